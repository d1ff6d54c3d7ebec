#[macro_export]
/// The `api_errors!` macro declares an API error enum from a table of error codes.
///
/// Every variant is bound to a `(major, minor, "message")` triple which is the
/// exact error code and message sent back to clients.
///
/// This macro generates:
/// - The enum itself, deriving `Debug`, `Clone`, `Copy`, `PartialEq` and `Eq`
/// - `major()`, `minor()` and `errormsg()` accessors
/// - `Display` (prints the message) and `std::error::Error`
///
/// # Usage
///
/// ```rust
/// subregsim_macros::api_errors! {
///     /// Errors returned by the API.
///     pub enum ApiError {
///         /// The session is missing or stale.
///         NotLogged => (500, 101, "You are not logged"),
///         InvalidDomain => (524, 1009, "Invalid domain"),
///     }
/// }
///
/// assert_eq!(ApiError::InvalidDomain.minor(), 1009);
/// assert_eq!(ApiError::NotLogged.to_string(), "You are not logged");
/// ```
///
/// Where:
/// - `major` and `minor` are `u32` literals
/// - the message is a string literal
///
macro_rules! api_errors {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => ($major:literal, $minor:literal, $msg:literal)
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )*
        }

        impl $name {
            /// Major part of the error code.
            pub fn major(&self) -> u32 {
                match self {
                    $( Self::$variant => $major, )*
                }
            }

            /// Minor part of the error code.
            pub fn minor(&self) -> u32 {
                match self {
                    $( Self::$variant => $minor, )*
                }
            }

            /// Message reported to the client.
            pub fn errormsg(&self) -> &'static str {
                match self {
                    $( Self::$variant => $msg, )*
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.errormsg())
            }
        }

        impl ::std::error::Error for $name {}
    };
}
