use reqwest::{Client, Method};

use crate::client::ClientError;


/// HTTP transport used by [`crate::client::SubregClient`].
pub trait ApiHttpClient: Send + Sync {
    /// Sends a request and returns the response body as text.
    fn request(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
    ) -> impl Future<Output = Result<String, ClientError>> + Send;
}

/// [`ApiHttpClient`] over a shared [`reqwest::Client`].
///
/// Bodies are sent as `application/json` and non-2xx statuses are reported
/// as [`ClientError::Http`].
pub struct DefaultApiClient {
    inner: Client,
}

impl DefaultApiClient {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Wraps a preconfigured client, e.g. one trusting a test certificate.
    pub fn with_client(inner: Client) -> Self {
        Self { inner }
    }
}

impl Default for DefaultApiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiHttpClient for DefaultApiClient {
    async fn request(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
    ) -> Result<String, ClientError> {
        let mut req = self.inner.request(method, url);
        if let Some(body) = body {
            req = req.header(reqwest::header::CONTENT_TYPE, "application/json").body(body);
        }
        let text = req.send().await?.error_for_status()?.text().await?;

        Ok(text)
    }
}
