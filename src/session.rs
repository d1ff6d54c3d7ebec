// Copyright 2023 subregsim authors
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Single-session login handling.
//!
//! The simulated registrar knows one account and keeps at most one live
//! session. Every login attempt, successful or not, drops the current session.
//!
//! A token checked by [`SessionAuthenticator::authorize`] can be invalidated
//! by a concurrent login before the caller uses it. The registrar behaves the
//! same way, so that window is left open.

use parking_lot::Mutex;
use rand::Rng;
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::error::ApiError;

/// Length of an issued session id.
pub const SSID_LEN: usize = 32;

const SSID_CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// The account accepted by the simulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    fn matches(&self, login: &str, password: &str) -> bool {
        self.username == login && self.password == password
    }
}

/// Issues and checks the single session id.
pub struct SessionAuthenticator {
    credentials: Credentials,
    ssid: Mutex<Option<String>>,
}

impl SessionAuthenticator {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            ssid: Mutex::new(None),
        }
    }

    /// Logs in and returns a fresh session id.
    ///
    /// The previous session is revoked before the credentials are checked.
    pub fn login(&self, login: &str, password: &str) -> Result<String, ApiError> {
        let mut ssid = self.ssid.lock();
        let previous = ssid.take();

        if !self.credentials.matches(login, password) {
            warn!(login, "login rejected");
            return Err(ApiError::AuthError);
        }

        let token = loop {
            let candidate = generate_ssid();
            // never hand out the id that was just revoked
            if previous.as_deref() != Some(candidate.as_str()) {
                break candidate;
            }
        };
        *ssid = Some(token.clone());
        info!(login, "login accepted");
        Ok(token)
    }

    /// Returns true only for the currently active session id.
    pub fn authorize(&self, ssid: Option<&str>) -> bool {
        match (ssid, self.ssid.lock().as_deref()) {
            (Some(given), Some(active)) => given == active,
            _ => false,
        }
    }
}

fn generate_ssid() -> String {
    let mut rng = OsRng;
    (0..SSID_LEN)
        .map(|_| SSID_CHARSET[rng.gen_range(0..SSID_CHARSET.len())] as char)
        .collect()
}
