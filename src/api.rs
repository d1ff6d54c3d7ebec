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

//! The six Subreg.cz operations and their request/response shapes.
//!
//! Transports deserialize a request type, call the matching [`Api`] method and
//! serialize the returned [`Response`] inside an [`Envelope`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::session::{Credentials, SessionAuthenticator};
use crate::store::{DomainInfo, NewRecord, Record, RecordPatch, RecordRef, RecordStore};
use crate::utils::serde_utils::{lenient, lenient_or_default, option_is_empty, vec_is_empty};

/// Numeric error code of the error envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode {
    pub major: u32,
    pub minor: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub errormsg: String,
    pub errorcode: ErrorCode,
}

impl From<ApiError> for ErrorInfo {
    fn from(err: ApiError) -> Self {
        Self {
            errormsg: err.errormsg().to_string(),
            errorcode: ErrorCode {
                major: err.major(),
                minor: err.minor(),
            },
        }
    }
}

/// Outcome of one operation, tagged by `status`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response<T> {
    Ok {
        #[serde(skip_serializing_if = "option_is_empty")]
        data: Option<T>,
    },
    Error {
        error: ErrorInfo,
    },
}

impl<T> Response<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Response::Ok { .. })
    }

    pub fn into_result(self) -> Result<Option<T>, ErrorInfo> {
        match self {
            Response::Ok { data } => Ok(data),
            Response::Error { error } => Err(error),
        }
    }
}

impl<T> From<ApiError> for Response<T> {
    fn from(err: ApiError) -> Self {
        Response::Error { error: err.into() }
    }
}

/// Wire wrapper, `{"response": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub response: Response<T>,
}

impl<T> From<Response<T>> for Envelope<T> {
    fn from(response: Response<T>) -> Self {
        Self { response }
    }
}

/// Payload of operations that report success without data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoData {}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginData {
    pub ssid: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainsList {
    pub count: usize,
    pub domains: Vec<DomainInfo>,
}

/// Get_DNS_Zone payload. `records` is left out entirely for an empty zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsZone {
    pub domain: String,
    #[serde(default, skip_serializing_if = "vec_is_empty")]
    pub records: Vec<Record>,
}

/// Request bodies decode leniently: a field of the wrong JSON type reads as
/// absent, so authorization and validation still answer with an envelope.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub login: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub password: String,
}

/// Request carrying only the session id (Domains_List).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "option_is_empty")]
    pub ssid: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRequest {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "option_is_empty")]
    pub ssid: Option<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub domain: String,
}

/// Request of the record operations, `R` is the operation's record shape.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(deserialize = "R: Deserialize<'de> + Default"))]
pub struct RecordRequest<R> {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "option_is_empty")]
    pub ssid: Option<String>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub domain: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub record: R,
}

/// The simulated registrar: one account, one session, a fixed domain set.
pub struct Api {
    session: SessionAuthenticator,
    store: RecordStore,
}

impl Api {
    pub fn new<I, S>(credentials: Credentials, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            session: SessionAuthenticator::new(credentials),
            store: RecordStore::new(domains),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn authorize(&self, ssid: Option<&str>) -> Result<(), ApiError> {
        if self.session.authorize(ssid) {
            Ok(())
        } else {
            Err(ApiError::NotLogged)
        }
    }

    pub fn login(&self, login: &str, password: &str) -> Response<LoginData> {
        respond("Login", self.session.login(login, password).map(|ssid| Some(LoginData { ssid })))
    }

    pub fn domains_list(&self, ssid: Option<&str>) -> Response<DomainsList> {
        let result = self.authorize(ssid).map(|()| {
            let domains = self.store.list_domains();
            Some(DomainsList {
                count: domains.len(),
                domains,
            })
        });
        respond("Domains_List", result)
    }

    pub fn get_dns_zone(&self, ssid: Option<&str>, domain: &str) -> Response<DnsZone> {
        let result = self.authorize(ssid).and_then(|()| {
            let records = self.store.get_zone(domain)?;
            Ok(Some(DnsZone {
                domain: domain.to_string(),
                records,
            }))
        });
        respond("Get_DNS_Zone", result)
    }

    pub fn add_dns_record(&self, ssid: Option<&str>, domain: &str, record: NewRecord) -> Response<NoData> {
        let result = self
            .authorize(ssid)
            .and_then(|()| self.store.add_record(domain, record))
            .map(|_id| None);
        respond("Add_DNS_Record", result)
    }

    pub fn modify_dns_record(&self, ssid: Option<&str>, domain: &str, patch: RecordPatch) -> Response<NoData> {
        let result = self
            .authorize(ssid)
            .and_then(|()| self.store.modify_record(domain, patch))
            .map(|()| None);
        respond("Modify_DNS_Record", result)
    }

    pub fn delete_dns_record(&self, ssid: Option<&str>, domain: &str, reference: RecordRef) -> Response<NoData> {
        let result = self
            .authorize(ssid)
            .and_then(|()| self.store.delete_record(domain, reference))
            .map(|()| None);
        respond("Delete_DNS_Record", result)
    }

    /// Zone file of every configured domain, rendered fresh on each call.
    pub fn zone(&self) -> String {
        self.store.zone()
    }
}

fn respond<T>(operation: &'static str, result: Result<Option<T>, ApiError>) -> Response<T> {
    match result {
        Ok(data) => Response::Ok { data },
        Err(err) => {
            debug!(operation, major = err.major(), minor = err.minor(), "{err}");
            err.into()
        }
    }
}
