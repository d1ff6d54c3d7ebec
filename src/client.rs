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

//! Typed client for the simulator's HTTP JSON binding.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::api::{
    DnsZone, DomainsList, Envelope, LoginData, LoginRequest, NoData, RecordRequest, Response,
    SessionRequest, ZoneRequest,
};
use crate::store::{NewRecord, RecordPatch, RecordRef};
use crate::utils::request::{ApiHttpClient, DefaultApiClient};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

pub struct SubregClient<T: ApiHttpClient = DefaultApiClient> {
    /// HTTP client for making requests
    http_client: T,
    /// Server root, e.g. `http://localhost:8008`
    api: String,
}

impl SubregClient<DefaultApiClient> {
    pub fn new(api: impl Into<String>) -> Self {
        Self::with_http_client(DefaultApiClient::new(), api)
    }
}

impl<T: ApiHttpClient> SubregClient<T> {
    pub fn with_http_client(http_client: T, api: impl Into<String>) -> Self {
        Self {
            http_client,
            api: api.into().trim_end_matches('/').to_string(),
        }
    }

    async fn call<Req, Data>(&self, operation: &str, request: &Req) -> Result<Response<Data>, ClientError>
    where
        Req: Serialize,
        Data: DeserializeOwned,
    {
        let url = format!("{}/{}", self.api, operation);
        let body = serde_json::to_string(request)?;
        let text = self.http_client.request(Method::POST, url, Some(body)).await?;
        let envelope: Envelope<Data> = serde_json::from_str(&text)?;
        Ok(envelope.response)
    }

    pub async fn login(&self, login: &str, password: &str) -> Result<Response<LoginData>, ClientError> {
        let request = LoginRequest {
            login: login.into(),
            password: password.into(),
        };
        self.call("Login", &request).await
    }

    pub async fn domains_list(&self, ssid: Option<&str>) -> Result<Response<DomainsList>, ClientError> {
        let request = SessionRequest {
            ssid: ssid.map(Into::into),
        };
        self.call("Domains_List", &request).await
    }

    pub async fn get_dns_zone(&self, ssid: Option<&str>, domain: &str) -> Result<Response<DnsZone>, ClientError> {
        let request = ZoneRequest {
            ssid: ssid.map(Into::into),
            domain: domain.into(),
        };
        self.call("Get_DNS_Zone", &request).await
    }

    pub async fn add_dns_record(
        &self,
        ssid: Option<&str>,
        domain: &str,
        record: NewRecord,
    ) -> Result<Response<NoData>, ClientError> {
        self.call("Add_DNS_Record", &record_request(ssid, domain, record)).await
    }

    pub async fn modify_dns_record(
        &self,
        ssid: Option<&str>,
        domain: &str,
        patch: RecordPatch,
    ) -> Result<Response<NoData>, ClientError> {
        self.call("Modify_DNS_Record", &record_request(ssid, domain, patch)).await
    }

    pub async fn delete_dns_record(
        &self,
        ssid: Option<&str>,
        domain: &str,
        reference: RecordRef,
    ) -> Result<Response<NoData>, ClientError> {
        self.call("Delete_DNS_Record", &record_request(ssid, domain, reference)).await
    }

    /// Fetches the rendered zone file.
    pub async fn zone(&self) -> Result<String, ClientError> {
        let url = format!("{}/zone", self.api);
        self.http_client.request(Method::GET, url, None).await
    }
}

fn record_request<R>(ssid: Option<&str>, domain: &str, record: R) -> RecordRequest<R> {
    RecordRequest {
        ssid: ssid.map(Into::into),
        domain: domain.into(),
        record,
    }
}
