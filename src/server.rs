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

//! HTTP JSON binding of the API.
//!
//! ```text
//! POST /Login               LoginRequest
//! POST /Domains_List        SessionRequest
//! POST /Get_DNS_Zone        ZoneRequest
//! POST /Add_DNS_Record      RecordRequest<NewRecord>
//! POST /Modify_DNS_Record   RecordRequest<RecordPatch>
//! POST /Delete_DNS_Record   RecordRequest<RecordRef>
//! GET  /zone                zone file text
//! ```
//!
//! Every POST answers `200 OK` with an [`Envelope`], business errors included.
//! A body that is not a JSON object is treated as an empty request, which the
//! operation then rejects like any request missing its fields.

use std::io;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tokio_rustls::TlsAcceptor;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::api::{
    Api, DnsZone, DomainsList, Envelope, LoginData, LoginRequest, NoData, RecordRequest,
    SessionRequest, ZoneRequest,
};
use crate::store::{NewRecord, RecordPatch, RecordRef};

/// Builds the router serving `api`.
pub fn router(api: Arc<Api>) -> Router {
    Router::new()
        .route("/Login", post(login))
        .route("/Domains_List", post(domains_list))
        .route("/Get_DNS_Zone", post(get_dns_zone))
        .route("/Add_DNS_Record", post(add_dns_record))
        .route("/Modify_DNS_Record", post(modify_dns_record))
        .route("/Delete_DNS_Record", post(delete_dns_record))
        .route("/zone", get(zone))
        .layer(TraceLayer::new_for_http())
        .with_state(api)
}

/// Serves `api` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, api: Arc<Api>, shutdown: F) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(api))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Serves `api` over TLS on `listener` until `shutdown` resolves.
///
/// Connections already accepted are left to finish on their own.
pub async fn serve_tls<F>(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    api: Arc<Api>,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let app = router(api);
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!("failed to accept HTTPS connection: {}", err);
                    continue;
                }
            },
            () = &mut shutdown => return Ok(()),
        };

        let acceptor = acceptor.clone();
        let app = app.clone();
        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    debug!(%peer, "TLS handshake failed: {}", err);
                    return;
                }
            };
            let service = TowerToHyperService::new(app);
            if let Err(err) = auto::Builder::new(TokioExecutor::new())
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!(%peer, "HTTPS connection closed with error: {}", err);
            }
        });
    }
}

fn decode<T>(operation: &'static str, body: &[u8]) -> T
where
    T: DeserializeOwned + Default,
{
    serde_json::from_slice(body).unwrap_or_else(|err| {
        debug!(operation, "undecodable request body: {}", err);
        T::default()
    })
}

async fn login(State(api): State<Arc<Api>>, body: Bytes) -> Json<Envelope<LoginData>> {
    let req: LoginRequest = decode("Login", &body);
    Json(api.login(&req.login, &req.password).into())
}

async fn domains_list(State(api): State<Arc<Api>>, body: Bytes) -> Json<Envelope<DomainsList>> {
    let req: SessionRequest = decode("Domains_List", &body);
    Json(api.domains_list(req.ssid.as_deref()).into())
}

async fn get_dns_zone(State(api): State<Arc<Api>>, body: Bytes) -> Json<Envelope<DnsZone>> {
    let req: ZoneRequest = decode("Get_DNS_Zone", &body);
    Json(api.get_dns_zone(req.ssid.as_deref(), &req.domain).into())
}

async fn add_dns_record(State(api): State<Arc<Api>>, body: Bytes) -> Json<Envelope<NoData>> {
    let req: RecordRequest<NewRecord> = decode("Add_DNS_Record", &body);
    Json(api.add_dns_record(req.ssid.as_deref(), &req.domain, req.record).into())
}

async fn modify_dns_record(State(api): State<Arc<Api>>, body: Bytes) -> Json<Envelope<NoData>> {
    let req: RecordRequest<RecordPatch> = decode("Modify_DNS_Record", &body);
    Json(api.modify_dns_record(req.ssid.as_deref(), &req.domain, req.record).into())
}

async fn delete_dns_record(State(api): State<Arc<Api>>, body: Bytes) -> Json<Envelope<NoData>> {
    let req: RecordRequest<RecordRef> = decode("Delete_DNS_Record", &body);
    Json(api.delete_dns_record(req.ssid.as_deref(), &req.domain, req.record).into())
}

async fn zone(State(api): State<Arc<Api>>) -> String {
    api.zone()
}

/// Resolves once `true` is sent on the channel or its sender is gone.
///
/// Lets one shutdown signal stop every listener.
pub async fn stopped(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Waits for SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("shutting down due to interrupt request");
        }
        _ = terminate => {
            info!("shutting down due to termination request");
        }
    }
}
