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

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use subregsim::api::Api;
use subregsim::config::{Args, Config};
use subregsim::{dns, server, tls};
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load(Args::parse()).context("invalid configuration")?;
    let host = config.host.as_str();

    let api = Arc::new(Api::new(config.credentials, config.domains));
    let (stop, _) = watch::channel(false);
    let mut servers = JoinSet::new();

    let listener = TcpListener::bind((host, config.port))
        .await
        .with_context(|| format!("cannot listen on {}:{}", host, config.port))?;
    let addr = listener.local_addr()?;
    info!(
        %addr,
        domains = ?api.store().domains(),
        "starting HTTP server"
    );
    servers.spawn(server::serve(listener, api.clone(), server::stopped(stop.subscribe())));

    if let Some(settings) = &config.tls {
        let acceptor = tls::acceptor(&settings.certificate, &settings.private_key)?;
        let listener = TcpListener::bind((host, settings.port))
            .await
            .with_context(|| format!("cannot listen on {}:{}", host, settings.port))?;
        let addr = listener.local_addr()?;
        info!(%addr, "starting HTTPS server");
        servers.spawn(server::serve_tls(
            listener,
            acceptor,
            api.clone(),
            server::stopped(stop.subscribe()),
        ));
    }

    if let Some(port) = config.dns_port {
        let socket = UdpSocket::bind((host, port))
            .await
            .with_context(|| format!("cannot listen on {}:{}/udp", host, port))?;
        let addr = socket.local_addr()?;
        info!(%addr, "starting DNS server");
        servers.spawn(dns::serve(socket, api.clone(), server::stopped(stop.subscribe())));
    }

    let early = tokio::select! {
        () = server::shutdown_signal() => None,
        Some(joined) = servers.join_next() => Some(joined),
    };
    stop.send_replace(true);

    if let Some(joined) = early {
        joined.context("server task failed")?.context("server stopped unexpectedly")?;
    }
    while let Some(joined) = servers.join_next().await {
        joined.context("server task failed")?.context("server failed")?;
    }

    info!("server stopped");
    Ok(())
}
