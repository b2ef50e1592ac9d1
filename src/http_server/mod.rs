//! HTTP transports for the control and admin protocols: plain TCP, TCP with
//! TLS (optionally mutual), and a Unix socket.

pub mod admin;
pub mod api;
pub mod tls;

pub use api::router;
pub use tls::load_server_config;

use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, UnixListener};
use tokio_rustls::TlsAcceptor;

use crate::process::ShutdownHandle;

pub async fn serve_tcp(addr: &str, app: Router, shutdown: ShutdownHandle) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

pub async fn serve_unix(path: &Path, app: Router, shutdown: ShutdownHandle) -> io::Result<()> {
    // A socket left behind by a previous run would make bind fail.
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    let listener = UnixListener::bind(path)?;
    tracing::info!(socket = %path.display(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await
}

/// TLS accept loop. Handshake failures drop the connection; served
/// connections run to completion on their own tasks even after shutdown
/// stops the accept loop.
pub async fn serve_tls(
    addr: &str,
    app: Router,
    config: Arc<rustls::ServerConfig>,
    shutdown: ShutdownHandle,
) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let acceptor = TlsAcceptor::from(config);
    tracing::info!(addr, "listening (tls)");

    loop {
        let (stream, remote) = tokio::select! {
            accepted = listener.accept() => accepted?,
            () = shutdown.wait() => return Ok(()),
        };

        let acceptor = acceptor.clone();
        let app = app.clone();

        tokio::spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::debug!(%remote, error = %err, "tls-handshake-failed");
                    return;
                }
            };

            let service = TowerToHyperService::new(app);
            if let Err(err) = ConnectionBuilder::new(TokioExecutor::new())
                .serve_connection_with_upgrades(TokioIo::new(stream), service)
                .await
            {
                tracing::debug!(%remote, error = %err, "connection-error");
            }
        });
    }
}
