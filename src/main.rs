use std::future::Future;
use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use s3_volume_driver::config::{Config, Transport};
use s3_volume_driver::driver::VolumeDriver;
use s3_volume_driver::http_server;
use s3_volume_driver::mounter::{MounterConfig, ProcessMounter};
use s3_volume_driver::process::{self, ShutdownHandle};
use s3_volume_driver::spec_file::{self, DriverSpec, TlsClientConfig};
use s3_volume_driver::sys::{
    FuseUnmounter, ProcMountChecker, RealInvoker, SystemClock, SystemOsHelper,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("start");

    let mounter = Arc::new(ProcessMounter::new(MounterConfig {
        mounter_path: config.mounter_path.clone(),
        log_dir: config.mounter_log_dir.clone(),
        pid_dir: config.mounter_pid_dir.clone(),
    }));

    let driver = Arc::new(
        VolumeDriver::new(
            &config.mount_dir,
            mounter,
            Arc::new(ProcMountChecker::new()),
            Arc::new(RealInvoker),
            Arc::new(FuseUnmounter),
            Arc::new(SystemOsHelper),
            Arc::new(SystemClock),
        )
        .context("resolving mount root")?,
    );

    driver.restore_state().await;

    write_driver_spec(&config)?;

    let shutdown = ShutdownHandle::new();
    tokio::spawn(process::watch_signals(shutdown.clone()));

    let app = http_server::router(driver.clone());
    let admin = http_server::admin::router(driver.clone(), shutdown.clone());

    let driver_server: std::pin::Pin<Box<dyn Future<Output = io::Result<()>> + '_>> =
        match config.transport {
            Transport::Unix => Box::pin(serve_unix_owned(
                config.listen_addr.clone(),
                app,
                shutdown.clone(),
            )),
            Transport::Tcp | Transport::TcpJson => {
                if config.require_ssl {
                    let cert_file = config
                        .cert_file
                        .as_deref()
                        .context("requireSSL is set but no certFile given")?;
                    let key_file = config
                        .key_file
                        .as_deref()
                        .context("requireSSL is set but no keyFile given")?;
                    let tls = http_server::load_server_config(
                        cert_file,
                        key_file,
                        config.ca_file.as_deref(),
                    )?;
                    Box::pin(http_server::serve_tls(
                        &config.listen_addr,
                        app,
                        Arc::new(tls),
                        shutdown.clone(),
                    ))
                } else {
                    Box::pin(http_server::serve_tcp(
                        &config.listen_addr,
                        app,
                        shutdown.clone(),
                    ))
                }
            }
        };

    let admin_server = http_server::serve_tcp(&config.admin_addr, admin, shutdown.clone());

    tracing::info!("started");

    let (driver_result, admin_result) = tokio::join!(
        run_server("volume-driver", driver_server, shutdown.clone()),
        run_server("admin", admin_server, shutdown.clone()),
    );

    // Servers are down; converge the mount table before exiting so no
    // kernel mounts leak past the daemon's lifetime.
    driver.drain().await;

    driver_result.context("volume driver server failed")?;
    admin_result.context("admin server failed")?;

    tracing::info!("end");
    Ok(())
}

/// Runs one server future; a server failing takes the whole group down.
async fn run_server(
    name: &str,
    server: impl Future<Output = io::Result<()>>,
    shutdown: ShutdownHandle,
) -> io::Result<()> {
    let result = server.await;
    if let Err(err) = &result {
        tracing::error!(server = name, error = %err, "server-failed");
        shutdown.trigger();
    }
    result
}

async fn serve_unix_owned(
    socket_path: String,
    app: axum::Router,
    shutdown: ShutdownHandle,
) -> io::Result<()> {
    http_server::serve_unix(Path::new(&socket_path), app, shutdown).await
}

/// Writes the discovery spec file for tcp transports; the unix transport is
/// discovered by socket path and writes none.
fn write_driver_spec(config: &Config) -> anyhow::Result<()> {
    let Some(drivers_path) = &config.drivers_path else {
        return Ok(());
    };

    match config.transport {
        Transport::Unix => Ok(()),
        Transport::Tcp => {
            let advertised_url = format!("http://{}", config.listen_addr);
            spec_file::write_spec(drivers_path, &advertised_url)
                .context("writing driver spec file")?;
            Ok(())
        }
        Transport::TcpJson => {
            let mut spec = DriverSpec {
                name: spec_file::DRIVER_NAME.to_string(),
                address: format!("http://{}", config.listen_addr),
                tls_config: None,
                unique_volume_ids: config.unique_volume_ids,
            };

            if config.require_ssl {
                let ca_file = abs_flag_path(config.ca_file.as_deref(), "caFile")?;
                let cert_file = abs_flag_path(config.client_cert_file.as_deref(), "clientCertFile")?;
                let key_file = abs_flag_path(config.client_key_file.as_deref(), "clientKeyFile")?;

                spec.tls_config = Some(TlsClientConfig {
                    insecure_skip_verify: config.insecure_skip_verify,
                    ca_file,
                    cert_file,
                    key_file,
                });
                spec.address = format!("https://{}", config.listen_addr);
            }

            spec_file::write_json_spec(drivers_path, &spec)
                .context("writing driver json spec file")?;
            Ok(())
        }
    }
}

fn abs_flag_path(path: Option<&Path>, flag: &str) -> anyhow::Result<String> {
    let path = path.with_context(|| format!("requireSSL is set but no {flag} given"))?;
    let abs = std::path::absolute(path)
        .with_context(|| format!("resolving {flag} {}", path.display()))?;
    Ok(abs.to_string_lossy().into_owned())
}
