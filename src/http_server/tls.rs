use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use rustls::{RootCertStore, ServerConfig};

/// Builds the server-side TLS configuration from PEM files. When a CA file
/// is supplied, clients must present a certificate signed by it (the
/// orchestrator side carries the matching client material in the driver
/// spec file).
pub fn load_server_config(
    cert_file: &Path,
    key_file: &Path,
    ca_file: Option<&Path>,
) -> anyhow::Result<ServerConfig> {
    let certs = read_certs(cert_file)?;

    let mut key_reader = BufReader::new(
        File::open(key_file).with_context(|| format!("opening key file {}", key_file.display()))?,
    );
    let key: PrivateKeyDer<'static> = rustls_pemfile::private_key(&mut key_reader)?
        .with_context(|| format!("no private key found in {}", key_file.display()))?;

    let builder = ServerConfig::builder();
    let config = match ca_file {
        Some(ca_file) => {
            let mut roots = RootCertStore::empty();
            for cert in read_certs(ca_file)? {
                roots.add(cert)?;
            }
            let verifier = WebPkiClientVerifier::builder(Arc::new(roots))
                .build()
                .context("building client certificate verifier")?;
            builder.with_client_cert_verifier(verifier)
        }
        None => builder.with_no_client_auth(),
    }
    .with_single_cert(certs, key)
    .context("assembling server TLS configuration")?;

    Ok(config)
}

fn read_certs(path: &Path) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("opening certificate file {}", path.display()))?,
    );
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("parsing certificates in {}", path.display()))?;
    anyhow::ensure!(!certs.is_empty(), "no certificates found in {}", path.display());
    Ok(certs)
}
