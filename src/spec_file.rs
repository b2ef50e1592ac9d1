//! Driver discovery spec file.
//!
//! The orchestrator finds volume drivers by scanning a well-known directory
//! for spec files. The `.spec` form is the advertised URL as raw text; the
//! `.json` form carries the address plus the client TLS material and the
//! unique-volume-ids opt-in.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name the driver advertises itself under.
pub const DRIVER_NAME: &str = "s3driver";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSpec {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "TLSConfig", skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<TlsClientConfig>,
    #[serde(rename = "UniqueVolumeIds")]
    pub unique_volume_ids: bool,
}

/// Client-side TLS material the orchestrator should use to reach the
/// driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsClientConfig {
    #[serde(rename = "InsecureSkipVerify")]
    pub insecure_skip_verify: bool,
    #[serde(rename = "CAFile")]
    pub ca_file: String,
    #[serde(rename = "CertFile")]
    pub cert_file: String,
    #[serde(rename = "KeyFile")]
    pub key_file: String,
}

/// Writes `<drivers_path>/<DRIVER_NAME>.spec` with the raw advertised URL.
pub fn write_spec(drivers_path: &Path, advertised_url: &str) -> io::Result<PathBuf> {
    write_file(drivers_path, "spec", advertised_url.as_bytes())
}

/// Writes `<drivers_path>/<DRIVER_NAME>.json` with the full driver spec.
pub fn write_json_spec(drivers_path: &Path, spec: &DriverSpec) -> io::Result<PathBuf> {
    let contents = serde_json::to_vec(spec)?;
    write_file(drivers_path, "json", &contents)
}

fn write_file(drivers_path: &Path, extension: &str, contents: &[u8]) -> io::Result<PathBuf> {
    std::fs::create_dir_all(drivers_path)?;
    let spec_path = drivers_path.join(format!("{DRIVER_NAME}.{extension}"));
    std::fs::write(&spec_path, contents)?;
    tracing::info!(location = %spec_path.display(), "wrote-spec-file");
    Ok(spec_path)
}
