use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Daemon configuration, straight from the command line.
#[derive(Debug, Clone, Parser)]
#[command(name = "s3driverd", version, about = "S3 volume driver daemon")]
pub struct Config {
    /// host:port to serve volume management functions, or the socket path
    /// for the unix transport
    #[arg(long = "listenAddr", default_value = "127.0.0.1:9750")]
    pub listen_addr: String,

    /// host:port to serve process admin functions
    #[arg(long = "adminAddr", default_value = "127.0.0.1:7590")]
    pub admin_addr: String,

    /// Path to the directory where the orchestrator discovers driver spec
    /// files; no spec file is written when unset
    #[arg(long = "driversPath")]
    pub drivers_path: Option<PathBuf>,

    /// Transport protocol to transmit HTTP over
    #[arg(long = "transport", value_enum, default_value_t = Transport::Tcp)]
    pub transport: Transport,

    /// Path to the directory where volume mount points are created
    #[arg(long = "mountDir", default_value = "/tmp/volumes")]
    pub mount_dir: PathBuf,

    /// Path to the mounter helper binary
    #[arg(long = "mounterPath", default_value = "s3mounter")]
    pub mounter_path: PathBuf,

    /// Where to place logs for the mounter helper
    #[arg(long = "mounterLogDir", default_value = "/tmp")]
    pub mounter_log_dir: PathBuf,

    /// Where to place pid files for the mounter helper
    #[arg(long = "mounterPidDir", default_value = "/tmp")]
    pub mounter_pid_dir: PathBuf,

    /// Whether the driver should require ssl-secured communication
    #[arg(long = "requireSSL")]
    pub require_ssl: bool,

    /// Certificate authority public key file to use with ssl authentication
    #[arg(long = "caFile")]
    pub ca_file: Option<PathBuf>,

    /// Public key file to use with ssl authentication
    #[arg(long = "certFile")]
    pub cert_file: Option<PathBuf>,

    /// Private key file to use with ssl authentication
    #[arg(long = "keyFile")]
    pub key_file: Option<PathBuf>,

    /// Public key file to use with client ssl authentication
    #[arg(long = "clientCertFile")]
    pub client_cert_file: Option<PathBuf>,

    /// Private key file to use with client ssl authentication
    #[arg(long = "clientKeyFile")]
    pub client_key_file: Option<PathBuf>,

    /// Whether SSL communication should skip verification of server IP
    /// addresses in the certificate
    #[arg(long = "insecureSkipVerify")]
    pub insecure_skip_verify: bool,

    /// Whether the driver should opt in to unique volume ids
    #[arg(long = "uniqueVolumeIds")]
    pub unique_volume_ids: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Plain TCP with a raw-URL spec file
    Tcp,
    /// TCP with a JSON spec file
    TcpJson,
    /// Unix domain socket
    Unix,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_expectations() {
        let config = Config::parse_from(["s3driverd"]);
        assert_eq!(config.listen_addr, "127.0.0.1:9750");
        assert_eq!(config.admin_addr, "127.0.0.1:7590");
        assert_eq!(config.transport, Transport::Tcp);
        assert_eq!(config.mount_dir, PathBuf::from("/tmp/volumes"));
        assert_eq!(config.mounter_path, PathBuf::from("s3mounter"));
        assert!(!config.require_ssl);
        assert!(!config.unique_volume_ids);
    }

    #[test]
    fn flags_use_camel_case_names() {
        let config = Config::parse_from([
            "s3driverd",
            "--transport",
            "tcp-json",
            "--mountDir",
            "/var/vcap/data/volumes",
            "--uniqueVolumeIds",
        ]);
        assert_eq!(config.transport, Transport::TcpJson);
        assert_eq!(config.mount_dir, PathBuf::from("/var/vcap/data/volumes"));
        assert!(config.unique_volume_ids);
    }
}
