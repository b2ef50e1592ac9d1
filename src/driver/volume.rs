use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A named, long-lived record binding a logical volume name to a bucket
/// connection and its local mount state.
///
/// The serialized form is the on-disk state-file entry; field names match
/// the state files written by earlier deployments. `mount_error` never
/// reaches disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: PathBuf,
    #[serde(rename = "MountCount", default)]
    pub mount_count: u32,
    #[serde(rename = "ConnectionInfo", default)]
    pub connection: ConnectionInfo,
    #[serde(skip)]
    pub mount_error: Option<String>,
}

impl Volume {
    pub fn new(name: impl Into<String>, connection: ConnectionInfo) -> Self {
        Self {
            name: name.into(),
            mountpoint: PathBuf::new(),
            mount_count: 0,
            connection,
            mount_error: None,
        }
    }

    /// Whether a mountpoint has been assigned by a previous Mount.
    pub fn has_mountpoint(&self) -> bool {
        !self.mountpoint.as_os_str().is_empty()
    }
}

/// Immutable binding describing how to reach the bucket.
///
/// Credentials are redacted from persistence: they are omitted when the
/// state file is written and come back empty on restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(rename = "Bucket", default)]
    pub bucket: String,
    #[serde(rename = "AccessKeyId", default, skip_serializing)]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey", default, skip_serializing)]
    pub secret_access_key: String,
    #[serde(rename = "Endpoint", default)]
    pub endpoint: String,
    #[serde(rename = "Region", default)]
    pub region: String,
    #[serde(rename = "RegionSet", default)]
    pub region_set: bool,
    #[serde(rename = "StorageClass", default)]
    pub storage_class: String,
    #[serde(rename = "UseContentType", default)]
    pub use_content_type: bool,
    #[serde(rename = "UseSSE", default)]
    pub use_sse: bool,
    #[serde(rename = "UseKMS", default)]
    pub use_kms: bool,
    #[serde(rename = "KMSKeyID", default, skip_serializing)]
    pub kms_key_id: String,
    #[serde(rename = "ACL", default)]
    pub acl: String,
    #[serde(rename = "Subdomain", default)]
    pub subdomain: bool,
    #[serde(rename = "MountOptions", default)]
    pub mount_options: HashMap<String, String>,
}

/// The `Opts` map accepted by Create. Keys are snake_case; unknown keys are
/// ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectionOpts {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub region_set: bool,
    #[serde(default)]
    pub storage_class: String,
    #[serde(default)]
    pub use_content_type: bool,
    #[serde(default)]
    pub use_sse: bool,
    #[serde(default)]
    pub use_kms: bool,
    #[serde(default)]
    pub kms_key_id: String,
    #[serde(default)]
    pub acl: String,
    #[serde(default)]
    pub subdomain: bool,
    #[serde(default)]
    pub mount_options: HashMap<String, String>,
}

impl From<ConnectionOpts> for ConnectionInfo {
    fn from(opts: ConnectionOpts) -> Self {
        Self {
            bucket: opts.bucket,
            access_key_id: opts.access_key_id,
            secret_access_key: opts.secret_access_key,
            endpoint: opts.endpoint,
            region: opts.region,
            region_set: opts.region_set,
            storage_class: opts.storage_class,
            use_content_type: opts.use_content_type,
            use_sse: opts.use_sse,
            use_kms: opts.use_kms,
            kms_key_id: opts.kms_key_id,
            acl: opts.acl,
            subdomain: opts.subdomain,
            mount_options: opts.mount_options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_redacted_from_serialization() {
        let mut volume = Volume::new(
            "v1",
            ConnectionInfo {
                bucket: "b".to_string(),
                access_key_id: "ak".to_string(),
                secret_access_key: "sk".to_string(),
                kms_key_id: "kms".to_string(),
                region: "eu-west-1".to_string(),
                ..Default::default()
            },
        );
        volume.mount_count = 2;
        volume.mountpoint = PathBuf::from("/tmp/volumes/v1");
        volume.mount_error = Some("boom".to_string());

        let json = serde_json::to_string(&volume).unwrap();
        assert!(json.contains("\"Bucket\":\"b\""));
        assert!(json.contains("\"Region\":\"eu-west-1\""));
        assert!(!json.contains("ak"));
        assert!(!json.contains("sk"));
        assert!(!json.contains("kms"));
        assert!(!json.contains("boom"));

        let restored: Volume = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "v1");
        assert_eq!(restored.mount_count, 2);
        assert_eq!(restored.connection.bucket, "b");
        assert!(restored.connection.access_key_id.is_empty());
        assert!(restored.mount_error.is_none());
    }

    #[test]
    fn opts_ignore_unknown_keys() {
        let opts: ConnectionOpts = serde_json::from_value(serde_json::json!({
            "bucket": "b",
            "access_key_id": "ak",
            "secret_access_key": "sk",
            "something_else": "ignored",
            "mount_options": {"ro": ""}
        }))
        .unwrap();

        assert_eq!(opts.bucket, "b");
        assert_eq!(opts.mount_options.get("ro"), Some(&String::new()));
    }
}
