use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::driver::ConnectionInfo;

/// Mount parameters fed to the helper on its stdin.
///
/// The field names are a wire contract with deployed mounter binaries and
/// must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountParams {
    #[serde(rename = "Uid")]
    pub uid: u32,
    #[serde(rename = "Gid")]
    pub gid: u32,
    #[serde(rename = "MountPoint")]
    pub mount_point: PathBuf,
    #[serde(rename = "MountOptions")]
    pub mount_options: HashMap<String, String>,
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "Bucket")]
    pub bucket: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "Endpoint")]
    pub endpoint: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "RegionSet")]
    pub region_set: bool,
    #[serde(rename = "StorageClass")]
    pub storage_class: String,
    #[serde(rename = "UseContentType")]
    pub use_content_type: bool,
    #[serde(rename = "UseSSE")]
    pub use_sse: bool,
    #[serde(rename = "UseKMS")]
    pub use_kms: bool,
    #[serde(rename = "KMSKeyID")]
    pub kms_key_id: String,
    #[serde(rename = "ACL")]
    pub acl: String,
    #[serde(rename = "Subdomain")]
    pub subdomain: bool,
}

impl MountParams {
    /// Builds the helper parameters from a volume's connection. The
    /// `allow_other` option is always forced so that containers running as
    /// other users can see the mount.
    pub fn new(conn: &ConnectionInfo, mount_point: &Path, uid: u32, gid: u32) -> Self {
        let mut mount_options = conn.mount_options.clone();
        mount_options.insert("allow_other".to_string(), String::new());

        Self {
            uid,
            gid,
            mount_point: mount_point.to_path_buf(),
            mount_options,
            access_key_id: conn.access_key_id.clone(),
            bucket: conn.bucket.clone(),
            secret_access_key: conn.secret_access_key.clone(),
            endpoint: conn.endpoint.clone(),
            region: conn.region.clone(),
            region_set: conn.region_set,
            storage_class: conn.storage_class.clone(),
            use_content_type: conn.use_content_type,
            use_sse: conn.use_sse,
            use_kms: conn.use_kms,
            kms_key_id: conn.kms_key_id.clone(),
            acl: conn.acl.clone(),
            subdomain: conn.subdomain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_conn() -> ConnectionInfo {
        ConnectionInfo {
            bucket: "b".to_string(),
            access_key_id: "ak".to_string(),
            secret_access_key: "sk".to_string(),
            kms_key_id: "kms".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn wire_field_names_are_stable() {
        let params = MountParams::new(&sample_conn(), Path::new("/tmp/volumes/v1"), 1000, 1000);
        let json: serde_json::Value = serde_json::to_value(&params).unwrap();

        assert_eq!(json["Bucket"], "b");
        assert_eq!(json["AccessKeyId"], "ak");
        assert_eq!(json["SecretAccessKey"], "sk");
        assert_eq!(json["KMSKeyID"], "kms");
        assert_eq!(json["MountPoint"], "/tmp/volumes/v1");
        assert_eq!(json["Uid"], 1000);
        assert!(json.get("bucket").is_none());
    }

    #[test]
    fn allow_other_is_forced() {
        let mut conn = sample_conn();
        conn.mount_options
            .insert("uid".to_string(), "2000".to_string());

        let params = MountParams::new(&conn, Path::new("/tmp/volumes/v1"), 0, 0);
        assert_eq!(params.mount_options.get("allow_other"), Some(&String::new()));
        assert_eq!(params.mount_options.get("uid"), Some(&"2000".to_string()));
    }
}
