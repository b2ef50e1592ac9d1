//! Volume-management daemon exposing S3 buckets as local mounts.
//!
//! The daemon speaks the Docker volume-plugin protocol over HTTP and maps
//! logical volume names to bucket connections. Each mounted volume is backed
//! by a supervised userspace FUSE helper process; the registry tracks
//! reference counts across repeated mount/unmount calls, persists itself
//! under the mount root so a restart can reconcile with in-kernel mounts,
//! and drains every mount on shutdown.

pub mod config;
pub mod driver;
pub mod http_server;
pub mod mounter;
pub mod process;
pub mod spec_file;
pub mod sys;

pub use config::Config;
pub use driver::VolumeDriver;
pub use process::ShutdownHandle;
