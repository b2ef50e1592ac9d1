//! Volume-plugin control endpoints.
//!
//! One module per operation, each carrying its typed request/response pair,
//! the axum handler, and the client-side `ApiRequest` impl. Responses always
//! come back `200 OK`; failures ride in the `Err` field, which is how the
//! orchestrator's plugin client expects them.

use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::driver::VolumeDriver;

pub mod activate;
pub mod capabilities;
pub mod client;
pub mod create;
pub mod get;
pub mod list;
pub mod mount;
pub mod path;
pub mod remove;
pub mod unmount;

pub use client::{ApiClient, ApiError, ApiRequest};

/// Response carrying only an error field; empty string on success.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "Err", default)]
    pub err: String,
}

impl ErrorResponse {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn from_err(err: impl std::fmt::Display) -> Self {
        Self {
            err: err.to_string(),
        }
    }
}

/// A volume as exposed on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: String,
}

pub fn router(driver: Arc<VolumeDriver>) -> Router {
    Router::new()
        .route("/Plugin.Activate", post(activate::handler))
        .route("/VolumeDriver.Create", post(create::handler))
        .route("/VolumeDriver.Remove", post(remove::handler))
        .route("/VolumeDriver.Mount", post(mount::handler))
        .route("/VolumeDriver.Unmount", post(unmount::handler))
        .route("/VolumeDriver.Get", post(get::handler))
        .route("/VolumeDriver.List", post(list::handler))
        .route("/VolumeDriver.Path", post(path::handler))
        .route("/VolumeDriver.Capabilities", post(capabilities::handler))
        .with_state(driver)
}
