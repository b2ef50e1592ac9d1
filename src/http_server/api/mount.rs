use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::ApiRequest;
use crate::driver::VolumeDriver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountRequest {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountResponse {
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: String,
    #[serde(rename = "Err", default)]
    pub err: String,
}

#[tracing::instrument(skip_all, fields(volume = %request.name))]
pub async fn handler(
    State(driver): State<Arc<VolumeDriver>>,
    Json(request): Json<MountRequest>,
) -> Json<MountResponse> {
    match driver.mount(&request.name).await {
        Ok(mountpoint) => Json(MountResponse {
            mountpoint: mountpoint.to_string_lossy().into_owned(),
            err: String::new(),
        }),
        Err(err) => Json(MountResponse {
            mountpoint: String::new(),
            err: err.to_string(),
        }),
    }
}

impl ApiRequest for MountRequest {
    type Response = MountResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/VolumeDriver.Mount").unwrap();
        client.post(full_url).json(&self)
    }
}
