use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::ApiRequest;
use crate::driver::VolumeDriver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRequest {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathResponse {
    #[serde(rename = "Mountpoint", default)]
    pub mountpoint: String,
    #[serde(rename = "Err", default)]
    pub err: String,
}

#[tracing::instrument(skip_all, fields(volume = %request.name))]
pub async fn handler(
    State(driver): State<Arc<VolumeDriver>>,
    Json(request): Json<PathRequest>,
) -> Json<PathResponse> {
    match driver.path(&request.name).await {
        Ok(mountpoint) => Json(PathResponse {
            mountpoint: mountpoint.to_string_lossy().into_owned(),
            err: String::new(),
        }),
        Err(err) => Json(PathResponse {
            mountpoint: String::new(),
            err: err.to_string(),
        }),
    }
}

impl ApiRequest for PathRequest {
    type Response = PathResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/VolumeDriver.Path").unwrap();
        client.post(full_url).json(&self)
    }
}
