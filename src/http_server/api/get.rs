use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiRequest, VolumeInfo};
use crate::driver::VolumeDriver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetRequest {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetResponse {
    #[serde(rename = "Volume", default)]
    pub volume: VolumeInfo,
    #[serde(rename = "Err", default)]
    pub err: String,
}

#[tracing::instrument(skip_all, fields(volume = %request.name))]
pub async fn handler(
    State(driver): State<Arc<VolumeDriver>>,
    Json(request): Json<GetRequest>,
) -> Json<GetResponse> {
    match driver.get(&request.name).await {
        Ok(summary) => Json(GetResponse {
            volume: VolumeInfo {
                name: summary.name,
                mountpoint: summary.mountpoint.to_string_lossy().into_owned(),
            },
            err: String::new(),
        }),
        Err(err) => Json(GetResponse {
            volume: VolumeInfo::default(),
            err: err.to_string(),
        }),
    }
}

impl ApiRequest for GetRequest {
    type Response = GetResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/VolumeDriver.Get").unwrap();
        client.post(full_url).json(&self)
    }
}
