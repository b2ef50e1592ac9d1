use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::ApiRequest;
use crate::driver::VolumeDriver;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilitiesRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilitiesResponse {
    #[serde(rename = "Capabilities")]
    pub capabilities: CapabilityInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityInfo {
    #[serde(rename = "Scope")]
    pub scope: String,
}

pub async fn handler(State(driver): State<Arc<VolumeDriver>>) -> Json<CapabilitiesResponse> {
    Json(CapabilitiesResponse {
        capabilities: CapabilityInfo {
            scope: driver.capabilities().to_string(),
        },
    })
}

impl ApiRequest for CapabilitiesRequest {
    type Response = CapabilitiesResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/VolumeDriver.Capabilities").unwrap();
        client.post(full_url)
    }
}
