use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::ApiRequest;
use crate::driver::VolumeDriver;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivateRequest {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivateResponse {
    #[serde(rename = "Implements")]
    pub implements: Vec<String>,
}

pub async fn handler(State(driver): State<Arc<VolumeDriver>>) -> Json<ActivateResponse> {
    Json(ActivateResponse {
        implements: driver.activate(),
    })
}

impl ApiRequest for ActivateRequest {
    type Response = ActivateResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/Plugin.Activate").unwrap();
        client.post(full_url)
    }
}
