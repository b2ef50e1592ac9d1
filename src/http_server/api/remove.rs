use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiRequest, ErrorResponse};
use crate::driver::VolumeDriver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveRequest {
    #[serde(rename = "Name")]
    pub name: String,
}

pub type RemoveResponse = ErrorResponse;

#[tracing::instrument(skip_all, fields(volume = %request.name))]
pub async fn handler(
    State(driver): State<Arc<VolumeDriver>>,
    Json(request): Json<RemoveRequest>,
) -> Json<RemoveResponse> {
    match driver.remove(&request.name).await {
        Ok(()) => Json(RemoveResponse::ok()),
        Err(err) => Json(RemoveResponse::from_err(err)),
    }
}

impl ApiRequest for RemoveRequest {
    type Response = RemoveResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/VolumeDriver.Remove").unwrap();
        client.post(full_url).json(&self)
    }
}
