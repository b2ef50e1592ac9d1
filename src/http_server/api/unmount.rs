use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiRequest, ErrorResponse};
use crate::driver::VolumeDriver;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnmountRequest {
    #[serde(rename = "Name")]
    pub name: String,
}

pub type UnmountResponse = ErrorResponse;

#[tracing::instrument(skip_all, fields(volume = %request.name))]
pub async fn handler(
    State(driver): State<Arc<VolumeDriver>>,
    Json(request): Json<UnmountRequest>,
) -> Json<UnmountResponse> {
    match driver.unmount(&request.name).await {
        Ok(()) => Json(UnmountResponse::ok()),
        Err(err) => Json(UnmountResponse::from_err(err)),
    }
}

impl ApiRequest for UnmountRequest {
    type Response = UnmountResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/VolumeDriver.Unmount").unwrap();
        client.post(full_url).json(&self)
    }
}
