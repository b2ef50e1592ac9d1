use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiRequest, ErrorResponse};
use crate::driver::VolumeDriver;

/// Registers a volume. `Opts` carries the bucket binding; unknown keys are
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Opts", default)]
    pub opts: serde_json::Value,
}

pub type CreateResponse = ErrorResponse;

#[tracing::instrument(skip_all, fields(volume = %request.name))]
pub async fn handler(
    State(driver): State<Arc<VolumeDriver>>,
    Json(request): Json<CreateRequest>,
) -> Json<CreateResponse> {
    match driver.create(&request.name, request.opts).await {
        Ok(()) => Json(CreateResponse::ok()),
        Err(err) => Json(CreateResponse::from_err(err)),
    }
}

impl ApiRequest for CreateRequest {
    type Response = CreateResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/VolumeDriver.Create").unwrap();
        client.post(full_url).json(&self)
    }
}
