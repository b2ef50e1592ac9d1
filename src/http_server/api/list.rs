use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{ApiRequest, VolumeInfo};
use crate::driver::VolumeDriver;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRequest {}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListResponse {
    #[serde(rename = "Volumes", default)]
    pub volumes: Vec<VolumeInfo>,
    #[serde(rename = "Err", default)]
    pub err: String,
}

pub async fn handler(State(driver): State<Arc<VolumeDriver>>) -> Json<ListResponse> {
    let volumes = driver
        .list()
        .await
        .into_iter()
        .map(|summary| VolumeInfo {
            name: summary.name,
            mountpoint: summary.mountpoint.to_string_lossy().into_owned(),
        })
        .collect();

    Json(ListResponse {
        volumes,
        err: String::new(),
    })
}

impl ApiRequest for ListRequest {
    type Response = ListResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        let full_url = base_url.join("/VolumeDriver.List").unwrap();
        client.post(full_url)
    }
}
