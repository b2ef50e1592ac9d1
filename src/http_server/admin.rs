//! Process-admin endpoints, served on their own listener.
//!
//! `/ping` answers while the process is alive; `/evacuate` drains every
//! mount and then asks the process to shut down. The orchestrator calls
//! evacuate before recycling the cell so no kernel mounts leak.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use super::api::ErrorResponse;
use crate::driver::VolumeDriver;
use crate::process::ShutdownHandle;

#[derive(Clone)]
pub struct AdminState {
    pub driver: Arc<VolumeDriver>,
    pub shutdown: ShutdownHandle,
}

pub fn router(driver: Arc<VolumeDriver>, shutdown: ShutdownHandle) -> Router {
    Router::new()
        .route("/evacuate", get(evacuate_handler))
        .route("/ping", get(ping_handler))
        .with_state(AdminState { driver, shutdown })
}

async fn ping_handler() -> Json<ErrorResponse> {
    Json(ErrorResponse::ok())
}

#[tracing::instrument(skip_all)]
async fn evacuate_handler(State(state): State<AdminState>) -> Json<ErrorResponse> {
    tracing::info!("evacuate-requested");
    state.driver.drain().await;
    state.shutdown.trigger();
    Json(ErrorResponse::ok())
}
