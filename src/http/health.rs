use axum::{extract::State, Json};
use serde::Serialize;

use crate::config::{DatabaseKind, NodeEnv};
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub environment: NodeEnv,
    pub database: DatabaseKind,
    pub version: &'static str,
}

pub async fn get_health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        environment: state.config.node_env,
        database: state.config.database_kind(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
