use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::server::RelayState;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Health {
    pub status: &'static str,
    pub funnels: usize,
}

pub async fn health_check(State(state): State<RelayState>) -> Json<Health> {
    Json(Health {
        status: "ok",
        funnels: state.registry().len(),
    })
}
