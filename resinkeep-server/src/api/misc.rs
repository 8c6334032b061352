use axum::{Json, extract::State};
use kanau::processor::Processor;
use resinkeep_core::query::engine::ListDistinct;
use resinkeep_core::store::DistinctField;
use serde::Serialize;

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub(super) struct Health {
    status: &'static str,
    version: &'static str,
}

pub(super) async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn distinct(state: &AppState, field: DistinctField) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.engine.process(ListDistinct(field)).await?))
}

pub(super) async fn materials(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    distinct(&state, DistinctField::Material).await
}

pub(super) async fn article_numbers(
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    distinct(&state, DistinctField::ArticleNumber).await
}

pub(super) async fn locations(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    distinct(&state, DistinctField::Location).await
}

pub(super) async fn lot_numbers(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    distinct(&state, DistinctField::LotNr).await
}
