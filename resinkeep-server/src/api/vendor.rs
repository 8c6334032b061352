use axum::{Json, extract::State, response::{IntoResponse, Response}};
use kanau::processor::Processor;
use resinkeep_core::broker::Topic;
use resinkeep_core::entities::Vendor;
use resinkeep_core::mutation::{CreateVendor, DeleteVendor, UpdateVendor};
use resinkeep_core::query::Query;
use resinkeep_core::query::engine::GetVendor;
use resinkeep_sdk::objects::{
    Message, Resource, VendorParameters, VendorQuery, VendorResponse, VendorUpdateParameters,
};

use super::extractors::{ApiJson, ApiPath, ApiQuery};
use super::ws::{self, MaybeUpgrade};
use super::{ApiError, deleted, paged};
use crate::state::AppState;

/// `GET /vendor`: search, or subscribe to every vendor change.
pub(super) async fn find_vendors(
    state: State<AppState>,
    upgrade: MaybeUpgrade,
    ApiQuery(params): ApiQuery<VendorQuery>,
) -> Result<Response, ApiError> {
    if let Ok(upgrade) = upgrade {
        return Ok(ws::subscribe(upgrade, &state.broker, Topic::resource(Resource::Vendor)));
    }
    let result = state.engine.process(Query::<Vendor>::try_from(params)?).await?;
    let items: Vec<VendorResponse> = result.items.iter().map(VendorResponse::from).collect();
    Ok(paged(items, result.total))
}

/// `GET /vendor/{id}`: one vendor, or subscribe to its changes.
pub(super) async fn get_vendor(
    state: State<AppState>,
    upgrade: MaybeUpgrade,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    if let Ok(upgrade) = upgrade {
        return Ok(ws::subscribe(upgrade, &state.broker, Topic::entity(Resource::Vendor, id)));
    }
    let vendor = state.engine.process(GetVendor { id }).await?;
    Ok(Json(VendorResponse::from(&vendor)).into_response())
}

pub(super) async fn create_vendor(
    state: State<AppState>,
    ApiJson(params): ApiJson<VendorParameters>,
) -> Result<Json<VendorResponse>, ApiError> {
    Ok(Json(state.coordinator.process(CreateVendor(params)).await?))
}

pub(super) async fn update_vendor(
    state: State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(params): ApiJson<VendorUpdateParameters>,
) -> Result<Json<VendorResponse>, ApiError> {
    Ok(Json(state.coordinator.process(UpdateVendor { id, params }).await?))
}

pub(super) async fn delete_vendor(
    state: State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Message>, ApiError> {
    state.coordinator.process(DeleteVendor { id }).await?;
    Ok(deleted())
}
