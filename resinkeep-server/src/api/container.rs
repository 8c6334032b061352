use axum::{Json, extract::State, response::{IntoResponse, Response}};
use kanau::processor::Processor;
use resinkeep_core::broker::Topic;
use resinkeep_core::entities::ContainerRow;
use resinkeep_core::mutation::{ConsumeContainer, CreateContainer, DeleteContainer, UpdateContainer};
use resinkeep_core::query::Query;
use resinkeep_core::query::engine::GetContainer;
use resinkeep_sdk::objects::{
    ContainerParameters, ContainerQuery, ContainerResponse, ContainerUpdateParameters,
    ContainerUseParameters, Message, Resource,
};

use super::extractors::{ApiJson, ApiPath, ApiQuery};
use super::ws::{self, MaybeUpgrade};
use super::{ApiError, deleted, paged};
use crate::state::AppState;

/// `GET /container`: archived containers are hidden unless
/// `allow_archived=true`.
pub(super) async fn find_containers(
    state: State<AppState>,
    upgrade: MaybeUpgrade,
    ApiQuery(params): ApiQuery<ContainerQuery>,
) -> Result<Response, ApiError> {
    if let Ok(upgrade) = upgrade {
        return Ok(ws::subscribe(upgrade, &state.broker, Topic::resource(Resource::Container)));
    }
    let result = state
        .engine
        .process(Query::<ContainerRow>::try_from(params)?)
        .await?;
    let items: Vec<ContainerResponse> = result.items.iter().map(ContainerResponse::from).collect();
    Ok(paged(items, result.total))
}

pub(super) async fn get_container(
    state: State<AppState>,
    upgrade: MaybeUpgrade,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    if let Ok(upgrade) = upgrade {
        return Ok(ws::subscribe(upgrade, &state.broker, Topic::entity(Resource::Container, id)));
    }
    let row = state.engine.process(GetContainer { id }).await?;
    Ok(Json(ContainerResponse::from(&row)).into_response())
}

pub(super) async fn create_container(
    state: State<AppState>,
    ApiJson(params): ApiJson<ContainerParameters>,
) -> Result<Json<ContainerResponse>, ApiError> {
    Ok(Json(state.coordinator.process(CreateContainer(params)).await?))
}

pub(super) async fn update_container(
    state: State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(params): ApiJson<ContainerUpdateParameters>,
) -> Result<Json<ContainerResponse>, ApiError> {
    Ok(Json(state.coordinator.process(UpdateContainer { id, params }).await?))
}

pub(super) async fn delete_container(
    state: State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Message>, ApiError> {
    state.coordinator.process(DeleteContainer { id }).await?;
    Ok(deleted())
}

/// `PUT /container/{id}/use`: exactly one of `use_weight` / `use_length`.
pub(super) async fn use_container(
    state: State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(usage): ApiJson<ContainerUseParameters>,
) -> Result<Json<ContainerResponse>, ApiError> {
    Ok(Json(state.coordinator.process(ConsumeContainer { id, usage }).await?))
}
