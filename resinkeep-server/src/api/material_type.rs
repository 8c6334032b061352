use axum::{Json, extract::State, response::{IntoResponse, Response}};
use kanau::processor::Processor;
use resinkeep_core::broker::Topic;
use resinkeep_core::entities::MaterialTypeRow;
use resinkeep_core::mutation::{CreateMaterialType, DeleteMaterialType, UpdateMaterialType};
use resinkeep_core::query::Query;
use resinkeep_core::query::engine::GetMaterialType;
use resinkeep_sdk::objects::{
    MaterialTypeParameters, MaterialTypeQuery, MaterialTypeResponse, MaterialTypeUpdateParameters,
    Message, Resource,
};

use super::extractors::{ApiJson, ApiPath, ApiQuery};
use super::ws::{self, MaybeUpgrade};
use super::{ApiError, deleted, paged};
use crate::state::AppState;

pub(super) async fn find_material_types(
    state: State<AppState>,
    upgrade: MaybeUpgrade,
    ApiQuery(params): ApiQuery<MaterialTypeQuery>,
) -> Result<Response, ApiError> {
    if let Ok(upgrade) = upgrade {
        return Ok(ws::subscribe(
            upgrade,
            &state.broker,
            Topic::resource(Resource::MaterialType),
        ));
    }
    let result = state
        .engine
        .process(Query::<MaterialTypeRow>::try_from(params)?)
        .await?;
    let items: Vec<MaterialTypeResponse> = result.items.iter().map(MaterialTypeResponse::from).collect();
    Ok(paged(items, result.total))
}

pub(super) async fn get_material_type(
    state: State<AppState>,
    upgrade: MaybeUpgrade,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response, ApiError> {
    if let Ok(upgrade) = upgrade {
        return Ok(ws::subscribe(
            upgrade,
            &state.broker,
            Topic::entity(Resource::MaterialType, id),
        ));
    }
    let row = state.engine.process(GetMaterialType { id }).await?;
    Ok(Json(MaterialTypeResponse::from(&row)).into_response())
}

/// `color_hex` is stored uppercase without a leading `#`.
pub(super) async fn create_material_type(
    state: State<AppState>,
    ApiJson(params): ApiJson<MaterialTypeParameters>,
) -> Result<Json<MaterialTypeResponse>, ApiError> {
    Ok(Json(state.coordinator.process(CreateMaterialType(params)).await?))
}

pub(super) async fn update_material_type(
    state: State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(params): ApiJson<MaterialTypeUpdateParameters>,
) -> Result<Json<MaterialTypeResponse>, ApiError> {
    Ok(Json(
        state
            .coordinator
            .process(UpdateMaterialType { id, params })
            .await?,
    ))
}

/// Refused with 403 while any container still uses the material type.
pub(super) async fn delete_material_type(
    state: State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Message>, ApiError> {
    state.coordinator.process(DeleteMaterialType { id }).await?;
    Ok(deleted())
}
