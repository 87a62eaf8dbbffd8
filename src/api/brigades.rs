//! Brigade API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use super::{created, no_content, success, ApiResult, JsonBody};
use crate::errors::AppError;
use crate::models::{
    Brigade, BrigadeWithMembers, ChangeStatusRequest, CreateBrigadeRequest, UpdateBrigadeRequest,
};
use crate::AppState;

/// GET /api/brigades - List all brigades.
pub async fn list_brigades(State(state): State<AppState>) -> ApiResult<Vec<Brigade>> {
    success(state.brigades.list().await?)
}

/// GET /api/brigades/{id} - Get a single brigade.
pub async fn get_brigade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Brigade> {
    success(state.brigades.get(&id).await?)
}

/// GET /api/brigades/cluster/{cluster_id} - The brigade of a cluster, or null.
pub async fn get_brigade_by_cluster(
    State(state): State<AppState>,
    Path(cluster_id): Path<String>,
) -> ApiResult<Option<Brigade>> {
    success(state.brigades.by_cluster(&cluster_id).await?)
}

/// GET /api/brigades/status/{status}
pub async fn list_brigades_by_status(
    State(state): State<AppState>,
    Path(status): Path<String>,
) -> ApiResult<Vec<Brigade>> {
    success(state.brigades.by_status(&status).await?)
}

/// POST /api/brigades - Create a brigade for a cluster.
pub async fn create_brigade(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateBrigadeRequest>,
) -> ApiResult<Brigade> {
    created(state.brigades.create(request).await?)
}

/// PUT /api/brigades/{id} - Update a brigade.
pub async fn update_brigade(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateBrigadeRequest>,
) -> ApiResult<Brigade> {
    success(state.brigades.update(&id, request).await?)
}

/// DELETE /api/brigades/{id} - Delete a brigade and its assignments.
pub async fn delete_brigade(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.brigades.delete(&id).await?;
    no_content()
}

/// PUT /api/brigades/{id}/estado - Change the brigade status.
pub async fn change_brigade_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<ChangeStatusRequest>,
) -> ApiResult<Brigade> {
    success(
        state
            .brigades
            .change_status(&id, request.status.as_deref())
            .await?,
    )
}

/// GET /api/brigades/{id}/brigadistas - Brigade with its members.
pub async fn get_brigade_with_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<BrigadeWithMembers> {
    success(state.brigades.with_members(&id).await?)
}
