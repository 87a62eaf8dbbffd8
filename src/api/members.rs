//! Member API endpoints.

use axum::extract::{Path, Query, State};

use super::{created, success, ApiResult, JsonBody};
use crate::auth::RequireAdmin;
use crate::models::{
    AvailabilityRequest, AvailableQuery, BrigadeMember, CreateMemberRequest, CredentialsRequest,
    DeletedMember, MemberWithAssignments, UpdateMemberRequest,
};
use crate::AppState;

/// GET /api/members - List all members.
pub async fn list_members(State(state): State<AppState>) -> ApiResult<Vec<BrigadeMember>> {
    success(state.members.list().await?)
}

/// GET /api/members/{id} - Get a single member.
pub async fn get_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<BrigadeMember> {
    success(state.members.get(&id).await?)
}

/// GET /api/members/user/{user_id} - Get the profile of an external user.
pub async fn get_member_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<BrigadeMember> {
    success(state.members.get_by_external_id(&user_id).await?)
}

/// GET /api/members/{id}/details - Member with its assignments.
pub async fn get_member_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<MemberWithAssignments> {
    success(state.members.details(&id).await?)
}

/// GET /api/members/locality/{locality}
pub async fn list_members_by_locality(
    State(state): State<AppState>,
    Path(locality): Path<String>,
) -> ApiResult<Vec<BrigadeMember>> {
    success(state.members.by_locality(&locality).await?)
}

/// GET /api/members/role/{role}
pub async fn list_members_by_role(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> ApiResult<Vec<BrigadeMember>> {
    success(state.members.by_role(&role).await?)
}

/// GET /api/members/available?locality=X - Members available in a locality.
pub async fn list_available_members(
    State(state): State<AppState>,
    Query(query): Query<AvailableQuery>,
) -> ApiResult<Vec<BrigadeMember>> {
    success(state.members.available_in(query.locality.as_deref()).await?)
}

/// POST /api/members/register - Self-service registration.
pub async fn register_member(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateMemberRequest>,
) -> ApiResult<BrigadeMember> {
    created(state.members.register(request).await?)
}

/// POST /api/members - Create a member on behalf of a user.
pub async fn create_member(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    JsonBody(request): JsonBody<CreateMemberRequest>,
) -> ApiResult<BrigadeMember> {
    created(state.members.register(request).await?)
}

/// PUT /api/members/{id} - Update a member.
pub async fn update_member(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateMemberRequest>,
) -> ApiResult<BrigadeMember> {
    success(state.members.update(&id, request).await?)
}

/// DELETE /api/members/{id} - Delete a member and its assignments.
pub async fn delete_member(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
) -> ApiResult<DeletedMember> {
    state.members.delete(&id).await?;
    success(DeletedMember {
        message: "Brigade member deleted".to_string(),
        id,
    })
}

/// PUT /api/members/{id}/availability - Replace availability windows.
pub async fn set_member_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<AvailabilityRequest>,
) -> ApiResult<BrigadeMember> {
    success(state.members.set_availability(&id, request.availability).await?)
}

/// PUT /api/members/{id}/verificar-titulos - Replace verified credentials.
pub async fn verify_member_credentials(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> ApiResult<BrigadeMember> {
    success(state.members.verify_credentials(&id, request.credentials).await?)
}
