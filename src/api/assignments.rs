//! Assignment API endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
};

use super::{created, no_content, success, ApiResult, JsonBody};
use crate::errors::AppError;
use crate::models::{
    Assignment, AssignmentWithBrigade, AssignmentWithMember, InviteRequest, RespondRequest,
    WorkDatesRequest,
};
use crate::AppState;

/// POST /api/assignments/invitar - Invite a member to a brigade.
pub async fn invite_member(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<InviteRequest>,
) -> ApiResult<Assignment> {
    created(state.assignments.invite(request).await?)
}

/// PUT /api/assignments/{id}/responder - Accept or reject an invitation.
pub async fn respond_invitation(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<RespondRequest>,
) -> ApiResult<Assignment> {
    success(state.assignments.respond(&id, request).await?)
}

/// DELETE /api/assignments/{brigade_id}/{member_id} - Remove a member from a brigade.
pub async fn unassign_member(
    State(state): State<AppState>,
    Path((brigade_id, member_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    state.assignments.unassign(&brigade_id, &member_id).await?;
    no_content()
}

/// PUT /api/assignments/{id}/fechas - Set the planned work dates.
pub async fn update_work_dates(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<WorkDatesRequest>,
) -> ApiResult<Assignment> {
    success(state.assignments.update_work_dates(&id, request).await?)
}

/// GET /api/assignments/brigade/{id}
pub async fn list_brigade_assignments(
    State(state): State<AppState>,
    Path(brigade_id): Path<String>,
) -> ApiResult<Vec<AssignmentWithMember>> {
    success(state.assignments.list_by_brigade(&brigade_id).await?)
}

/// GET /api/assignments/member/{id}
pub async fn list_member_assignments(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> ApiResult<Vec<AssignmentWithBrigade>> {
    success(state.assignments.list_by_member(&member_id).await?)
}

/// GET /api/assignments/member/{id}/pendientes - Invitations awaiting an answer.
pub async fn list_pending_invitations(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> ApiResult<Vec<AssignmentWithBrigade>> {
    success(state.assignments.list_pending_for_member(&member_id).await?)
}
