//! Assignment coordinator: invitations, responses and the joined listings.

use std::sync::Arc;

use serde_json::Value;

use super::{parse_date, parse_optional_date, parse_uuid, required};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    Assignment, AssignmentWithBrigade, AssignmentWithMember, InvitationStatus, InviteRequest,
    RespondRequest, WorkDates, WorkDatesRequest,
};

/// Owns the brigade/member relationship.
///
/// At most one assignment exists per (brigade, member) pair. An invitation
/// starts `pending` and is answered exactly once.
#[derive(Clone)]
pub struct AssignmentCoordinator {
    repo: Arc<Repository>,
}

impl AssignmentCoordinator {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Invite a member to a brigade.
    pub async fn invite(&self, request: InviteRequest) -> Result<Assignment, AppError> {
        let brigade_id = reference(request.brigade_id.as_deref(), "brigade_id")?;
        let member_id = reference(request.member_id.as_deref(), "member_id")?;
        let dates = WorkDates {
            start: parse_optional_date(request.start_date.as_deref(), "start_date")?,
            end: parse_optional_date(request.end_date.as_deref(), "end_date")?,
        };

        if self
            .repo
            .find_assignment(&brigade_id, &member_id)
            .await?
            .is_some()
        {
            tracing::debug!(%brigade_id, %member_id, "Rejected duplicate invitation");
            return Err(AppError::Conflict(
                "Member is already assigned to this brigade".to_string(),
            ));
        }

        let assignment = self
            .repo
            .create_assignment(&brigade_id, &member_id, dates)
            .await?;

        tracing::info!(
            assignment_id = %assignment.id,
            %brigade_id,
            %member_id,
            "Member invited to brigade"
        );
        Ok(assignment)
    }

    /// Accept or reject a pending invitation. A rejection needs a reason.
    pub async fn respond(&self, id: &str, request: RespondRequest) -> Result<Assignment, AppError> {
        let accepted = match request.accepted {
            Some(Value::Bool(accepted)) => accepted,
            _ => {
                return Err(AppError::Validation(
                    "accepted must be true or false".to_string(),
                ))
            }
        };

        let rejection_reason = if accepted {
            None
        } else {
            Some(
                required(request.rejection_reason.as_deref(), "rejection_reason").map_err(
                    |_| {
                        AppError::Validation(
                            "rejection_reason is required when rejecting".to_string(),
                        )
                    },
                )?,
            )
        };

        let existing = self
            .repo
            .get_assignment(id)
            .await?
            .ok_or_else(|| not_found(id))?;

        if existing.invitation_status != InvitationStatus::Pending {
            tracing::debug!(assignment_id = %id, "Rejected second response");
            return Err(already_responded());
        }

        let status = InvitationStatus::from_response(accepted);
        let assignment = match self
            .repo
            .record_response(id, status, rejection_reason.as_deref())
            .await?
        {
            Some(assignment) => assignment,
            // Answered or removed concurrently
            None => {
                return match self.repo.get_assignment(id).await? {
                    Some(_) => Err(already_responded()),
                    None => Err(not_found(id)),
                }
            }
        };

        tracing::info!(assignment_id = %id, status = status.as_str(), "Invitation answered");
        Ok(assignment)
    }

    /// Remove the assignment of a member to a brigade, whatever its status.
    pub async fn unassign(&self, brigade_id: &str, member_id: &str) -> Result<(), AppError> {
        let missing = || AppError::NotFound("Assignment not found".to_string());

        if self
            .repo
            .find_assignment(brigade_id, member_id)
            .await?
            .is_none()
        {
            return Err(missing());
        }

        if !self.repo.delete_assignment(brigade_id, member_id).await? {
            return Err(missing());
        }

        tracing::info!(%brigade_id, %member_id, "Member unassigned from brigade");
        Ok(())
    }

    /// Overwrite both planned work dates, whatever the invitation status.
    pub async fn update_work_dates(
        &self,
        id: &str,
        request: WorkDatesRequest,
    ) -> Result<Assignment, AppError> {
        let (start, end) = match (request.start_date.as_deref(), request.end_date.as_deref()) {
            (Some(start), Some(end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
                (start, end)
            }
            _ => {
                return Err(AppError::Validation(
                    "start_date and end_date are both required".to_string(),
                ))
            }
        };

        let dates = WorkDates {
            start: Some(parse_date(start, "start_date")?),
            end: Some(parse_date(end, "end_date")?),
        };

        let assignment = self
            .repo
            .set_work_dates(id, dates)
            .await?
            .ok_or_else(|| not_found(id))?;

        tracing::info!(assignment_id = %id, "Work dates updated");
        Ok(assignment)
    }

    pub async fn list_by_brigade(
        &self,
        brigade_id: &str,
    ) -> Result<Vec<AssignmentWithMember>, AppError> {
        self.repo.list_assignments_with_members(brigade_id).await
    }

    pub async fn list_by_member(
        &self,
        member_id: &str,
    ) -> Result<Vec<AssignmentWithBrigade>, AppError> {
        self.repo.list_assignments_with_brigades(member_id, None).await
    }

    pub async fn list_pending_for_member(
        &self,
        member_id: &str,
    ) -> Result<Vec<AssignmentWithBrigade>, AppError> {
        self.repo
            .list_assignments_with_brigades(member_id, Some(InvitationStatus::Pending))
            .await
    }
}

/// Stored ids are lowercase UUIDs; anything else cannot name an existing row.
fn reference(value: Option<&str>, field: &str) -> Result<String, AppError> {
    let id = required(value, field)?;
    let id = parse_uuid(&id, field).map_err(|_| {
        AppError::Validation("Brigade or brigade member does not exist".to_string())
    })?;
    Ok(id.to_string())
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Invitation {} not found", id))
}

fn already_responded() -> AppError {
    AppError::Conflict("This invitation has already been answered".to_string())
}
