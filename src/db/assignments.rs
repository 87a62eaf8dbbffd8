//! Assignment persistence and the joined listings built on it.

use super::repository::{
    assignment_from_row, brigade_summary_from_row, member_summary_from_row, ASSIGNMENT_COLUMNS,
};
use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{
    Assignment, AssignmentWithBrigade, AssignmentWithMember, InvitationStatus, WorkDates,
};

impl Repository {
    /// Get an assignment by ID.
    pub async fn get_assignment(&self, id: &str) -> Result<Option<Assignment>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a WHERE a.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(assignment_from_row).transpose()
    }

    /// Get the assignment linking a brigade and a member, whatever its status.
    pub async fn find_assignment(
        &self,
        brigade_id: &str,
        member_id: &str,
    ) -> Result<Option<Assignment>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a WHERE a.brigade_id = ? AND a.member_id = ?"
        ))
        .bind(brigade_id)
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(assignment_from_row).transpose()
    }

    /// Insert a pending invitation.
    ///
    /// The pair's unique constraint rejects a concurrent duplicate as a
    /// conflict; the foreign keys reject unknown brigades or members as a
    /// validation error.
    pub async fn create_assignment(
        &self,
        brigade_id: &str,
        member_id: &str,
        dates: WorkDates,
    ) -> Result<Assignment, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let status = InvitationStatus::Pending;

        sqlx::query(
            "INSERT INTO assignments (id, brigade_id, member_id, invitation_status, invited_at, work_start_date, work_end_date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(brigade_id)
        .bind(member_id)
        .bind(status.as_str())
        .bind(&now)
        .bind(dates.start)
        .bind(dates.end)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(
                "Member is already assigned to this brigade".to_string(),
            ),
            AppError::Validation(_) => {
                AppError::Validation("Brigade or brigade member does not exist".to_string())
            }
            other => other,
        })?;

        Ok(Assignment {
            id,
            brigade_id: brigade_id.to_string(),
            member_id: member_id.to_string(),
            invitation_status: status,
            invited_at: now.clone(),
            responded_at: None,
            rejection_reason: None,
            work_start_date: dates.start,
            work_end_date: dates.end,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Move a pending assignment to `status`.
    ///
    /// Returns `None` when no pending assignment with this id exists, so two
    /// concurrent responses cannot both succeed.
    pub async fn record_response(
        &self,
        id: &str,
        status: InvitationStatus,
        rejection_reason: Option<&str>,
    ) -> Result<Option<Assignment>, AppError> {
        let now = now_timestamp();

        let result = sqlx::query(
            "UPDATE assignments SET invitation_status = ?, responded_at = ?, rejection_reason = ?, updated_at = ? WHERE id = ? AND invitation_status = 'pending'"
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(rejection_reason)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_assignment(id).await
    }

    /// Overwrite the planned work dates. Returns `None` for an unknown id.
    pub async fn set_work_dates(
        &self,
        id: &str,
        dates: WorkDates,
    ) -> Result<Option<Assignment>, AppError> {
        let result = sqlx::query(
            "UPDATE assignments SET work_start_date = ?, work_end_date = ?, updated_at = ? WHERE id = ?",
        )
        .bind(dates.start)
        .bind(dates.end)
        .bind(now_timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_assignment(id).await
    }

    /// Remove the assignment linking a brigade and a member. Returns whether a row was removed.
    pub async fn delete_assignment(
        &self,
        brigade_id: &str,
        member_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM assignments WHERE brigade_id = ? AND member_id = ?")
            .bind(brigade_id)
            .bind(member_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All assignments of a brigade, oldest invitation first.
    pub async fn list_brigade_assignments(
        &self,
        brigade_id: &str,
    ) -> Result<Vec<Assignment>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments a WHERE a.brigade_id = ? ORDER BY a.created_at, a.rowid"
        ))
        .bind(brigade_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(assignment_from_row).collect()
    }

    /// Assignments of a brigade joined with the member summaries.
    pub async fn list_assignments_with_members(
        &self,
        brigade_id: &str,
    ) -> Result<Vec<AssignmentWithMember>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {ASSIGNMENT_COLUMNS},
                      m.external_user_id AS member_external_user_id,
                      m.locality AS member_locality,
                      m.credentials AS member_credentials,
                      m.work_history AS member_work_history,
                      m.role AS member_role
               FROM assignments a
               JOIN members m ON m.id = a.member_id
               WHERE a.brigade_id = ?
               ORDER BY a.created_at DESC, a.rowid DESC"#
        ))
        .bind(brigade_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AssignmentWithMember, AppError> {
                Ok(AssignmentWithMember {
                    assignment: assignment_from_row(row)?,
                    member: member_summary_from_row(row)?,
                })
            })
            .collect()
    }

    /// Assignments of a member joined with the brigade summaries, optionally
    /// restricted to one invitation status.
    pub async fn list_assignments_with_brigades(
        &self,
        member_id: &str,
        status: Option<InvitationStatus>,
    ) -> Result<Vec<AssignmentWithBrigade>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {ASSIGNMENT_COLUMNS},
                      b.cluster_id AS brigade_cluster_id,
                      b.status AS brigade_status
               FROM assignments a
               JOIN brigades b ON b.id = a.brigade_id
               WHERE a.member_id = ?
                 AND (? IS NULL OR a.invitation_status = ?)
               ORDER BY a.created_at DESC, a.rowid DESC"#
        ))
        .bind(member_id)
        .bind(status.map(|s| s.as_str()))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<AssignmentWithBrigade, AppError> {
                Ok(AssignmentWithBrigade {
                    assignment: assignment_from_row(row)?,
                    brigade: brigade_summary_from_row(row)?,
                })
            })
            .collect()
    }
}
