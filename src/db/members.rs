//! Member persistence.

use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};

use super::repository::{member_from_row, to_json_records, MEMBER_COLUMNS};
use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{BrigadeMember, BrigadeStatus, MemberRole};

/// Validated fields of a member about to be inserted.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub external_user_id: String,
    pub locality: String,
    pub role: MemberRole,
    pub credentials: Vec<Value>,
    pub work_history: Vec<Value>,
    pub availability: Vec<Value>,
}

/// Validated partial update of a member; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct MemberChanges {
    pub locality: Option<String>,
    pub role: Option<MemberRole>,
    pub credentials: Option<Vec<Value>>,
    pub work_history: Option<Vec<Value>>,
    pub availability: Option<Vec<Value>>,
}

impl Repository {
    /// List all members, newest first.
    pub async fn list_members(&self) -> Result<Vec<BrigadeMember>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    /// Get a member by ID.
    pub async fn get_member(&self, id: &str) -> Result<Option<BrigadeMember>, AppError> {
        let row = sqlx::query(&format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(member_from_row).transpose()
    }

    /// Get the member profile of an external user.
    pub async fn get_member_by_external_id(
        &self,
        external_user_id: &str,
    ) -> Result<Option<BrigadeMember>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE external_user_id = ?"
        ))
        .bind(external_user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(member_from_row).transpose()
    }

    pub async fn list_members_by_locality(
        &self,
        locality: &str,
    ) -> Result<Vec<BrigadeMember>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE locality = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(locality)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    pub async fn list_members_by_role(
        &self,
        role: MemberRole,
    ) -> Result<Vec<BrigadeMember>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {MEMBER_COLUMNS} FROM members WHERE role = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(member_from_row).collect()
    }

    /// Fetch several members in one round-trip. Unknown ids are skipped.
    pub async fn get_members_by_ids(&self, ids: &[String]) -> Result<Vec<BrigadeMember>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {MEMBER_COLUMNS} FROM members WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(member_from_row).collect()
    }

    /// Insert a new member. A duplicate external identity is rejected by the
    /// unique constraint and surfaces as a conflict.
    pub async fn create_member(&self, member: &NewMember) -> Result<BrigadeMember, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO members (id, external_user_id, locality, credentials, work_history, role, availability, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(&member.external_user_id)
        .bind(&member.locality)
        .bind(to_json_records(&member.credentials)?)
        .bind(to_json_records(&member.work_history)?)
        .bind(member.role.as_str())
        .bind(to_json_records(&member.availability)?)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(
                "User already has a brigade member profile".to_string(),
            ),
            other => other,
        })?;

        Ok(BrigadeMember {
            id,
            external_user_id: member.external_user_id.clone(),
            locality: member.locality.clone(),
            credentials: member.credentials.clone(),
            work_history: member.work_history.clone(),
            role: member.role,
            availability: member.availability.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Merge `changes` into the stored member and refresh its modification time.
    pub async fn update_member(
        &self,
        id: &str,
        changes: MemberChanges,
    ) -> Result<BrigadeMember, AppError> {
        let existing = self
            .get_member(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brigade member {} not found", id)))?;

        let now = now_timestamp();
        let updated = BrigadeMember {
            locality: changes.locality.unwrap_or(existing.locality),
            role: changes.role.unwrap_or(existing.role),
            credentials: changes.credentials.unwrap_or(existing.credentials),
            work_history: changes.work_history.unwrap_or(existing.work_history),
            availability: changes.availability.unwrap_or(existing.availability),
            updated_at: now,
            ..existing
        };

        let result = sqlx::query(
            "UPDATE members SET locality = ?, credentials = ?, work_history = ?, role = ?, availability = ?, updated_at = ? WHERE id = ?"
        )
        .bind(&updated.locality)
        .bind(to_json_records(&updated.credentials)?)
        .bind(to_json_records(&updated.work_history)?)
        .bind(updated.role.as_str())
        .bind(to_json_records(&updated.availability)?)
        .bind(&updated.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Deleted between read and write
            return Err(AppError::NotFound(format!("Brigade member {} not found", id)));
        }

        Ok(updated)
    }

    /// Whether the member has an accepted assignment to a brigade that is
    /// still in formation or active.
    pub async fn has_active_assignment(&self, member_id: &str) -> Result<bool, AppError> {
        let row: (i64,) = sqlx::query_as(&format!(
            "SELECT EXISTS ({})",
            active_assignment_subquery()
        ))
        .bind(member_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0 != 0)
    }

    /// Delete the member unless it has an active assignment, in a single
    /// statement. Returns whether a row was removed.
    pub async fn delete_member_if_unengaged(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query(&format!(
            "DELETE FROM members WHERE id = ? AND NOT EXISTS ({})",
            active_assignment_subquery()
        ))
        .bind(id)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Accepted assignments of member `?` to brigades that still engage it.
fn active_assignment_subquery() -> String {
    let engaging: Vec<String> = BrigadeStatus::ALL
        .iter()
        .filter(|status| status.is_engaging())
        .map(|status| format!("'{}'", status.as_str()))
        .collect();

    format!(
        "SELECT 1 FROM assignments a \
         JOIN brigades b ON b.id = a.brigade_id \
         WHERE a.member_id = ? \
           AND a.invitation_status = 'accepted' \
           AND b.status IN ({})",
        engaging.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::BrigadeChanges;
    use crate::models::{InvitationStatus, WorkDates};
    use crate::services::test_support::temp_repository;

    fn new_member(external_user_id: &str) -> NewMember {
        NewMember {
            external_user_id: external_user_id.to_string(),
            locality: "Leticia".to_string(),
            role: MemberRole::Technician,
            credentials: Vec::new(),
            work_history: Vec::new(),
            availability: Vec::new(),
        }
    }

    #[test]
    fn test_active_assignment_subquery_lists_engaging_statuses() {
        let sql = active_assignment_subquery();
        assert!(sql.ends_with("b.status IN ('formation', 'active')"));
    }

    #[tokio::test]
    async fn test_second_profile_for_user_is_conflict() {
        let (repo, _dir) = temp_repository().await;
        let user = uuid::Uuid::new_v4().to_string();

        repo.create_member(&new_member(&user)).await.unwrap();
        match repo.create_member(&new_member(&user)).await {
            Err(AppError::Conflict(msg)) => {
                assert_eq!(msg, "User already has a brigade member profile")
            }
            other => panic!("expected conflict, got {:?}", other),
        }
        assert_eq!(repo.list_members().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_if_unengaged() {
        let (repo, _dir) = temp_repository().await;
        let member = repo
            .create_member(&new_member(&uuid::Uuid::new_v4().to_string()))
            .await
            .unwrap();
        let brigade = repo
            .create_brigade(&uuid::Uuid::new_v4().to_string())
            .await
            .unwrap();
        let assignment = repo
            .create_assignment(&brigade.id, &member.id, WorkDates::default())
            .await
            .unwrap();

        // Pending only
        assert!(!repo.has_active_assignment(&member.id).await.unwrap());

        repo.record_response(&assignment.id, InvitationStatus::Accepted, None)
            .await
            .unwrap();
        assert!(repo.has_active_assignment(&member.id).await.unwrap());
        assert!(!repo.delete_member_if_unengaged(&member.id).await.unwrap());
        assert!(repo.get_member(&member.id).await.unwrap().is_some());

        repo.update_brigade(
            &brigade.id,
            BrigadeChanges {
                status: Some(BrigadeStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(repo.delete_member_if_unengaged(&member.id).await.unwrap());
        assert!(repo.get_assignment(&assignment.id).await.unwrap().is_none());
        assert!(!repo.delete_member_if_unengaged(&member.id).await.unwrap());
    }
}
