//! Database repository shared by the entity-specific query modules.

use serde_json::Value;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    Assignment, Brigade, BrigadeMember, BrigadeStatus, BrigadeSummary, InvitationStatus,
    MemberRole, MemberSummary,
};

/// Database repository for all data operations.
///
/// Constructed once at startup from an explicitly opened pool and handed to
/// every service; [`Repository::close`] ends its lifecycle.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Round-trip to the store, used by the health check.
    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// Helper functions for row conversion

pub(super) const MEMBER_COLUMNS: &str = "id, external_user_id, locality, credentials, work_history, role, availability, created_at, updated_at";

pub(super) const BRIGADE_COLUMNS: &str = "id, cluster_id, status, created_at, updated_at";

/// Assignment columns qualified with the `a` alias so they can be joined.
pub(super) const ASSIGNMENT_COLUMNS: &str = "a.id AS id, a.brigade_id AS brigade_id, \
     a.member_id AS member_id, a.invitation_status AS invitation_status, \
     a.invited_at AS invited_at, a.responded_at AS responded_at, \
     a.rejection_reason AS rejection_reason, a.work_start_date AS work_start_date, \
     a.work_end_date AS work_end_date, a.created_at AS created_at, a.updated_at AS updated_at";

pub(super) fn member_from_row(row: &SqliteRow) -> Result<BrigadeMember, AppError> {
    Ok(BrigadeMember {
        id: row.try_get("id")?,
        external_user_id: row.try_get("external_user_id")?,
        locality: row.try_get("locality")?,
        credentials: parse_json_records(row.try_get("credentials")?)?,
        work_history: parse_json_records(row.try_get("work_history")?)?,
        role: parse_role(row.try_get("role")?)?,
        availability: parse_json_records(row.try_get("availability")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn brigade_from_row(row: &SqliteRow) -> Result<Brigade, AppError> {
    Ok(Brigade {
        id: row.try_get("id")?,
        cluster_id: row.try_get("cluster_id")?,
        status: parse_brigade_status(row.try_get("status")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(super) fn assignment_from_row(row: &SqliteRow) -> Result<Assignment, AppError> {
    let status: String = row.try_get("invitation_status")?;
    Ok(Assignment {
        id: row.try_get("id")?,
        brigade_id: row.try_get("brigade_id")?,
        member_id: row.try_get("member_id")?,
        invitation_status: InvitationStatus::parse(&status).ok_or_else(|| {
            AppError::Internal(format!("Unknown invitation status '{}' in storage", status))
        })?,
        invited_at: row.try_get("invited_at")?,
        responded_at: row.try_get("responded_at")?,
        rejection_reason: row.try_get("rejection_reason")?,
        work_start_date: row.try_get("work_start_date")?,
        work_end_date: row.try_get("work_end_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Member summary from columns selected with the `member_` prefix.
pub(super) fn member_summary_from_row(row: &SqliteRow) -> Result<MemberSummary, AppError> {
    Ok(MemberSummary {
        id: row.try_get("member_id")?,
        external_user_id: row.try_get("member_external_user_id")?,
        locality: row.try_get("member_locality")?,
        credentials: parse_json_records(row.try_get("member_credentials")?)?,
        work_history: parse_json_records(row.try_get("member_work_history")?)?,
        role: parse_role(row.try_get("member_role")?)?,
    })
}

/// Brigade summary from columns selected with the `brigade_` prefix.
pub(super) fn brigade_summary_from_row(row: &SqliteRow) -> Result<BrigadeSummary, AppError> {
    Ok(BrigadeSummary {
        id: row.try_get("brigade_id")?,
        cluster_id: row.try_get("brigade_cluster_id")?,
        status: parse_brigade_status(row.try_get("brigade_status")?)?,
    })
}

fn parse_role(s: String) -> Result<MemberRole, AppError> {
    MemberRole::parse(&s)
        .ok_or_else(|| AppError::Internal(format!("Unknown member role '{}' in storage", s)))
}

fn parse_brigade_status(s: String) -> Result<BrigadeStatus, AppError> {
    BrigadeStatus::parse(&s)
        .ok_or_else(|| AppError::Internal(format!("Unknown brigade status '{}' in storage", s)))
}

fn parse_json_records(s: String) -> Result<Vec<Value>, AppError> {
    serde_json::from_str(&s)
        .map_err(|e| AppError::Internal(format!("Malformed record list in storage: {}", e)))
}

pub(super) fn to_json_records(records: &[Value]) -> Result<String, AppError> {
    Ok(serde_json::to_string(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_json_records() {
        assert_eq!(
            parse_json_records(r#"[{"title": "BSc"}]"#.to_string()).unwrap(),
            vec![json!({"title": "BSc"})]
        );
        assert!(parse_json_records("[]".to_string()).unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_record_list_is_an_error() {
        assert!(matches!(
            parse_json_records("[{\"title\": ".to_string()),
            Err(AppError::Internal(_))
        ));
        assert!(matches!(
            parse_json_records("{\"title\": \"BSc\"}".to_string()),
            Err(AppError::Internal(_))
        ));
    }
}
