//! Brigade persistence.

use super::repository::{brigade_from_row, BRIGADE_COLUMNS};
use super::{now_timestamp, Repository};
use crate::errors::AppError;
use crate::models::{Brigade, BrigadeStatus};

/// Validated partial update of a brigade; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct BrigadeChanges {
    pub cluster_id: Option<String>,
    pub status: Option<BrigadeStatus>,
}

impl Repository {
    /// List all brigades, newest first.
    pub async fn list_brigades(&self) -> Result<Vec<Brigade>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {BRIGADE_COLUMNS} FROM brigades ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(brigade_from_row).collect()
    }

    /// Get a brigade by ID.
    pub async fn get_brigade(&self, id: &str) -> Result<Option<Brigade>, AppError> {
        let row = sqlx::query(&format!("SELECT {BRIGADE_COLUMNS} FROM brigades WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(brigade_from_row).transpose()
    }

    /// Get the brigade working on a cluster, if any.
    pub async fn get_brigade_by_cluster(
        &self,
        cluster_id: &str,
    ) -> Result<Option<Brigade>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {BRIGADE_COLUMNS} FROM brigades WHERE cluster_id = ?"
        ))
        .bind(cluster_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(brigade_from_row).transpose()
    }

    pub async fn list_brigades_by_status(
        &self,
        status: BrigadeStatus,
    ) -> Result<Vec<Brigade>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {BRIGADE_COLUMNS} FROM brigades WHERE status = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(brigade_from_row).collect()
    }

    /// Insert a brigade in formation for `cluster_id`. A second brigade for
    /// the same cluster is rejected by the unique constraint.
    pub async fn create_brigade(&self, cluster_id: &str) -> Result<Brigade, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_timestamp();
        let status = BrigadeStatus::Formation;

        sqlx::query(
            "INSERT INTO brigades (id, cluster_id, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(cluster_id)
        .bind(status.as_str())
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(cluster_taken)?;

        Ok(Brigade {
            id,
            cluster_id: cluster_id.to_string(),
            status,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Merge `changes` into the stored brigade and refresh its modification time.
    pub async fn update_brigade(
        &self,
        id: &str,
        changes: BrigadeChanges,
    ) -> Result<Brigade, AppError> {
        let existing = self
            .get_brigade(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Brigade {} not found", id)))?;

        let updated = Brigade {
            cluster_id: changes.cluster_id.unwrap_or(existing.cluster_id),
            status: changes.status.unwrap_or(existing.status),
            updated_at: now_timestamp(),
            ..existing
        };

        let result = sqlx::query(
            "UPDATE brigades SET cluster_id = ?, status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&updated.cluster_id)
        .bind(updated.status.as_str())
        .bind(&updated.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(cluster_taken)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Brigade {} not found", id)));
        }

        Ok(updated)
    }

    /// Delete a brigade. Its assignments go with it. Returns whether a row was removed.
    pub async fn delete_brigade(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM brigades WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn cluster_taken(err: sqlx::Error) -> AppError {
    match AppError::from(err) {
        AppError::Conflict(_) => {
            AppError::Conflict("A brigade already exists for this cluster".to_string())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::temp_repository;
    use uuid::Uuid;

    fn assert_cluster_taken(result: Result<Brigade, AppError>) {
        match result {
            Err(AppError::Conflict(msg)) => {
                assert_eq!(msg, "A brigade already exists for this cluster")
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_one_brigade_per_cluster() {
        let (repo, _dir) = temp_repository().await;
        let cluster = Uuid::new_v4().to_string();

        let first = repo.create_brigade(&cluster).await.unwrap();
        assert_eq!(first.status, BrigadeStatus::Formation);
        assert_cluster_taken(repo.create_brigade(&cluster).await);

        let second = repo
            .create_brigade(&Uuid::new_v4().to_string())
            .await
            .unwrap();
        assert_cluster_taken(
            repo.update_brigade(
                &second.id,
                BrigadeChanges {
                    cluster_id: Some(cluster.clone()),
                    status: Some(BrigadeStatus::Active),
                },
            )
            .await,
        );

        // Rejected update left the row untouched
        let stored = repo.get_brigade(&second.id).await.unwrap().unwrap();
        assert_eq!(stored.cluster_id, second.cluster_id);
        assert_eq!(stored.status, BrigadeStatus::Formation);
    }

    #[tokio::test]
    async fn test_update_missing_brigade() {
        let (repo, _dir) = temp_repository().await;
        assert!(matches!(
            repo.update_brigade("missing", BrigadeChanges::default()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(!repo.delete_brigade("missing").await.unwrap());
    }
}
