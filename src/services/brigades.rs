//! Brigade registry.

use std::collections::HashMap;
use std::sync::Arc;

use super::{parse_status, parse_uuid, required};
use crate::clusters::{ClusterDirectory, ClusterLookup};
use crate::db::{BrigadeChanges, Repository};
use crate::errors::AppError;
use crate::models::{
    Brigade, BrigadeWithMembers, CreateBrigadeRequest, MemberWithAssignment, UpdateBrigadeRequest,
};

/// Owns brigades: one per survey cluster, with a free-form status lifecycle.
#[derive(Clone)]
pub struct BrigadeRegistry {
    repo: Arc<Repository>,
    clusters: Arc<dyn ClusterDirectory>,
}

impl BrigadeRegistry {
    pub fn new(repo: Arc<Repository>, clusters: Arc<dyn ClusterDirectory>) -> Self {
        Self { repo, clusters }
    }

    pub async fn list(&self) -> Result<Vec<Brigade>, AppError> {
        self.repo.list_brigades().await
    }

    pub async fn get(&self, id: &str) -> Result<Brigade, AppError> {
        self.repo
            .get_brigade(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// The brigade working on a cluster; `None` is a normal answer.
    pub async fn by_cluster(&self, cluster_id: &str) -> Result<Option<Brigade>, AppError> {
        let cluster_id = match parse_uuid(cluster_id.trim(), "cluster_id") {
            Ok(id) => id.to_string(),
            // A malformed id cannot match any stored reference
            Err(_) => return Ok(None),
        };
        self.repo.get_brigade_by_cluster(&cluster_id).await
    }

    pub async fn by_status(&self, status: &str) -> Result<Vec<Brigade>, AppError> {
        let status = parse_status(status)?;
        self.repo.list_brigades_by_status(status).await
    }

    /// Form a brigade for an existing cluster that has none yet.
    pub async fn create(&self, request: CreateBrigadeRequest) -> Result<Brigade, AppError> {
        let cluster_id = required(request.cluster_id.as_deref(), "cluster_id")?;
        let cluster_id = parse_uuid(&cluster_id, "cluster_id")?;

        self.ensure_cluster_exists(cluster_id).await?;

        let cluster_id = cluster_id.to_string();
        if self.repo.get_brigade_by_cluster(&cluster_id).await?.is_some() {
            tracing::debug!(%cluster_id, "Rejected second brigade for cluster");
            return Err(cluster_taken());
        }

        let brigade = self.repo.create_brigade(&cluster_id).await?;
        tracing::info!(brigade_id = %brigade.id, %cluster_id, "Brigade created");
        Ok(brigade)
    }

    /// Partial update. Moving the brigade to another cluster is subject to
    /// the same checks as creation.
    pub async fn update(&self, id: &str, request: UpdateBrigadeRequest) -> Result<Brigade, AppError> {
        let existing = self.get(id).await?;

        let status = request.status.as_deref().map(parse_status).transpose()?;

        let cluster_id = match request.cluster_id.as_deref() {
            Some(raw) => {
                let cluster_id = parse_uuid(&required(Some(raw), "cluster_id")?, "cluster_id")?;
                let cluster_id_str = cluster_id.to_string();
                if cluster_id_str == existing.cluster_id {
                    None
                } else {
                    self.ensure_cluster_exists(cluster_id).await?;
                    if self.repo.get_brigade_by_cluster(&cluster_id_str).await?.is_some() {
                        return Err(cluster_taken());
                    }
                    Some(cluster_id_str)
                }
            }
            None => None,
        };

        let brigade = self
            .repo
            .update_brigade(id, BrigadeChanges { cluster_id, status })
            .await?;

        tracing::info!(brigade_id = %id, status = %brigade.status, "Brigade updated");
        Ok(brigade)
    }

    /// Delete a brigade and, with it, all of its assignments.
    ///
    /// Unlike member deletion there is no guard on accepted assignments.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.repo.delete_brigade(id).await? {
            return Err(not_found(id));
        }

        tracing::info!(brigade_id = %id, "Brigade deleted");
        Ok(())
    }

    /// Set the status to any of the four values, from any current status.
    pub async fn change_status(&self, id: &str, status: Option<&str>) -> Result<Brigade, AppError> {
        let status = parse_status(&required(status, "status")?)?;

        let brigade = self
            .repo
            .update_brigade(
                id,
                BrigadeChanges {
                    status: Some(status),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(brigade_id = %id, %status, "Brigade status changed");
        Ok(brigade)
    }

    /// The brigade with every assigned member, each carrying its assignment.
    pub async fn with_members(&self, id: &str) -> Result<BrigadeWithMembers, AppError> {
        let brigade = self.get(id).await?;

        let assignments = self.repo.list_brigade_assignments(id).await?;
        let member_ids: Vec<String> = assignments.iter().map(|a| a.member_id.clone()).collect();
        let mut members: HashMap<String, _> = self
            .repo
            .get_members_by_ids(&member_ids)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        let members = assignments
            .into_iter()
            .filter_map(|assignment| {
                members
                    .remove(&assignment.member_id)
                    .map(|member| MemberWithAssignment { member, assignment })
            })
            .collect();

        Ok(BrigadeWithMembers { brigade, members })
    }

    async fn ensure_cluster_exists(&self, cluster_id: uuid::Uuid) -> Result<(), AppError> {
        match self.clusters.lookup(cluster_id).await {
            ClusterLookup::Exists => Ok(()),
            ClusterLookup::Missing => {
                tracing::debug!(%cluster_id, "Cluster does not exist");
                Err(AppError::Validation("Cluster does not exist".to_string()))
            }
            ClusterLookup::Unreachable => {
                tracing::warn!(%cluster_id, "Could not verify cluster, proceeding");
                Ok(())
            }
        }
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Brigade {} not found", id))
}

fn cluster_taken() -> AppError {
    AppError::Conflict("A brigade already exists for this cluster".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::StaticClusterDirectory;
    use crate::models::BrigadeStatus;
    use crate::services::test_support::temp_repository;
    use uuid::Uuid;

    fn create_request(cluster_id: Uuid) -> CreateBrigadeRequest {
        CreateBrigadeRequest {
            cluster_id: Some(cluster_id.to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_checks_cluster_and_uniqueness() {
        let (repo, _dir) = temp_repository().await;
        let known = Uuid::new_v4();
        let registry = BrigadeRegistry::new(
            repo,
            Arc::new(StaticClusterDirectory::with_clusters([known])),
        );

        assert!(matches!(
            registry.create(CreateBrigadeRequest::default()).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            registry
                .create(CreateBrigadeRequest {
                    cluster_id: Some("c1".to_string())
                })
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            registry.create(create_request(Uuid::new_v4())).await,
            Err(AppError::Validation(_))
        ));

        let brigade = registry.create(create_request(known)).await.unwrap();
        assert_eq!(brigade.status, BrigadeStatus::Formation);
        assert_eq!(brigade.cluster_id, known.to_string());

        assert!(matches!(
            registry.create(create_request(known)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_create_proceeds_when_cluster_service_is_down() {
        let (repo, _dir) = temp_repository().await;
        let registry = BrigadeRegistry::new(repo, Arc::new(StaticClusterDirectory::unreachable()));

        let brigade = registry.create(create_request(Uuid::new_v4())).await.unwrap();
        assert_eq!(brigade.status, BrigadeStatus::Formation);
    }

    #[tokio::test]
    async fn test_status_transitions_are_unrestricted() {
        let (repo, _dir) = temp_repository().await;
        let cluster = Uuid::new_v4();
        let registry = BrigadeRegistry::new(
            repo,
            Arc::new(StaticClusterDirectory::with_clusters([cluster])),
        );
        let brigade = registry.create(create_request(cluster)).await.unwrap();

        for status in ["completed", "formation", "cancelled", "active"] {
            let changed = registry.change_status(&brigade.id, Some(status)).await.unwrap();
            assert_eq!(changed.status.as_str(), status);
        }

        assert!(matches!(
            registry.change_status(&brigade.id, Some("archived")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            registry.change_status(&brigade.id, None).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            registry.change_status("nope", Some("active")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_lookups() {
        let (repo, _dir) = temp_repository().await;
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let registry = BrigadeRegistry::new(
            repo,
            Arc::new(StaticClusterDirectory::with_clusters([first, second])),
        );
        let a = registry.create(create_request(first)).await.unwrap();
        let b = registry.create(create_request(second)).await.unwrap();

        assert!(matches!(
            registry
                .update(
                    &a.id,
                    UpdateBrigadeRequest {
                        status: Some("paused".to_string()),
                        ..Default::default()
                    }
                )
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            registry
                .update(
                    &a.id,
                    UpdateBrigadeRequest {
                        cluster_id: Some(second.to_string()),
                        ..Default::default()
                    }
                )
                .await,
            Err(AppError::Conflict(_))
        ));

        let unchanged = registry
            .update(&a.id, UpdateBrigadeRequest::default())
            .await
            .unwrap();
        assert_eq!(unchanged.status, BrigadeStatus::Formation);
        assert_eq!(unchanged.cluster_id, a.cluster_id);

        registry.change_status(&b.id, Some("active")).await.unwrap();
        let active = registry.by_status("active").await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);

        let found = registry.by_cluster(&first.to_string()).await.unwrap();
        assert_eq!(found.map(|f| f.id), Some(a.id.clone()));
        assert!(registry.by_cluster("c1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_and_empty_member_view() {
        let (repo, _dir) = temp_repository().await;
        let cluster = Uuid::new_v4();
        let registry = BrigadeRegistry::new(
            repo,
            Arc::new(StaticClusterDirectory::with_clusters([cluster])),
        );
        let brigade = registry.create(create_request(cluster)).await.unwrap();

        let view = registry.with_members(&brigade.id).await.unwrap();
        assert!(view.members.is_empty());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["members"], serde_json::json!([]));
        assert_eq!(json["id"], brigade.id.as_str());

        registry.delete(&brigade.id).await.unwrap();
        assert!(matches!(
            registry.delete(&brigade.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            registry.with_members(&brigade.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
