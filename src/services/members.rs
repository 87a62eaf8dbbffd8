//! Brigade member registry.

use std::sync::Arc;

use serde_json::Value;

use super::{parse_role, parse_uuid, records, required};
use crate::db::{MemberChanges, NewMember, Repository};
use crate::errors::AppError;
use crate::models::{BrigadeMember, CreateMemberRequest, MemberWithAssignments, UpdateMemberRequest};

/// Owns member profiles: one per external user, deletion guarded by
/// active assignments.
#[derive(Clone)]
pub struct MemberRegistry {
    repo: Arc<Repository>,
}

impl MemberRegistry {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    pub async fn list(&self) -> Result<Vec<BrigadeMember>, AppError> {
        self.repo.list_members().await
    }

    pub async fn get(&self, id: &str) -> Result<BrigadeMember, AppError> {
        self.repo
            .get_member(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Profile of an external user; identities compare case-insensitively.
    pub async fn get_by_external_id(&self, external_user_id: &str) -> Result<BrigadeMember, AppError> {
        let missing = || {
            AppError::NotFound(format!(
                "No brigade member profile for user {}",
                external_user_id
            ))
        };

        // A malformed identity cannot belong to any stored profile
        let normalized = parse_uuid(external_user_id.trim(), "external_user_id")
            .map_err(|_| missing())?
            .to_string();

        self.repo
            .get_member_by_external_id(&normalized)
            .await?
            .ok_or_else(missing)
    }

    /// A member with all its assignments and the brigades they point to.
    pub async fn details(&self, id: &str) -> Result<MemberWithAssignments, AppError> {
        let member = self.get(id).await?;
        let assignments = self.repo.list_assignments_with_brigades(id, None).await?;
        Ok(MemberWithAssignments {
            member,
            assignments,
        })
    }

    /// Create a member profile, either self-registered or on behalf of a user.
    pub async fn register(&self, request: CreateMemberRequest) -> Result<BrigadeMember, AppError> {
        let external_user_id = required(request.external_user_id.as_deref(), "external_user_id")?;
        let locality = required(request.locality.as_deref(), "locality")?;
        let role = required(request.role.as_deref(), "role")?;

        let external_user_id = parse_uuid(&external_user_id, "external_user_id")?.to_string();
        let role = parse_role(&role)?;

        if self
            .repo
            .get_member_by_external_id(&external_user_id)
            .await?
            .is_some()
        {
            tracing::debug!(%external_user_id, "Rejected duplicate member profile");
            return Err(AppError::Conflict(
                "User already has a brigade member profile".to_string(),
            ));
        }

        let member = self
            .repo
            .create_member(&NewMember {
                external_user_id,
                locality,
                role,
                credentials: request.credentials.unwrap_or_default(),
                work_history: request.work_history.unwrap_or_default(),
                availability: request.availability.unwrap_or_default(),
            })
            .await?;

        tracing::info!(member_id = %member.id, external_user_id = %member.external_user_id, "Brigade member registered");
        Ok(member)
    }

    /// Partial update. An empty request only refreshes `updated_at`.
    pub async fn update(
        &self,
        id: &str,
        request: UpdateMemberRequest,
    ) -> Result<BrigadeMember, AppError> {
        self.get(id).await?;

        let role = request.role.as_deref().map(parse_role).transpose()?;
        let locality = match request.locality {
            Some(locality) => Some(required(Some(&locality), "locality")?),
            None => None,
        };

        let member = self
            .repo
            .update_member(
                id,
                MemberChanges {
                    locality,
                    role,
                    credentials: request.credentials,
                    work_history: request.work_history,
                    availability: request.availability,
                },
            )
            .await?;

        tracing::info!(member_id = %id, "Brigade member updated");
        Ok(member)
    }

    /// Delete a member that is not engaged in a brigade in formation or active.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.get(id).await?;

        if self.repo.has_active_assignment(id).await? {
            tracing::debug!(member_id = %id, "Refused to delete engaged member");
            return Err(active_assignment());
        }

        if !self.repo.delete_member_if_unengaged(id).await? {
            // Lost a race: either deleted meanwhile or an assignment was accepted
            return match self.repo.get_member(id).await? {
                Some(_) => Err(active_assignment()),
                None => Err(not_found(id)),
            };
        }

        tracing::info!(member_id = %id, "Brigade member deleted");
        Ok(())
    }

    /// Replace the member's credential records with the verified list.
    pub async fn verify_credentials(
        &self,
        id: &str,
        credentials: Option<Value>,
    ) -> Result<BrigadeMember, AppError> {
        let credentials = records(credentials, "credentials")?;

        let member = self
            .repo
            .update_member(
                id,
                MemberChanges {
                    credentials: Some(credentials),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(member_id = %id, count = member.credentials.len(), "Credentials verified");
        Ok(member)
    }

    /// Replace the member's availability windows.
    pub async fn set_availability(
        &self,
        id: &str,
        availability: Option<Value>,
    ) -> Result<BrigadeMember, AppError> {
        let availability = records(availability, "availability")?;

        let member = self
            .repo
            .update_member(
                id,
                MemberChanges {
                    availability: Some(availability),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(member_id = %id, windows = member.availability.len(), "Availability updated");
        Ok(member)
    }

    pub async fn by_locality(&self, locality: &str) -> Result<Vec<BrigadeMember>, AppError> {
        self.repo.list_members_by_locality(locality).await
    }

    pub async fn by_role(&self, role: &str) -> Result<Vec<BrigadeMember>, AppError> {
        let role = parse_role(role)?;
        self.repo.list_members_by_role(role).await
    }

    /// Members available in a locality.
    ///
    /// Only the locality is matched; stored availability windows are not
    /// compared against any date range.
    pub async fn available_in(&self, locality: Option<&str>) -> Result<Vec<BrigadeMember>, AppError> {
        let locality = required(locality, "locality")?;
        self.repo.list_members_by_locality(&locality).await
    }
}

fn not_found(id: &str) -> AppError {
    AppError::NotFound(format!("Brigade member {} not found", id))
}

fn active_assignment() -> AppError {
    AppError::Conflict("Cannot delete: member has an active brigade assignment".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{member_request, temp_repository};
    use serde_json::json;

    #[tokio::test]
    async fn test_register_requires_fields() {
        let (repo, _dir) = temp_repository().await;
        let registry = MemberRegistry::new(repo);

        let mut request = member_request("technician");
        request.locality = None;
        assert!(matches!(
            registry.register(request).await,
            Err(AppError::Validation(_))
        ));

        let mut request = member_request("technician");
        request.external_user_id = Some("u1".to_string());
        assert!(matches!(
            registry.register(request).await,
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            registry.register(member_request("chef")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_defaults_lists_and_rejects_duplicate_identity() {
        let (repo, _dir) = temp_repository().await;
        let registry = MemberRegistry::new(repo);

        let request = member_request("botanist");
        let member = registry.register(request.clone()).await.unwrap();
        assert!(member.credentials.is_empty());
        assert!(member.work_history.is_empty());
        assert!(member.availability.is_empty());

        // Same identity in upper case is still the same user
        let mut duplicate = request;
        duplicate.external_user_id = duplicate.external_user_id.map(|id| id.to_uppercase());
        assert!(matches!(
            registry.register(duplicate).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_by_external_id_ignores_case() {
        let (repo, _dir) = temp_repository().await;
        let registry = MemberRegistry::new(repo);

        let external_id = uuid::Uuid::new_v4().to_string().to_uppercase();
        let mut request = member_request("technician");
        request.external_user_id = Some(external_id.clone());
        let member = registry.register(request).await.unwrap();
        assert_eq!(member.external_user_id, external_id.to_lowercase());

        let found = registry.get_by_external_id(&external_id).await.unwrap();
        assert_eq!(found.id, member.id);
        let found = registry
            .get_by_external_id(&external_id.to_lowercase())
            .await
            .unwrap();
        assert_eq!(found.id, member.id);

        assert!(matches!(
            registry.get_by_external_id("u1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_validates_role_and_merges() {
        let (repo, _dir) = temp_repository().await;
        let registry = MemberRegistry::new(repo);
        let member = registry.register(member_request("technician")).await.unwrap();

        let bad = UpdateMemberRequest {
            role: Some("captain".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            registry.update(&member.id, bad).await,
            Err(AppError::Validation(_))
        ));

        let updated = registry
            .update(
                &member.id,
                UpdateMemberRequest {
                    role: Some("lead".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.role, crate::models::MemberRole::Lead);
        assert_eq!(updated.locality, member.locality);

        let missing = registry.update("nope", UpdateMemberRequest::default()).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_update_only_refreshes_timestamp() {
        let (repo, _dir) = temp_repository().await;
        let registry = MemberRegistry::new(repo);
        let member = registry.register(member_request("technician")).await.unwrap();

        let updated = registry
            .update(&member.id, UpdateMemberRequest::default())
            .await
            .unwrap();
        assert_eq!(updated.locality, member.locality);
        assert_eq!(updated.role, member.role);
        assert_eq!(updated.created_at, member.created_at);
        assert!(updated.updated_at >= member.updated_at);
    }

    #[tokio::test]
    async fn test_replacing_record_lists() {
        let (repo, _dir) = temp_repository().await;
        let registry = MemberRegistry::new(repo);
        let member = registry.register(member_request("technician")).await.unwrap();

        assert!(matches!(
            registry
                .verify_credentials(&member.id, Some(json!({"title": "BSc"})))
                .await,
            Err(AppError::Validation(_))
        ));

        let verified = registry
            .verify_credentials(&member.id, Some(json!([{"title": "BSc", "verified": true}])))
            .await
            .unwrap();
        assert_eq!(verified.credentials.len(), 1);

        let available = registry
            .set_availability(&member.id, Some(json!([{"from": "2024-01-01", "to": "2024-02-01"}])))
            .await
            .unwrap();
        assert_eq!(available.availability.len(), 1);
        assert_eq!(available.credentials.len(), 1);

        assert!(matches!(
            registry.set_availability(&member.id, Some(json!("always"))).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            registry.set_availability("nope", Some(json!([]))).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_available_in_locality_ignores_windows() {
        let (repo, _dir) = temp_repository().await;
        let registry = MemberRegistry::new(repo);
        let member = registry.register(member_request("technician")).await.unwrap();

        let found = registry.available_in(Some("Leticia")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, member.id);

        assert!(registry.available_in(Some("Mitu")).await.unwrap().is_empty());
        assert!(matches!(
            registry.available_in(None).await,
            Err(AppError::Validation(_))
        ));
    }
}
