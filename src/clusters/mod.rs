//! Existence checks against the externally owned clusters service.
//!
//! The service only needs to know whether a cluster exists before forming a
//! brigade for it, so the collaborator is reduced to a single lookup.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use uuid::Uuid;

/// Outcome of a cluster lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterLookup {
    Exists,
    Missing,
    /// The clusters service could not give an answer.
    Unreachable,
}

/// Capability to check that a survey cluster exists.
#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    async fn lookup(&self, cluster_id: Uuid) -> ClusterLookup;
}

/// Clusters service reached over HTTP: `GET {base_url}/{cluster_id}`.
pub struct HttpClusterDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClusterDirectory {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn cluster_url(&self, cluster_id: Uuid) -> String {
        format!("{}/{}", self.base_url, cluster_id)
    }
}

#[async_trait]
impl ClusterDirectory for HttpClusterDirectory {
    async fn lookup(&self, cluster_id: Uuid) -> ClusterLookup {
        let url = self.cluster_url(cluster_id);

        match self.client.get(&url).send().await {
            Ok(resp) => classify_status(resp.status()),
            Err(e) => {
                tracing::warn!("Clusters service request to {} failed: {}", url, e);
                ClusterLookup::Unreachable
            }
        }
    }
}

fn classify_status(status: StatusCode) -> ClusterLookup {
    if status.is_success() {
        ClusterLookup::Exists
    } else if status == StatusCode::NOT_FOUND {
        ClusterLookup::Missing
    } else {
        tracing::warn!("Clusters service answered {}", status);
        ClusterLookup::Unreachable
    }
}

/// Fixed set of known clusters, for tests.
#[cfg(test)]
pub struct StaticClusterDirectory {
    known: std::collections::HashSet<Uuid>,
    reachable: bool,
}

#[cfg(test)]
impl StaticClusterDirectory {
    pub fn with_clusters(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            known: ids.into_iter().collect(),
            reachable: true,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            known: Default::default(),
            reachable: false,
        }
    }
}

#[cfg(test)]
#[async_trait]
impl ClusterDirectory for StaticClusterDirectory {
    async fn lookup(&self, cluster_id: Uuid) -> ClusterLookup {
        if !self.reachable {
            ClusterLookup::Unreachable
        } else if self.known.contains(&cluster_id) {
            ClusterLookup::Exists
        } else {
            ClusterLookup::Missing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), ClusterLookup::Exists);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), ClusterLookup::Missing);
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            ClusterLookup::Unreachable
        );
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            ClusterLookup::Unreachable
        );
    }

    #[test]
    fn test_cluster_url_strips_trailing_slash() {
        let directory =
            HttpClusterDirectory::new("http://clusters.local/api/clusters/", Duration::from_secs(1))
                .unwrap();
        let id = Uuid::nil();
        assert_eq!(
            directory.cluster_url(id),
            "http://clusters.local/api/clusters/00000000-0000-0000-0000-000000000000"
        );
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Nothing listens on port 9 (discard) locally
        let directory =
            HttpClusterDirectory::new("http://127.0.0.1:9/api/clusters", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            directory.lookup(Uuid::new_v4()).await,
            ClusterLookup::Unreachable
        );
    }
}
