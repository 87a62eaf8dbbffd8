//! Brigade member model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role a member plays inside a brigade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MemberRole {
    Lead,
    Botanist,
    Technician,
    CoResearcher,
}

impl MemberRole {
    pub const ALL: [MemberRole; 4] = [
        MemberRole::Lead,
        MemberRole::Botanist,
        MemberRole::Technician,
        MemberRole::CoResearcher,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Lead => "lead",
            MemberRole::Botanist => "botanist",
            MemberRole::Technician => "technician",
            MemberRole::CoResearcher => "co-researcher",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == s)
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person eligible for assignment to brigades.
///
/// Credential, work-history and availability records are free-form JSON
/// objects owned by the clients; the service only stores and replaces them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrigadeMember {
    pub id: String,
    /// Identity of the user account this profile belongs to (unique)
    pub external_user_id: String,
    pub locality: String,
    pub credentials: Vec<Value>,
    pub work_history: Vec<Value>,
    pub role: MemberRole,
    pub availability: Vec<Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// Member fields embedded in assignment listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: String,
    pub external_user_id: String,
    pub locality: String,
    pub credentials: Vec<Value>,
    pub work_history: Vec<Value>,
    pub role: MemberRole,
}

/// Request body for registering a member.
///
/// Fields are optional so that missing values surface as validation errors
/// instead of body rejections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateMemberRequest {
    #[serde(default, alias = "external_id")]
    pub external_user_id: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub credentials: Option<Vec<Value>>,
    #[serde(default)]
    pub work_history: Option<Vec<Value>>,
    #[serde(default)]
    pub availability: Option<Vec<Value>>,
}

/// Request body for a partial member update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMemberRequest {
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub credentials: Option<Vec<Value>>,
    #[serde(default)]
    pub work_history: Option<Vec<Value>>,
    #[serde(default)]
    pub availability: Option<Vec<Value>>,
}

/// Request body for replacing verified credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub credentials: Option<Value>,
}

/// Request body for replacing availability windows.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityRequest {
    #[serde(default)]
    pub availability: Option<Value>,
}

/// Query string of the "available in locality" listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailableQuery {
    #[serde(default)]
    pub locality: Option<String>,
}

/// Body returned after a member is deleted.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedMember {
    pub message: String,
    pub id: String,
}
