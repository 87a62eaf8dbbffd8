//! Brigade model and composite views.

use serde::{Deserialize, Serialize};

use super::{Assignment, BrigadeMember};

/// Lifecycle status of a brigade.
///
/// Any value may follow any other; only membership in the set is checked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BrigadeStatus {
    Formation,
    Active,
    Completed,
    Cancelled,
}

impl BrigadeStatus {
    pub const ALL: [BrigadeStatus; 4] = [
        BrigadeStatus::Formation,
        BrigadeStatus::Active,
        BrigadeStatus::Completed,
        BrigadeStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BrigadeStatus::Formation => "formation",
            BrigadeStatus::Active => "active",
            BrigadeStatus::Completed => "completed",
            BrigadeStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Statuses in which an accepted member is still engaged.
    pub fn is_engaging(&self) -> bool {
        matches!(self, BrigadeStatus::Formation | BrigadeStatus::Active)
    }
}

impl std::fmt::Display for BrigadeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field team formed for exactly one survey cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brigade {
    pub id: String,
    /// Survey cluster this brigade works on (unique)
    pub cluster_id: String,
    pub status: BrigadeStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Brigade fields embedded in assignment listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrigadeSummary {
    pub id: String,
    pub cluster_id: String,
    pub status: BrigadeStatus,
}

/// A member of a brigade together with the assignment that links them.
#[derive(Debug, Clone, Serialize)]
pub struct MemberWithAssignment {
    #[serde(flatten)]
    pub member: BrigadeMember,
    pub assignment: Assignment,
}

/// A brigade with every assigned member, whatever the invitation status.
#[derive(Debug, Clone, Serialize)]
pub struct BrigadeWithMembers {
    #[serde(flatten)]
    pub brigade: Brigade,
    pub members: Vec<MemberWithAssignment>,
}

/// Request body for creating a brigade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBrigadeRequest {
    #[serde(default)]
    pub cluster_id: Option<String>,
}

/// Request body for a partial brigade update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBrigadeRequest {
    #[serde(default)]
    pub cluster_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Request body for an explicit status change.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangeStatusRequest {
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        for status in BrigadeStatus::ALL {
            assert_eq!(BrigadeStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(BrigadeStatus::parse("formacion"), None);
        assert_eq!(BrigadeStatus::parse(""), None);
    }

    #[test]
    fn test_engaging_statuses() {
        assert!(BrigadeStatus::Formation.is_engaging());
        assert!(BrigadeStatus::Active.is_engaging());
        assert!(!BrigadeStatus::Completed.is_engaging());
        assert!(!BrigadeStatus::Cancelled.is_engaging());
    }
}
