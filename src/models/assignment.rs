//! Assignment (brigade <-> member) model.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BrigadeMember, BrigadeSummary, MemberSummary};

/// Invitation sub-lifecycle of an assignment.
///
/// `Pending` moves once to `Accepted` or `Rejected`; both are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InvitationStatus::Pending),
            "accepted" => Some(InvitationStatus::Accepted),
            "rejected" => Some(InvitationStatus::Rejected),
            _ => None,
        }
    }

    pub fn from_response(accepted: bool) -> Self {
        if accepted {
            InvitationStatus::Accepted
        } else {
            InvitationStatus::Rejected
        }
    }
}

/// Invitation-based link between one member and one brigade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub brigade_id: String,
    pub member_id: String,
    pub invitation_status: InvitationStatus,
    pub invited_at: String,
    pub responded_at: Option<String>,
    pub rejection_reason: Option<String>,
    pub work_start_date: Option<NaiveDate>,
    pub work_end_date: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

/// Assignment listed from the brigade side.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentWithMember {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub member: MemberSummary,
}

/// Assignment listed from the member side.
#[derive(Debug, Clone, Serialize)]
pub struct AssignmentWithBrigade {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub brigade: BrigadeSummary,
}

/// A member together with every brigade it is linked to.
#[derive(Debug, Clone, Serialize)]
pub struct MemberWithAssignments {
    #[serde(flatten)]
    pub member: BrigadeMember,
    pub assignments: Vec<AssignmentWithBrigade>,
}

/// Planned work period of an assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkDates {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Request body for inviting a member to a brigade.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InviteRequest {
    #[serde(default)]
    pub brigade_id: Option<String>,
    #[serde(default)]
    pub member_id: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Request body for answering an invitation.
///
/// `accepted` stays untyped so a non-boolean value is reported as a
/// validation error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RespondRequest {
    #[serde(default)]
    pub accepted: Option<Value>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Request body for setting planned work dates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkDatesRequest {
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invitation_status_from_response() {
        assert_eq!(
            InvitationStatus::from_response(true),
            InvitationStatus::Accepted
        );
        assert_eq!(
            InvitationStatus::from_response(false),
            InvitationStatus::Rejected
        );
    }

    #[test]
    fn test_invitation_status_parse() {
        assert_eq!(
            InvitationStatus::parse("pending"),
            Some(InvitationStatus::Pending)
        );
        assert_eq!(InvitationStatus::parse("pendiente"), None);
    }

    #[test]
    fn test_work_dates_serialize_as_iso_dates() {
        let assignment = Assignment {
            id: "a".into(),
            brigade_id: "b".into(),
            member_id: "m".into(),
            invitation_status: InvitationStatus::Pending,
            invited_at: "2024-01-01T00:00:00+00:00".into(),
            responded_at: None,
            rejection_reason: None,
            work_start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            work_end_date: None,
            created_at: "2024-01-01T00:00:00+00:00".into(),
            updated_at: "2024-01-01T00:00:00+00:00".into(),
        };
        let json = serde_json::to_value(&assignment).unwrap();
        assert_eq!(json["work_start_date"], "2024-03-01");
        assert!(json["work_end_date"].is_null());
        assert_eq!(json["invitation_status"], "pending");
    }
}
