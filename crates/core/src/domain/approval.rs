use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::claim::ClaimId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub i64);

/// Roles that take approval decisions. Lecturers and HR never appear in the
/// ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    Coordinator,
    Manager,
}

impl ApproverRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coordinator => "coordinator",
            Self::Manager => "manager",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "coordinator" => Some(Self::Coordinator),
            "manager" => Some(Self::Manager),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn from_approved(approved: bool) -> Self {
        if approved {
            Self::Approved
        } else {
            Self::Rejected
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One row of the approval ledger. Entries are immutable once written; the
/// ledger is the audit trail of who decided what and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalEntry {
    pub id: ApprovalId,
    pub claim_id: ClaimId,
    pub approver_id: String,
    pub role: ApproverRole,
    pub decision: Decision,
    pub comments: String,
    pub decided_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::{ApproverRole, Decision};

    #[test]
    fn approver_role_round_trips_from_storage_encoding() {
        for role in [ApproverRole::Coordinator, ApproverRole::Manager] {
            assert_eq!(ApproverRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(ApproverRole::parse("lecturer"), None);
    }

    #[test]
    fn decision_round_trips_from_storage_encoding() {
        for decision in [Decision::Approved, Decision::Rejected] {
            assert_eq!(Decision::parse(decision.as_str()), Some(decision));
        }
    }

    #[test]
    fn decision_maps_from_the_boolean_wire_form() {
        assert_eq!(Decision::from_approved(true), Decision::Approved);
        assert_eq!(Decision::from_approved(false), Decision::Rejected);
        assert!(Decision::Approved.is_approved());
        assert!(!Decision::Rejected.is_approved());
    }
}
