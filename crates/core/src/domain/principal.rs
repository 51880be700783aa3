use serde::{Deserialize, Serialize};

use crate::domain::approval::ApproverRole;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Lecturer,
    Coordinator,
    Manager,
    Hr,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lecturer => "lecturer",
            Self::Coordinator => "coordinator",
            Self::Manager => "manager",
            Self::Hr => "hr",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lecturer" => Some(Self::Lecturer),
            "coordinator" => Some(Self::Coordinator),
            "manager" => Some(Self::Manager),
            "hr" => Some(Self::Hr),
            _ => None,
        }
    }

    /// The decision-taking identity of this role, if it has one.
    pub fn approver_role(&self) -> Option<ApproverRole> {
        match self {
            Self::Coordinator => Some(ApproverRole::Coordinator),
            Self::Manager => Some(ApproverRole::Manager),
            Self::Lecturer | Self::Hr => None,
        }
    }
}

/// The authenticated caller, supplied per request by the identity
/// collaborator and passed explicitly into every operation. Nothing in this
/// crate reads identity from ambient state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self { user_id: user_id.into(), role }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::approval::ApproverRole;

    use super::Role;

    #[test]
    fn role_round_trips_from_storage_encoding() {
        for role in [Role::Lecturer, Role::Coordinator, Role::Manager, Role::Hr] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("HR"), Some(Role::Hr));
        assert_eq!(Role::parse("admin"), None);
    }

    #[test]
    fn only_coordinator_and_manager_decide() {
        assert_eq!(Role::Coordinator.approver_role(), Some(ApproverRole::Coordinator));
        assert_eq!(Role::Manager.approver_role(), Some(ApproverRole::Manager));
        assert_eq!(Role::Lecturer.approver_role(), None);
        assert_eq!(Role::Hr.approver_role(), None);
    }
}
