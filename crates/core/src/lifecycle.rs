use thiserror::Error;

use crate::domain::approval::{ApproverRole, Decision};
use crate::domain::claim::ClaimStatus;

/// The computed outcome of a legal approval decision: the status update to
/// apply and the ledger facts to append. Both writes belong to one
/// transaction; applying either alone violates the consistency contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: ClaimStatus,
    pub to: ClaimStatus,
    pub role: ApproverRole,
    pub decision: Decision,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IllegalTransition {
    #[error("{role:?} cannot decide a claim in status {status:?}")]
    Decision { role: ApproverRole, status: ClaimStatus },
    #[error("a claim in status {status:?} cannot be marked paid")]
    Payment { status: ClaimStatus },
}

/// Computes the transition for an approval decision.
///
/// Coordinators act on `Pending` claims, managers on claims a coordinator has
/// already approved. Every other pairing is rejected before any write, which
/// also covers the terminal statuses.
pub fn decide(
    status: ClaimStatus,
    role: ApproverRole,
    approved: bool,
) -> Result<Transition, IllegalTransition> {
    let to = match (&role, &status) {
        (ApproverRole::Coordinator, ClaimStatus::Pending) => {
            if approved {
                ClaimStatus::ApprovedByCoordinator
            } else {
                ClaimStatus::RejectedByCoordinator
            }
        }
        (ApproverRole::Manager, ClaimStatus::ApprovedByCoordinator) => {
            if approved {
                ClaimStatus::ApprovedByManager
            } else {
                ClaimStatus::RejectedByManager
            }
        }
        _ => return Err(IllegalTransition::Decision { role, status }),
    };

    Ok(Transition { from: status, to, role, decision: Decision::from_approved(approved) })
}

/// Payment is a status-only action: it is legal exactly once, after the
/// manager's approval, and appends nothing to the ledger.
pub fn mark_paid(status: ClaimStatus) -> Result<ClaimStatus, IllegalTransition> {
    match status {
        ClaimStatus::ApprovedByManager => Ok(ClaimStatus::Paid),
        status => Err(IllegalTransition::Payment { status }),
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::approval::{ApproverRole, Decision};
    use crate::domain::claim::ClaimStatus;

    use super::{decide, mark_paid, IllegalTransition};

    #[test]
    fn coordinator_decides_pending_claims() {
        let approved = decide(ClaimStatus::Pending, ApproverRole::Coordinator, true)
            .expect("pending -> approved_by_coordinator");
        assert_eq!(approved.from, ClaimStatus::Pending);
        assert_eq!(approved.to, ClaimStatus::ApprovedByCoordinator);
        assert_eq!(approved.decision, Decision::Approved);

        let rejected = decide(ClaimStatus::Pending, ApproverRole::Coordinator, false)
            .expect("pending -> rejected_by_coordinator");
        assert_eq!(rejected.to, ClaimStatus::RejectedByCoordinator);
        assert_eq!(rejected.decision, Decision::Rejected);
    }

    #[test]
    fn manager_decides_coordinator_approved_claims() {
        let approved = decide(ClaimStatus::ApprovedByCoordinator, ApproverRole::Manager, true)
            .expect("approved_by_coordinator -> approved_by_manager");
        assert_eq!(approved.to, ClaimStatus::ApprovedByManager);

        let rejected = decide(ClaimStatus::ApprovedByCoordinator, ApproverRole::Manager, false)
            .expect("approved_by_coordinator -> rejected_by_manager");
        assert_eq!(rejected.to, ClaimStatus::RejectedByManager);
    }

    #[test]
    fn manager_cannot_decide_a_pending_claim() {
        let error = decide(ClaimStatus::Pending, ApproverRole::Manager, true)
            .expect_err("manager must wait for the coordinator");

        assert_eq!(
            error,
            IllegalTransition::Decision {
                role: ApproverRole::Manager,
                status: ClaimStatus::Pending,
            }
        );
    }

    #[test]
    fn coordinator_cannot_redecide_a_forwarded_claim() {
        let error = decide(ClaimStatus::ApprovedByCoordinator, ApproverRole::Coordinator, false)
            .expect_err("coordinator already decided this claim");

        assert!(matches!(error, IllegalTransition::Decision { .. }));
    }

    #[test]
    fn terminal_statuses_accept_no_further_decisions() {
        let terminal = [
            ClaimStatus::RejectedByCoordinator,
            ClaimStatus::RejectedByManager,
            ClaimStatus::Paid,
        ];

        for status in terminal {
            for role in [ApproverRole::Coordinator, ApproverRole::Manager] {
                for approved in [true, false] {
                    let error = decide(status.clone(), role.clone(), approved)
                        .expect_err("terminal claims are closed");
                    assert_eq!(
                        error,
                        IllegalTransition::Decision { role: role.clone(), status: status.clone() }
                    );
                }
            }
        }
    }

    #[test]
    fn manager_approved_claims_cannot_be_decided_again() {
        for role in [ApproverRole::Coordinator, ApproverRole::Manager] {
            let error = decide(ClaimStatus::ApprovedByManager, role, true)
                .expect_err("awaiting payment, not another decision");
            assert!(matches!(error, IllegalTransition::Decision { .. }));
        }
    }

    #[test]
    fn payment_requires_manager_approval() {
        assert_eq!(mark_paid(ClaimStatus::ApprovedByManager), Ok(ClaimStatus::Paid));

        let not_ready = [
            ClaimStatus::Pending,
            ClaimStatus::ApprovedByCoordinator,
            ClaimStatus::RejectedByCoordinator,
            ClaimStatus::RejectedByManager,
            ClaimStatus::Paid,
        ];
        for status in not_ready {
            let error = mark_paid(status.clone()).expect_err("payment precondition");
            assert_eq!(error, IllegalTransition::Payment { status });
        }
    }

    #[test]
    fn rejection_errors_report_the_observed_status() {
        let error = decide(ClaimStatus::Paid, ApproverRole::Manager, true)
            .expect_err("paid claims are closed");
        assert!(error.to_string().contains("Paid"));
    }
}
