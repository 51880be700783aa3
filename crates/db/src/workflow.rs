//! Claim lifecycle orchestration over the database: submission, the two
//! approval stages and settlement.
//!
//! Transition legality is checked by [`claimflow_core::lifecycle`] against a
//! fresh read, then re-checked at write time with a compare-and-set on the
//! claim row. Two approvers deciding the same claim therefore cannot both
//! win: the loser's update matches zero rows and the claim is re-read to
//! report the status that beat it.

use chrono::Utc;
use thiserror::Error;

use claimflow_core::domain::approval::{ApprovalEntry, ApprovalId, ApproverRole, Decision};
use claimflow_core::domain::claim::{ClaimId, ClaimStatus, ClaimSubmission, MonthlyClaim};
use claimflow_core::domain::lecturer::LecturerId;
use claimflow_core::errors::ValidationError;
use claimflow_core::lifecycle::{self, IllegalTransition};

use crate::repositories::{
    ClaimRepository, LecturerRepository, NewClaim, RepositoryError, SqlClaimRepository,
    SqlLecturerRepository,
};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transition(#[from] IllegalTransition),
    #[error("claim {0} was not found")]
    ClaimNotFound(i64),
    #[error("lecturer `{0}` is not registered")]
    UnknownLecturer(String),
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

impl From<sqlx::Error> for WorkflowError {
    fn from(error: sqlx::Error) -> Self {
        Self::Storage(RepositoryError::Database(error))
    }
}

/// One approver's verdict on a claim.
#[derive(Clone, Debug)]
pub struct DecisionCommand {
    pub approver_id: String,
    pub role: ApproverRole,
    pub approved: bool,
    pub comments: String,
}

/// What a successful decision produced: the claim with its new status and
/// the ledger entry that recorded the verdict.
#[derive(Clone, Debug)]
pub struct DecisionOutcome {
    pub claim: MonthlyClaim,
    pub entry: ApprovalEntry,
}

#[derive(Clone)]
pub struct ClaimWorkflow {
    pool: DbPool,
}

impl ClaimWorkflow {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn claims(&self) -> SqlClaimRepository {
        SqlClaimRepository::new(self.pool.clone())
    }

    /// Validates and stores a new claim for `lecturer_id`. The claim always
    /// enters the workflow as pending; status, total and timestamp are
    /// assigned here, never taken from the caller.
    pub async fn submit(
        &self,
        lecturer_id: &LecturerId,
        submission: ClaimSubmission,
    ) -> Result<MonthlyClaim, WorkflowError> {
        submission.validate()?;

        let lecturers = SqlLecturerRepository::new(self.pool.clone());
        if lecturers.find_by_id(lecturer_id).await?.is_none() {
            return Err(WorkflowError::UnknownLecturer(lecturer_id.0.clone()));
        }

        let new_claim = NewClaim {
            lecturer_id: lecturer_id.clone(),
            module_name: submission.module_name.clone(),
            hours_worked: submission.hours_worked,
            hourly_rate: submission.hourly_rate,
            total_amount: submission.total_amount(),
            document: submission.document.clone(),
            status: ClaimStatus::Pending,
            submitted_at: Utc::now(),
        };

        let id = self.claims().insert(new_claim.clone()).await?;

        Ok(MonthlyClaim {
            id,
            lecturer_id: new_claim.lecturer_id,
            module_name: new_claim.module_name,
            hours_worked: new_claim.hours_worked,
            hourly_rate: new_claim.hourly_rate,
            total_amount: new_claim.total_amount,
            document: new_claim.document,
            status: new_claim.status,
            submitted_at: new_claim.submitted_at,
        })
    }

    /// Applies one approver's decision. The ledger append and the status
    /// update commit together or not at all.
    pub async fn decide(
        &self,
        claim_id: ClaimId,
        command: DecisionCommand,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let claim = self
            .claims()
            .find_by_id(claim_id)
            .await?
            .ok_or(WorkflowError::ClaimNotFound(claim_id.0))?;

        let transition =
            lifecycle::decide(claim.status.clone(), command.role.clone(), command.approved)?;
        let decision = Decision::from_approved(command.approved);
        let decided_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        // The compare-and-set runs first so concurrent decisions serialize on
        // the claim row; the loser matches zero rows instead of appending a
        // second ledger entry.
        let updated = sqlx::query("UPDATE claim SET status = ? WHERE id = ? AND status = ?")
            .bind(transition.to.as_str())
            .bind(claim_id.0)
            .bind(transition.from.as_str())
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self
                .claims()
                .find_by_id(claim_id)
                .await?
                .ok_or(WorkflowError::ClaimNotFound(claim_id.0))?;
            return Err(IllegalTransition::Decision {
                role: command.role,
                status: current.status,
            }
            .into());
        }

        let inserted = sqlx::query(
            "INSERT INTO claim_approval (claim_id, approver_id, role, decision, comments, decided_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(claim_id.0)
        .bind(&command.approver_id)
        .bind(command.role.as_str())
        .bind(decision.as_str())
        .bind(&command.comments)
        .bind(decided_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let entry = ApprovalEntry {
            id: ApprovalId(inserted.last_insert_rowid()),
            claim_id,
            approver_id: command.approver_id,
            role: command.role,
            decision,
            comments: command.comments,
            decided_at,
        };

        Ok(DecisionOutcome { claim: MonthlyClaim { status: transition.to, ..claim }, entry })
    }

    /// Settles a manager-approved claim. Payment is a status change only;
    /// the approval ledger records decisions, not settlement.
    pub async fn mark_paid(&self, claim_id: ClaimId) -> Result<MonthlyClaim, WorkflowError> {
        let claims = self.claims();
        let claim =
            claims.find_by_id(claim_id).await?.ok_or(WorkflowError::ClaimNotFound(claim_id.0))?;

        let next = lifecycle::mark_paid(claim.status.clone())?;

        let moved = claims.update_status_if(claim_id, claim.status.clone(), next.clone()).await?;
        if !moved {
            let current = claims
                .find_by_id(claim_id)
                .await?
                .ok_or(WorkflowError::ClaimNotFound(claim_id.0))?;
            return Err(IllegalTransition::Payment { status: current.status }.into());
        }

        Ok(MonthlyClaim { status: next, ..claim })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use claimflow_core::domain::approval::{ApproverRole, Decision};
    use claimflow_core::domain::claim::{ClaimId, ClaimStatus, ClaimSubmission};
    use claimflow_core::domain::lecturer::{Lecturer, LecturerId};
    use claimflow_core::errors::ValidationError;
    use claimflow_core::lifecycle::IllegalTransition;

    use super::{ClaimWorkflow, DecisionCommand, WorkflowError};
    use crate::migrations;
    use crate::repositories::{
        ApprovalLedger, ClaimRepository, LecturerRepository, SqlApprovalRepository,
        SqlLecturerRepository,
    };
    use crate::{connect_with_settings, DbPool};

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }

    async fn register_lecturer(pool: &DbPool, id: &str, display_name: &str) -> LecturerId {
        let lecturer_id = LecturerId(id.to_string());
        SqlLecturerRepository::new(pool.clone())
            .save(Lecturer { id: lecturer_id.clone(), display_name: display_name.to_string() })
            .await
            .expect("register lecturer");
        lecturer_id
    }

    fn submission() -> ClaimSubmission {
        ClaimSubmission {
            module_name: "PROG6212".to_string(),
            hours_worked: Decimal::new(125, 1),
            hourly_rate: Decimal::new(35000, 2),
            document: None,
        }
    }

    fn approve(role: ApproverRole, approver_id: &str) -> DecisionCommand {
        DecisionCommand {
            approver_id: approver_id.to_string(),
            role,
            approved: true,
            comments: String::new(),
        }
    }

    fn reject(role: ApproverRole, approver_id: &str, comments: &str) -> DecisionCommand {
        DecisionCommand {
            approver_id: approver_id.to_string(),
            role,
            approved: false,
            comments: comments.to_string(),
        }
    }

    #[tokio::test]
    async fn submit_assigns_pending_status_and_derived_total() {
        let pool = setup_pool().await;
        let lecturer_id = register_lecturer(&pool, "lect-john-doe", "John Doe").await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let claim = workflow.submit(&lecturer_id, submission()).await.expect("submit");

        assert_eq!(claim.status, ClaimStatus::Pending);
        assert_eq!(claim.total_amount, Decimal::new(437500, 2));
        assert!(claim.id.0 > 0);

        let stored = workflow
            .claims()
            .find_by_id(claim.id)
            .await
            .expect("find")
            .expect("stored claim exists");
        assert_eq!(stored, claim);

        pool.close().await;
    }

    #[tokio::test]
    async fn submit_rejects_invalid_hours_without_writing() {
        let pool = setup_pool().await;
        let lecturer_id = register_lecturer(&pool, "lect-john-doe", "John Doe").await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let over = ClaimSubmission { hours_worked: Decimal::from(201), ..submission() };
        let error = workflow.submit(&lecturer_id, over).await.expect_err("over the hours cap");

        assert!(matches!(
            error,
            WorkflowError::Validation(ValidationError::HoursOutOfRange { .. })
        ));
        assert_eq!(workflow.claims().count().await.expect("count"), 0);

        pool.close().await;
    }

    #[tokio::test]
    async fn submit_requires_a_registered_lecturer() {
        let pool = setup_pool().await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let error = workflow
            .submit(&LecturerId("lect-ghost".to_string()), submission())
            .await
            .expect_err("unregistered lecturer");

        assert!(matches!(error, WorkflowError::UnknownLecturer(ref id) if id == "lect-ghost"));

        pool.close().await;
    }

    #[tokio::test]
    async fn full_approval_chain_reaches_paid() {
        let pool = setup_pool().await;
        let lecturer_id = register_lecturer(&pool, "lect-john-doe", "John Doe").await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let claim = workflow.submit(&lecturer_id, submission()).await.expect("submit");

        let vetted = workflow
            .decide(claim.id, approve(ApproverRole::Coordinator, "coord-jane-smith"))
            .await
            .expect("coordinator approval");
        assert_eq!(vetted.claim.status, ClaimStatus::ApprovedByCoordinator);
        assert_eq!(vetted.entry.decision, Decision::Approved);

        let cleared = workflow
            .decide(claim.id, approve(ApproverRole::Manager, "mgr-mike-johnson"))
            .await
            .expect("manager approval");
        assert_eq!(cleared.claim.status, ClaimStatus::ApprovedByManager);

        let paid = workflow.mark_paid(claim.id).await.expect("mark paid");
        assert_eq!(paid.status, ClaimStatus::Paid);

        let entries = SqlApprovalRepository::new(pool.clone())
            .list_for_claim(claim.id)
            .await
            .expect("list ledger");
        assert_eq!(entries.len(), 2, "settlement must not append a ledger entry");
        assert_eq!(entries[0].role, ApproverRole::Coordinator);
        assert_eq!(entries[1].role, ApproverRole::Manager);

        pool.close().await;
    }

    #[tokio::test]
    async fn rejection_is_terminal_for_later_deciders() {
        let pool = setup_pool().await;
        let lecturer_id = register_lecturer(&pool, "lect-john-doe", "John Doe").await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let claim = workflow.submit(&lecturer_id, submission()).await.expect("submit");
        let rejected = workflow
            .decide(
                claim.id,
                reject(ApproverRole::Coordinator, "coord-jane-smith", "Hours exceed the register"),
            )
            .await
            .expect("coordinator rejection");
        assert_eq!(rejected.claim.status, ClaimStatus::RejectedByCoordinator);
        assert_eq!(rejected.entry.comments, "Hours exceed the register");

        let error = workflow
            .decide(claim.id, approve(ApproverRole::Manager, "mgr-mike-johnson"))
            .await
            .expect_err("rejected claims take no further decisions");
        assert!(matches!(
            error,
            WorkflowError::Transition(IllegalTransition::Decision {
                status: ClaimStatus::RejectedByCoordinator,
                ..
            })
        ));

        pool.close().await;
    }

    #[tokio::test]
    async fn manager_cannot_decide_an_unvetted_claim() {
        let pool = setup_pool().await;
        let lecturer_id = register_lecturer(&pool, "lect-john-doe", "John Doe").await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let claim = workflow.submit(&lecturer_id, submission()).await.expect("submit");
        let error = workflow
            .decide(claim.id, approve(ApproverRole::Manager, "mgr-mike-johnson"))
            .await
            .expect_err("manager must wait for the coordinator");

        assert!(matches!(
            error,
            WorkflowError::Transition(IllegalTransition::Decision {
                role: ApproverRole::Manager,
                status: ClaimStatus::Pending,
            })
        ));

        let stored = workflow.claims().find_by_id(claim.id).await.expect("find").expect("exists");
        assert_eq!(stored.status, ClaimStatus::Pending);

        pool.close().await;
    }

    #[tokio::test]
    async fn deciding_a_missing_claim_reports_not_found() {
        let pool = setup_pool().await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let error = workflow
            .decide(ClaimId(404), approve(ApproverRole::Coordinator, "coord-jane-smith"))
            .await
            .expect_err("no such claim");
        assert!(matches!(error, WorkflowError::ClaimNotFound(404)));

        pool.close().await;
    }

    #[tokio::test]
    async fn concurrent_coordinator_decisions_record_exactly_one_entry() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("claims.db").display());
        let pool = connect_with_settings(&url, 4, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("run migrations");

        let lecturer_id = register_lecturer(&pool, "lect-john-doe", "John Doe").await;
        let workflow = ClaimWorkflow::new(pool.clone());
        let claim = workflow.submit(&lecturer_id, submission()).await.expect("submit");

        let (first, second) = tokio::join!(
            workflow.decide(claim.id, approve(ApproverRole::Coordinator, "coord-jane-smith")),
            workflow.decide(claim.id, reject(ApproverRole::Coordinator, "coord-rival", "no")),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);

        let loser = outcomes
            .iter()
            .find_map(|outcome| outcome.as_ref().err())
            .expect("one decision lost the race");
        assert!(matches!(
            loser,
            WorkflowError::Transition(IllegalTransition::Decision { .. })
        ));

        let entries = SqlApprovalRepository::new(pool.clone())
            .list_for_claim(claim.id)
            .await
            .expect("list ledger");
        assert_eq!(entries.len(), 1);

        let stored = workflow.claims().find_by_id(claim.id).await.expect("find").expect("exists");
        let expected = match entries[0].decision {
            Decision::Approved => ClaimStatus::ApprovedByCoordinator,
            Decision::Rejected => ClaimStatus::RejectedByCoordinator,
        };
        assert_eq!(stored.status, expected, "final status must match the winning decision");

        pool.close().await;
    }

    #[tokio::test]
    async fn mark_paid_requires_manager_approval_first() {
        let pool = setup_pool().await;
        let lecturer_id = register_lecturer(&pool, "lect-john-doe", "John Doe").await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let claim = workflow.submit(&lecturer_id, submission()).await.expect("submit");
        let error = workflow.mark_paid(claim.id).await.expect_err("pending claims cannot be paid");

        assert!(matches!(
            error,
            WorkflowError::Transition(IllegalTransition::Payment { status: ClaimStatus::Pending })
        ));

        pool.close().await;
    }

    #[tokio::test]
    async fn mark_paid_is_not_repeatable() {
        let pool = setup_pool().await;
        let lecturer_id = register_lecturer(&pool, "lect-john-doe", "John Doe").await;
        let workflow = ClaimWorkflow::new(pool.clone());

        let claim = workflow.submit(&lecturer_id, submission()).await.expect("submit");
        workflow
            .decide(claim.id, approve(ApproverRole::Coordinator, "coord-jane-smith"))
            .await
            .expect("coordinator approval");
        workflow
            .decide(claim.id, approve(ApproverRole::Manager, "mgr-mike-johnson"))
            .await
            .expect("manager approval");

        workflow.mark_paid(claim.id).await.expect("first settlement");
        let error = workflow.mark_paid(claim.id).await.expect_err("already settled");

        assert!(matches!(
            error,
            WorkflowError::Transition(IllegalTransition::Payment { status: ClaimStatus::Paid })
        ));

        pool.close().await;
    }
}
