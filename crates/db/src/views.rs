//! Read-side projections of the claim table, one per role in the approval
//! chain. The workflow owns every write; these only select. Each queue names
//! the status it surfaces, so a new status value starts its life here.

use sqlx::Row;

use claimflow_core::domain::claim::{ClaimStatus, MonthlyClaim};
use claimflow_core::domain::lecturer::LecturerId;

use crate::repositories::claim::claim_from_row;
use crate::repositories::{ClaimRepository, RepositoryError, SqlClaimRepository};
use crate::DbPool;

/// One row of the payment desk's work list: the claim plus who to pay.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentQueueEntry {
    pub claim: MonthlyClaim,
    pub lecturer_display_name: String,
}

#[derive(Clone)]
pub struct RoleScopedViews {
    pool: DbPool,
}

impl RoleScopedViews {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn claims(&self) -> SqlClaimRepository {
        SqlClaimRepository::new(self.pool.clone())
    }

    /// Claims awaiting the coordinator's verdict, oldest submission first.
    pub async fn pending_for_coordinator(&self) -> Result<Vec<MonthlyClaim>, RepositoryError> {
        self.claims().list_by_status(ClaimStatus::Pending).await
    }

    /// Claims the coordinator has vetted, awaiting the manager, oldest first.
    pub async fn pending_for_manager(&self) -> Result<Vec<MonthlyClaim>, RepositoryError> {
        self.claims().list_by_status(ClaimStatus::ApprovedByCoordinator).await
    }

    /// Fully approved claims ready for settlement, joined with the owning
    /// lecturer's display name.
    pub async fn approved_for_hr(&self) -> Result<Vec<PaymentQueueEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                c.id,
                c.lecturer_id,
                c.module_name,
                c.hours_worked,
                c.hourly_rate,
                c.total_amount,
                c.document_ref,
                c.status,
                c.submitted_at,
                l.display_name AS lecturer_display_name
             FROM claim c
             JOIN lecturer l ON l.id = c.lecturer_id
             WHERE c.status = ?
             ORDER BY c.submitted_at ASC, c.id ASC",
        )
        .bind(ClaimStatus::ApprovedByManager.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let lecturer_display_name = row.try_get("lecturer_display_name")?;
                Ok(PaymentQueueEntry { claim: claim_from_row(row)?, lecturer_display_name })
            })
            .collect()
    }

    /// Every claim the lecturer has submitted, newest first.
    pub async fn status_for_lecturer(
        &self,
        lecturer_id: &LecturerId,
    ) -> Result<Vec<MonthlyClaim>, RepositoryError> {
        self.claims().list_by_lecturer(lecturer_id).await
    }

    /// Newest-first slice for the lecturer's dashboard.
    pub async fn recent_for_lecturer(
        &self,
        lecturer_id: &LecturerId,
        limit: i64,
    ) -> Result<Vec<MonthlyClaim>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                id,
                lecturer_id,
                module_name,
                hours_worked,
                hourly_rate,
                total_amount,
                document_ref,
                status,
                submitted_at
             FROM claim
             WHERE lecturer_id = ?
             ORDER BY submitted_at DESC, id DESC
             LIMIT ?",
        )
        .bind(&lecturer_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(claim_from_row).collect()
    }
}
