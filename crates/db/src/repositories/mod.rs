use async_trait::async_trait;
use thiserror::Error;

use claimflow_core::domain::approval::{ApprovalEntry, ApprovalId};
use claimflow_core::domain::claim::{ClaimId, ClaimStatus, MonthlyClaim};
use claimflow_core::domain::lecturer::{Lecturer, LecturerId};

pub mod approval;
pub mod claim;
pub mod lecturer;

pub use approval::{NewApprovalEntry, SqlApprovalRepository};
pub use claim::{NewClaim, SqlClaimRepository};
pub use lecturer::SqlLecturerRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("claim {0} was not found")]
    MissingClaim(i64),
}

#[async_trait]
pub trait ClaimRepository: Send + Sync {
    async fn find_by_id(&self, id: ClaimId) -> Result<Option<MonthlyClaim>, RepositoryError>;

    /// Inserts a new claim and returns the database-assigned id.
    async fn insert(&self, claim: NewClaim) -> Result<ClaimId, RepositoryError>;

    /// Compare-and-set status update. Returns `false` when the claim no
    /// longer carries `expected`, in which case nothing was written.
    async fn update_status_if(
        &self,
        id: ClaimId,
        expected: ClaimStatus,
        next: ClaimStatus,
    ) -> Result<bool, RepositoryError>;

    /// Claims belonging to one lecturer, newest submission first.
    async fn list_by_lecturer(
        &self,
        lecturer_id: &LecturerId,
    ) -> Result<Vec<MonthlyClaim>, RepositoryError>;

    /// Claims currently carrying `status`, oldest submission first.
    async fn list_by_status(
        &self,
        status: ClaimStatus,
    ) -> Result<Vec<MonthlyClaim>, RepositoryError>;

    async fn count(&self) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait LecturerRepository: Send + Sync {
    async fn find_by_id(&self, id: &LecturerId) -> Result<Option<Lecturer>, RepositoryError>;
    async fn save(&self, lecturer: Lecturer) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ApprovalLedger: Send + Sync {
    /// Appends one decision and returns the database-assigned id. Fails with
    /// [`RepositoryError::MissingClaim`] when the claim does not exist.
    async fn append(&self, entry: NewApprovalEntry) -> Result<ApprovalId, RepositoryError>;

    /// Ledger entries for one claim, oldest decision first.
    async fn list_for_claim(&self, claim_id: ClaimId)
        -> Result<Vec<ApprovalEntry>, RepositoryError>;
}
