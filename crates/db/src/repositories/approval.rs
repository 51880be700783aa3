use chrono::{DateTime, Utc};
use sqlx::error::ErrorKind;
use sqlx::{sqlite::SqliteRow, Row};

use claimflow_core::domain::approval::{ApprovalEntry, ApprovalId, ApproverRole, Decision};
use claimflow_core::domain::claim::ClaimId;

use super::claim::parse_timestamp;
use super::{ApprovalLedger, RepositoryError};
use crate::DbPool;

/// Field set for a ledger entry that has not been assigned an id yet.
#[derive(Clone, Debug)]
pub struct NewApprovalEntry {
    pub claim_id: ClaimId,
    pub approver_id: String,
    pub role: ApproverRole,
    pub decision: Decision,
    pub comments: String,
    pub decided_at: DateTime<Utc>,
}

pub struct SqlApprovalRepository {
    pool: DbPool,
}

impl SqlApprovalRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ApprovalLedger for SqlApprovalRepository {
    async fn append(&self, entry: NewApprovalEntry) -> Result<ApprovalId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO claim_approval (claim_id, approver_id, role, decision, comments, decided_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.claim_id.0)
        .bind(&entry.approver_id)
        .bind(entry.role.as_str())
        .bind(entry.decision.as_str())
        .bind(&entry.comments)
        .bind(entry.decided_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(ApprovalId(done.last_insert_rowid())),
            Err(sqlx::Error::Database(db_error))
                if db_error.kind() == ErrorKind::ForeignKeyViolation =>
            {
                Err(RepositoryError::MissingClaim(entry.claim_id.0))
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn list_for_claim(
        &self,
        claim_id: ClaimId,
    ) -> Result<Vec<ApprovalEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, claim_id, approver_id, role, decision, comments, decided_at
             FROM claim_approval
             WHERE claim_id = ?
             ORDER BY decided_at ASC, id ASC",
        )
        .bind(claim_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(entry_from_row).collect()
    }
}

pub(crate) fn entry_from_row(row: SqliteRow) -> Result<ApprovalEntry, RepositoryError> {
    let role_raw = row.try_get::<String, _>("role")?;
    let role = ApproverRole::parse(&role_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown approver role `{role_raw}`")))?;

    let decision_raw = row.try_get::<String, _>("decision")?;
    let decision = Decision::parse(&decision_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown decision `{decision_raw}`")))?;

    Ok(ApprovalEntry {
        id: ApprovalId(row.try_get("id")?),
        claim_id: ClaimId(row.try_get("claim_id")?),
        approver_id: row.try_get("approver_id")?,
        role,
        decision,
        comments: row.try_get("comments")?,
        decided_at: parse_timestamp("decided_at", row.try_get("decided_at")?)?,
    })
}
