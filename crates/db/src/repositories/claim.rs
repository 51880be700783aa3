use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqliteRow, Row};

use claimflow_core::documents::DocumentRef;
use claimflow_core::domain::claim::{ClaimId, ClaimStatus, MonthlyClaim};
use claimflow_core::domain::lecturer::LecturerId;

use super::{ClaimRepository, RepositoryError};
use crate::DbPool;

/// Field set for a claim that has not been assigned an id yet. The id comes
/// back from the database on insert.
#[derive(Clone, Debug)]
pub struct NewClaim {
    pub lecturer_id: LecturerId,
    pub module_name: String,
    pub hours_worked: Decimal,
    pub hourly_rate: Decimal,
    pub total_amount: Decimal,
    pub document: Option<DocumentRef>,
    pub status: ClaimStatus,
    pub submitted_at: DateTime<Utc>,
}

pub struct SqlClaimRepository {
    pool: DbPool,
}

impl SqlClaimRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ClaimRepository for SqlClaimRepository {
    async fn find_by_id(&self, id: ClaimId) -> Result<Option<MonthlyClaim>, RepositoryError> {
        let row = sqlx::query(
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
             WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(claim_from_row).transpose()
    }

    async fn insert(&self, claim: NewClaim) -> Result<ClaimId, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO claim (
                lecturer_id,
                module_name,
                hours_worked,
                hourly_rate,
                total_amount,
                document_ref,
                status,
                submitted_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&claim.lecturer_id.0)
        .bind(&claim.module_name)
        .bind(claim.hours_worked.to_string())
        .bind(claim.hourly_rate.to_string())
        .bind(claim.total_amount.to_string())
        .bind(claim.document.as_ref().map(|document| document.0.as_str()).unwrap_or(""))
        .bind(claim.status.as_str())
        .bind(claim.submitted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(ClaimId(result.last_insert_rowid()))
    }

    async fn update_status_if(
        &self,
        id: ClaimId,
        expected: ClaimStatus,
        next: ClaimStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE claim SET status = ? WHERE id = ? AND status = ?")
            .bind(next.as_str())
            .bind(id.0)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_lecturer(
        &self,
        lecturer_id: &LecturerId,
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
             ORDER BY submitted_at DESC, id DESC",
        )
        .bind(&lecturer_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(claim_from_row).collect()
    }

    async fn list_by_status(
        &self,
        status: ClaimStatus,
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
             WHERE status = ?
             ORDER BY submitted_at ASC, id ASC",
        )
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(claim_from_row).collect()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM claim").fetch_one(&self.pool).await?;
        Ok(count)
    }
}

pub(crate) fn claim_from_row(row: SqliteRow) -> Result<MonthlyClaim, RepositoryError> {
    let status_raw = row.try_get::<String, _>("status")?;
    let status = ClaimStatus::parse(&status_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown claim status `{status_raw}`")))?;

    let document_ref = row.try_get::<String, _>("document_ref")?;
    let document = if document_ref.is_empty() { None } else { Some(DocumentRef(document_ref)) };

    Ok(MonthlyClaim {
        id: ClaimId(row.try_get("id")?),
        lecturer_id: LecturerId(row.try_get("lecturer_id")?),
        module_name: row.try_get("module_name")?,
        hours_worked: parse_decimal("hours_worked", row.try_get("hours_worked")?)?,
        hourly_rate: parse_decimal("hourly_rate", row.try_get("hourly_rate")?)?,
        total_amount: parse_decimal("total_amount", row.try_get("total_amount")?)?,
        document,
        status,
        submitted_at: parse_timestamp("submitted_at", row.try_get("submitted_at")?)?,
    })
}

pub(crate) fn parse_decimal(column: &str, value: String) -> Result<Decimal, RepositoryError> {
    value.parse::<Decimal>().map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}
