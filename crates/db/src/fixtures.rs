use serde::Serialize;
use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

/// Canonical seed rows and their verification contract: one claim per
/// lifecycle status, so every queue and the ledger render non-empty.
const SEED_CLAIMS: &[SeedClaimContract] = &[
    SeedClaimContract {
        claim_id: 9001,
        lecturer_id: "lect-john-doe",
        module_name: "PROG6212",
        status: "pending",
        hours_worked: "12",
        hourly_rate: "350",
        total_amount: "4200",
        has_document: false,
        approval_count: 0,
        final_decision: None,
        description: "Fresh submission awaiting the coordinator",
    },
    SeedClaimContract {
        claim_id: 9002,
        lecturer_id: "lect-john-doe",
        module_name: "CLDV6212",
        status: "approved_by_coordinator",
        hours_worked: "8.5",
        hourly_rate: "400",
        total_amount: "3400",
        has_document: true,
        approval_count: 1,
        final_decision: Some("approved"),
        description: "Coordinator-vetted claim with a supporting timesheet",
    },
    SeedClaimContract {
        claim_id: 9003,
        lecturer_id: "lect-thandi-mokoena",
        module_name: "PROG7311",
        status: "approved_by_manager",
        hours_worked: "20",
        hourly_rate: "375.50",
        total_amount: "7510.00",
        has_document: false,
        approval_count: 2,
        final_decision: Some("approved"),
        description: "Fully approved claim sitting in the payment queue",
    },
    SeedClaimContract {
        claim_id: 9004,
        lecturer_id: "lect-thandi-mokoena",
        module_name: "INSY7315",
        status: "paid",
        hours_worked: "30",
        hourly_rate: "320",
        total_amount: "9600",
        has_document: false,
        approval_count: 2,
        final_decision: Some("approved"),
        description: "Settled claim from the previous payment run",
    },
    SeedClaimContract {
        claim_id: 9005,
        lecturer_id: "lect-john-doe",
        module_name: "PROG6212",
        status: "rejected_by_coordinator",
        hours_worked: "45",
        hourly_rate: "350",
        total_amount: "15750",
        has_document: false,
        approval_count: 1,
        final_decision: Some("rejected"),
        description: "Rejected at the first stage over the hours claimed",
    },
    SeedClaimContract {
        claim_id: 9006,
        lecturer_id: "lect-thandi-mokoena",
        module_name: "CLDV6212",
        status: "rejected_by_manager",
        hours_worked: "15",
        hourly_rate: "300",
        total_amount: "4500",
        has_document: false,
        approval_count: 2,
        final_decision: Some("rejected"),
        description: "Vetted by the coordinator, then rejected by the manager",
    },
];

const SEED_LECTURER_IDS: &[&str] = &["lect-john-doe", "lect-thandi-mokoena"];

const SEED_CLAIM_IDS: &[i64] = &[9001, 9002, 9003, 9004, 9005, 9006];

const SEED_APPROVAL_IDS: &[i64] = &[8101, 8102, 8103, 8104, 8105, 8106, 8107, 8108];

/// Deterministic seed dataset for demos and end-to-end checks.
///
/// Two lecturers, six claims (one per status) and the matching approval
/// ledger rows. Loading is idempotent: every row carries a fixed id.
pub struct SeedDataset;

impl SeedDataset {
    /// SQL fixture content for the seed dataset.
    pub const SQL: &str = include_str!("../../../config/fixtures/seed_claims.sql");

    /// Load the seed dataset into the database.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let claims_seeded = SEED_CLAIMS
            .iter()
            .map(|claim| ClaimSeedInfo {
                claim_id: claim.claim_id,
                status: claim.status,
                description: claim.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult { claims_seeded })
    }

    /// Verify that the seed rows exist and match the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_lecturers = sql_array_from_strings(SEED_LECTURER_IDS);
        let lecturer_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM lecturer WHERE id IN {quoted_lecturers}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("lecturers".to_string(), lecturer_count == SEED_LECTURER_IDS.len() as i64));

        let quoted_approvals = sql_array_from_numbers(SEED_APPROVAL_IDS);
        let approval_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM claim_approval WHERE id IN {quoted_approvals}"
        ))
        .fetch_one(pool)
        .await?;
        checks
            .push(("approval-ledger".to_string(), approval_count == SEED_APPROVAL_IDS.len() as i64));

        for claim in SEED_CLAIMS {
            let row_matches: i64 = sqlx::query_scalar(
                "SELECT EXISTS(
                    SELECT 1 FROM claim
                    WHERE id = ?1 AND lecturer_id = ?2 AND module_name = ?3 AND status = ?4
                      AND hours_worked = ?5 AND hourly_rate = ?6 AND total_amount = ?7
                )",
            )
            .bind(claim.claim_id)
            .bind(claim.lecturer_id)
            .bind(claim.module_name)
            .bind(claim.status)
            .bind(claim.hours_worked)
            .bind(claim.hourly_rate)
            .bind(claim.total_amount)
            .fetch_one(pool)
            .await?;
            checks.push((format!("claim-{}-row", claim.claim_id), row_matches == 1));

            let document_ref: String =
                sqlx::query_scalar("SELECT document_ref FROM claim WHERE id = ?1")
                    .bind(claim.claim_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((
                format!("claim-{}-document", claim.claim_id),
                !document_ref.is_empty() == claim.has_document,
            ));

            let ledger_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM claim_approval WHERE claim_id = ?1")
                    .bind(claim.claim_id)
                    .fetch_one(pool)
                    .await?;
            checks
                .push((format!("claim-{}-ledger", claim.claim_id), ledger_count == claim.approval_count));

            if let Some(final_decision) = claim.final_decision {
                let last_decision: Option<String> = sqlx::query_scalar(
                    "SELECT decision FROM claim_approval
                     WHERE claim_id = ?1
                     ORDER BY decided_at DESC, id DESC
                     LIMIT 1",
                )
                .bind(claim.claim_id)
                .fetch_optional(pool)
                .await?;
                checks.push((
                    format!("claim-{}-final-decision", claim.claim_id),
                    last_decision.as_deref() == Some(final_decision),
                ));
            }
        }

        let all_present = checks.iter().all(|(_, present)| *present);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seed rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;

        let quoted_approvals = sql_array_from_numbers(SEED_APPROVAL_IDS);
        let quoted_claims = sql_array_from_numbers(SEED_CLAIM_IDS);
        let quoted_lecturers = sql_array_from_strings(SEED_LECTURER_IDS);

        sqlx::query(&format!("DELETE FROM claim_approval WHERE id IN {quoted_approvals}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM claim WHERE id IN {quoted_claims}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM lecturer WHERE id IN {quoted_lecturers}"))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct SeedClaimContract {
    claim_id: i64,
    lecturer_id: &'static str,
    module_name: &'static str,
    status: &'static str,
    hours_worked: &'static str,
    hourly_rate: &'static str,
    total_amount: &'static str,
    has_document: bool,
    approval_count: i64,
    final_decision: Option<&'static str>,
    description: &'static str,
}

fn sql_array_from_strings(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}

fn sql_array_from_numbers(ids: &[i64]) -> String {
    let joined = ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
    format!("({joined})")
}

#[derive(Debug, Serialize)]
pub struct SeedResult {
    pub claims_seeded: Vec<ClaimSeedInfo>,
}

#[derive(Debug, Serialize)]
pub struct ClaimSeedInfo {
    pub claim_id: i64,
    pub status: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(String, bool)>,
}
