use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::documents::DocumentRef;
use crate::domain::lecturer::LecturerId;
use crate::errors::ValidationError;

/// Inclusive bounds on the hours claimable in a single monthly claim.
pub const HOURS_MIN: u32 = 1;
pub const HOURS_MAX: u32 = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClaimId(pub i64);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    ApprovedByCoordinator,
    RejectedByCoordinator,
    ApprovedByManager,
    RejectedByManager,
    Paid,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ApprovedByCoordinator => "approved_by_coordinator",
            Self::RejectedByCoordinator => "rejected_by_coordinator",
            Self::ApprovedByManager => "approved_by_manager",
            Self::RejectedByManager => "rejected_by_manager",
            Self::Paid => "paid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved_by_coordinator" => Some(Self::ApprovedByCoordinator),
            "rejected_by_coordinator" => Some(Self::RejectedByCoordinator),
            "approved_by_manager" => Some(Self::ApprovedByManager),
            "rejected_by_manager" => Some(Self::RejectedByManager),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Terminal statuses accept no further decision or payment.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::RejectedByCoordinator | Self::RejectedByManager | Self::Paid)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClaim {
    pub id: ClaimId,
    pub lecturer_id: LecturerId,
    pub module_name: String,
    pub hours_worked: Decimal,
    pub hourly_rate: Decimal,
    pub total_amount: Decimal,
    pub document: Option<DocumentRef>,
    pub status: ClaimStatus,
    pub submitted_at: DateTime<Utc>,
}

/// The fields a lecturer supplies when submitting a claim. Identity, status,
/// total and timestamp are assigned at creation, never taken from the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimSubmission {
    pub module_name: String,
    pub hours_worked: Decimal,
    pub hourly_rate: Decimal,
    pub document: Option<DocumentRef>,
}

impl ClaimSubmission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.module_name.trim().is_empty() {
            return Err(ValidationError::MissingModuleName);
        }

        if self.hours_worked < Decimal::from(HOURS_MIN)
            || self.hours_worked > Decimal::from(HOURS_MAX)
        {
            return Err(ValidationError::HoursOutOfRange { hours: self.hours_worked });
        }

        if self.hourly_rate <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveRate { rate: self.hourly_rate });
        }

        if let Some(document) = &self.document {
            if document.0.trim().is_empty() {
                return Err(ValidationError::EmptyDocumentReference);
            }
        }

        Ok(())
    }

    /// Total is always derived from hours and rate; it is never accepted from
    /// the caller and never mutated after creation.
    pub fn total_amount(&self) -> Decimal {
        self.hours_worked * self.hourly_rate
    }
}
