pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod views;
pub mod workflow;

pub use connection::{connect, connect_from_config, connect_with_settings, DbPool};
pub use fixtures::{SeedDataset, SeedResult, VerificationResult};
pub use views::{PaymentQueueEntry, RoleScopedViews};
pub use workflow::{ClaimWorkflow, DecisionCommand, DecisionOutcome, WorkflowError};
