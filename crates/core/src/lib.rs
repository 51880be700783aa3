pub mod config;
pub mod documents;
pub mod domain;
pub mod errors;
pub mod lifecycle;

pub use documents::{
    DocumentAcceptError, DocumentPolicy, DocumentRef, DocumentResolver, DocumentStore,
    DocumentStoreError, InMemoryDocumentStore, MAX_DOCUMENT_BYTES,
};
pub use domain::approval::{ApprovalEntry, ApprovalId, ApproverRole, Decision};
pub use domain::claim::{
    ClaimId, ClaimStatus, ClaimSubmission, MonthlyClaim, HOURS_MAX, HOURS_MIN,
};
pub use domain::lecturer::{Lecturer, LecturerId};
pub use domain::principal::{Principal, Role};
pub use errors::ValidationError;
pub use lifecycle::{decide, mark_paid, IllegalTransition, Transition};
