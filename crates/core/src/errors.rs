use rust_decimal::Decimal;
use thiserror::Error;

/// Field-level rejection of a claim submission or document upload.
///
/// Validation failures are recoverable by the caller fixing the input; they
/// never indicate a storage or lifecycle problem and never leave partial
/// state behind.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("module name is required")]
    MissingModuleName,
    #[error("hours worked must be between 1 and 200, got {hours}")]
    HoursOutOfRange { hours: Decimal },
    #[error("hourly rate must be greater than zero, got {rate}")]
    NonPositiveRate { rate: Decimal },
    #[error("document reference must not be empty when supplied")]
    EmptyDocumentReference,
    #[error("uploaded file `{file_name}` is empty")]
    EmptyDocument { file_name: String },
    #[error("file `{file_name}` is {size_bytes} bytes, above the {max_bytes} byte limit")]
    FileTooLarge { file_name: String, size_bytes: u64, max_bytes: u64 },
    #[error("file `{file_name}` has unsupported extension `{extension}` (expected pdf|docx|jpg|jpeg|png)")]
    UnsupportedType { file_name: String, extension: String },
}
