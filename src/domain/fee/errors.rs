//! Fee-specific error types.
//!
//! # Severity
//!
//! | Error | Scope |
//! |-------|-------|
//! | PaidReceipt | operation rejected, nothing written |
//! | FeeNotFound | operation rejected |
//! | MemberNotFound / CategoryNotFound | fatal for one member |
//! | ItemTypeNotFound | fatal for one member |
//! | InvalidState | operation rejected |
//! | InvalidPeriod / ValidationFailed | operation rejected |
//! | Infrastructure | fatal for the unit of work |

use crate::domain::foundation::{CategoryId, DomainError, ErrorCode, FeeId, MemberId};

/// Fee-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    /// One or more fees belong to paid receipts and may not be modified.
    PaidReceipt { fee_ids: Vec<FeeId> },

    /// Year or month outside the accepted range.
    InvalidPeriod(String),

    /// Fee was not found.
    FeeNotFound(FeeId),

    /// Member was not found in the member catalog.
    MemberNotFound(MemberId),

    /// Category was not found in the member catalog.
    CategoryNotFound(CategoryId),

    /// A required item type code is missing from the catalog.
    ItemTypeNotFound(String),

    /// Invalid state for the requested operation.
    InvalidState {
        current: String,
        attempted: String,
    },

    /// Validation failed.
    ValidationFailed {
        field: String,
        message: String,
    },

    /// Infrastructure error.
    Infrastructure(String),
}

impl FeeError {
    pub fn paid_receipt(fee_ids: Vec<FeeId>) -> Self {
        FeeError::PaidReceipt { fee_ids }
    }

    pub fn invalid_period(reason: impl Into<String>) -> Self {
        FeeError::InvalidPeriod(reason.into())
    }

    pub fn fee_not_found(id: FeeId) -> Self {
        FeeError::FeeNotFound(id)
    }

    pub fn member_not_found(id: MemberId) -> Self {
        FeeError::MemberNotFound(id)
    }

    pub fn category_not_found(id: CategoryId) -> Self {
        FeeError::CategoryNotFound(id)
    }

    pub fn item_type_not_found(code: impl Into<String>) -> Self {
        FeeError::ItemTypeNotFound(code.into())
    }

    pub fn invalid_state(current: impl Into<String>, attempted: impl Into<String>) -> Self {
        FeeError::InvalidState {
            current: current.into(),
            attempted: attempted.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        FeeError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        FeeError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            FeeError::PaidReceipt { .. } => ErrorCode::ReceiptPaid,
            FeeError::InvalidPeriod(_) => ErrorCode::OutOfRange,
            FeeError::FeeNotFound(_) => ErrorCode::FeeNotFound,
            FeeError::MemberNotFound(_) => ErrorCode::MemberNotFound,
            FeeError::CategoryNotFound(_) => ErrorCode::CategoryNotFound,
            FeeError::ItemTypeNotFound(_) => ErrorCode::ItemTypeNotFound,
            FeeError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            FeeError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            FeeError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns a user-friendly error message.
    pub fn message(&self) -> String {
        match self {
            FeeError::PaidReceipt { fee_ids } => {
                let ids: Vec<String> = fee_ids.iter().map(|id| id.to_string()).collect();
                format!(
                    "{} fee(s) belong to paid receipts and cannot be modified: {}",
                    fee_ids.len(),
                    ids.join(", ")
                )
            }
            FeeError::InvalidPeriod(reason) => format!("Invalid billing period: {}", reason),
            FeeError::FeeNotFound(id) => format!("Fee not found: {}", id),
            FeeError::MemberNotFound(id) => format!("Member not found: {}", id),
            FeeError::CategoryNotFound(id) => format!("Category not found: {}", id),
            FeeError::ItemTypeNotFound(code) => {
                format!("Item type '{}' is missing from the catalog", code)
            }
            FeeError::InvalidState { current, attempted } => {
                format!("Cannot {} fee in {} state", attempted, current)
            }
            FeeError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            FeeError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if this error should trigger a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeeError::Infrastructure(_))
    }
}

impl std::fmt::Display for FeeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for FeeError {}

impl From<DomainError> for FeeError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => FeeError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::InvalidStateTransition => FeeError::InvalidState {
                current: "unknown".to_string(),
                attempted: err.message,
            },
            ErrorCode::ItemTypeNotFound => FeeError::ItemTypeNotFound(
                err.details.get("code").cloned().unwrap_or(err.message),
            ),
            _ => FeeError::Infrastructure(err.to_string()),
        }
    }
}

impl From<FeeError> for DomainError {
    fn from(err: FeeError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}
