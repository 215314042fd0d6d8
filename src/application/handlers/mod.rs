//! Application handlers.
//!
//! Command and query handlers that orchestrate fee operations.

pub mod fees;

pub use fees::{
    // Commands
    GenerateFeesCommand, GenerateFeesHandler, GenerateFeesResult, DiscountSummary,
    RecalculateFeeCommand, RecalculateFeeHandler, RecalculateFeeResult,
    RegenerateFeesCommand, RegenerateFeesHandler, RegenerateFeesResult,
    // Queries
    PreviewRecalculationHandler, PreviewRecalculationQuery, PreviewRecalculationResult,
    FeePreview, PreviewSummary, PreviewTarget,
    CompareFeeHandler, CompareFeeQuery, CompareFeeResult,
};
