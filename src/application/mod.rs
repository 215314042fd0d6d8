//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).
//! Every handler drives the same [`FeePipeline`], so generation, recalculation,
//! preview and comparison agree on what a fee should be.

mod fee_pipeline;
pub mod handlers;

pub use fee_pipeline::{
    CalculationContext, CalculationLayers, FeeCalculation, FeePipeline,
    DEFAULT_BASE_AMOUNT_KEY_PREFIX,
};

pub use handlers::{
    CompareFeeHandler, CompareFeeQuery, CompareFeeResult, DiscountSummary, FeePreview,
    GenerateFeesCommand, GenerateFeesHandler, GenerateFeesResult, PreviewRecalculationHandler,
    PreviewRecalculationQuery, PreviewRecalculationResult, PreviewSummary, PreviewTarget,
    RecalculateFeeCommand, RecalculateFeeHandler, RecalculateFeeResult, RegenerateFeesCommand,
    RegenerateFeesHandler, RegenerateFeesResult,
};
