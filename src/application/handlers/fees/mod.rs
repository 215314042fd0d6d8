//! Fee handlers - generate, recalculate, regenerate, preview and compare.
//!
//! Mutating handlers run one [`FeeTransaction`] per fee and take a
//! [`CommandMetadata`] that ends up in history rows. Query handlers never
//! open a transaction.

mod compare_fee;
mod generate_fees;
mod preview_recalculation;
mod recalculate_fee;
mod regenerate_fees;

#[cfg(test)]
pub(crate) mod test_support;

pub use compare_fee::{CompareFeeHandler, CompareFeeQuery, CompareFeeResult};
pub use generate_fees::{
    DiscountSummary, GenerateFeesCommand, GenerateFeesHandler, GenerateFeesResult,
};
pub use preview_recalculation::{
    FeePreview, PreviewRecalculationHandler, PreviewRecalculationQuery,
    PreviewRecalculationResult, PreviewSummary, PreviewTarget,
};
pub use recalculate_fee::{RecalculateFeeCommand, RecalculateFeeHandler, RecalculateFeeResult};
pub use regenerate_fees::{RegenerateFeesCommand, RegenerateFeesHandler, RegenerateFeesResult};

use tracing::warn;

use crate::domain::fee::FeeError;
use crate::domain::foundation::BillingPeriod;
use crate::domain::history::HistoryEntry;
use crate::ports::{FeeTransaction, HistoryRecorder};

/// Builds a billing period from command input.
pub(crate) fn billing_period(year: i32, month: u32) -> Result<BillingPeriod, FeeError> {
    BillingPeriod::new(year, month).map_err(|e| FeeError::invalid_period(e.to_string()))
}

/// Appends a history entry; a failure is logged and swallowed.
pub(crate) async fn record_history(tx: &mut dyn FeeTransaction, entry: &HistoryEntry) {
    if let Err(err) = tx.append_history(entry).await {
        warn!(
            fee_id = %entry.fee_id,
            action = entry.action.as_str(),
            correlation_id = %entry.correlation_id,
            error = %err,
            "failed to record fee history"
        );
    }
}

/// Rolls back, logging rollback failures so the original error survives.
pub(crate) async fn discard(tx: Box<dyn FeeTransaction>) {
    if let Err(err) = tx.rollback().await {
        warn!(error = %err, "transaction rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_month_maps_to_invalid_period() {
        let err = billing_period(2024, 13).unwrap_err();
        assert!(matches!(err, FeeError::InvalidPeriod(_)));
    }

    #[test]
    fn valid_period_is_built() {
        let period = billing_period(2024, 2).unwrap();
        assert_eq!(period.month(), 2);
        assert_eq!(period.year(), 2024);
    }
}
