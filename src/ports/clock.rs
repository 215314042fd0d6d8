//! Clock port.
//!
//! Supplies "now" for history timestamps and "today" for the exemption
//! lapse filter, so tests can pin time.

use chrono::NaiveDate;

use crate::domain::foundation::Timestamp;

pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}
