use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// External lookup returning base-currency rates for the requested currencies on one date.
///
/// Rates are expressed as units of currency per one base unit, so `base = amount / rate`.
/// Currencies the source does not know are simply missing from the returned map.
pub trait RateProvider: Send + Sync {
    fn fetch_rates(
        &self,
        date: NaiveDate,
        currencies: &BTreeSet<String>,
    ) -> impl Future<Output = Result<BTreeMap<String, Decimal>, RateLookupError>> + Send;
}

/// Failure of a single date lookup. Never fatal to a batch.
#[derive(Debug, thiserror::Error)]
pub enum RateLookupError {
    #[error("rate service unreachable: {0}")]
    Transport(String),
    #[error("rate service returned HTTP {0}")]
    Status(u16),
    #[error("rate service payload could not be parsed: {0}")]
    Parse(String),
    #[error("rate lookup timed out after {0:?}")]
    Timeout(Duration),
    #[error("rate lookup task failed: {0}")]
    Task(String),
}
