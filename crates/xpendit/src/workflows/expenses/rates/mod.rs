mod oxr;
mod provider;

pub use oxr::OpenExchangeRatesClient;
pub use provider::{RateLookupError, RateProvider};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::domain::Expense;

const DEFAULT_MAX_CONCURRENCY: usize = 4;
const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Currencies that must be converted, grouped by expense date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrencyNeeds {
    by_date: BTreeMap<NaiveDate, BTreeSet<String>>,
}

impl CurrencyNeeds {
    pub fn from_expenses<'a, I>(expenses: I, base_currency: &str) -> Self
    where
        I: IntoIterator<Item = &'a Expense>,
    {
        let mut needs = Self::default();
        for expense in expenses {
            if !expense.currency.is_empty() && expense.currency != base_currency {
                needs.add(expense.date, &expense.currency);
            }
        }
        needs
    }

    pub fn add(&mut self, date: NaiveDate, currency: &str) {
        self.by_date
            .entry(date)
            .or_default()
            .insert(currency.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.values().all(BTreeSet::is_empty)
    }

    /// Dates with at least one currency to resolve.
    pub fn date_count(&self) -> usize {
        self.by_date.values().filter(|set| !set.is_empty()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &BTreeSet<String>)> {
        self.by_date.iter()
    }
}

/// Per-date conversion rates for one batch run. A missing entry means "unavailable".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateTable {
    base_currency: String,
    rates: BTreeMap<NaiveDate, BTreeMap<String, Decimal>>,
}

impl RateTable {
    pub fn new(
        base_currency: impl Into<String>,
        rates: BTreeMap<NaiveDate, BTreeMap<String, Decimal>>,
    ) -> Self {
        Self {
            base_currency: base_currency.into(),
            rates,
        }
    }

    pub fn empty(base_currency: impl Into<String>) -> Self {
        Self::new(base_currency, BTreeMap::new())
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    pub fn rate(&self, date: NaiveDate, currency: &str) -> Option<Decimal> {
        self.rates
            .get(&date)
            .and_then(|rates| rates.get(currency))
            .copied()
    }

    pub fn rates_for(&self, date: NaiveDate) -> Option<&BTreeMap<String, Decimal>> {
        self.rates.get(&date)
    }

    /// Converts `amount` into the base currency. Zero rates count as unavailable.
    pub fn convert(&self, amount: Decimal, currency: &str, date: NaiveDate) -> Option<Decimal> {
        if currency == self.base_currency {
            return Some(amount);
        }

        self.rate(date, currency)
            .filter(|rate| !rate.is_zero())
            .map(|rate| base_amount(amount, rate))
    }
}

/// `amount / rate`, saturating at the representable bounds so an overflowing
/// amount still compares above every limit. `rate` must be non-zero.
pub(crate) fn base_amount(amount: Decimal, rate: Decimal) -> Decimal {
    amount.checked_div(rate).unwrap_or_else(|| {
        if amount.is_sign_negative() != rate.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

/// Rates gathered for a batch along with lookup bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateResolution {
    pub table: RateTable,
    pub request_count: usize,
    pub failed_dates: Vec<NaiveDate>,
}

impl RateResolution {
    /// Resolution used when no lookups could be attempted.
    pub fn unavailable(base_currency: impl Into<String>) -> Self {
        Self {
            table: RateTable::empty(base_currency),
            request_count: 0,
            failed_dates: Vec::new(),
        }
    }
}

/// Issues one lookup per distinct date, bounded by a concurrency cap and a per-lookup timeout.
pub struct RateResolver<P> {
    provider: Arc<P>,
    max_concurrency: usize,
    timeout: Duration,
}

impl<P> RateResolver<P>
where
    P: RateProvider + 'static,
{
    pub fn new(provider: P) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    pub fn from_shared(provider: Arc<P>) -> Self {
        Self {
            provider,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, max_concurrency: usize, timeout: Duration) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self.timeout = timeout;
        self
    }

    pub async fn resolve(&self, needs: &CurrencyNeeds, base_currency: &str) -> RateResolution {
        let requests: Vec<(NaiveDate, BTreeSet<String>)> = needs
            .iter()
            .filter(|(_, currencies)| !currencies.is_empty())
            .map(|(date, currencies)| (*date, currencies.clone()))
            .collect();
        let request_count = requests.len();

        let mut rates: BTreeMap<NaiveDate, BTreeMap<String, Decimal>> = BTreeMap::new();
        let mut failed_dates = Vec::new();
        let mut queue = requests.iter().cloned();
        let mut lookups = JoinSet::new();

        loop {
            while lookups.len() < self.max_concurrency {
                let Some((date, currencies)) = queue.next() else {
                    break;
                };
                let provider = Arc::clone(&self.provider);
                let timeout = self.timeout;
                lookups.spawn(async move {
                    let outcome =
                        match tokio::time::timeout(timeout, provider.fetch_rates(date, &currencies))
                            .await
                        {
                            Ok(result) => result,
                            Err(_) => Err(RateLookupError::Timeout(timeout)),
                        };
                    (date, currencies, outcome)
                });
            }

            let Some(joined) = lookups.join_next().await else {
                break;
            };

            match joined {
                Ok((date, currencies, Ok(found))) => {
                    let resolved: BTreeMap<String, Decimal> = found
                        .into_iter()
                        .filter(|(currency, _)| currencies.contains(currency))
                        .collect();
                    debug!(%date, requested = currencies.len(), resolved = resolved.len(), "exchange rates resolved");
                    rates.insert(date, resolved);
                }
                Ok((date, _, Err(error))) => {
                    warn!(%date, %error, "exchange rate lookup failed; date continues without rates");
                    rates.insert(date, BTreeMap::new());
                    failed_dates.push(date);
                }
                Err(join_error) => {
                    let error = RateLookupError::Task(join_error.to_string());
                    warn!(%error, "exchange rate lookup task aborted");
                }
            }
        }

        for (date, _) in &requests {
            if !rates.contains_key(date) {
                rates.insert(*date, BTreeMap::new());
                failed_dates.push(*date);
            }
        }
        failed_dates.sort();

        RateResolution {
            table: RateTable::new(base_currency, rates),
            request_count,
            failed_dates,
        }
    }
}
