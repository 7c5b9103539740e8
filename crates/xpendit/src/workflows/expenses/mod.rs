//! Expense reimbursement: single-record policy evaluation and historical batch reconciliation.

pub mod anomalies;
pub mod batch;
pub mod domain;
pub mod ingest;
pub mod policy;
pub mod rates;

pub use anomalies::{find_duplicates, find_negatives, DuplicateGroup, DuplicateKey, DuplicateScan};
pub use batch::{BatchPipeline, BatchReport, StatusCounts};
pub use domain::{Alert, AlertCode, Employee, Expense, ExpenseId, ExpenseStatus, Verdict};
pub use ingest::{ExpenseBatch, ExpenseCsvSource, ExpenseImportError, SkippedRow};
pub use policy::{PolicyConfig, PolicyEngine, PolicyError};
pub use rates::{
    CurrencyNeeds, OpenExchangeRatesClient, RateLookupError, RateProvider, RateResolution,
    RateResolver, RateTable,
};
