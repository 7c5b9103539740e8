use std::collections::BTreeMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::super::anomalies::{find_duplicates, find_negatives};
use super::super::domain::{Alert, AlertCode, Expense, ExpenseStatus, Verdict};
use super::super::ingest::ExpenseBatch;
use super::super::policy::PolicyEngine;
use super::super::rates::{CurrencyNeeds, RateProvider, RateResolution, RateResolver, RateTable};
use super::report::{BatchReport, StatusCounts};

/// Runs a historical batch: rate resolution, per-record policy evaluation and anomaly merge.
#[derive(Debug, Clone)]
pub struct BatchPipeline {
    engine: PolicyEngine,
}

impl BatchPipeline {
    pub fn new(engine: PolicyEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &PolicyEngine {
        &self.engine
    }

    pub fn currency_needs(&self, expenses: &[Expense]) -> CurrencyNeeds {
        CurrencyNeeds::from_expenses(expenses, &self.engine.policy().base_currency)
    }

    /// Resolves rates (when a resolver is available) and evaluates the batch.
    /// Without a resolver, non-base expenses degrade to an unavailable-rate verdict.
    pub async fn run<P>(
        &self,
        batch: &ExpenseBatch,
        resolver: Option<&RateResolver<P>>,
        today: NaiveDate,
    ) -> BatchReport
    where
        P: RateProvider + 'static,
    {
        let base_currency = self.engine.policy().base_currency.as_str();
        let needs = self.currency_needs(&batch.expenses);

        let resolution = match resolver {
            _ if needs.is_empty() => RateResolution::unavailable(base_currency),
            Some(resolver) => resolver.resolve(&needs, base_currency).await,
            None => {
                warn!(
                    dates = needs.date_count(),
                    "no exchange rate credential configured; non-{base_currency} expenses cannot be converted"
                );
                RateResolution::unavailable(base_currency)
            }
        };

        self.evaluate(batch, &resolution, today)
    }

    /// Pure evaluation against an already resolved rate table.
    pub fn evaluate(
        &self,
        batch: &ExpenseBatch,
        resolution: &RateResolution,
        today: NaiveDate,
    ) -> BatchReport {
        let policy = self.engine.policy();
        let expenses = &batch.expenses;
        let duplicates = find_duplicates(expenses);
        let negatives = find_negatives(expenses);

        let mut status_counts = StatusCounts::default();
        let mut currency_distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut verdicts = Vec::with_capacity(expenses.len());

        for expense in expenses {
            let mut verdict = self.verdict_for(expense, &resolution.table, today);
            apply_anomalies(
                &mut verdict,
                duplicates.contains(&expense.id),
                negatives.contains(&expense.id),
            );

            status_counts.record(verdict.status);
            *currency_distribution
                .entry(expense.currency.clone())
                .or_default() += 1;
            verdicts.push(verdict);
        }

        let non_base_expenses = expenses
            .iter()
            .filter(|expense| !policy.is_base_currency(&expense.currency))
            .count();
        let non_base_dates = self.currency_needs(expenses).date_count();

        info!(
            total = expenses.len(),
            approved = status_counts.approved,
            pending = status_counts.pending,
            rejected = status_counts.rejected,
            duplicates = duplicates.ids.len(),
            negatives = negatives.len(),
            rate_lookups = resolution.request_count,
            "batch evaluated"
        );

        BatchReport {
            evaluated_on: today,
            base_currency: policy.base_currency.clone(),
            total_expenses: expenses.len(),
            non_base_expenses,
            non_base_dates,
            skipped_rows: batch.skipped.clone(),
            status_counts,
            verdicts,
            duplicate_groups: duplicates.groups,
            negative_ids: negatives.into_iter().collect(),
            currency_distribution,
            rate_lookups: resolution.request_count,
            failed_rate_dates: resolution.failed_dates.clone(),
        }
    }

    fn verdict_for(&self, expense: &Expense, table: &RateTable, today: NaiveDate) -> Verdict {
        match table.convert(expense.amount, &expense.currency, expense.date) {
            Some(amount) => {
                let normalized = expense.normalized(amount, table.base_currency());
                self.engine.evaluate(&normalized, today)
            }
            None => {
                // Age still decides when no rate exists; anything short of rejected waits for review.
                let status = self
                    .engine
                    .age_status(expense, today)
                    .max(ExpenseStatus::Pending);
                Verdict {
                    expense_id: expense.id.clone(),
                    status,
                    alerts: vec![Alert::new(
                        AlertCode::ExchangeRateUnavailable,
                        format!(
                            "No exchange rate available for {} on {}.",
                            expense.currency, expense.date
                        ),
                    )],
                }
            }
        }
    }
}

/// Duplicates only demote an approval; negatives always reject.
fn apply_anomalies(verdict: &mut Verdict, duplicate: bool, negative: bool) {
    if duplicate {
        verdict.alerts.push(Alert::new(
            AlertCode::ExactDuplicate,
            "Possible duplicate: amount, currency and date match another expense.",
        ));
        if verdict.status == ExpenseStatus::Approved {
            verdict.status = ExpenseStatus::Pending;
        }
    }

    if negative {
        verdict.alerts.push(Alert::new(
            AlertCode::NegativeAmount,
            "Expense amount is negative; the record is suspicious or erroneous.",
        ));
        verdict.status = ExpenseStatus::Rejected;
    }
}
