use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::super::anomalies::DuplicateGroup;
use super::super::domain::{ExpenseId, ExpenseStatus, Verdict};
use super::super::ingest::SkippedRow;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn record(&mut self, status: ExpenseStatus) {
        match status {
            ExpenseStatus::Approved => self.approved += 1,
            ExpenseStatus::Pending => self.pending += 1,
            ExpenseStatus::Rejected => self.rejected += 1,
        }
    }

    pub fn get(&self, status: ExpenseStatus) -> usize {
        match status {
            ExpenseStatus::Approved => self.approved,
            ExpenseStatus::Pending => self.pending,
            ExpenseStatus::Rejected => self.rejected,
        }
    }

    pub fn total(&self) -> usize {
        self.approved + self.pending + self.rejected
    }
}

/// Aggregate outcome of a batch run, ready for rendering by a report consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub evaluated_on: NaiveDate,
    pub base_currency: String,
    pub total_expenses: usize,
    pub non_base_expenses: usize,
    pub non_base_dates: usize,
    pub skipped_rows: Vec<SkippedRow>,
    pub status_counts: StatusCounts,
    /// One verdict per expense, in input order.
    pub verdicts: Vec<Verdict>,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub negative_ids: Vec<ExpenseId>,
    pub currency_distribution: BTreeMap<String, usize>,
    pub rate_lookups: usize,
    pub failed_rate_dates: Vec<NaiveDate>,
}

impl BatchReport {
    pub fn verdict(&self, id: &str) -> Option<&Verdict> {
        self.verdicts
            .iter()
            .find(|verdict| verdict.expense_id.0 == id)
    }
}
