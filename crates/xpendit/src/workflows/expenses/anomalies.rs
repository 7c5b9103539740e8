use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use super::domain::{Expense, ExpenseId};

/// Grouping key for exact duplicates, built from the amount and currency as submitted.
///
/// Amounts are rounded to cents with half-away-from-zero, so 10.005 and 10.01 collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DuplicateKey {
    pub amount: Decimal,
    pub currency: String,
    pub date: NaiveDate,
}

impl DuplicateKey {
    pub fn for_expense(expense: &Expense) -> Self {
        let mut amount = expense
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        amount.rescale(2);

        Self {
            amount,
            currency: expense.currency.clone(),
            date: expense.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub key: DuplicateKey,
    pub expense_ids: Vec<ExpenseId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DuplicateScan {
    pub ids: BTreeSet<ExpenseId>,
    pub groups: Vec<DuplicateGroup>,
}

impl DuplicateScan {
    pub fn contains(&self, id: &ExpenseId) -> bool {
        self.ids.contains(id)
    }
}

/// Groups expenses by rounded amount, currency and date; groups of two or more are duplicates.
/// Ids within a group keep input order and groups are ordered by key.
pub fn find_duplicates(expenses: &[Expense]) -> DuplicateScan {
    let mut buckets: BTreeMap<DuplicateKey, Vec<ExpenseId>> = BTreeMap::new();
    for expense in expenses {
        buckets
            .entry(DuplicateKey::for_expense(expense))
            .or_default()
            .push(expense.id.clone());
    }

    let mut scan = DuplicateScan::default();
    for (key, expense_ids) in buckets {
        if expense_ids.len() < 2 {
            continue;
        }
        scan.ids.extend(expense_ids.iter().cloned());
        scan.groups.push(DuplicateGroup { key, expense_ids });
    }
    scan
}

pub fn find_negatives(expenses: &[Expense]) -> BTreeSet<ExpenseId> {
    expenses
        .iter()
        .filter(|expense| expense.amount < Decimal::ZERO)
        .map(|expense| expense.id.clone())
        .collect()
}
