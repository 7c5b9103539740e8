use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::super::domain::{Alert, AlertCode, Expense, ExpenseStatus};
use super::super::rates::base_amount;
use super::config::{AgeLimits, PolicyConfig};

/// Status suggested by one rule, with the alert it raised (if any).
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RuleFinding {
    pub status: ExpenseStatus,
    pub alert: Option<Alert>,
}

impl RuleFinding {
    fn clear(status: ExpenseStatus) -> Self {
        Self {
            status,
            alert: None,
        }
    }

    fn flagged(status: ExpenseStatus, code: AlertCode, message: String) -> Self {
        Self {
            status,
            alert: Some(Alert::new(code, message)),
        }
    }
}

pub(crate) fn age_status(limits: &AgeLimits, age_days: i64) -> ExpenseStatus {
    if age_days > limits.rejected_after_days {
        ExpenseStatus::Rejected
    } else if age_days > limits.pending_after_days {
        ExpenseStatus::Pending
    } else {
        ExpenseStatus::Approved
    }
}

pub(crate) fn age_rule(expense: &Expense, limits: &AgeLimits, today: NaiveDate) -> RuleFinding {
    match age_status(limits, expense.age_in_days(today)) {
        ExpenseStatus::Rejected => RuleFinding::flagged(
            ExpenseStatus::Rejected,
            AlertCode::AgeLimit,
            format!(
                "Expense is older than {} days and is not reimbursable.",
                limits.rejected_after_days
            ),
        ),
        ExpenseStatus::Pending => RuleFinding::flagged(
            ExpenseStatus::Pending,
            AlertCode::AgeLimit,
            format!(
                "Expense is older than {} days and requires review.",
                limits.pending_after_days
            ),
        ),
        ExpenseStatus::Approved => RuleFinding::clear(ExpenseStatus::Approved),
    }
}

/// Amount in the base currency using the policy's fallback table.
pub(crate) fn fallback_base_amount(expense: &Expense, policy: &PolicyConfig) -> Option<Decimal> {
    if policy.is_base_currency(&expense.currency) {
        return Some(expense.amount);
    }

    policy
        .fallback_rates
        .get(&expense.currency)
        .filter(|rate| !rate.is_zero())
        .map(|rate| base_amount(expense.amount, *rate))
}

pub(crate) fn category_rule(expense: &Expense, policy: &PolicyConfig) -> Option<RuleFinding> {
    let Some(amount) = fallback_base_amount(expense, policy) else {
        return Some(RuleFinding::flagged(
            ExpenseStatus::Pending,
            AlertCode::UnknownCurrency,
            format!(
                "Currency {} is unknown and cannot be converted to {}.",
                expense.currency, policy.base_currency
            ),
        ));
    };

    let limits = policy.category_limits.get(&expense.category)?;

    let finding = if amount > limits.pending_up_to {
        RuleFinding::flagged(
            ExpenseStatus::Rejected,
            AlertCode::CategoryLimit,
            format!("'{}' expense exceeds the allowed limit.", expense.category),
        )
    } else if amount > limits.approved_up_to {
        RuleFinding::flagged(
            ExpenseStatus::Pending,
            AlertCode::CategoryLimit,
            format!(
                "'{}' expense exceeds the approved limit and requires review.",
                expense.category
            ),
        )
    } else {
        RuleFinding::clear(ExpenseStatus::Approved)
    };

    Some(finding)
}

pub(crate) fn cost_center_rule(expense: &Expense, policy: &PolicyConfig) -> Vec<RuleFinding> {
    policy
        .cost_center_rules
        .iter()
        .filter(|rule| {
            rule.cost_center == expense.employee.cost_center
                && rule.prohibited_category == expense.category
        })
        .map(|rule| {
            RuleFinding::flagged(
                ExpenseStatus::Rejected,
                AlertCode::CostCenterPolicy,
                format!(
                    "Cost center '{}' may not report '{}' expenses.",
                    rule.cost_center, expense.category
                ),
            )
        })
        .collect()
}
