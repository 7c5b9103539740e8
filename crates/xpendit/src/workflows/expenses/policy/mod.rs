mod config;
mod rules;

pub use config::{AgeLimits, CategoryLimits, CostCenterRule, PolicyConfig, PolicyError};

use std::sync::Arc;

use chrono::NaiveDate;

use super::domain::{Expense, ExpenseStatus, Verdict};
use rules::RuleFinding;

/// Stateless evaluator applying the reimbursement policy to one expense.
///
/// Every rule runs independently and contributes its alert; the final status is the
/// strictest status any rule suggested, or `Pending` when no rule had an opinion.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    policy: Arc<PolicyConfig>,
}

impl PolicyEngine {
    pub fn new(policy: PolicyConfig) -> Self {
        Self {
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    pub fn evaluate(&self, expense: &Expense, today: NaiveDate) -> Verdict {
        evaluate(expense, &self.policy, today)
    }

    /// Status implied by the age rule alone.
    pub fn age_status(&self, expense: &Expense, today: NaiveDate) -> ExpenseStatus {
        rules::age_status(&self.policy.age_limits, expense.age_in_days(today))
    }
}

pub fn evaluate(expense: &Expense, policy: &PolicyConfig, today: NaiveDate) -> Verdict {
    let mut findings = vec![rules::age_rule(expense, &policy.age_limits, today)];
    findings.extend(rules::category_rule(expense, policy));
    findings.extend(rules::cost_center_rule(expense, policy));

    collapse(expense, findings)
}

fn collapse(expense: &Expense, findings: Vec<RuleFinding>) -> Verdict {
    let status = findings
        .iter()
        .map(|finding| finding.status)
        .max()
        .unwrap_or(ExpenseStatus::Pending);
    let alerts = findings
        .into_iter()
        .filter_map(|finding| finding.alert)
        .collect();

    Verdict {
        expense_id: expense.id.clone(),
        status,
        alerts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::expenses::domain::{AlertCode, Employee, ExpenseId};
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date")
    }

    fn expense(amount: Decimal, currency: &str, age_days: i64, category: &str) -> Expense {
        Expense {
            id: ExpenseId("g-test".to_string()),
            amount,
            currency: currency.to_string(),
            date: today() - Duration::days(age_days),
            category: category.to_string(),
            employee: Employee {
                id: "e-1".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Rojas".to_string(),
                cost_center: "sales_team".to_string(),
            },
        }
    }

    #[test]
    fn age_boundaries_are_inclusive_of_lower_status() {
        let engine = PolicyEngine::new(PolicyConfig::standard());

        let at_pending = engine.evaluate(&expense(Decimal::ONE, "USD", 30, "misc"), today());
        assert_eq!(at_pending.status, ExpenseStatus::Approved);
        assert!(at_pending.alerts.is_empty());

        let past_pending = engine.evaluate(&expense(Decimal::ONE, "USD", 31, "misc"), today());
        assert_eq!(past_pending.status, ExpenseStatus::Pending);
        assert!(past_pending.has_alert(AlertCode::AgeLimit));

        let at_reject = engine.evaluate(&expense(Decimal::ONE, "USD", 60, "misc"), today());
        assert_eq!(at_reject.status, ExpenseStatus::Pending);

        let past_reject = engine.evaluate(&expense(Decimal::ONE, "USD", 61, "misc"), today());
        assert_eq!(past_reject.status, ExpenseStatus::Rejected);
        assert!(past_reject.has_alert(AlertCode::AgeLimit));
    }

    #[test]
    fn fallback_table_converts_before_category_check() {
        let engine = PolicyEngine::new(PolicyConfig::standard());

        // 96,000 CLP at 800 per USD is 120 USD: above food's approval cutoff.
        let verdict = engine.evaluate(&expense(Decimal::new(96_000, 0), "CLP", 1, "food"), today());
        assert_eq!(verdict.status, ExpenseStatus::Pending);
        assert_eq!(verdict.alert_codes(), vec![AlertCode::CategoryLimit]);
    }

    #[test]
    fn overflowing_conversion_is_still_a_known_currency() {
        let engine = PolicyEngine::new(PolicyConfig::standard());
        let huge = Decimal::from_scientific("7.9e28").expect("valid amount");

        let verdict = engine.evaluate(&expense(huge, "EUR", 1, "food"), today());
        assert_eq!(verdict.status, ExpenseStatus::Rejected);
        assert_eq!(verdict.alert_codes(), vec![AlertCode::CategoryLimit]);
    }

    #[test]
    fn unknown_currency_skips_category_check() {
        let engine = PolicyEngine::new(PolicyConfig::standard());

        let verdict = engine.evaluate(&expense(Decimal::new(9_999, 0), "ARS", 1, "food"), today());
        assert_eq!(verdict.status, ExpenseStatus::Pending);
        assert_eq!(verdict.alert_codes(), vec![AlertCode::UnknownCurrency]);
    }

    #[test]
    fn duplicate_prohibitions_each_raise_an_alert() {
        let mut policy = PolicyConfig::standard();
        policy.cost_center_rules.push(CostCenterRule {
            cost_center: "sales_team".to_string(),
            prohibited_category: "misc".to_string(),
        });
        policy.cost_center_rules.push(CostCenterRule {
            cost_center: "sales_team".to_string(),
            prohibited_category: "misc".to_string(),
        });
        let engine = PolicyEngine::new(policy);

        let verdict = engine.evaluate(&expense(Decimal::ONE, "USD", 0, "misc"), today());
        assert_eq!(verdict.status, ExpenseStatus::Rejected);
        assert_eq!(
            verdict.alert_codes(),
            vec![AlertCode::CostCenterPolicy, AlertCode::CostCenterPolicy]
        );
    }

    #[test]
    fn collapse_defaults_to_pending_without_findings() {
        let verdict = collapse(&expense(Decimal::ONE, "USD", 0, "misc"), Vec::new());
        assert_eq!(verdict.status, ExpenseStatus::Pending);
        assert!(verdict.alerts.is_empty());
    }

    #[test]
    fn repeated_evaluation_is_stable() {
        let engine = PolicyEngine::new(PolicyConfig::standard());
        let subject = expense(Decimal::new(14_999, 2), "USD", 45, "food");

        let first = engine.evaluate(&subject, today());
        let _ = engine.evaluate(&expense(Decimal::new(500, 0), "EUR", 90, "food"), today());
        let second = engine.evaluate(&subject, today());
        assert_eq!(first, second);
    }
}
