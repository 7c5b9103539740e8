//! Policy engine behavior observed through the public evaluation entry points.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;

use xpendit::workflows::expenses::policy::{self, PolicyConfig, PolicyEngine};
use xpendit::workflows::expenses::{AlertCode, Employee, Expense, ExpenseId, ExpenseStatus};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date")
}

fn expense(
    id: &str,
    amount: &str,
    currency: &str,
    age_days: i64,
    category: &str,
    cost_center: &str,
) -> Expense {
    Expense {
        id: ExpenseId(id.to_string()),
        amount: amount.parse::<Decimal>().expect("valid amount"),
        currency: currency.to_string(),
        date: today() - Duration::days(age_days),
        category: category.to_string(),
        employee: Employee {
            id: "e-100".to_string(),
            first_name: "Camila".to_string(),
            last_name: "Fuentes".to_string(),
            cost_center: cost_center.to_string(),
        },
    }
}

fn engine() -> PolicyEngine {
    PolicyEngine::new(PolicyConfig::standard())
}

#[test]
fn food_thresholds_follow_inclusive_upper_bounds() {
    let engine = engine();
    let cases = [
        ("100", ExpenseStatus::Approved, false),
        ("100.01", ExpenseStatus::Pending, true),
        ("150", ExpenseStatus::Pending, true),
        ("150.01", ExpenseStatus::Rejected, true),
    ];

    for (amount, status, alerted) in cases {
        let verdict = engine.evaluate(
            &expense("g-1", amount, "USD", 2, "food", "sales_team"),
            today(),
        );
        assert_eq!(verdict.status, status, "amount {amount}");
        assert_eq!(verdict.has_alert(AlertCode::CategoryLimit), alerted, "amount {amount}");
    }
}

#[test]
fn age_boundaries_are_exclusive() {
    let engine = engine();
    let cases = [
        (30, ExpenseStatus::Approved),
        (31, ExpenseStatus::Pending),
        (60, ExpenseStatus::Pending),
        (61, ExpenseStatus::Rejected),
    ];

    for (age, status) in cases {
        let verdict = engine.evaluate(
            &expense("g-2", "10", "USD", age, "transport", "sales_team"),
            today(),
        );
        assert_eq!(verdict.status, status, "age {age}");
        assert_eq!(
            verdict.has_alert(AlertCode::AgeLimit),
            status != ExpenseStatus::Approved
        );
    }
}

#[test]
fn every_violation_contributes_an_alert() {
    let verdict = engine().evaluate(
        &expense("g-3", "120", "USD", 45, "food", "core_engineering"),
        today(),
    );

    assert_eq!(verdict.status, ExpenseStatus::Rejected);
    assert_eq!(
        verdict.alert_codes(),
        vec![
            AlertCode::AgeLimit,
            AlertCode::CategoryLimit,
            AlertCode::CostCenterPolicy
        ]
    );
}

#[test]
fn cost_center_prohibition_only_matches_the_pair() {
    let engine = engine();

    let other_center = engine.evaluate(
        &expense("g-4", "20", "USD", 1, "food", "sales_team"),
        today(),
    );
    let other_category = engine.evaluate(
        &expense("g-5", "20", "USD", 1, "transport", "core_engineering"),
        today(),
    );

    assert_eq!(other_center.status, ExpenseStatus::Approved);
    assert_eq!(other_category.status, ExpenseStatus::Approved);
    assert!(other_center.alerts.is_empty());
}

#[test]
fn uncovered_category_is_approved_when_recent() {
    let verdict = engine().evaluate(
        &expense("g-6", "5000", "USD", 1, "software", "sales_team"),
        today(),
    );

    assert_eq!(verdict.status, ExpenseStatus::Approved);
    assert!(verdict.alerts.is_empty());
}

#[test]
fn fallback_rates_convert_before_limits() {
    let engine = engine();

    let at_limit = engine.evaluate(
        &expense("g-7", "80000", "CLP", 3, "food", "sales_team"),
        today(),
    );
    let over_limit = engine.evaluate(
        &expense("g-8", "80001", "CLP", 3, "food", "sales_team"),
        today(),
    );

    assert_eq!(at_limit.status, ExpenseStatus::Approved);
    assert_eq!(over_limit.status, ExpenseStatus::Pending);
    assert_eq!(over_limit.alert_codes(), vec![AlertCode::CategoryLimit]);
}

#[test]
fn unknown_currency_requires_review() {
    let verdict = engine().evaluate(
        &expense("g-9", "10", "ARS", 3, "food", "sales_team"),
        today(),
    );

    assert_eq!(verdict.status, ExpenseStatus::Pending);
    assert_eq!(verdict.alert_codes(), vec![AlertCode::UnknownCurrency]);
}

#[test]
fn free_function_matches_engine() {
    let policy = PolicyConfig::standard();
    let subject = expense("g-10", "175", "USD", 40, "transport", "sales_team");

    assert_eq!(
        policy::evaluate(&subject, &policy, today()),
        PolicyEngine::new(policy.clone()).evaluate(&subject, today())
    );
}

#[test]
fn custom_policy_document_drives_evaluation() {
    let policy = PolicyConfig::from_json(
        r#"{
            "base_currency": "EUR",
            "age_limits": { "pending_after_days": 10, "rejected_after_days": 20 },
            "category_limits": {
                "lodging": { "approved_up_to": "300", "pending_up_to": "500" }
            },
            "cost_center_rules": [],
            "fallback_rates": {}
        }"#,
    )
    .expect("valid policy");
    let engine = PolicyEngine::new(policy);

    let verdict = engine.evaluate(
        &expense("g-11", "450", "EUR", 12, "lodging", "finance"),
        today(),
    );

    assert_eq!(verdict.status, ExpenseStatus::Pending);
    assert_eq!(
        verdict.alert_codes(),
        vec![AlertCode::AgeLimit, AlertCode::CategoryLimit]
    );
}
