use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Identifier wrapper for submitted expenses. Unique within a batch by convention only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(pub String);

impl fmt::Display for ExpenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Employee reporting the expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub cost_center: String,
}

/// A single expense as read from the source. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub amount: Decimal,
    pub currency: String,
    pub date: NaiveDate,
    pub category: String,
    pub employee: Employee,
}

impl Expense {
    /// Copy of this expense expressed in `base_currency`.
    pub fn normalized(&self, amount_in_base: Decimal, base_currency: &str) -> Expense {
        Expense {
            amount: amount_in_base,
            currency: base_currency.to_string(),
            ..self.clone()
        }
    }

    pub fn age_in_days(&self, today: NaiveDate) -> i64 {
        (today - self.date).num_days()
    }
}

/// Reimbursement status. Variant order is severity order, so `max` picks the strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseStatus {
    Approved,
    Pending,
    Rejected,
}

impl ExpenseStatus {
    pub fn ordered() -> [ExpenseStatus; 3] {
        [
            ExpenseStatus::Approved,
            ExpenseStatus::Pending,
            ExpenseStatus::Rejected,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExpenseStatus::Approved => "Approved",
            ExpenseStatus::Pending => "Pending",
            ExpenseStatus::Rejected => "Rejected",
        }
    }
}

/// Machine-readable alert codes. Wire names are kept stable for downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertCode {
    #[serde(rename = "LIMITE_ANTIGUEDAD")]
    AgeLimit,
    #[serde(rename = "LIMITE_CATEGORIA")]
    CategoryLimit,
    #[serde(rename = "MONEDA_DESCONOCIDA")]
    UnknownCurrency,
    #[serde(rename = "POLITICA_CENTRO_COSTO")]
    CostCenterPolicy,
    #[serde(rename = "TASA_CAMBIO_NO_DISPONIBLE")]
    ExchangeRateUnavailable,
    #[serde(rename = "DUPLICADO_EXACTO")]
    ExactDuplicate,
    #[serde(rename = "MONTO_NEGATIVO")]
    NegativeAmount,
}

impl AlertCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCode::AgeLimit => "LIMITE_ANTIGUEDAD",
            AlertCode::CategoryLimit => "LIMITE_CATEGORIA",
            AlertCode::UnknownCurrency => "MONEDA_DESCONOCIDA",
            AlertCode::CostCenterPolicy => "POLITICA_CENTRO_COSTO",
            AlertCode::ExchangeRateUnavailable => "TASA_CAMBIO_NO_DISPONIBLE",
            AlertCode::ExactDuplicate => "DUPLICADO_EXACTO",
            AlertCode::NegativeAmount => "MONTO_NEGATIVO",
        }
    }
}

impl fmt::Display for AlertCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub code: AlertCode,
    pub message: String,
}

impl Alert {
    pub fn new(code: AlertCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of evaluating one expense: final status plus every alert raised, in rule order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub expense_id: ExpenseId,
    pub status: ExpenseStatus,
    pub alerts: Vec<Alert>,
}

impl Verdict {
    pub fn has_alert(&self, code: AlertCode) -> bool {
        self.alerts.iter().any(|alert| alert.code == code)
    }

    pub fn alert_codes(&self) -> Vec<AlertCode> {
        self.alerts.iter().map(|alert| alert.code).collect()
    }
}
