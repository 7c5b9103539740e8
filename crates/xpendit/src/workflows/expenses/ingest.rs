use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use super::domain::{Employee, Expense, ExpenseId};

#[derive(Debug)]
pub enum ExpenseImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for ExpenseImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpenseImportError::Io(err) => write!(f, "failed to read expense file: {}", err),
            ExpenseImportError::Csv(err) => write!(f, "invalid expense CSV data: {}", err),
        }
    }
}

impl std::error::Error for ExpenseImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExpenseImportError::Io(err) => Some(err),
            ExpenseImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ExpenseImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ExpenseImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Row dropped during import, kept so reports can surface it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub line: Option<u64>,
    pub expense_id: Option<String>,
    pub reason: String,
}

/// Expenses accepted from a source plus the rows that were rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseBatch {
    pub expenses: Vec<Expense>,
    pub skipped: Vec<SkippedRow>,
}

impl From<Vec<Expense>> for ExpenseBatch {
    fn from(expenses: Vec<Expense>) -> Self {
        Self {
            expenses,
            skipped: Vec::new(),
        }
    }
}

/// Reads historical expense exports (`gasto_id,empleado_id,...,monto` layout).
pub struct ExpenseCsvSource;

impl ExpenseCsvSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ExpenseBatch, ExpenseImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ExpenseBatch, ExpenseImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut batch = ExpenseBatch::default();

        for result in csv_reader.records() {
            let record = match result {
                Ok(record) => record,
                Err(err) if err.is_io_error() => return Err(err.into()),
                Err(err) => {
                    let line = err.position().map(|position| position.line());
                    skip(&mut batch, line, None, err.to_string());
                    continue;
                }
            };
            let line = record.position().map(|position| position.line());

            let row: ExpenseRow = match record.deserialize(Some(&headers)) {
                Ok(row) => row,
                Err(err) => {
                    skip(&mut batch, line, None, err.to_string());
                    continue;
                }
            };

            match row.into_expense() {
                Ok(expense) => batch.expenses.push(expense),
                Err((expense_id, reason)) => skip(&mut batch, line, expense_id, reason),
            }
        }

        Ok(batch)
    }
}

fn skip(batch: &mut ExpenseBatch, line: Option<u64>, expense_id: Option<String>, reason: String) {
    warn!(?line, expense_id = ?expense_id, %reason, "skipping malformed expense row");
    batch.skipped.push(SkippedRow {
        line,
        expense_id,
        reason,
    });
}

#[derive(Debug, Deserialize)]
struct ExpenseRow {
    #[serde(rename = "gasto_id", default, deserialize_with = "empty_string_as_none")]
    expense_id: Option<String>,
    #[serde(rename = "empleado_id", default, deserialize_with = "empty_string_as_none")]
    employee_id: Option<String>,
    #[serde(rename = "empleado_nombre", default)]
    first_name: Option<String>,
    #[serde(rename = "empleado_apellido", default)]
    last_name: Option<String>,
    #[serde(rename = "empleado_cost_center", default)]
    cost_center: Option<String>,
    #[serde(rename = "categoria", default)]
    category: Option<String>,
    #[serde(rename = "moneda", default)]
    currency: Option<String>,
    #[serde(rename = "fecha", default, deserialize_with = "empty_string_as_none")]
    date: Option<String>,
    #[serde(rename = "monto", default, deserialize_with = "empty_string_as_none")]
    amount: Option<String>,
}

impl ExpenseRow {
    fn into_expense(self) -> Result<Expense, (Option<String>, String)> {
        let Some(expense_id) = self.expense_id else {
            return Err((None, "missing gasto_id".to_string()));
        };
        let Some(employee_id) = self.employee_id else {
            return Err((Some(expense_id), "missing empleado_id".to_string()));
        };
        let Some(date) = self.date.as_deref().and_then(parse_date) else {
            let reason = format!("invalid fecha {:?}", self.date.unwrap_or_default());
            return Err((Some(expense_id), reason));
        };
        let Some(amount) = self.amount.as_deref().and_then(parse_amount) else {
            let reason = format!("invalid monto {:?}", self.amount.unwrap_or_default());
            return Err((Some(expense_id), reason));
        };

        Ok(Expense {
            id: ExpenseId(expense_id),
            amount,
            currency: self.currency.unwrap_or_default(),
            date,
            category: self.category.unwrap_or_default(),
            employee: Employee {
                id: employee_id,
                first_name: self.first_name.unwrap_or_default(),
                last_name: self.last_name.unwrap_or_default(),
                cost_center: self.cost_center.unwrap_or_default(),
            },
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parses plain or scientific decimal notation without going through floats.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
}
