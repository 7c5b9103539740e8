use std::collections::BTreeMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Declarative reimbursement policy. Loaded once and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub base_currency: String,
    pub age_limits: AgeLimits,
    #[serde(default)]
    pub category_limits: BTreeMap<String, CategoryLimits>,
    #[serde(default)]
    pub cost_center_rules: Vec<CostCenterRule>,
    /// Units of each currency per one unit of the base currency. Only used when a
    /// single expense is evaluated without an externally resolved rate.
    #[serde(default)]
    pub fallback_rates: BTreeMap<String, Decimal>,
}

/// Age cutoffs in days. Both bounds are inclusive of the lower status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeLimits {
    pub pending_after_days: i64,
    pub rejected_after_days: i64,
}

/// Base-currency amount cutoffs for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryLimits {
    pub approved_up_to: Decimal,
    pub pending_up_to: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCenterRule {
    pub cost_center: String,
    pub prohibited_category: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid policy document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("policy base currency must not be empty")]
    MissingBaseCurrency,
    #[error("age limits inverted (pending after {pending} days, rejected after {rejected} days)")]
    InvertedAgeLimits { pending: i64, rejected: i64 },
    #[error("category '{category}' limits inverted (approved up to {approved}, pending up to {pending})")]
    InvertedCategoryLimits {
        category: String,
        approved: Decimal,
        pending: Decimal,
    },
    #[error("fallback rate for {currency} must be positive (found {rate})")]
    NonPositiveFallbackRate { currency: String, rate: Decimal },
}

impl PolicyConfig {
    /// Built-in company policy.
    pub fn standard() -> Self {
        let mut category_limits = BTreeMap::new();
        category_limits.insert(
            "food".to_string(),
            CategoryLimits {
                approved_up_to: Decimal::new(100, 0),
                pending_up_to: Decimal::new(150, 0),
            },
        );
        category_limits.insert(
            "transport".to_string(),
            CategoryLimits {
                approved_up_to: Decimal::new(200, 0),
                pending_up_to: Decimal::new(200, 0),
            },
        );

        let mut fallback_rates = BTreeMap::new();
        fallback_rates.insert("CLP".to_string(), Decimal::new(800, 0));
        fallback_rates.insert("MXN".to_string(), Decimal::new(20, 0));
        fallback_rates.insert("EUR".to_string(), Decimal::new(85, 2));

        Self {
            base_currency: "USD".to_string(),
            age_limits: AgeLimits {
                pending_after_days: 30,
                rejected_after_days: 60,
            },
            category_limits,
            cost_center_rules: vec![CostCenterRule {
                cost_center: "core_engineering".to_string(),
                prohibited_category: "food".to_string(),
            }],
            fallback_rates,
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, PolicyError> {
        let policy: PolicyConfig = serde_json::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.base_currency.trim().is_empty() {
            return Err(PolicyError::MissingBaseCurrency);
        }

        let AgeLimits {
            pending_after_days,
            rejected_after_days,
        } = self.age_limits;
        if rejected_after_days < pending_after_days {
            return Err(PolicyError::InvertedAgeLimits {
                pending: pending_after_days,
                rejected: rejected_after_days,
            });
        }

        for (category, limits) in &self.category_limits {
            if limits.pending_up_to < limits.approved_up_to {
                return Err(PolicyError::InvertedCategoryLimits {
                    category: category.clone(),
                    approved: limits.approved_up_to,
                    pending: limits.pending_up_to,
                });
            }
        }

        for (currency, rate) in &self.fallback_rates {
            if *rate <= Decimal::ZERO {
                return Err(PolicyError::NonPositiveFallbackRate {
                    currency: currency.clone(),
                    rate: *rate,
                });
            }
        }

        Ok(())
    }

    pub fn is_base_currency(&self, currency: &str) -> bool {
        currency == self.base_currency
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self::standard()
    }
}
