use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::provider::{RateLookupError, RateProvider};
use crate::config::RatesConfig;

const USER_AGENT: &str = concat!("xpendit/", env!("CARGO_PKG_VERSION"));

/// Open Exchange Rates historical endpoint client.
pub struct OpenExchangeRatesClient {
    client: Client,
    base_url: String,
    app_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    #[serde(default)]
    rates: BTreeMap<String, Value>,
}

impl OpenExchangeRatesClient {
    pub fn new(
        app_id: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, RateLookupError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| RateLookupError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            app_id: app_id.into(),
        })
    }

    /// Client for the configured credential, or `None` when no credential is set.
    pub fn from_config(config: &RatesConfig) -> Result<Option<Self>, RateLookupError> {
        config
            .app_id
            .as_ref()
            .map(|app_id| Self::new(app_id.clone(), config.base_url.clone(), config.timeout))
            .transpose()
    }

    fn historical_url(&self, date: NaiveDate) -> String {
        format!("{}/historical/{}.json", self.base_url, date.format("%Y-%m-%d"))
    }
}

impl std::fmt::Debug for OpenExchangeRatesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenExchangeRatesClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl RateProvider for OpenExchangeRatesClient {
    async fn fetch_rates(
        &self,
        date: NaiveDate,
        currencies: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Decimal>, RateLookupError> {
        let symbols = currencies.iter().cloned().collect::<Vec<_>>().join(",");

        let response = self
            .client
            .get(self.historical_url(date))
            .query(&[("app_id", self.app_id.as_str()), ("symbols", symbols.as_str())])
            .send()
            .await
            .map_err(|err| RateLookupError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            return Err(RateLookupError::Status(response.status().as_u16()));
        }

        let payload: HistoricalResponse = response
            .json()
            .await
            .map_err(|err| RateLookupError::Parse(err.to_string()))?;

        Ok(parse_rates(&payload.rates, currencies))
    }
}

fn parse_rates(
    raw: &BTreeMap<String, Value>,
    currencies: &BTreeSet<String>,
) -> BTreeMap<String, Decimal> {
    currencies
        .iter()
        .filter_map(|currency| {
            raw.get(currency)
                .and_then(decimal_from_json)
                .map(|rate| (currency.clone(), rate))
        })
        .collect()
}

fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_rates_keeps_requested_symbols_only() {
        let payload: HistoricalResponse = serde_json::from_value(json!({
            "base": "USD",
            "rates": { "CLP": 934.52, "MXN": "17.1", "EUR": 0.92, "BTC": 1.6e-5, "ARS": null }
        }))
        .expect("payload parses");
        let wanted: BTreeSet<String> = ["CLP", "MXN", "ARS", "BTC"]
            .into_iter()
            .map(String::from)
            .collect();

        let rates = parse_rates(&payload.rates, &wanted);

        assert_eq!(rates.get("CLP"), Some(&Decimal::new(93452, 2)));
        assert_eq!(rates.get("MXN"), Some(&Decimal::new(171, 1)));
        assert_eq!(rates.get("BTC"), Some(&Decimal::new(16, 6)));
        assert!(!rates.contains_key("EUR"));
        assert!(!rates.contains_key("ARS"));
    }

    #[test]
    fn historical_url_uses_iso_date() {
        let client = OpenExchangeRatesClient::new(
            "secret",
            "https://rates.example.test/api",
            Duration::from_secs(5),
        )
        .expect("client builds");
        let date = NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid date");

        assert_eq!(
            client.historical_url(date),
            "https://rates.example.test/api/historical/2025-03-07.json"
        );
        assert!(!format!("{client:?}").contains("secret"));
    }

    #[test]
    fn from_config_without_credential_is_none() {
        let config = RatesConfig {
            app_id: None,
            base_url: "https://rates.example.test/api".to_string(),
            timeout: Duration::from_secs(5),
            max_concurrency: 2,
        };

        assert!(OpenExchangeRatesClient::from_config(&config)
            .expect("no client error")
            .is_none());
    }
}
