use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{RetryPolicy, with_retry};
use crate::core::currency::{Currency, RateProvider, RateTable};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the latest rates from an exchangerate-api style endpoint.
///
/// The endpoint quotes how many units of each currency one base unit buys,
/// so the conversion factor into the base currency is the reciprocal.
pub struct ExchangeRateApiProvider {
    base_url: String,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str) -> Self {
        ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn fetch_rates(&self, base: Currency) -> Result<RateTable> {
        let url = format!("{}/v4/latest/{}", self.base_url, base);
        debug!("Requesting exchange rates from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("pfreturns/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = with_retry(|| client.get(&url).send(), RetryPolicy::default())
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", base, e))?;

        let mut table = RateTable::new(base);
        for currency in Currency::ALL {
            if currency == base {
                continue;
            }
            match data.rates.get(currency.code()) {
                Some(quote) if *quote > 0.0 => {
                    table = table.with_rate(currency, 1.0 / quote)?;
                }
                _ => debug!("No usable quote for {} in {} response", currency, base),
            }
        }

        debug!("Fetched rate table: {:?}", table);
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(base: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(format!("/v4/latest/{base}")))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "base": "CNY",
            "date": "2025-01-15",
            "rates": {"CNY": 1, "HKD": 1.08, "USD": 0.1379, "EUR": 0.1334}
        }"#;
        let mock_server = create_mock_server(
            "CNY",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri());
        let table = provider.fetch_rates(Currency::Cny).await.unwrap();

        assert_eq!(table.base(), Currency::Cny);
        assert_eq!(table.get(Currency::Cny), Some(1.0));
        assert!((table.get(Currency::Hkd).unwrap() - 1.0 / 1.08).abs() < 1e-12);
        assert!((table.get(Currency::Usd).unwrap() - 1.0 / 0.1379).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_missing_quote_is_left_out() {
        let mock_response = r#"{"rates": {"HKD": 1.08, "USD": 0}}"#;
        let mock_server = create_mock_server(
            "CNY",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri());
        let table = provider.fetch_rates(Currency::Cny).await.unwrap();
        assert!(table.contains(Currency::Hkd));
        assert!(!table.contains(Currency::Usd));
    }

    #[tokio::test]
    async fn test_rate_api_error_response() {
        let mock_server = create_mock_server("CNY", ResponseTemplate::new(500)).await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri());
        let result = provider.fetch_rates(Currency::Cny).await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for base currency: CNY"
        );
    }

    #[tokio::test]
    async fn test_rate_api_malformed_response() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(r#"{"result": "error"}"#),
        )
        .await;

        let provider = ExchangeRateApiProvider::new(&mock_server.uri());
        let result = provider.fetch_rates(Currency::Usd).await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USD")
        );
    }
}
