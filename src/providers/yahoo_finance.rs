use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{RetryPolicy, with_retry};
use crate::core::price::{PriceProvider, PriceQuote};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fetches the latest market price of a ticker from the Yahoo Finance chart
/// endpoint, along with the currency it is quoted in.
pub struct YahooFinanceProvider {
    base_url: String,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Self {
        YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Vec<PriceChartItem>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: PriceChartMeta,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
    currency: String,
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceQuote> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        debug!("Requesting price data from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("pfreturns/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = with_retry(|| client.get(&url).send(), RetryPolicy::default())
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: YahooPriceResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        debug!(
            "Price for {}: {} {}",
            symbol, item.meta.regular_market_price, item.meta.currency
        );
        Ok(PriceQuote {
            price: item.meta.regular_market_price,
            currency: item.meta.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(symbol: &str, response: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        mock_server
    }

    #[tokio::test]
    async fn test_successful_price_fetch() {
        let mock_response = r#"{
            "chart": {
                "result": [{
                    "meta": {
                        "regularMarketPrice": 1580.5,
                        "currency": "CNY"
                    }
                }]
            }
        }"#;

        let mock_server = create_mock_server(
            "600519.SS",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri());
        let result = provider.fetch_price("600519.SS").await.unwrap();
        assert_eq!(result.price, 1580.5);
        assert_eq!(result.currency, "CNY");
    }

    #[tokio::test]
    async fn test_no_price_result_data() {
        let mock_response = r#"{"chart": {"result": []}}"#;
        let mock_server = create_mock_server(
            "INVALID",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri());
        let result = provider.fetch_price("INVALID").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "No price data found for symbol: INVALID"
        );
    }

    #[tokio::test]
    async fn test_price_api_error_response() {
        let mock_server = create_mock_server("1810.HK", ResponseTemplate::new(500)).await;

        let provider = YahooFinanceProvider::new(&mock_server.uri());
        let result = provider.fetch_price("1810.HK").await;
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for symbol: 1810.HK"
        );
    }

    #[tokio::test]
    async fn test_price_api_malformed_response() {
        let mock_response = r#"{"chart": {"results": []}}"#;
        let mock_server = create_mock_server(
            "1810.HK",
            ResponseTemplate::new(200).set_body_string(mock_response),
        )
        .await;

        let provider = YahooFinanceProvider::new(&mock_server.uri());
        let result = provider.fetch_price("1810.HK").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for 1810.HK")
        );
    }
}
