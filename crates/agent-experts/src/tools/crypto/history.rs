use reqwest::StatusCode;
use serde::Deserialize;

use crate::tools::{ToolContext, endpoint};

/// A price sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
    /// Unix time in milliseconds.
    pub timestamp_ms: i64,
    /// Price in US dollars.
    pub price: f64,
}

/// Why market history could not be fetched.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request never got a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// CoinGecko answered with an error status.
    #[error("HTTP {status}")]
    Status {
        /// The status code.
        status: StatusCode,
    },
    /// The response was not a market chart.
    #[error("malformed market data: {0}")]
    Decode(String),
}

impl FetchError {
    /// Whether retrying might help: transport failures, rate limiting and
    /// server errors.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status } => {
                *status == StatusCode::TOO_MANY_REQUESTS
                    || status.is_server_error()
            }
            Self::Decode(_) => false,
        }
    }
}

#[derive(Deserialize)]
struct MarketChart {
    prices: Vec<(f64, f64)>,
}

/// Fetches `days` of USD price history of the coin `crypto_id`.
///
/// Transient failures are retried with the context's retry policy
/// (3 attempts, 1 s then 2 s apart, by default).
pub async fn fetch_market_history(
    ctx: &ToolContext,
    crypto_id: &str,
    days: u32,
) -> Result<Vec<PricePoint>, FetchError> {
    let policy = ctx.history_retry();
    let max_attempts = policy.max_attempts();
    let mut attempt = 0;
    let operation = || {
        attempt += 1;
        let is_last_attempt = attempt >= max_attempts;
        let current_attempt = attempt;
        async move {
            fetch_once(ctx, crypto_id, days).await.map_err(|err| {
                if err.is_transient() && !is_last_attempt {
                    warn!(
                        crypto_id,
                        "market history fetch failed on attempt {current_attempt}/{max_attempts}, retrying: {err}"
                    );
                    backoff::Error::transient(err)
                } else {
                    backoff::Error::permanent(err)
                }
            })
        }
    };
    backoff::future::retry(policy.backoff(), operation).await
}

async fn fetch_once(
    ctx: &ToolContext,
    crypto_id: &str,
    days: u32,
) -> Result<Vec<PricePoint>, FetchError> {
    let url = endpoint(
        &ctx.upstreams().coingecko_base_url,
        &format!("coins/{crypto_id}/market_chart"),
    );
    let days = days.to_string();
    let resp = ctx
        .client()
        .get(url)
        .query(&[("vs_currency", "usd"), ("days", days.as_str())])
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(FetchError::Status { status });
    }
    let body = resp.bytes().await?;
    let chart: MarketChart = serde_json::from_slice(&body)
        .map_err(|err| FetchError::Decode(err.to_string()))?;

    Ok(chart
        .prices
        .into_iter()
        .map(|(timestamp, price)| PricePoint {
            timestamp_ms: timestamp as i64,
            price,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use agent_experts_core::RetryPolicy;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Upstreams;

    fn context(server: &MockServer) -> ToolContext {
        ToolContext::new(Upstreams {
            coingecko_base_url: server.uri(),
            ..Default::default()
        })
        .with_history_retry(
            RetryPolicy::default()
                .with_initial_interval(Duration::from_millis(5)),
        )
    }

    fn chart() -> serde_json::Value {
        serde_json::json!({
            "prices": [[1700000000000u64, 100.0], [1700003600000u64, 101.5]],
            "market_caps": [],
            "total_volumes": []
        })
    }

    #[tokio::test]
    async fn test_fetch_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/bitcoin/market_chart"))
            .and(query_param("vs_currency", "usd"))
            .and(query_param("days", "7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart()))
            .expect(1)
            .mount(&server)
            .await;

        let points = fetch_market_history(&context(&server), "bitcoin", 7)
            .await
            .unwrap();
        assert_eq!(
            points,
            [
                PricePoint {
                    timestamp_ms: 1_700_000_000_000,
                    price: 100.0
                },
                PricePoint {
                    timestamp_ms: 1_700_003_600_000,
                    price: 101.5
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/ethereum/market_chart"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coins/ethereum/market_chart"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chart()))
            .expect(1)
            .mount(&server)
            .await;

        let points = fetch_market_history(&context(&server), "ethereum", 1)
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/solana/market_chart"))
            .respond_with(ResponseTemplate::new(429))
            .expect(3)
            .mount(&server)
            .await;

        let err = fetch_market_history(&context(&server), "solana", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status {
                status: StatusCode::TOO_MANY_REQUESTS
            }
        ));
    }

    #[tokio::test]
    async fn test_client_errors_are_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/cardano/market_chart"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let err = fetch_market_history(&context(&server), "cardano", 1)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_malformed_body_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/dogecoin/market_chart"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "error": "nope" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = fetch_market_history(&context(&server), "dogecoin", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
