//! Tools of the three experts.
//!
//! Every tool is available both as an async function returning a
//! [`ToolOutcome`](crate::outcome::ToolOutcome), which the service layer
//! calls, and as a [`Tool`](agent_experts_core::tool::Tool) the agents
//! register.

pub mod city;
pub mod crypto;
pub mod law;

use std::sync::Arc;
use std::time::Duration;

use agent_experts_core::RetryPolicy;
use reqwest::Client;

use crate::config::Upstreams;

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state of the tools that call upstream APIs.
///
/// Cheap to clone, tools clone it into their futures.
#[derive(Clone, Debug)]
pub struct ToolContext {
    client: Client,
    upstreams: Arc<Upstreams>,
    history_retry: RetryPolicy,
}

impl ToolContext {
    /// Creates a context reaching the given upstreams.
    pub fn new(upstreams: Upstreams) -> Self {
        Self {
            client: build_client(HTTP_TIMEOUT),
            upstreams: Arc::new(upstreams),
            history_retry: RetryPolicy::default(),
        }
    }

    /// Sets how market history fetches are retried.
    #[inline]
    pub fn with_history_retry(mut self, retry: RetryPolicy) -> Self {
        self.history_retry = retry;
        self
    }

    #[inline]
    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    #[inline]
    pub(crate) fn upstreams(&self) -> &Upstreams {
        &self.upstreams
    }

    #[inline]
    pub(crate) fn history_retry(&self) -> &RetryPolicy {
        &self.history_retry
    }
}

/// Builds the upstream HTTP client, falling back to the default client
/// when the configured one cannot be built.
fn build_client(timeout: Duration) -> Client {
    Client::builder().timeout(timeout).build().unwrap_or_else(|err| {
        warn!("failed to build HTTP client, using defaults: {err}");
        Client::new()
    })
}

/// Joins a base URL and a path.
pub(crate) fn endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Formats a float the way the reports print numbers: integral values keep
/// one decimal place (`20.0`), others print their shortest form.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Rounds to `digits` decimal places.
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Capitalizes the first letter of every word and lowercases the rest.
pub(crate) fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_is_alpha = false;
    for c in text.chars() {
        if prev_is_alpha {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_is_alpha = c.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn test_client_times_out_slow_upstreams() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = build_client(Duration::from_millis(100));
        let err = client.get(server.uri()).send().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            endpoint("http://localhost:8080/", "/data/2.5/weather"),
            "http://localhost:8080/data/2.5/weather"
        );
        assert_eq!(
            endpoint("https://api.coingecko.com/api/v3", "simple/price"),
            "https://api.coingecko.com/api/v3/simple/price"
        );
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(20.0), "20.0");
        assert_eq!(format_number(18.5), "18.5");
        assert_eq!(format_number(round_to(65.299999, 1)), "65.3");
        assert_eq!(format_number(-3.0), "-3.0");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("new york"), "New York");
        assert_eq!(title_case("SAN FRANCISCO"), "San Francisco");
        assert_eq!(title_case("hong-kong"), "Hong-Kong");
        assert_eq!(title_case(""), "");
    }
}
