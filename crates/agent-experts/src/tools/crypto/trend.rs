use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use serde::Serialize;
use serde_json::Value;

use super::history::fetch_market_history;
use super::{
    CryptoParameters, format_usd, mock, resolve_crypto_id, stats,
    unsupported_message,
};
use crate::outcome::ToolOutcome;
use crate::tools::{ToolContext, round_to};

const HISTORY_DAYS: u32 = 7;
const SHORT_WINDOW: usize = 24;
const LONG_WINDOW: usize = 72;
const MOMENTUM_WINDOW: usize = 24;
const BASE_CONFIDENCE: f64 = 50.0;
const CONFIDENCE_PER_VOTE: f64 = 15.0;
const MAX_VOLATILITY_PENALTY: f64 = 20.0;
/// Confidence points lost per percent of hourly volatility.
const VOLATILITY_PENALTY_RATE: f64 = 10.0;
const DISCLAIMER: &str = "This prediction is based on simple technical \
    indicators over recent price data and is not financial advice. \
    Cryptocurrency markets are highly volatile.";

/// Indicators a prediction is based on.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendIndicators {
    /// Latest price.
    pub current_price_usd: f64,
    /// Moving average over the last 24 samples.
    pub short_term_sma_usd: f64,
    /// Moving average over the last 72 samples.
    pub long_term_sma_usd: f64,
    /// Percent change over the last 24 samples.
    pub momentum_24h_percentage: f64,
    /// Standard deviation of the step returns, in percent.
    pub volatility_percentage: f64,
}

/// Direction a coin's price is expected to take over the next 24 hours.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendPrediction {
    /// A short paragraph.
    pub report: String,
    /// The coin as requested.
    pub crypto: String,
    /// CoinGecko id of the coin.
    pub crypto_id: String,
    /// `"up"` or `"down"`.
    pub prediction: String,
    /// Confidence in percent, 10 to 95.
    pub confidence: f64,
    /// `"low"`, `"medium"` or `"high"`.
    pub confidence_level: String,
    /// The inputs of the prediction.
    pub indicators: TrendIndicators,
    /// Not financial advice.
    pub disclaimer: String,
    /// Whether the samples were simulated.
    pub is_mock_data: bool,
}

#[derive(Debug, PartialEq)]
struct Analysis {
    up: bool,
    confidence: f64,
    indicators: TrendIndicators,
}

/// Each indicator votes up (+1) or down (-1), ties vote down.
fn analyse(prices: &[f64]) -> Option<Analysis> {
    if prices.len() < 2 {
        return None;
    }
    let current = *prices.last()?;
    let short_sma = stats::simple_moving_average(prices, SHORT_WINDOW)?;
    let long_sma = stats::simple_moving_average(prices, LONG_WINDOW)?;
    let momentum = stats::momentum(prices, MOMENTUM_WINDOW)?;
    let volatility = stats::volatility(prices);

    let vote = |up: bool| -> i32 { if up { 1 } else { -1 } };
    let net = vote(short_sma > long_sma) + vote(momentum > 0.0)
        + vote(current > short_sma);

    let penalty =
        (volatility * VOLATILITY_PENALTY_RATE).min(MAX_VOLATILITY_PENALTY);
    let confidence = (BASE_CONFIDENCE
        + CONFIDENCE_PER_VOTE * f64::from(net.abs())
        - penalty)
        .clamp(10.0, 95.0);

    Some(Analysis {
        up: net > 0,
        confidence: round_to(confidence, 1),
        indicators: TrendIndicators {
            current_price_usd: current,
            short_term_sma_usd: short_sma,
            long_term_sma_usd: long_sma,
            momentum_24h_percentage: round_to(momentum, 2),
            volatility_percentage: round_to(volatility, 2),
        },
    })
}

fn confidence_level(confidence: f64) -> &'static str {
    if confidence < 50.0 {
        "low"
    } else if confidence < 70.0 {
        "medium"
    } else {
        "high"
    }
}

fn build_prediction(
    crypto: &str,
    crypto_id: &str,
    prices: &[f64],
    is_mock_data: bool,
) -> ToolOutcome<TrendPrediction> {
    let Some(analysis) = analyse(prices) else {
        return ToolOutcome::error(format!(
            "Not enough price data to predict a trend for {crypto}."
        ));
    };
    let prediction = if analysis.up { "up" } else { "down" };
    let level = confidence_level(analysis.confidence);
    let indicators = analysis.indicators;

    let mut report = format!(
        "{crypto} ({crypto_id}) is predicted to go {prediction} over the next \
         24 hours with {level} confidence ({:.1}%). The current price is ${}, \
         the 24-hour average is ${} and the 72-hour average is ${}, with \
         {:+.2}% momentum over the last 24 hours.",
        analysis.confidence,
        format_usd(indicators.current_price_usd),
        format_usd(indicators.short_term_sma_usd),
        format_usd(indicators.long_term_sma_usd),
        indicators.momentum_24h_percentage,
    );
    if is_mock_data {
        report = format!(
            "[MOCK DATA] {report} This prediction is based on simulated data \
             because live market data is currently unavailable."
        );
    }

    ToolOutcome::Success(TrendPrediction {
        report,
        crypto: crypto.to_owned(),
        crypto_id: crypto_id.to_owned(),
        prediction: prediction.to_owned(),
        confidence: analysis.confidence,
        confidence_level: level.to_owned(),
        indicators,
        disclaimer: DISCLAIMER.to_owned(),
        is_mock_data,
    })
}

/// Predicts whether the price of `crypto` goes up or down in the next 24
/// hours, from 7 days of hourly prices.
///
/// When CoinGecko stays unreachable after retries, the prediction is made
/// over simulated data and flagged with `is_mock_data`.
pub async fn predict_crypto_price_trend(
    ctx: &ToolContext,
    crypto: &str,
) -> ToolOutcome<TrendPrediction> {
    let crypto = crypto.trim();
    let Some(crypto_id) = resolve_crypto_id(crypto) else {
        return ToolOutcome::error(unsupported_message(crypto));
    };

    match fetch_market_history(ctx, crypto_id, HISTORY_DAYS).await {
        Ok(points) => {
            let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
            build_prediction(crypto, crypto_id, &prices, false)
        }
        Err(err) => {
            warn!(crypto_id, "using simulated market data: {err}");
            let prices: Vec<f64> = mock::simulate_history(
                &mut rand::thread_rng(),
                crypto_id,
                HISTORY_DAYS,
            )
            .iter()
            .map(|p| p.price)
            .collect();
            build_prediction(crypto, crypto_id, &prices, true)
        }
    }
}

/// A tool predicting the 24-hour price trend of a coin.
pub struct TrendTool {
    ctx: ToolContext,
    parameter_schema: Value,
}

impl TrendTool {
    /// Creates a new trend tool.
    #[inline]
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            parameter_schema: parameter_schema::<CryptoParameters>(),
        }
    }
}

impl Tool for TrendTool {
    type Input = CryptoParameters;

    fn name(&self) -> &str {
        "predict_crypto_price_trend"
    }

    fn description(&self) -> &str {
        "Predicts whether the price of a cryptocurrency will go up or down in \
         the next 24 hours from recent price data and technical indicators, \
         with a confidence level."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: CryptoParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let ctx = self.ctx.clone();
        async move {
            predict_crypto_price_trend(&ctx, &input.crypto)
                .await
                .into_tool_result()
        }
    }
}
