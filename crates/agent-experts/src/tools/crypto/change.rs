use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::history::{PricePoint, fetch_market_history};
use super::{format_usd, mock, resolve_crypto_id, stats, unsupported_message};
use crate::outcome::ToolOutcome;
use crate::tools::{ToolContext, round_to};

/// Longest supported look-back period.
pub const MAX_DAYS: i64 = 365;
const DEFAULT_DAYS: i64 = 7;

/// How a coin's price moved over a period.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PriceChangeSummary {
    /// A short paragraph.
    pub report: String,
    /// The coin as requested.
    pub crypto: String,
    /// CoinGecko id of the coin.
    pub crypto_id: String,
    /// Length of the period.
    pub days: u32,
    /// First price of the period.
    pub initial_price_usd: f64,
    /// Last price of the period.
    pub final_price_usd: f64,
    /// Absolute change.
    pub price_change_usd: f64,
    /// Relative change, two decimal places.
    pub price_change_percentage: f64,
    /// Highest price of the period.
    pub highest_price_usd: f64,
    /// Lowest price of the period.
    pub lowest_price_usd: f64,
    /// Number of samples the summary is based on.
    pub data_points: usize,
    /// Whether the samples were simulated.
    pub is_mock_data: bool,
}

/// Validates a look-back period.
pub fn validate_days(days: i64) -> Result<u32, String> {
    if days <= 0 {
        return Err("Number of days must be a positive integer".to_owned());
    }
    if days > MAX_DAYS {
        return Err("Maximum supported time period is 365 days".to_owned());
    }
    Ok(days as u32)
}

fn summarize(
    crypto: &str,
    crypto_id: &str,
    days: u32,
    points: &[PricePoint],
    is_mock_data: bool,
) -> ToolOutcome<PriceChangeSummary> {
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    let (Some(&initial), Some(&last), Some((lowest, highest))) =
        (prices.first(), prices.last(), stats::min_max(&prices))
    else {
        return ToolOutcome::error(not_enough_data(crypto, days));
    };
    if prices.len() < 2 {
        return ToolOutcome::error(not_enough_data(crypto, days));
    }

    let change = last - initial;
    let change_pct = round_to(stats::percent_change(initial, last), 2);
    let direction = if change >= 0.0 { "up" } else { "down" };
    let mut report = format!(
        "Over the last {days} days, the price of {crypto} ({crypto_id}) went \
         {direction} from ${} to ${} ({change_pct:+.2}%). It ranged between \
         ${} and ${}.",
        format_usd(initial),
        format_usd(last),
        format_usd(lowest),
        format_usd(highest),
    );
    if is_mock_data {
        report = format!(
            "[MOCK DATA] {report} This summary is based on simulated data \
             because live market data is currently unavailable."
        );
    }

    ToolOutcome::Success(PriceChangeSummary {
        report,
        crypto: crypto.to_owned(),
        crypto_id: crypto_id.to_owned(),
        days,
        initial_price_usd: initial,
        final_price_usd: last,
        price_change_usd: change,
        price_change_percentage: change_pct,
        highest_price_usd: highest,
        lowest_price_usd: lowest,
        data_points: prices.len(),
        is_mock_data,
    })
}

fn not_enough_data(crypto: &str, days: u32) -> String {
    format!("Not enough price data to summarize {crypto} over {days} days.")
}

/// Summarizes how the USD price of `crypto` changed over the last `days`.
///
/// When CoinGecko stays unreachable after retries, the summary is computed
/// over simulated data and flagged with `is_mock_data`.
pub async fn get_crypto_price_change_summary(
    ctx: &ToolContext,
    crypto: &str,
    days: i64,
) -> ToolOutcome<PriceChangeSummary> {
    let crypto = crypto.trim();
    let days = match validate_days(days) {
        Ok(days) => days,
        Err(message) => return ToolOutcome::error(message),
    };
    let Some(crypto_id) = resolve_crypto_id(crypto) else {
        return ToolOutcome::error(unsupported_message(crypto));
    };

    match fetch_market_history(ctx, crypto_id, days).await {
        Ok(points) => summarize(crypto, crypto_id, days, &points, false),
        Err(err) => {
            warn!(crypto_id, "using simulated market data: {err}");
            let points =
                mock::simulate_history(&mut rand::thread_rng(), crypto_id, days);
            summarize(crypto, crypto_id, days, &points, true)
        }
    }
}

/// Parameters of [`PriceChangeTool`].
#[derive(Deserialize, JsonSchema)]
pub struct PriceChangeParameters {
    #[schemars(description = "Name or ticker of the cryptocurrency.")]
    crypto: String,
    #[schemars(description = "Number of days to look back, 1 to 365. Defaults to 7.")]
    days: Option<i64>,
}

/// A tool summarizing price changes over a period.
pub struct PriceChangeTool {
    ctx: ToolContext,
    parameter_schema: Value,
}

impl PriceChangeTool {
    /// Creates a new price change tool.
    #[inline]
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            parameter_schema: parameter_schema::<PriceChangeParameters>(),
        }
    }
}

impl Tool for PriceChangeTool {
    type Input = PriceChangeParameters;

    fn name(&self) -> &str {
        "get_crypto_price_change_summary"
    }

    fn description(&self) -> &str {
        "Summarizes how the price of a cryptocurrency changed over the last \
         given number of days: start and end price, change, highest and lowest."
    }

    fn parameter_schema(&self) -> &Value {
        &self.parameter_schema
    }

    #[allow(clippy::manual_async_fn)]
    fn execute(
        &self,
        input: PriceChangeParameters,
    ) -> impl Future<Output = ToolResult> + Send + 'static {
        let ctx = self.ctx.clone();
        async move {
            let days = input.days.unwrap_or(DEFAULT_DAYS);
            get_crypto_price_change_summary(&ctx, &input.crypto, days)
                .await
                .into_tool_result()
        }
    }
}
