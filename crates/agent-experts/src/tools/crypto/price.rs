use agent_experts_core::tool::{Tool, ToolResult, parameter_schema};
use serde::Serialize;
use serde_json::Value;

use super::{CryptoParameters, format_usd, resolve_crypto_id, unsupported_message};
use crate::outcome::ToolOutcome;
use crate::tools::{ToolContext, endpoint};

/// Spot price of a coin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CryptoPrice {
    /// One-sentence summary.
    pub report: String,
    /// The coin as requested.
    pub crypto: String,
    /// CoinGecko id of the coin.
    pub crypto_id: String,
    /// Price in US dollars.
    pub price_usd: f64,
}

/// Fetches the current USD price of `crypto` from CoinGecko.
pub async fn get_crypto_price(
    ctx: &ToolContext,
    crypto: &str,
) -> ToolOutcome<CryptoPrice> {
    let crypto = crypto.trim();
    let Some(crypto_id) = resolve_crypto_id(crypto) else {
        return ToolOutcome::error(unsupported_message(crypto));
    };

    let url = endpoint(&ctx.upstreams().coingecko_base_url, "simple/price");
    let resp = match ctx
        .client()
        .get(url)
        .query(&[("ids", crypto_id), ("vs_currencies", "usd")])
        .send()
        .await
    {
        Ok(resp) => resp,
        Err(err) => {
            return ToolOutcome::error(format!(
                "Failed to retrieve cryptocurrency price data: {err}"
            ));
        }
    };
    if let Err(err) = resp.error_for_status_ref() {
        return ToolOutcome::error(format!(
            "Failed to retrieve cryptocurrency price data: {err} (Status: {})",
            resp.status().as_u16()
        ));
    }
    let data: Value = match resp.json().await {
        Ok(data) => data,
        Err(err) => {
            return ToolOutcome::error(format!(
                "Failed to retrieve cryptocurrency price data: {err}"
            ));
        }
    };

    let Some(price) = data[crypto_id]["usd"].as_f64() else {
        return ToolOutcome::error(format!(
            "Price data not available for cryptocurrency '{crypto}'."
        ));
    };
    ToolOutcome::Success(CryptoPrice {
        report: format!(
            "The current price of {crypto} ({crypto_id}) is ${} USD.",
            format_usd(price)
        ),
        crypto: crypto.to_owned(),
        crypto_id: crypto_id.to_owned(),
        price_usd: price,
    })
}

/// A tool for spot prices.
pub struct CryptoPriceTool {
    ctx: ToolContext,
    parameter_schema: Value,
}

impl CryptoPriceTool {
    /// Creates a new price tool.
    #[inline]
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            parameter_schema: parameter_schema::<CryptoParameters>(),
        }
    }
}

impl Tool for CryptoPriceTool {
    type Input = CryptoParameters;

    fn name(&self) -> &str {
        "get_crypto_price"
    }

    fn description(&self) -> &str {
        "Returns the current price of a cryptocurrency in USD. Accepts names \
         or tickers such as 'bitcoin', 'btc', 'ethereum' or 'eth'."
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
            get_crypto_price(&ctx, &input.crypto)
                .await
                .into_tool_result()
        }
    }
}
