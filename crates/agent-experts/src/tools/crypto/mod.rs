//! Cryptocurrency prices, price changes and trend predictions from
//! CoinGecko.

mod change;
mod history;
mod mock;
mod price;
mod stats;
mod trend;

use schemars::JsonSchema;
use serde::Deserialize;

pub use change::{
    PriceChangeSummary, PriceChangeTool, get_crypto_price_change_summary,
    validate_days,
};
pub use history::{FetchError, PricePoint, fetch_market_history};
pub use price::{CryptoPrice, CryptoPriceTool, get_crypto_price};
pub use trend::{
    TrendIndicators, TrendPrediction, TrendTool, predict_crypto_price_trend,
};

/// Names and tickers mapped to CoinGecko ids.
const ALIASES: &[(&str, &str)] = &[
    ("bitcoin", "bitcoin"),
    ("btc", "bitcoin"),
    ("ethereum", "ethereum"),
    ("eth", "ethereum"),
    ("litecoin", "litecoin"),
    ("ltc", "litecoin"),
    ("ripple", "ripple"),
    ("xrp", "ripple"),
    ("cardano", "cardano"),
    ("ada", "cardano"),
    ("solana", "solana"),
    ("sol", "solana"),
    ("dogecoin", "dogecoin"),
    ("doge", "dogecoin"),
    ("polkadot", "polkadot"),
    ("dot", "polkadot"),
    ("polygon", "polygon"),
    ("matic", "polygon"),
    ("chainlink", "chainlink"),
    ("link", "chainlink"),
    ("uniswap", "uniswap"),
    ("uni", "uniswap"),
    ("binancecoin", "binancecoin"),
    ("bnb", "binancecoin"),
    ("shiba-inu", "shiba-inu"),
    ("shib", "shiba-inu"),
];

/// Resolves a coin name or ticker to its CoinGecko id.
pub fn resolve_crypto_id(crypto: &str) -> Option<&'static str> {
    let key = crypto.trim().to_lowercase();
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, id)| *id)
}

pub(crate) fn unsupported_message(crypto: &str) -> String {
    format!(
        "Cryptocurrency '{crypto}' not supported. Available options include: \
         bitcoin, ethereum, litecoin, ripple, cardano, solana, dogecoin, \
         polkadot, polygon, chainlink, uniswap, binancecoin, shiba-inu \
         (and their common aliases like btc, eth, etc.)"
    )
}

/// Formats a USD amount with thousands separators and two decimals,
/// e.g. `43,567.89`.
pub fn format_usd(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) =
        fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    // No sign for amounts that round to zero.
    let is_zero = fixed.bytes().all(|b| b == b'0' || b == b'.');
    let sign = if amount < 0.0 && !is_zero { "-" } else { "" };
    format!("{sign}{grouped}.{frac_part}")
}

/// Parameters of the tools that take a single coin.
#[derive(Deserialize, JsonSchema)]
pub struct CryptoParameters {
    #[schemars(
        description = "Name or ticker of the cryptocurrency, e.g. \"bitcoin\" or \"btc\"."
    )]
    crypto: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_crypto_id() {
        assert_eq!(resolve_crypto_id("BTC"), Some("bitcoin"));
        assert_eq!(resolve_crypto_id(" Ethereum "), Some("ethereum"));
        assert_eq!(resolve_crypto_id("matic"), Some("polygon"));
        assert_eq!(resolve_crypto_id("shib"), Some("shiba-inu"));
        assert_eq!(resolve_crypto_id("monero"), None);
        assert_eq!(resolve_crypto_id(""), None);
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(43567.891), "43,567.89");
        assert_eq!(format_usd(1234567.0), "1,234,567.00");
        assert_eq!(format_usd(999.999), "1,000.00");
        assert_eq!(format_usd(0.5), "0.50");
        assert_eq!(format_usd(0.00002), "0.00");
        assert_eq!(format_usd(-1500.25), "-1,500.25");
        assert_eq!(format_usd(-0.001), "0.00");
    }

    #[test]
    fn test_unsupported_message() {
        let message = unsupported_message("monero");
        assert!(message.starts_with("Cryptocurrency 'monero' not supported."));
        assert!(message.contains("shiba-inu"));
    }
}
