//! Simulated market data, served when CoinGecko stays unreachable.

use chrono::{Duration, Utc};
use rand::Rng;

use super::history::PricePoint;

const HOUR_MS: i64 = 60 * 60 * 1000;
const DAY_MS: i64 = 24 * HOUR_MS;
/// Largest move of a single simulated step, as a fraction.
const MAX_STEP: f64 = 0.02;

/// Rough USD price the simulation starts from.
pub fn reference_price(crypto_id: &str) -> f64 {
    match crypto_id {
        "bitcoin" => 65_000.0,
        "ethereum" => 3_500.0,
        "binancecoin" => 580.0,
        "solana" => 150.0,
        "litecoin" => 80.0,
        "chainlink" => 15.0,
        "uniswap" => 8.0,
        "polkadot" => 7.0,
        "polygon" => 0.7,
        "ripple" => 0.6,
        "cardano" => 0.45,
        "dogecoin" => 0.15,
        "shiba-inu" => 0.000_02,
        _ => 1.0,
    }
}

/// Simulates `days` of history ending now: hourly samples up to 90 days,
/// daily ones beyond, like the live market chart.
pub fn simulate_history<R: Rng>(
    rng: &mut R,
    crypto_id: &str,
    days: u32,
) -> Vec<PricePoint> {
    let days = days.max(1);
    let (steps, step_ms) = if days <= 90 {
        (days as i64 * 24, HOUR_MS)
    } else {
        (days as i64, DAY_MS)
    };
    let end = Utc::now().timestamp_millis();
    let start = end - Duration::days(days as i64).num_milliseconds();

    let mut price = reference_price(crypto_id);
    let mut points = Vec::with_capacity(steps as usize + 1);
    for step in 0..=steps {
        if step > 0 {
            price *= 1.0 + rng.gen_range(-MAX_STEP..MAX_STEP);
        }
        points.push(PricePoint {
            timestamp_ms: start + step * step_ms,
            price,
        });
    }
    points
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_hourly_samples() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = simulate_history(&mut rng, "bitcoin", 7);
        assert_eq!(points.len(), 7 * 24 + 1);
        assert_eq!(points[0].price, 65_000.0);
        assert_eq!(points[1].timestamp_ms - points[0].timestamp_ms, HOUR_MS);
        for pair in points.windows(2) {
            let step = pair[1].price / pair[0].price - 1.0;
            assert!(step.abs() <= MAX_STEP);
        }
    }

    #[test]
    fn test_daily_samples_beyond_ninety_days() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = simulate_history(&mut rng, "ethereum", 365);
        assert_eq!(points.len(), 366);
        assert_eq!(points[1].timestamp_ms - points[0].timestamp_ms, DAY_MS);
    }

    #[test]
    fn test_unknown_coin_starts_at_one() {
        let mut rng = StdRng::seed_from_u64(1);
        let points = simulate_history(&mut rng, "unknown", 1);
        assert_eq!(points[0].price, 1.0);
        assert!(points.iter().all(|p| p.price > 0.0));
    }
}
