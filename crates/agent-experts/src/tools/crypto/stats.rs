//! Descriptive statistics over a price series, oldest first.

/// Percent change from `from` to `to`, `0` when `from` is zero.
pub fn percent_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        0.0
    } else {
        (to - from) / from * 100.0
    }
}

/// Mean of the last `window` prices, or of all of them when fewer.
pub fn simple_moving_average(prices: &[f64], window: usize) -> Option<f64> {
    let window = window.min(prices.len());
    if window == 0 {
        return None;
    }
    let tail = &prices[prices.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Percent change over the last `window` steps, or over the whole series
/// when it is shorter.
pub fn momentum(prices: &[f64], window: usize) -> Option<f64> {
    let last = *prices.last()?;
    let start = prices.len().saturating_sub(window + 1);
    Some(percent_change(prices[start], last))
}

/// Population standard deviation of the step returns, in percent.
pub fn volatility(prices: &[f64]) -> f64 {
    let returns: Vec<f64> = prices
        .windows(2)
        .map(|pair| percent_change(pair[0], pair[1]))
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Smallest and largest price.
pub fn min_max(prices: &[f64]) -> Option<(f64, f64)> {
    let first = *prices.first()?;
    Some(
        prices
            .iter()
            .fold((first, first), |(lo, hi), &p| (lo.min(p), hi.max(p))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_percent_change() {
        assert!(approx_eq(percent_change(100.0, 110.0), 10.0));
        assert!(approx_eq(percent_change(200.0, 150.0), -25.0));
        assert_eq!(percent_change(0.0, 5.0), 0.0);
    }

    #[test]
    fn test_simple_moving_average() {
        let prices = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx_eq(simple_moving_average(&prices, 2).unwrap(), 4.5));
        assert!(approx_eq(simple_moving_average(&prices, 10).unwrap(), 3.0));
        assert_eq!(simple_moving_average(&[], 3), None);
    }

    #[test]
    fn test_momentum() {
        let prices = [100.0, 120.0, 90.0, 99.0];
        assert!(approx_eq(momentum(&prices, 1).unwrap(), 10.0));
        assert!(approx_eq(momentum(&prices, 2).unwrap(), -17.5));
        assert!(approx_eq(momentum(&prices, 50).unwrap(), -1.0));
        assert_eq!(momentum(&[], 3), None);
    }

    #[test]
    fn test_volatility() {
        assert_eq!(volatility(&[100.0]), 0.0);
        // Constant growth has no dispersion.
        assert!(approx_eq(volatility(&[100.0, 110.0, 121.0]), 0.0));
        // Returns +10% and -10%.
        assert!(approx_eq(volatility(&[100.0, 110.0, 99.0]), 10.0));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(min_max(&[3.0, 1.0, 2.0]), Some((1.0, 3.0)));
        assert_eq!(min_max(&[]), None);
    }
}
