//! Volatility estimation from a recent price window.
//!
//! Sample standard deviation of simple returns over the lookback tail of
//! the supplied price series. Returns are computed in exact decimals; the
//! final square root goes through f64, which is precise enough for a
//! threshold comparison (the ledger never sees these values).

use rust_decimal::Decimal;

use warden_core::Price;

/// Sample standard deviation of returns over the last `lookback` prices.
///
/// Returns `None` if the window holds fewer than `lookback` prices or
/// fewer than two usable returns.
#[must_use]
pub fn sample_volatility(prices: &[Price], lookback: usize) -> Option<Decimal> {
    if lookback < 2 || prices.len() < lookback {
        return None;
    }

    let window = &prices[prices.len() - lookback..];
    let mut returns = Vec::with_capacity(window.len() - 1);
    for pair in window.windows(2) {
        returns.push(pair[1].return_from(pair[0])?);
    }
    if returns.len() < 2 {
        return None;
    }

    let n = Decimal::from(returns.len() as u64);
    let mean: Decimal = returns.iter().sum::<Decimal>() / n;

    // Sample variance (n - 1 denominator).
    let sum_sq: Decimal = returns.iter().map(|r| (*r - mean) * (*r - mean)).sum();
    let variance = sum_sq / (n - Decimal::ONE);

    let variance_f64 = variance.to_string().parse::<f64>().ok()?;
    Decimal::from_f64_retain(variance_f64.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn prices(values: &[i64]) -> Vec<Price> {
        values
            .iter()
            .map(|v| Price::new(Decimal::from(*v)))
            .collect()
    }

    #[test]
    fn test_constant_prices_zero_volatility() {
        let series = prices(&[100, 100, 100, 100, 100]);
        let vol = sample_volatility(&series, 5).unwrap();
        assert_eq!(vol, Decimal::ZERO);
    }

    #[test]
    fn test_insufficient_window_returns_none() {
        let series = prices(&[100, 101]);
        assert!(sample_volatility(&series, 5).is_none());
        assert!(sample_volatility(&series, 1).is_none());
        assert!(sample_volatility(&[], 5).is_none());
    }

    #[test]
    fn test_alternating_prices_positive_volatility() {
        let series = prices(&[100, 110, 100, 110, 100, 110]);
        let vol = sample_volatility(&series, 6).unwrap();
        assert!(vol > dec!(0.05), "vol={vol} should reflect 10% swings");
    }

    #[test]
    fn test_uses_lookback_tail_only() {
        // Wild early prices, calm tail: only the tail should count.
        let mut series = prices(&[100, 200, 50, 300]);
        series.extend(prices(&[100, 100, 100, 100, 100]));

        let vol = sample_volatility(&series, 5).unwrap();
        assert_eq!(vol, Decimal::ZERO);
    }

    #[test]
    fn test_zero_price_in_window_returns_none() {
        let series = prices(&[100, 0, 100, 100, 100]);
        assert!(sample_volatility(&series, 5).is_none());
    }
}
