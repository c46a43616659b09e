//! Exponential moving average kernel used by MACD.
//!
//! k = 2/(n+1), seeded with the first value, then EMA[i] = X[i]*k + EMA[i-1]*(1-k).
//! No warmup: defined from the first value, though noisy for the first n.

/// Recursive EMA over raw values, seeded with the first value.
pub(crate) fn ema_values(input: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(input.len());
    let mut prev: Option<f64> = None;

    for &value in input {
        let ema = match prev {
            None => value,
            Some(p) => value * k + p * (1.0 - k),
        };
        out.push(ema);
        prev = Some(ema);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeded_with_first_value() {
        let values = ema_values(&[10.0, 20.0, 30.0], 3);
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], 10.0);
    }

    #[test]
    fn ema_recursive_calculation() {
        let values = ema_values(&[10.0, 20.0, 30.0, 40.0], 3);

        let k = 2.0 / 4.0;
        let e1 = 20.0 * k + 10.0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        let e3 = 40.0 * k + e2 * (1.0 - k);

        assert!((values[1] - e1).abs() < 1e-12);
        assert!((values[2] - e2).abs() < 1e-12);
        assert!((values[3] - e3).abs() < 1e-12);
    }

    #[test]
    fn ema_period_1_tracks_input() {
        assert_eq!(ema_values(&[10.0, 20.0, 30.0], 1), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn ema_equal_values() {
        for value in ema_values(&[100.0; 5], 3) {
            assert!((value - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_empty_input() {
        assert!(ema_values(&[], 3).is_empty());
    }
}
