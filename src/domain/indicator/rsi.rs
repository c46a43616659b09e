//! RSI (Relative Strength Index) indicator.
//!
//! Consecutive close changes are split into gains and losses, each averaged
//! with a simple rolling mean over the last n changes:
//!
//! RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 (a flat window included).
//!
//! Warmup: first n bars are undefined (n changes are needed).

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi(period);
    if period == 0 || bars.len() <= period {
        return IndicatorSeries::all_undefined(indicator_type, bars);
    }

    let mut gains: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    let mut losses: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    for pair in bars.windows(2) {
        let change = pair[1].close - pair[0].close;
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut values = Vec::with_capacity(bars.len());
    values.push(IndicatorPoint::undefined(bars[0].date));

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let change_idx = i - 1;
        if change_idx + 1 < period {
            values.push(IndicatorPoint::undefined(bar.date));
            continue;
        }

        // Summed per window (not rolled) so a loss-free window is exactly zero.
        let start = change_idx + 1 - period;
        let avg_gain = gains[start..=change_idx].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[start..=change_idx].iter().sum::<f64>() / period as f64;
        values.push(IndicatorPoint::simple(bar.date, rsi_from_averages(avg_gain, avg_loss)));
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss <= 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
