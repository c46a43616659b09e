//! Simple Moving Average indicator.
//!
//! SMA(n)[i] = sum(C[i-n+1..=i]) / n
//! Warmup: first (n-1) bars are undefined. A zero period, or a period longer
//! than the series, yields an all-undefined series.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Sma(period);
    if period == 0 || period > bars.len() {
        return IndicatorSeries::all_undefined(indicator_type, bars);
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if i >= period {
            sum -= bars[i - period].close;
        }

        if i + 1 < period {
            values.push(IndicatorPoint::undefined(bar.date));
        } else {
            values.push(IndicatorPoint::simple(bar.date, sum / period as f64));
        }
    }

    IndicatorSeries {
        indicator_type,
        values,
    }
}
