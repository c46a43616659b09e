//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorValue`: enum for different indicator output shapes
//! - `IndicatorType`: enum for indicator identity + parameters (serves as map key)
//! - `IndicatorSeries`: a time series of indicator values, aligned to the bars
//! - `IndicatorSet`: every indicator computed for one run
//!
//! Warm-up bars carry `value: None`. Nothing downstream may read them as zero.

pub mod bollinger;
mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use bollinger::calculate_bollinger;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::ohlcv::OhlcvBar;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<IndicatorValue>,
}

impl IndicatorPoint {
    pub fn undefined(date: NaiveDate) -> Self {
        IndicatorPoint { date, value: None }
    }

    pub fn simple(date: NaiveDate, value: f64) -> Self {
        IndicatorPoint {
            date,
            value: Some(IndicatorValue::Simple(value)),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }

    /// The scalar value, if this point is defined and single-valued.
    pub fn as_simple(&self) -> Option<f64> {
        match self.value {
            Some(IndicatorValue::Simple(v)) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

impl IndicatorValue {
    /// Component values in the same order as [`IndicatorType::column_names`].
    pub fn components(&self) -> Vec<f64> {
        match *self {
            IndicatorValue::Simple(v) => vec![v],
            IndicatorValue::Macd {
                line,
                signal,
                histogram,
            } => vec![line, signal, histogram],
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => vec![upper, middle, lower],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl IndicatorType {
    /// Standard panel computed alongside every strategy: SMA 20/50/200,
    /// RSI 14, MACD 12/26/9 and Bollinger 20/2.
    pub fn chart_panel() -> Vec<IndicatorType> {
        vec![
            IndicatorType::Sma(20),
            IndicatorType::Sma(50),
            IndicatorType::Sma(200),
            IndicatorType::Rsi(rsi::DEFAULT_PERIOD),
            IndicatorType::Macd {
                fast: macd::DEFAULT_FAST,
                slow: macd::DEFAULT_SLOW,
                signal: macd::DEFAULT_SIGNAL,
            },
            IndicatorType::Bollinger {
                period: bollinger::DEFAULT_PERIOD,
                stddev_mult_x100: bollinger::DEFAULT_MULT_X100,
            },
        ]
    }

    /// Number of bars needed before the first defined value.
    pub fn lookback(&self) -> usize {
        match *self {
            IndicatorType::Sma(period) => period,
            IndicatorType::Macd { .. } => 1,
            IndicatorType::Rsi(period) => period + 1,
            IndicatorType::Bollinger { period, .. } => period,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        match self {
            IndicatorType::Macd { .. } => vec![
                format!("{self}.line"),
                format!("{self}.signal"),
                format!("{self}.histogram"),
            ],
            IndicatorType::Bollinger { .. } => vec![
                format!("{self}.upper"),
                format!("{self}.middle"),
                format!("{self}.lower"),
            ],
            _ => vec![self.to_string()],
        }
    }

    pub fn calculate(&self, bars: &[OhlcvBar]) -> IndicatorSeries {
        match *self {
            IndicatorType::Sma(period) => calculate_sma(bars, period),
            IndicatorType::Rsi(period) => calculate_rsi(bars, period),
            IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => calculate_bollinger(bars, period, stddev_mult_x100),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub(crate) fn all_undefined(indicator_type: IndicatorType, bars: &[OhlcvBar]) -> Self {
        IndicatorSeries {
            indicator_type,
            values: bars.iter().map(|b| IndicatorPoint::undefined(b.date)).collect(),
        }
    }

    pub fn is_all_undefined(&self) -> bool {
        self.values.iter().all(|p| !p.is_defined())
    }

    /// Scalar values per bar; `None` for warm-up bars and multi-valued points.
    pub fn simple_values(&self) -> Vec<Option<f64>> {
        self.values.iter().map(IndicatorPoint::as_simple).collect()
    }

    /// Flattened output columns, one per component.
    pub fn columns(&self) -> Vec<(String, Vec<Option<f64>>)> {
        self.indicator_type
            .column_names()
            .into_iter()
            .enumerate()
            .map(|(component, name)| {
                let column = self
                    .values
                    .iter()
                    .map(|p| p.value.map(|v| v.components()[component]))
                    .collect();
                (name, column)
            })
            .collect()
    }
}

/// All indicators computed for one price series, keyed and ordered by type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSet {
    series: BTreeMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    /// Compute each distinct indicator once over `bars`.
    pub fn compute(bars: &[OhlcvBar], types: &[IndicatorType]) -> Self {
        let mut series = BTreeMap::new();
        for indicator_type in types {
            series
                .entry(*indicator_type)
                .or_insert_with(|| indicator_type.calculate(bars));
        }
        IndicatorSet { series }
    }

    pub fn get(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    /// Scalar values of one indicator; all `None` when it was not computed.
    pub fn simple_values(&self, indicator_type: &IndicatorType, len: usize) -> Vec<Option<f64>> {
        match self.series.get(indicator_type) {
            Some(series) => series.simple_values(),
            None => vec![None; len],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IndicatorType, &IndicatorSeries)> {
        self.series.iter()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Indicators whose lookback never completed over the series.
    pub fn undefined_types(&self) -> Vec<IndicatorType> {
        self.series
            .values()
            .filter(|s| s.is_all_undefined())
            .map(|s| s.indicator_type)
            .collect()
    }

    pub fn columns(&self) -> Vec<(String, Vec<Option<f64>>)> {
        self.series.values().flat_map(|s| s.columns()).collect()
    }
}

#[cfg(test)]
pub(crate) fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    prices
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: base + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 200,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,2)");
        assert_eq!(
            boll.column_names(),
            vec![
                "BOLLINGER(20,2).upper",
                "BOLLINGER(20,2).middle",
                "BOLLINGER(20,2).lower"
            ]
        );
    }

    #[test]
    fn lookback_per_type() {
        assert_eq!(IndicatorType::Sma(20).lookback(), 20);
        assert_eq!(IndicatorType::Rsi(14).lookback(), 15);
        assert_eq!(
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9
            }
            .lookback(),
            1
        );
    }

    #[test]
    fn set_computes_duplicates_once() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let set = IndicatorSet::compute(
            &bars,
            &[IndicatorType::Sma(2), IndicatorType::Sma(2), IndicatorType::Rsi(2)],
        );
        assert_eq!(set.len(), 2);
        assert!(set.get(&IndicatorType::Sma(2)).is_some());
    }

    #[test]
    fn set_reports_undefined_columns() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let set = IndicatorSet::compute(&bars, &[IndicatorType::Sma(2), IndicatorType::Sma(5)]);
        assert_eq!(set.undefined_types(), vec![IndicatorType::Sma(5)]);
    }

    #[test]
    fn set_missing_indicator_is_all_none() {
        let set = IndicatorSet::default();
        assert_eq!(set.simple_values(&IndicatorType::Sma(3), 2), vec![None, None]);
    }

    #[test]
    fn columns_are_aligned_and_keep_undefined() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let set = IndicatorSet::compute(
            &bars,
            &[IndicatorType::Bollinger {
                period: 2,
                stddev_mult_x100: 200,
            }],
        );
        let columns = set.columns();
        assert_eq!(columns.len(), 3);
        for (_, column) in &columns {
            assert_eq!(column.len(), 3);
            assert_eq!(column[0], None);
        }
        assert_eq!(columns[1].0, "BOLLINGER(2,2).middle");
        assert_eq!(columns[1].1[1], Some(15.0));
    }

    #[test]
    fn chart_panel_contents() {
        let panel = IndicatorType::chart_panel();
        assert_eq!(panel.len(), 6);
        assert!(panel.contains(&IndicatorType::Sma(200)));
        assert!(panel.contains(&IndicatorType::Rsi(14)));
    }
}
