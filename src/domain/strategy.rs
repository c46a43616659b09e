//! Strategy variants and their signal rules.

use std::fmt;
use std::str::FromStr;

use super::error::BistraderError;
use super::indicator::{IndicatorSet, IndicatorType};
use super::ohlcv::PriceSeries;
use super::signal::{Signal, SignalGenerator};

pub const DEFAULT_SHORT_PERIOD: usize = 20;
pub const DEFAULT_LONG_PERIOD: usize = 50;
pub const DEFAULT_RSI_PERIOD: usize = 14;
pub const DEFAULT_OVERSOLD: f64 = 30.0;
pub const DEFAULT_OVERBOUGHT: f64 = 70.0;

/// Long while the short moving average is strictly above the long one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaCrossover {
    pub short_period: usize,
    pub long_period: usize,
}

impl Default for MaCrossover {
    fn default() -> Self {
        MaCrossover {
            short_period: DEFAULT_SHORT_PERIOD,
            long_period: DEFAULT_LONG_PERIOD,
        }
    }
}

impl SignalGenerator for MaCrossover {
    fn name(&self) -> String {
        format!("MA Crossover ({}/{})", self.short_period, self.long_period)
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![
            IndicatorType::Sma(self.short_period),
            IndicatorType::Sma(self.long_period),
        ]
    }

    fn validate(&self) -> Result<(), BistraderError> {
        if self.short_period < 1 {
            return Err(BistraderError::invalid_parameter(
                "short_period",
                "must be at least 1",
            ));
        }
        if self.long_period < 1 {
            return Err(BistraderError::invalid_parameter(
                "long_period",
                "must be at least 1",
            ));
        }
        if self.short_period >= self.long_period {
            return Err(BistraderError::invalid_parameter(
                "short_period",
                format!(
                    "must be less than long_period ({} >= {})",
                    self.short_period, self.long_period
                ),
            ));
        }
        Ok(())
    }

    fn compute_signal(&self, series: &PriceSeries, indicators: &IndicatorSet) -> Vec<Signal> {
        let len = series.len();
        let short = indicators.simple_values(&IndicatorType::Sma(self.short_period), len);
        let long = indicators.simple_values(&IndicatorType::Sma(self.long_period), len);

        short
            .iter()
            .zip(&long)
            .map(|pair| match pair {
                (Some(s), Some(l)) if s > l => Signal::Long,
                _ => Signal::Flat,
            })
            .collect()
    }
}

/// Enter below `oversold`, exit above `overbought`, hold in between.
///
/// The signal is carried as state: only crossing a threshold changes it, so
/// RSI drifting back into the neutral band never flips the position. Bars with
/// undefined RSI are Flat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiThreshold {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiThreshold {
    fn default() -> Self {
        RsiThreshold {
            period: DEFAULT_RSI_PERIOD,
            oversold: DEFAULT_OVERSOLD,
            overbought: DEFAULT_OVERBOUGHT,
        }
    }
}

impl SignalGenerator for RsiThreshold {
    fn name(&self) -> String {
        format!(
            "RSI Threshold (RSI: {}, OS: {}, OB: {})",
            self.period, self.oversold, self.overbought
        )
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![IndicatorType::Rsi(self.period)]
    }

    fn validate(&self) -> Result<(), BistraderError> {
        if self.period < 1 {
            return Err(BistraderError::invalid_parameter(
                "rsi_period",
                "must be at least 1",
            ));
        }
        for (name, value) in [("oversold", self.oversold), ("overbought", self.overbought)] {
            if !(value > 0.0 && value < 100.0) {
                return Err(BistraderError::invalid_parameter(
                    name,
                    format!("must be within (0, 100), got {value}"),
                ));
            }
        }
        if self.oversold >= self.overbought {
            return Err(BistraderError::invalid_parameter(
                "oversold",
                format!(
                    "must be less than overbought ({} >= {})",
                    self.oversold, self.overbought
                ),
            ));
        }
        Ok(())
    }

    fn compute_signal(&self, series: &PriceSeries, indicators: &IndicatorSet) -> Vec<Signal> {
        let rsi = indicators.simple_values(&IndicatorType::Rsi(self.period), series.len());

        let mut state = Signal::Flat;
        rsi.iter()
            .map(|value| {
                state = match *value {
                    None => Signal::Flat,
                    Some(r) if r < self.oversold => Signal::Long,
                    Some(r) if r > self.overbought => Signal::Flat,
                    Some(_) => state,
                };
                state
            })
            .collect()
    }
}

/// Strategy family selected in config or on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    MaCrossover,
    RsiThreshold,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ma" | "ma_crossover" => Ok(StrategyKind::MaCrossover),
            "rsi" | "rsi_threshold" => Ok(StrategyKind::RsiThreshold),
            other => Err(format!(
                "unknown strategy type '{other}' (expected ma_crossover or rsi)"
            )),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::MaCrossover => write!(f, "ma_crossover"),
            StrategyKind::RsiThreshold => write!(f, "rsi"),
        }
    }
}

/// Tagged union over the supported strategies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Strategy {
    MaCrossover(MaCrossover),
    RsiThreshold(RsiThreshold),
}

impl Strategy {
    pub fn generator(&self) -> &dyn SignalGenerator {
        match self {
            Strategy::MaCrossover(s) => s,
            Strategy::RsiThreshold(s) => s,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::MaCrossover(_) => StrategyKind::MaCrossover,
            Strategy::RsiThreshold(_) => StrategyKind::RsiThreshold,
        }
    }

    pub fn name(&self) -> String {
        self.generator().name()
    }

    pub fn validate(&self) -> Result<(), BistraderError> {
        self.generator().validate()
    }

    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        self.generator().required_indicators()
    }

    pub fn compute_signal(&self, series: &PriceSeries, indicators: &IndicatorSet) -> Vec<Signal> {
        self.generator().compute_signal(series, indicators)
    }
}

impl From<MaCrossover> for Strategy {
    fn from(s: MaCrossover) -> Self {
        Strategy::MaCrossover(s)
    }
}

impl From<RsiThreshold> for Strategy {
    fn from(s: RsiThreshold) -> Self {
        Strategy::RsiThreshold(s)
    }
}
