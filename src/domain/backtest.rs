//! Backtest pipeline: indicators, signals, simulation and metrics.
//!
//! [`run_backtest`] is a pure function of its inputs. Parameters are checked
//! before any computation, so an invalid strategy never produces a partial
//! result.

use std::fmt;

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::error::BistraderError;
use super::indicator::{IndicatorSet, IndicatorType};
use super::metrics::PerformanceMetrics;
use super::ohlcv::{OhlcvBar, PriceSeries};
use super::portfolio::{EquityPoint, simulate};
use super::position::{OpenPosition, Trade};
use super::signal::{PositionChange, Signal, count_entries, position_changes};
use super::strategy::Strategy;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Compute the standard chart panel alongside the strategy's indicators.
    pub chart_indicators: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            start_date: None,
            end_date: None,
            chart_indicators: true,
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BistraderError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BistraderError::invalid_parameter(
                "initial_capital",
                format!("must be a positive number, got {}", self.initial_capital),
            ));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(BistraderError::invalid_parameter(
                    "start_date",
                    format!("{start} is after end_date {end}"),
                ));
            }
        }
        Ok(())
    }

    fn indicator_types(&self, strategy: &Strategy) -> Vec<IndicatorType> {
        let mut types = strategy.required_indicators();
        if self.chart_indicators {
            types.extend(IndicatorType::chart_panel());
        }
        types
    }
}

/// Non-fatal diagnostics attached to a result.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// The series is shorter than the indicator's lookback, so every value
    /// is undefined.
    InsufficientHistory {
        indicator: IndicatorType,
        lookback: usize,
        bars: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::InsufficientHistory {
                indicator,
                lookback,
                bars,
            } => write!(
                f,
                "insufficient history for {indicator}: needs {lookback} bars, have {bars}"
            ),
        }
    }
}

/// One output row of the augmented series.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentedRow {
    pub bar: OhlcvBar,
    /// Values in the order of [`BacktestResult::indicator_columns`].
    pub indicators: Vec<Option<f64>>,
    pub signal: Signal,
    pub change: PositionChange,
    pub portfolio_value: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub series: PriceSeries,
    pub strategy_name: String,
    pub initial_capital: f64,
    pub indicators: IndicatorSet,
    pub signals: Vec<Signal>,
    pub changes: Vec<PositionChange>,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub open_position: Option<OpenPosition>,
    pub metrics: PerformanceMetrics,
    pub warnings: Vec<Warning>,
}

impl BacktestResult {
    pub fn code(&self) -> &str {
        self.series.code()
    }

    pub fn indicator_columns(&self) -> Vec<String> {
        self.indicators
            .iter()
            .flat_map(|(t, _)| t.column_names())
            .collect()
    }

    /// Bars joined with indicator values, signal, change and portfolio value.
    pub fn rows(&self) -> Vec<AugmentedRow> {
        let columns: Vec<Vec<Option<f64>>> = self
            .indicators
            .columns()
            .into_iter()
            .map(|(_, values)| values)
            .collect();

        self.series
            .bars()
            .iter()
            .enumerate()
            .map(|(i, bar)| AugmentedRow {
                bar: bar.clone(),
                indicators: columns.iter().map(|c| c[i]).collect(),
                signal: self.signals[i],
                change: self.changes[i],
                portfolio_value: self.equity_curve[i].portfolio_value,
            })
            .collect()
    }
}

/// Run one strategy over one price series.
pub fn run_backtest(
    series: &PriceSeries,
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, BistraderError> {
    config.validate()?;
    strategy.validate()?;

    let series = if config.start_date.is_some() || config.end_date.is_some() {
        series.within(config.start_date, config.end_date)?
    } else {
        series.clone()
    };
    let strategy_name = strategy.name();
    debug!(code = series.code(), bars = series.len(), strategy = %strategy_name, "starting backtest");

    let indicators = IndicatorSet::compute(series.bars(), &config.indicator_types(strategy));
    let warnings: Vec<Warning> = indicators
        .undefined_types()
        .into_iter()
        .map(|indicator| Warning::InsufficientHistory {
            indicator,
            lookback: indicator.lookback(),
            bars: series.len(),
        })
        .collect();
    for warning in &warnings {
        warn!(code = series.code(), "{warning}");
    }
    debug!(count = indicators.len(), "indicators computed");

    let signals = strategy.compute_signal(&series, &indicators);
    let changes = position_changes(&signals);
    let trade_count = count_entries(&changes);
    debug!(entries = trade_count, "signals computed");

    let sim = simulate(&series, &changes, config.initial_capital)?;
    let metrics = PerformanceMetrics::compute(&sim, config.initial_capital, trade_count);

    info!(
        code = series.code(),
        total_return_pct = metrics.total_return_pct,
        trades = metrics.trade_count,
        "backtest complete"
    );

    Ok(BacktestResult {
        series,
        strategy_name,
        initial_capital: config.initial_capital,
        indicators,
        signals,
        changes,
        equity_curve: sim.equity_curve,
        trades: sim.trades,
        open_position: sim.open_position,
        metrics,
        warnings,
    })
}

/// Run the same strategy over many series on the rayon pool.
///
/// Results keep the input order; a failure in one series does not affect the
/// others.
pub fn run_batch(
    inputs: &[PriceSeries],
    strategy: &Strategy,
    config: &BacktestConfig,
) -> Vec<Result<BacktestResult, BistraderError>> {
    inputs
        .par_iter()
        .map(|series| run_backtest(series, strategy, config))
        .collect()
}
