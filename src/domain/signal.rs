//! Per-bar signals, position changes and the signal-generator seam.
//!
//! A generator turns bars plus precomputed indicators into one [`Signal`] per
//! bar. The signal at bar `t` may only read indicator values at or before `t`;
//! every indicator in this crate is a trailing window, so indexing at `t` is
//! sufficient.

use std::fmt;

use super::error::BistraderError;
use super::indicator::{IndicatorSet, IndicatorType};
use super::ohlcv::PriceSeries;

/// Desired position state at a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    #[default]
    Flat = 0,
    Long = 1,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        self as i8
    }
}

/// Transition between the previous bar's signal and this bar's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PositionChange {
    #[default]
    None,
    Enter,
    Exit,
}

impl fmt::Display for PositionChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionChange::None => write!(f, ""),
            PositionChange::Enter => write!(f, "ENTER"),
            PositionChange::Exit => write!(f, "EXIT"),
        }
    }
}

/// Derive position changes from a signal series.
///
/// The state before bar 0 is Flat, so a Long first bar enters immediately.
pub fn position_changes(signals: &[Signal]) -> Vec<PositionChange> {
    let mut prev = Signal::Flat;
    signals
        .iter()
        .map(|&signal| {
            let change = match (prev, signal) {
                (Signal::Flat, Signal::Long) => PositionChange::Enter,
                (Signal::Long, Signal::Flat) => PositionChange::Exit,
                _ => PositionChange::None,
            };
            prev = signal;
            change
        })
        .collect()
}

/// Number of Enter changes in a series.
pub fn count_entries(changes: &[PositionChange]) -> usize {
    changes
        .iter()
        .filter(|c| **c == PositionChange::Enter)
        .count()
}

/// Strategy capability: market data in, one signal per bar out.
///
/// Implementations must be pure. The same series and indicators always yield
/// the same signals, and nothing may depend on portfolio state.
pub trait SignalGenerator: Send + Sync {
    /// Display name including parameters, e.g. `MA Crossover (20/50)`.
    fn name(&self) -> String;

    /// Indicators that must be present in the set passed to `compute_signal`.
    fn required_indicators(&self) -> Vec<IndicatorType>;

    /// Reject out-of-range parameters before any computation runs.
    fn validate(&self) -> Result<(), BistraderError>;

    fn compute_signal(&self, series: &PriceSeries, indicators: &IndicatorSet) -> Vec<Signal>;
}
