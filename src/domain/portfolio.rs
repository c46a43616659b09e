//! Single-instrument, all-in portfolio simulation.
//!
//! The simulator is a fold over the bars: each bar applies its position
//! change to a [`Book`] and records the resulting portfolio value. An Enter
//! converts all cash into shares at the close, an Exit converts all shares
//! back to cash at the close. There are no costs, no slippage and no
//! fractional-share rounding.

use chrono::NaiveDate;
use tracing::debug;

use super::error::BistraderError;
use super::ohlcv::{OhlcvBar, PriceSeries};
use super::position::{OpenPosition, Trade};
use super::signal::{PositionChange, Signal};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub portfolio_value: f64,
}

/// Output of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    /// One point per bar, aligned with the input series.
    pub equity_curve: Vec<EquityPoint>,
    /// Realized round trips in chronological order.
    pub trades: Vec<Trade>,
    /// Position still held at the last bar, if any.
    pub open_position: Option<OpenPosition>,
}

impl Simulation {
    pub fn final_value(&self) -> Option<f64> {
        self.equity_curve.last().map(|p| p.portfolio_value)
    }

    pub fn values(&self) -> Vec<f64> {
        self.equity_curve.iter().map(|p| p.portfolio_value).collect()
    }
}

#[derive(Debug, Clone)]
struct Book {
    cash: f64,
    shares: f64,
    state: Signal,
    pending: Option<OpenPosition>,
}

impl Book {
    fn new(initial_capital: f64) -> Self {
        Book {
            cash: initial_capital,
            shares: 0.0,
            state: Signal::Flat,
            pending: None,
        }
    }

    /// Apply one bar's change; returns the trade closed on this bar, if any.
    fn apply(
        &mut self,
        index: usize,
        bar: &OhlcvBar,
        change: PositionChange,
    ) -> Result<Option<Trade>, BistraderError> {
        match (self.state, change) {
            (Signal::Flat, PositionChange::Enter) => {
                if bar.close <= 0.0 {
                    return Err(BistraderError::malformed(
                        index,
                        Some(bar.date),
                        format!("cannot enter at non-positive close {}", bar.close),
                    ));
                }
                self.shares = self.cash / bar.close;
                self.cash = 0.0;
                self.state = Signal::Long;
                self.pending = Some(OpenPosition {
                    entry_date: bar.date,
                    entry_price: bar.close,
                    shares: self.shares,
                });
                debug!(date = %bar.date, price = bar.close, shares = self.shares, "enter");
                Ok(None)
            }
            (Signal::Long, PositionChange::Exit) => {
                self.cash = self.shares * bar.close;
                self.shares = 0.0;
                self.state = Signal::Flat;
                let trade = self.pending.take().map(|pos| pos.close(bar.date, bar.close));
                debug!(date = %bar.date, price = bar.close, cash = self.cash, "exit");
                Ok(trade)
            }
            // Enter while Long and Exit while Flat leave the book untouched.
            _ => Ok(None),
        }
    }

    fn value(&self, close: f64) -> f64 {
        match self.state {
            Signal::Long => self.shares * close,
            Signal::Flat => self.cash,
        }
    }
}

/// Run the all-in long/flat simulation over `series`.
///
/// `changes` must hold exactly one entry per bar.
pub fn simulate(
    series: &PriceSeries,
    changes: &[PositionChange],
    initial_capital: f64,
) -> Result<Simulation, BistraderError> {
    if changes.len() != series.len() {
        return Err(BistraderError::invalid_parameter(
            "changes",
            format!(
                "length {} does not match series length {}",
                changes.len(),
                series.len()
            ),
        ));
    }

    let start: (Book, Vec<EquityPoint>, Vec<Trade>) = (
        Book::new(initial_capital),
        Vec::with_capacity(series.len()),
        Vec::new(),
    );

    let (book, equity_curve, trades) = series.bars().iter().zip(changes).enumerate().try_fold(
        start,
        |(mut book, mut curve, mut trades), (index, (bar, &change))| {
            if let Some(trade) = book.apply(index, bar, change)? {
                trades.push(trade);
            }
            curve.push(EquityPoint {
                date: bar.date,
                portfolio_value: book.value(bar.close),
            });
            Ok::<_, BistraderError>((book, curve, trades))
        },
    )?;

    Ok(Simulation {
        equity_curve,
        trades,
        open_position: book.pending,
    })
}
