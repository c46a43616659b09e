//! Open positions and realized trades.

use chrono::NaiveDate;

/// A long position opened by an Enter and not yet closed.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub shares: f64,
}

impl OpenPosition {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.shares * (price - self.entry_price)
    }

    pub fn close(self, exit_date: NaiveDate, exit_price: f64) -> Trade {
        Trade {
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            exit_date,
            exit_price,
            shares: self.shares,
        }
    }
}

/// A matched Enter/Exit pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub shares: f64,
}

impl Trade {
    pub fn is_win(&self) -> bool {
        self.exit_price > self.entry_price
    }

    pub fn pnl(&self) -> f64 {
        self.shares * (self.exit_price - self.entry_price)
    }

    /// Price return of the trade in percent; 0 for a zero entry price.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price > 0.0 {
            (self.exit_price - self.entry_price) / self.entry_price * 100.0
        } else {
            0.0
        }
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}
