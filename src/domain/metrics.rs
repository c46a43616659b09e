//! Performance metrics over a simulated equity curve.

use super::portfolio::{EquityPoint, Simulation};
use super::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
/// Standard deviations below this fraction of |mean| are rounding noise.
const STDDEV_RELATIVE_TOLERANCE: f64 = 1e-12;

/// Summary statistics for one backtest run.
///
/// `trade_count` counts every Enter, including a position still open at the
/// last bar, while `win_rate_pct` only considers realized trades. A run ending
/// in a position therefore reports one more trade than `closed_trade_count`.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub total_return_pct: f64,
    pub sharpe_ratio: f64,
    /// Largest peak-to-trough decline in percent; never positive.
    pub max_drawdown_pct: f64,
    pub win_rate_pct: f64,
    pub trade_count: usize,
    pub final_value: f64,
    pub closed_trade_count: usize,
}

impl PerformanceMetrics {
    pub fn compute(sim: &Simulation, initial_capital: f64, trade_count: usize) -> Self {
        let final_value = sim.final_value().unwrap_or(initial_capital);

        let total_return_pct = if initial_capital > 0.0 {
            finite_or_zero((final_value - initial_capital) / initial_capital * 100.0)
        } else {
            0.0
        };

        let returns = bar_returns(&sim.equity_curve);

        PerformanceMetrics {
            total_return_pct,
            sharpe_ratio: compute_sharpe(&returns),
            max_drawdown_pct: compute_max_drawdown(&returns),
            win_rate_pct: compute_win_rate(&sim.trades),
            trade_count,
            final_value,
            closed_trade_count: sim.trades.len(),
        }
    }

    /// Metric name and value pairs in display order.
    pub fn entries(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("total_return_pct", self.total_return_pct),
            ("sharpe_ratio", self.sharpe_ratio),
            ("max_drawdown_pct", self.max_drawdown_pct),
            ("win_rate_pct", self.win_rate_pct),
            ("trade_count", self.trade_count as f64),
            ("final_value", self.final_value),
            ("closed_trade_count", self.closed_trade_count as f64),
        ]
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Simple per-bar returns of the equity curve.
///
/// A zero previous value (a zero close while long) yields a return of 0. The
/// compounded drawdown series therefore stays at zero from that bar on, and
/// the run reports a -100% drawdown even if equity later recovers.
fn bar_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].portfolio_value;
            let curr = w[1].portfolio_value;
            if prev != 0.0 {
                (curr - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualized mean over sample standard deviation of per-bar returns.
fn compute_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stddev = variance.sqrt();

    if stddev > 0.0 && stddev > mean.abs() * STDDEV_RELATIVE_TOLERANCE {
        finite_or_zero(mean / stddev * TRADING_DAYS_PER_YEAR.sqrt())
    } else {
        0.0
    }
}

fn compute_max_drawdown(returns: &[f64]) -> f64 {
    let mut cumulative = 1.0_f64;
    let mut peak = cumulative;
    let mut max_dd = 0.0_f64;

    for r in returns {
        cumulative *= 1.0 + r;
        if cumulative > peak {
            peak = cumulative;
        } else if peak > 0.0 {
            let dd = (cumulative - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    finite_or_zero(max_dd * 100.0)
}

fn compute_win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_win()).count();
    wins as f64 / trades.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                portfolio_value: v,
            })
            .collect()
    }

    fn make_trade(entry_price: f64, exit_price: f64) -> Trade {
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Trade {
            entry_date,
            entry_price,
            exit_date: entry_date + chrono::Duration::days(3),
            exit_price,
            shares: 100.0,
        }
    }

    fn make_sim(values: &[f64], trades: Vec<Trade>) -> Simulation {
        Simulation {
            equity_curve: make_equity_curve(values),
            trades,
            open_position: None,
        }
    }

    #[test]
    fn metrics_flat_run() {
        let sim = make_sim(&[100_000.0; 5], vec![]);
        let metrics = PerformanceMetrics::compute(&sim, 100_000.0, 0);

        assert_eq!(metrics.total_return_pct, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown_pct, 0.0);
        assert_eq!(metrics.win_rate_pct, 0.0);
        assert_eq!(metrics.trade_count, 0);
        assert_eq!(metrics.closed_trade_count, 0);
    }

    #[test]
    fn metrics_total_return_single_trade() {
        let sim = make_sim(&[100_000.0, 120_000.0], vec![make_trade(10.0, 12.0)]);
        let metrics = PerformanceMetrics::compute(&sim, 100_000.0, 1);

        assert_relative_eq!(metrics.total_return_pct, 20.0, epsilon = 1e-9);
        assert_relative_eq!(metrics.win_rate_pct, 100.0);
        assert_relative_eq!(metrics.final_value, 120_000.0);
    }

    #[test]
    fn metrics_empty_curve_falls_back_to_capital() {
        let sim = make_sim(&[], vec![]);
        let metrics = PerformanceMetrics::compute(&sim, 50_000.0, 0);
        assert_eq!(metrics.final_value, 50_000.0);
        assert_eq!(metrics.total_return_pct, 0.0);
    }

    #[test]
    fn sharpe_uses_sample_stddev() {
        // returns 0.1 and 0.2: mean 0.15, sample variance 0.005
        let returns = bar_returns(&make_equity_curve(&[100.0, 110.0, 132.0]));
        let expected = 0.15 / 0.005_f64.sqrt() * 252.0_f64.sqrt();
        assert_relative_eq!(compute_sharpe(&returns), expected, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_degenerate_cases_are_zero() {
        assert_eq!(compute_sharpe(&[]), 0.0);
        assert_eq!(compute_sharpe(&[0.05]), 0.0);
        assert_eq!(compute_sharpe(&[0.01, 0.01, 0.01]), 0.0);
    }

    #[test]
    fn sharpe_geometric_curve_is_zero() {
        // constant 10% returns; sigma is rounding noise only
        let returns = bar_returns(&make_equity_curve(&[100.0, 110.0, 121.0, 133.1, 146.41]));
        assert!(returns.iter().all(|r| (r - 0.1).abs() < 1e-12));
        assert_eq!(compute_sharpe(&returns), 0.0);
    }

    #[test]
    fn max_drawdown_from_running_peak() {
        let returns = bar_returns(&make_equity_curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]));
        let expected = (80.0 - 110.0) / 110.0 * 100.0;
        assert_relative_eq!(compute_max_drawdown(&returns), expected, epsilon = 1e-9);
    }

    #[test]
    fn max_drawdown_counts_drop_from_base() {
        let returns = bar_returns(&make_equity_curve(&[100.0, 90.0]));
        assert_relative_eq!(compute_max_drawdown(&returns), -10.0, epsilon = 1e-9);
    }

    #[test]
    fn max_drawdown_single_bar_is_zero() {
        assert_eq!(compute_max_drawdown(&[]), 0.0);
    }

    #[test]
    fn max_drawdown_monotonic_rise_is_zero() {
        let returns = bar_returns(&make_equity_curve(&[100.0, 101.0, 105.0]));
        assert_eq!(compute_max_drawdown(&returns), 0.0);
    }

    #[test]
    fn bar_returns_zero_previous_value() {
        let returns = bar_returns(&make_equity_curve(&[0.0, 10.0]));
        assert_eq!(returns, vec![0.0]);
    }

    #[test]
    fn drawdown_stays_at_total_loss_after_zero_value() {
        let returns = bar_returns(&make_equity_curve(&[100.0, 0.0, 50.0, 120.0]));
        assert_eq!(returns, vec![-1.0, 0.0, 0.0]);
        assert_relative_eq!(compute_max_drawdown(&returns), -100.0, epsilon = 1e-9);
    }

    #[test]
    fn win_rate_ignores_open_position() {
        let trades = vec![
            make_trade(10.0, 12.0),
            make_trade(10.0, 9.0),
            make_trade(10.0, 10.0),
            make_trade(10.0, 11.0),
        ];
        let sim = make_sim(&[100.0, 101.0], trades);
        let metrics = PerformanceMetrics::compute(&sim, 100.0, 5);

        assert_relative_eq!(metrics.win_rate_pct, 50.0);
        assert_eq!(metrics.trade_count, 5);
        assert_eq!(metrics.closed_trade_count, 4);
    }

    #[test]
    fn entries_in_display_order() {
        let sim = make_sim(&[100.0, 110.0], vec![]);
        let metrics = PerformanceMetrics::compute(&sim, 100.0, 0);
        let names: Vec<&str> = metrics.entries().iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "total_return_pct",
                "sharpe_ratio",
                "max_drawdown_pct",
                "win_rate_pct",
                "trade_count",
                "final_value",
                "closed_trade_count",
            ]
        );
    }
}
