//! CSV report writer.
//!
//! For every result three files are written into the output directory:
//! - `<CODE>_series.csv`: bars, indicator columns, signal, position change and
//!   portfolio value per bar; undefined indicator values are empty cells
//! - `<CODE>_trades.csv`: realized trades
//! - `<CODE>_summary.csv`: metric name and value pairs, plus the open
//!   position marked to the last close when the run ends long
//!
//! [`ReportPort::write_batch`] additionally writes `summary.csv` with one row
//! per code.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BistraderError;
use crate::domain::indicator::IndicatorSet;
use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use crate::ports::report_port::ReportPort;

pub const BATCH_SUMMARY_FILE: &str = "summary.csv";

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

#[derive(Serialize)]
struct MetricRow<'a> {
    metric: &'a str,
    value: String,
}

#[derive(Serialize)]
struct BatchRow<'a> {
    code: &'a str,
    strategy: &'a str,
    bars: usize,
    total_return_pct: f64,
    sharpe_ratio: f64,
    max_drawdown_pct: f64,
    win_rate_pct: f64,
    trade_count: usize,
    final_value: f64,
}

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    pub fn series_path(output_dir: &Path, code: &str) -> PathBuf {
        output_dir.join(format!("{code}_series.csv"))
    }

    pub fn trades_path(output_dir: &Path, code: &str) -> PathBuf {
        output_dir.join(format!("{code}_trades.csv"))
    }

    pub fn summary_path(output_dir: &Path, code: &str) -> PathBuf {
        output_dir.join(format!("{code}_summary.csv"))
    }

    fn write_series(result: &BacktestResult, path: &Path) -> Result<(), BistraderError> {
        let mut wtr = csv::Writer::from_path(path)?;

        let mut header = bar_header();
        header.extend(result.indicator_columns());
        header.extend(["signal", "position_change", "portfolio_value"].map(String::from));
        wtr.write_record(&header)?;

        for row in result.rows() {
            let mut record = bar_fields(&row.bar);
            record.extend(row.indicators.iter().map(|v| format_optional(*v)));
            record.push(row.signal.as_i8().to_string());
            record.push(row.change.to_string());
            record.push(format!("{:.2}", row.portfolio_value));
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }

    fn write_trades(result: &BacktestResult, path: &Path) -> Result<(), BistraderError> {
        let mut wtr = csv::Writer::from_path(path)?;

        wtr.write_record([
            "entry_date",
            "entry_price",
            "exit_date",
            "exit_price",
            "shares",
            "return_pct",
            "pnl",
            "holding_days",
        ])?;

        for t in &result.trades {
            wtr.write_record([
                &t.entry_date.to_string(),
                &format!("{:.4}", t.entry_price),
                &t.exit_date.to_string(),
                &format!("{:.4}", t.exit_price),
                &format!("{:.6}", t.shares),
                &format!("{:.4}", t.return_pct()),
                &format!("{:.2}", t.pnl()),
                &t.holding_days().to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    fn write_summary(result: &BacktestResult, path: &Path) -> Result<(), BistraderError> {
        let mut wtr = csv::Writer::from_path(path)?;

        let bars = result.series.len().to_string();
        let capital = format!("{:.2}", result.initial_capital);
        let mut rows = vec![
            MetricRow {
                metric: "code",
                value: result.code().to_string(),
            },
            MetricRow {
                metric: "strategy",
                value: result.strategy_name.clone(),
            },
            MetricRow {
                metric: "bars",
                value: bars,
            },
            MetricRow {
                metric: "initial_capital",
                value: capital,
            },
        ];
        rows.extend(
            result
                .metrics
                .entries()
                .into_iter()
                .map(|(metric, value)| MetricRow {
                    metric,
                    value: format_metric(metric, value),
                }),
        );
        if let Some(open) = &result.open_position {
            rows.push(MetricRow {
                metric: "open_position_entry_date",
                value: open.entry_date.to_string(),
            });
            rows.push(MetricRow {
                metric: "open_position_entry_price",
                value: format!("{:.4}", open.entry_price),
            });
            let last_close = result.series.bars().last().map_or(open.entry_price, |b| b.close);
            rows.push(MetricRow {
                metric: "open_position_market_value",
                value: format!("{:.2}", open.market_value(last_close)),
            });
            rows.push(MetricRow {
                metric: "open_position_unrealized_pnl",
                value: format!("{:.2}", open.unrealized_pnl(last_close)),
            });
        }

        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_dir: &Path) -> Result<(), BistraderError> {
        fs::create_dir_all(output_dir)?;
        let code = result.code();

        Self::write_series(result, &Self::series_path(output_dir, code))?;
        Self::write_trades(result, &Self::trades_path(output_dir, code))?;
        Self::write_summary(result, &Self::summary_path(output_dir, code))?;

        info!(code, dir = %output_dir.display(), "report written");
        Ok(())
    }

    fn write_batch(
        &self,
        results: &[BacktestResult],
        output_dir: &Path,
    ) -> Result<(), BistraderError> {
        for result in results {
            self.write(result, output_dir)?;
        }

        let mut wtr = csv::Writer::from_path(output_dir.join(BATCH_SUMMARY_FILE))?;
        for result in results {
            let m = &result.metrics;
            wtr.serialize(BatchRow {
                code: result.code(),
                strategy: &result.strategy_name,
                bars: result.series.len(),
                total_return_pct: m.total_return_pct,
                sharpe_ratio: m.sharpe_ratio,
                max_drawdown_pct: m.max_drawdown_pct,
                win_rate_pct: m.win_rate_pct,
                trade_count: m.trade_count,
                final_value: m.final_value,
            })?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Write bars joined with every indicator column in `indicators`.
pub fn write_indicator_table<W: io::Write>(
    series: &PriceSeries,
    indicators: &IndicatorSet,
    writer: W,
) -> Result<(), BistraderError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let columns = indicators.columns();

    let mut header = bar_header();
    header.extend(columns.iter().map(|(name, _)| name.clone()));
    wtr.write_record(&header)?;

    for (i, bar) in series.bars().iter().enumerate() {
        let mut record = bar_fields(bar);
        record.extend(columns.iter().map(|(_, values)| format_optional(values[i])));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn bar_header() -> Vec<String> {
    ["date", "open", "high", "low", "close", "volume"]
        .map(String::from)
        .to_vec()
}

fn bar_fields(bar: &OhlcvBar) -> Vec<String> {
    vec![
        bar.date.to_string(),
        bar.open.to_string(),
        bar.high.to_string(),
        bar.low.to_string(),
        bar.close.to_string(),
        bar.volume.to_string(),
    ]
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

fn format_metric(name: &str, value: f64) -> String {
    match name {
        "trade_count" | "closed_trade_count" => format!("{}", value as usize),
        _ => format!("{:.4}", value),
    }
}
