#![allow(dead_code)]

use bistrader::domain::backtest::BacktestConfig;
use bistrader::domain::error::BistraderError;
pub use bistrader::domain::ohlcv::{OhlcvBar, PriceSeries};
use bistrader::domain::strategy::{MaCrossover, RsiThreshold, Strategy};
use bistrader::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, BistraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(BistraderError::Data {
                reason: reason.clone(),
            });
        }
        let bars: Vec<OhlcvBar> = self
            .data
            .get(code)
            .ok_or_else(|| BistraderError::NoData {
                code: code.to_string(),
            })?
            .iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s))
            .filter(|b| end_date.is_none_or(|e| b.date <= e))
            .cloned()
            .collect();
        PriceSeries::new(code, bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BistraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BistraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(BistraderError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close + 1.0,
        low: (close - 1.0).max(0.0),
        close,
        volume: 1000.0,
    }
}

/// Consecutive daily bars with the given closes.
pub fn bars_from_closes(start_date: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

pub fn series_from_closes(code: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(code, bars_from_closes("2024-01-01", closes)).unwrap()
}

/// Linearly rising bars starting at `start_price`.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| OhlcvBar {
            date: start + chrono::Duration::days(i as i64),
            open: start_price + i as f64,
            high: start_price + i as f64 + 1.0,
            low: start_price + i as f64 - 1.0,
            close: start_price + i as f64,
            volume: 1000.0,
        })
        .collect()
}

pub fn ma_strategy(short_period: usize, long_period: usize) -> Strategy {
    MaCrossover {
        short_period,
        long_period,
    }
    .into()
}

pub fn rsi_strategy(period: usize, oversold: f64, overbought: f64) -> Strategy {
    RsiThreshold {
        period,
        oversold,
        overbought,
    }
    .into()
}

/// Default config without the chart panel, so only strategy indicators run.
pub fn lean_config() -> BacktestConfig {
    BacktestConfig {
        chart_indicators: false,
        ..BacktestConfig::default()
    }
}
