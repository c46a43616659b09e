//! CSV file data adapter.
//!
//! Each symbol lives in `<data_dir>/<CODE>.csv` with a header row naming at
//! least `date,open,high,low,close,volume`. Header names are matched without
//! regard to case and any other columns (`adj_close`, ...) are ignored.

use crate::domain::error::BistraderError;
use crate::domain::ohlcv::{OhlcvBar, PriceSeries};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_DATA_DIR: &str = "data";

const REQUIRED_COLUMNS: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// Positions of the required columns within a file's header.
struct ColumnMap {
    date: usize,
    prices: [usize; 4],
    volume: usize,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self, BistraderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| BistraderError::Data {
                    reason: format!("{}: missing '{}' column", path.display(), name),
                })
        };
        let [date, open, high, low, close, volume] = REQUIRED_COLUMNS;
        Ok(ColumnMap {
            date: find(date)?,
            prices: [find(open)?, find(high)?, find(low)?, find(close)?],
            volume: find(volume)?,
        })
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let dir = config
            .get_string("backtest", "data_dir")
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        Self::new(PathBuf::from(dir.trim()))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `<base>/<code>.csv`, or failing that a CSV whose stem matches `code`
    /// ignoring ASCII case.
    fn csv_path(&self, code: &str) -> PathBuf {
        let exact = self.base_path.join(format!("{}.csv", code));
        if exact.is_file() {
            return exact;
        }
        self.csv_files()
            .into_iter()
            .find(|p| {
                p.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.eq_ignore_ascii_case(code))
            })
            .unwrap_or(exact)
    }

    fn csv_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(&self.base_path) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_csv(path))
            .collect()
    }

    fn read_bars(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<OhlcvBar>, BistraderError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => BistraderError::NoData {
                code: code.to_string(),
            },
            _ => BistraderError::Io(e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let columns = ColumnMap::from_headers(rdr.headers()?, &path)?;

        let mut bars = Vec::new();
        let mut gaps = 0usize;

        for (i, result) in rdr.records().enumerate() {
            let row = i + 1;
            let record = result?;
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let date = parse_date(field(columns.date)).ok_or_else(|| {
                BistraderError::malformed_row(
                    path.display().to_string(),
                    row,
                    None,
                    format!("invalid date '{}'", field(columns.date)),
                )
            })?;

            let raw_prices = columns.prices.map(field);
            if raw_prices.iter().all(|s| s.is_empty()) {
                gaps += 1;
                continue;
            }

            let mut prices = [0.0_f64; 4];
            for (slot, (name, raw)) in prices
                .iter_mut()
                .zip(["open", "high", "low", "close"].iter().zip(raw_prices))
            {
                *slot = parse_number(raw).ok_or_else(|| {
                    BistraderError::malformed_row(
                        path.display().to_string(),
                        row,
                        Some(date),
                        format!("invalid {name} value '{raw}'"),
                    )
                })?;
            }

            let raw_volume = field(columns.volume);
            let volume = if raw_volume.is_empty() {
                0.0
            } else {
                parse_number(raw_volume).ok_or_else(|| {
                    BistraderError::malformed_row(
                        path.display().to_string(),
                        row,
                        Some(date),
                        format!("invalid volume value '{raw_volume}'"),
                    )
                })?
            };

            if start_date.is_some_and(|s| date < s) || end_date.is_some_and(|e| date > e) {
                continue;
            }

            let [open, high, low, close] = prices;
            bars.push(OhlcvBar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        debug!(code, path = %path.display(), bars = bars.len(), gaps, "loaded csv");
        Ok(bars)
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let day = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn is_csv(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, BistraderError> {
        let bars = self.read_bars(code, start_date, end_date)?;
        PriceSeries::new(code, bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, BistraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BistraderError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();

        for entry in entries {
            let path = entry?.path();
            if !is_csv(&path) {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                symbols.push(stem.to_string_lossy().into_owned());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BistraderError> {
        match self.read_bars(code, None, None) {
            Ok(bars) => match (bars.first(), bars.last()) {
                (Some(first), Some(last)) => Ok(Some((first.date, last.date, bars.len()))),
                _ => Ok(None),
            },
            Err(BistraderError::NoData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
