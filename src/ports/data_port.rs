//! Data access port trait.

use crate::domain::error::BistraderError;
use crate::domain::ohlcv::PriceSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Daily bars for `code`, optionally limited to `[start_date, end_date]`.
    fn fetch_ohlcv(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<PriceSeries, BistraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, BistraderError>;

    /// First date, last date and bar count, or `None` when the code has no data.
    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BistraderError>;
}
