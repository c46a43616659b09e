//! OHLCV bar and validated price series.

use chrono::NaiveDate;

use super::error::BistraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
    }
}

/// Daily bars for one symbol, ordered by strictly increasing date.
///
/// Only constructible through [`PriceSeries::new`], so every series seen by the
/// engine is non-empty, duplicate-free and holds finite non-negative values.
/// Missing trading days are simply absent rows.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    code: String,
    bars: Vec<OhlcvBar>,
}

impl PriceSeries {
    pub fn new(code: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, BistraderError> {
        let code = code.into();
        if bars.is_empty() {
            return Err(BistraderError::EmptyInput { code });
        }

        for (index, bar) in bars.iter().enumerate() {
            for (name, value) in bar.fields() {
                if !value.is_finite() {
                    return Err(BistraderError::malformed(
                        index,
                        Some(bar.date),
                        format!("{name} is not finite"),
                    ));
                }
                if value < 0.0 {
                    return Err(BistraderError::malformed(
                        index,
                        Some(bar.date),
                        format!("{name} is negative ({value})"),
                    ));
                }
            }
            if index > 0 && bar.date <= bars[index - 1].date {
                return Err(BistraderError::malformed(
                    index,
                    Some(bar.date),
                    format!(
                        "date does not follow previous bar {} (dates must be strictly increasing)",
                        bars[index - 1].date
                    ),
                ));
            }
        }

        Ok(Self { code, bars })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series; kept for slice-like ergonomics.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.bars[self.bars.len() - 1].date
    }

    /// Bars dated within `[start, end]`; either bound may be open.
    pub fn within(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<PriceSeries, BistraderError> {
        let bars: Vec<OhlcvBar> = self
            .bars
            .iter()
            .filter(|b| start.is_none_or(|s| b.date >= s) && end.is_none_or(|e| b.date <= e))
            .cloned()
            .collect();
        if bars.is_empty() {
            return Err(BistraderError::EmptyInput {
                code: self.code.clone(),
            });
        }
        Ok(PriceSeries {
            code: self.code.clone(),
            bars,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: &str, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn new_accepts_ordered_bars_with_gaps() {
        let series = PriceSeries::new(
            "THYAO.IS",
            vec![bar("2024-01-02", 10.0), bar("2024-01-05", 11.0)],
        )
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.code(), "THYAO.IS");
        assert_eq!(series.closes(), vec![10.0, 11.0]);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn new_rejects_empty() {
        let err = PriceSeries::new("X", vec![]).unwrap_err();
        assert!(matches!(err, BistraderError::EmptyInput { ref code } if code == "X"));
    }

    #[test]
    fn new_rejects_duplicate_date() {
        let err = PriceSeries::new("X", vec![bar("2024-01-02", 10.0), bar("2024-01-02", 11.0)])
            .unwrap_err();
        assert!(matches!(err, BistraderError::MalformedBar { index: 1, .. }));
    }

    #[test]
    fn new_rejects_descending_dates() {
        let err = PriceSeries::new("X", vec![bar("2024-01-03", 10.0), bar("2024-01-02", 11.0)])
            .unwrap_err();
        assert!(matches!(err, BistraderError::MalformedBar { index: 1, .. }));
    }

    #[test]
    fn new_rejects_nan_close() {
        let mut b = bar("2024-01-02", 10.0);
        b.close = f64::NAN;
        let err = PriceSeries::new("X", vec![bar("2024-01-01", 10.0), b]).unwrap_err();
        match err {
            BistraderError::MalformedBar { index, date, reason } => {
                assert_eq!(index, 1);
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 2));
                assert!(reason.contains("close"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn new_rejects_negative_volume() {
        let mut b = bar("2024-01-02", 10.0);
        b.volume = -5.0;
        let err = PriceSeries::new("X", vec![b]).unwrap_err();
        assert!(matches!(err, BistraderError::MalformedBar { index: 0, .. }));
    }

    #[test]
    fn within_filters_inclusive_range() {
        let series = PriceSeries::new(
            "X",
            vec![
                bar("2024-01-01", 10.0),
                bar("2024-01-02", 11.0),
                bar("2024-01-03", 12.0),
                bar("2024-01-04", 13.0),
            ],
        )
        .unwrap();

        let sliced = series
            .within(NaiveDate::from_ymd_opt(2024, 1, 2), NaiveDate::from_ymd_opt(2024, 1, 3))
            .unwrap();
        assert_eq!(sliced.closes(), vec![11.0, 12.0]);

        let open_start = series.within(None, NaiveDate::from_ymd_opt(2024, 1, 1)).unwrap();
        assert_eq!(open_start.len(), 1);

        let err = series
            .within(NaiveDate::from_ymd_opt(2025, 1, 1), None)
            .unwrap_err();
        assert!(matches!(err, BistraderError::EmptyInput { .. }));
    }
}
