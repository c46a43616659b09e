//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for bistrader.
#[derive(Debug, thiserror::Error)]
pub enum BistraderError {
    #[error("no price data for {code}: series is empty")]
    EmptyInput { code: String },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// `index` is the 0-based position of the bar within its series.
    #[error("malformed bar at index {index}{}: {reason}", format_date(.date))]
    MalformedBar {
        index: usize,
        date: Option<NaiveDate>,
        reason: String,
    },

    /// `row` is the 1-based data row of the source file, header excluded.
    #[error("malformed row {row} in {file}{}: {reason}", format_date(.date))]
    MalformedRow {
        file: String,
        row: usize,
        date: Option<NaiveDate>,
        reason: String,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn format_date(date: &Option<NaiveDate>) -> String {
    match date {
        Some(d) => format!(" ({d})"),
        None => String::new(),
    }
}

impl BistraderError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        BistraderError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn malformed(index: usize, date: Option<NaiveDate>, reason: impl Into<String>) -> Self {
        BistraderError::MalformedBar {
            index,
            date,
            reason: reason.into(),
        }
    }

    pub fn malformed_row(
        file: impl Into<String>,
        row: usize,
        date: Option<NaiveDate>,
        reason: impl Into<String>,
    ) -> Self {
        BistraderError::MalformedRow {
            file: file.into(),
            row,
            date,
            reason: reason.into(),
        }
    }

    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            BistraderError::Io(_) | BistraderError::Csv(_) => 1,
            BistraderError::ConfigParse { .. }
            | BistraderError::ConfigMissing { .. }
            | BistraderError::ConfigInvalid { .. } => 2,
            BistraderError::Data { .. }
            | BistraderError::MalformedBar { .. }
            | BistraderError::MalformedRow { .. } => 3,
            BistraderError::InvalidParameter { .. } => 4,
            BistraderError::EmptyInput { .. } | BistraderError::NoData { .. } => 5,
        }
    }
}

impl From<&BistraderError> for std::process::ExitCode {
    fn from(err: &BistraderError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
