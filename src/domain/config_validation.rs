//! Configuration validation.
//!
//! Checks every config field before a run so that a bad value is reported
//! against its section and key rather than surfacing mid-pipeline.

use std::str::FromStr;

use crate::domain::error::BistraderError;
use crate::domain::strategy::StrategyKind;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BistraderError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_data_dir(config)?;
    validate_chart_indicators(config)?;
    Ok(())
}

/// Check that the `[strategy]` keys used by `kind` parse, ignoring the others.
///
/// Relations between parameters (short below long, thresholds within 0..100)
/// are left to `Strategy::validate`, which reports them as `InvalidParameter`.
pub fn validate_strategy_params(
    config: &dyn ConfigPort,
    kind: StrategyKind,
) -> Result<(), BistraderError> {
    match kind {
        StrategyKind::MaCrossover => validate_ma_periods(config),
        StrategyKind::RsiThreshold => validate_rsi_params(config),
    }
}

/// At least one code must be configured through `codes` or `code`.
pub fn validate_codes(config: &dyn ConfigPort) -> Result<(), BistraderError> {
    let codes = config.get_string("backtest", "codes");
    let code = config.get_string("backtest", "code");

    match (codes, code) {
        (Some(c), _) if c.split(',').any(|s| !s.trim().is_empty()) => Ok(()),
        (_, Some(c)) if !c.trim().is_empty() => Ok(()),
        _ => Err(BistraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "code".to_string(),
        }),
    }
}

/// Strategy type from `[strategy] type`, defaulting to the MA crossover.
pub fn strategy_kind(config: &dyn ConfigPort) -> Result<StrategyKind, BistraderError> {
    match config.get_string("strategy", "type") {
        None => Ok(StrategyKind::MaCrossover),
        Some(s) => s.parse().map_err(|reason| invalid("strategy", "type", reason)),
    }
}

/// Parse an optional `YYYY-MM-DD` value.
pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, BistraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .map(Some)
            .map_err(|_| {
                invalid(
                    section,
                    key,
                    format!("invalid date '{s}', expected YYYY-MM-DD"),
                )
            }),
    }
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BistraderError {
    BistraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_value<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, BistraderError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(section, key, format!("'{s}' is not a valid number"))),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BistraderError> {
    if let Some(value) = parse_value::<f64>(config, "backtest", "initial_capital")? {
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BistraderError> {
    let start_date = parse_date(config, "backtest", "start_date")?;
    let end_date = parse_date(config, "backtest", "end_date")?;

    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

fn validate_data_dir(config: &dyn ConfigPort) -> Result<(), BistraderError> {
    match config.get_string("backtest", "data_dir") {
        Some(s) if s.trim().is_empty() => {
            Err(invalid("backtest", "data_dir", "data_dir must not be empty"))
        }
        _ => Ok(()),
    }
}

fn validate_chart_indicators(config: &dyn ConfigPort) -> Result<(), BistraderError> {
    match config.get_string("backtest", "chart_indicators") {
        Some(s) if !matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "false" | "no" | "0"
        ) =>
        {
            Err(invalid(
                "backtest",
                "chart_indicators",
                format!("'{s}' is not a boolean"),
            ))
        }
        _ => Ok(()),
    }
}

fn validate_period(config: &dyn ConfigPort, key: &str) -> Result<(), BistraderError> {
    if let Some(value) = parse_value::<i64>(config, "strategy", key)? {
        if value < 1 {
            return Err(invalid("strategy", key, format!("{key} must be at least 1")));
        }
    }
    Ok(())
}

fn validate_ma_periods(config: &dyn ConfigPort) -> Result<(), BistraderError> {
    validate_period(config, "short_period")?;
    validate_period(config, "long_period")
}

fn validate_rsi_params(config: &dyn ConfigPort) -> Result<(), BistraderError> {
    validate_period(config, "rsi_period")?;
    for key in ["oversold", "overbought"] {
        parse_value::<f64>(config, "strategy", key)?;
    }
    Ok(())
}
