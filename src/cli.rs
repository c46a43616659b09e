//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::{CsvReportAdapter, write_indicator_table};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestResult, DEFAULT_INITIAL_CAPITAL, run_batch};
use crate::domain::config_validation::{
    parse_date, strategy_kind, validate_backtest_config, validate_codes, validate_strategy_params,
};
use crate::domain::error::BistraderError;
use crate::domain::indicator::{IndicatorSet, IndicatorType};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::strategy::{
    DEFAULT_LONG_PERIOD, DEFAULT_OVERBOUGHT, DEFAULT_OVERSOLD, DEFAULT_RSI_PERIOD,
    DEFAULT_SHORT_PERIOD, MaCrossover, RsiThreshold, Strategy, StrategyKind,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_OUTPUT_DIR: &str = "reports";

#[derive(Parser, Debug)]
#[command(name = "bistrader", about = "Rule-based strategy backtester for daily price series")]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest for the configured codes
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated codes, replacing the config's list
        #[arg(long)]
        code: Option<String>,
        /// Strategy type (ma or rsi), replacing [strategy] type
        #[arg(short, long)]
        strategy: Option<StrategyKind>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Export the chart indicator panel for one code
    Indicators {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: String,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List codes available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for code(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Backtest {
            config,
            code,
            strategy,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, code.as_deref(), strategy)
            } else {
                run_backtest(&config, code.as_deref(), strategy, output.as_deref())
            }
        }
        Command::Indicators {
            config,
            code,
            output,
        } => run_indicators(&config, &code, output.as_deref()),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::Info { config, code } => run_info(&config, code.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Install the stderr fmt subscriber; a second call is a no-op.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("bistrader=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bistrader=info"))
    };

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BistraderError> {
    debug!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, BistraderError> {
    Ok(BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
        start_date: parse_date(adapter, "backtest", "start_date")?,
        end_date: parse_date(adapter, "backtest", "end_date")?,
        chart_indicators: adapter.get_bool("backtest", "chart_indicators", true),
    })
}

/// Build and validate the strategy from `[strategy]`; `kind_override` replaces
/// the configured type.
pub fn build_strategy(
    adapter: &dyn ConfigPort,
    kind_override: Option<StrategyKind>,
) -> Result<Strategy, BistraderError> {
    let kind = match kind_override {
        Some(kind) => kind,
        None => strategy_kind(adapter)?,
    };
    validate_strategy_params(adapter, kind)?;

    let period = |key: &str, default: usize| {
        usize::try_from(adapter.get_int("strategy", key, default as i64)).unwrap_or(0)
    };

    let strategy: Strategy = match kind {
        StrategyKind::MaCrossover => MaCrossover {
            short_period: period("short_period", DEFAULT_SHORT_PERIOD),
            long_period: period("long_period", DEFAULT_LONG_PERIOD),
        }
        .into(),
        StrategyKind::RsiThreshold => RsiThreshold {
            period: period("rsi_period", DEFAULT_RSI_PERIOD),
            oversold: adapter.get_double("strategy", "oversold", DEFAULT_OVERSOLD),
            overbought: adapter.get_double("strategy", "overbought", DEFAULT_OVERBOUGHT),
        }
        .into(),
    };

    strategy.validate()?;
    Ok(strategy)
}

pub fn resolve_codes(code_override: Option<&str>, config: &dyn ConfigPort) -> Vec<String> {
    let split = |s: &str| -> Vec<String> {
        s.split(',')
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect()
    };

    if let Some(c) = code_override {
        return split(c);
    }

    if let Some(codes_str) = config.get_string("backtest", "codes") {
        let codes = split(&codes_str);
        if !codes.is_empty() {
            return codes;
        }
    }

    if let Some(code) = config.get_string("backtest", "code") {
        return split(&code);
    }

    vec![]
}

pub fn resolve_output_dir(output_override: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    match output_override {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(
            config
                .get_string("report", "output_dir")
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string()),
        ),
    }
}

/// Config, strategy and codes for a backtest, validated in that order.
struct BacktestPlan {
    config: BacktestConfig,
    strategy: Strategy,
    codes: Vec<String>,
}

fn plan_backtest(
    adapter: &dyn ConfigPort,
    code_override: Option<&str>,
    kind_override: Option<StrategyKind>,
) -> Result<BacktestPlan, BistraderError> {
    validate_backtest_config(adapter)?;
    if code_override.is_none() {
        validate_codes(adapter)?;
    }

    let strategy = build_strategy(adapter, kind_override)?;
    let config = build_backtest_config(adapter)?;
    config.validate()?;

    let codes = resolve_codes(code_override, adapter);
    if codes.is_empty() {
        return Err(BistraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "code".to_string(),
        });
    }

    Ok(BacktestPlan {
        config,
        strategy,
        codes,
    })
}

fn run_backtest(
    config_path: &Path,
    code_override: Option<&str>,
    kind_override: Option<StrategyKind>,
    output_override: Option<&Path>,
) -> Result<(), BistraderError> {
    let adapter = load_config(config_path)?;
    let plan = plan_backtest(&adapter, code_override, kind_override)?;
    info!(strategy = %plan.strategy.name(), codes = plan.codes.len(), "starting run");

    let data_port = CsvAdapter::from_config(&adapter);
    let output_dir = resolve_output_dir(output_override, &adapter);

    let results = run_backtest_pipeline(
        &data_port,
        &plan.strategy,
        &plan.config,
        &plan.codes,
        &output_dir,
    )?;

    print_metrics_table(&results);
    println!("\nReports written to: {}", output_dir.display());
    Ok(())
}

/// Fetch every code, run the batch and write reports.
///
/// Codes that fail to load or to backtest are skipped with a warning; the
/// run fails only when nothing succeeds.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    strategy: &Strategy,
    config: &BacktestConfig,
    codes: &[String],
    output_dir: &Path,
) -> Result<Vec<BacktestResult>, BistraderError> {
    let mut inputs: Vec<PriceSeries> = Vec::with_capacity(codes.len());
    let mut first_error = None;

    for code in codes {
        match data_port.fetch_ohlcv(code, config.start_date, config.end_date) {
            Ok(series) => {
                debug!(code, bars = series.len(), "fetched");
                inputs.push(series);
            }
            Err(e) => {
                warn!(code, "skipping: {e}");
                first_error.get_or_insert(e);
            }
        }
    }

    let mut results = Vec::with_capacity(inputs.len());
    for (series, outcome) in inputs.iter().zip(run_batch(&inputs, strategy, config)) {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!(code = series.code(), "backtest failed: {e}");
                first_error.get_or_insert(e);
            }
        }
    }

    if results.is_empty() {
        return Err(first_error.unwrap_or_else(|| BistraderError::NoData {
            code: codes.join(","),
        }));
    }

    CsvReportAdapter::new().write_batch(&results, output_dir)?;
    Ok(results)
}

pub fn print_metrics_table(results: &[BacktestResult]) {
    if let Some(first) = results.first() {
        println!("Strategy: {}", first.strategy_name);
    }
    println!(
        "{:<12} {:>6} {:>10} {:>8} {:>10} {:>8} {:>7} {:>14}",
        "code", "bars", "return%", "sharpe", "max_dd%", "win%", "trades", "final_value"
    );
    for r in results {
        let m = &r.metrics;
        println!(
            "{:<12} {:>6} {:>10.2} {:>8.2} {:>10.2} {:>8.1} {:>7} {:>14.2}",
            r.code(),
            r.series.len(),
            m.total_return_pct,
            m.sharpe_ratio,
            m.max_drawdown_pct,
            m.win_rate_pct,
            m.trade_count,
            m.final_value,
        );
    }
}

pub fn run_dry_run(
    config_path: &Path,
    code_override: Option<&str>,
    kind_override: Option<StrategyKind>,
) -> Result<(), BistraderError> {
    let adapter = load_config(config_path)?;
    let plan = plan_backtest(&adapter, code_override, kind_override)?;

    println!("Strategy: {}", plan.strategy.name());

    let mut indicators = plan.strategy.required_indicators();
    if plan.config.chart_indicators {
        indicators.extend(IndicatorType::chart_panel());
    }
    indicators.sort();
    indicators.dedup();
    println!("Indicators:");
    for ind in &indicators {
        println!("  {}", ind);
    }

    println!("Codes: {}", plan.codes.join(", "));
    println!("Initial capital: {:.2}", plan.config.initial_capital);
    let bound = |d: Option<chrono::NaiveDate>| d.map_or_else(|| "-".to_string(), |d| d.to_string());
    println!(
        "Date range: {} to {}",
        bound(plan.config.start_date),
        bound(plan.config.end_date)
    );
    println!(
        "Data dir: {}",
        CsvAdapter::from_config(&adapter).base_path().display()
    );

    info!("dry run complete: configuration is valid");
    Ok(())
}

fn run_indicators(
    config_path: &Path,
    code: &str,
    output: Option<&Path>,
) -> Result<(), BistraderError> {
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    let config = build_backtest_config(&adapter)?;

    let data_port = CsvAdapter::from_config(&adapter);
    let series = data_port.fetch_ohlcv(&code.to_uppercase(), config.start_date, config.end_date)?;
    let indicators = IndicatorSet::compute(series.bars(), &IndicatorType::chart_panel());
    for ty in indicators.undefined_types() {
        warn!(code = series.code(), "insufficient history for {ty}");
    }

    match output {
        Some(path) => {
            write_indicator_table(&series, &indicators, File::create(path)?)?;
            info!(path = %path.display(), "indicators written");
        }
        None => write_indicator_table(&series, &indicators, io::stdout().lock())?,
    }
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), BistraderError> {
    let adapter = load_config(config_path)?;
    let data_port = CsvAdapter::from_config(&adapter);

    let symbols = data_port.list_symbols()?;
    if symbols.is_empty() {
        warn!(dir = %data_port.base_path().display(), "no symbols found");
    }
    for symbol in &symbols {
        println!("{}", symbol);
    }
    Ok(())
}

fn run_info(config_path: &Path, code: Option<&str>) -> Result<(), BistraderError> {
    let adapter = load_config(config_path)?;
    let data_port = CsvAdapter::from_config(&adapter);

    let mut codes = resolve_codes(code, &adapter);
    if codes.is_empty() {
        codes = data_port.list_symbols()?;
    }

    for c in &codes {
        match data_port.get_data_range(c) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} bars, {} to {}", c, count, min_date, max_date);
            }
            Ok(None) => println!("{}: no data found", c),
            Err(e) => warn!(code = %c, "error reading data: {e}"),
        }
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BistraderError> {
    let adapter = load_config(config_path)?;
    let plan = plan_backtest(&adapter, None, None)?;

    println!("Strategy: {}", plan.strategy.name());
    println!("Codes: {}", plan.codes.join(", "));
    println!("Configuration is valid.");
    Ok(())
}
