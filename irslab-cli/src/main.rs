//! IRSLab CLI — fetch and run commands.
//!
//! Commands:
//! - `fetch` — pull a liquidity-index series from Dune Analytics and
//!   write it as a token dataset CSV
//! - `run` — execute a backtest from a TOML config file or from flags,
//!   save artifacts, and print the summary

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use irslab_core::data::dune::{write_token_csv, DuneClient};
use irslab_runner::{
    run_backtest, save_artifacts, BacktestConfig, BacktestResult, StrategyConfig,
};

#[derive(Parser)]
#[command(name = "irslab", about = "IRSLab CLI — interest-rate-swap backtesting engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StrategyKind {
    /// Go long the variable leg once per token and hold.
    LongRate,
    /// Long/short momentum on the APY level.
    Momentum,
    /// Momentum on the fitted APY trend.
    MomentumTrend,
    /// Pairs arbitrage on the APY ratio of the first two tokens.
    StatArb,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a liquidity-index series from Dune Analytics into a CSV.
    Fetch {
        /// Dune query id holding the series (e.g. 891837).
        #[arg(long)]
        query_id: u64,

        /// Column carrying the index values (e.g. liquidityIndexUSDC).
        #[arg(long)]
        column: String,

        /// Token name; the dataset is written to `<data_dir>/<token>.csv`.
        #[arg(long)]
        token: String,

        /// Dataset directory. Defaults to ./datasets.
        #[arg(long, default_value = "datasets")]
        data_dir: PathBuf,

        /// Dune API key; falls back to the DUNE_API_KEY environment
        /// variable.
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Execute a backtest from a TOML config file or from flags.
    Run {
        /// Path to a TOML config file. Flags below are ignored if set.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Tokens to replay (e.g. aave_usdc lido_steth).
        #[arg(required_unless_present = "config")]
        tokens: Vec<String>,

        /// Strategy preset.
        #[arg(long, value_enum, default_value = "long-rate")]
        strategy: StrategyKind,

        /// Replay start (YYYY-MM-DD or "YYYY-MM-DD HH:MM:SS").
        #[arg(long)]
        start: Option<String>,

        /// Replay end.
        #[arg(long)]
        end: Option<String>,

        /// Notional / margin ratio.
        #[arg(long, default_value_t = 1.0)]
        leverage: f64,

        /// Margin posted per order, and the starting cash.
        #[arg(long, default_value_t = 1.0)]
        initial_capital: f64,

        /// Flat fee per fill.
        #[arg(long, default_value_t = 0.0)]
        fee: f64,

        /// Dataset directory.
        #[arg(long, default_value = "datasets")]
        data_dir: PathBuf,

        /// Where to save the manifest and equity-curve artifacts.
        #[arg(long, default_value = "reports")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Fetch {
            query_id,
            column,
            token,
            data_dir,
            api_key,
        } => fetch(query_id, &column, &token, &data_dir, api_key),
        Commands::Run {
            config,
            tokens,
            strategy,
            start,
            end,
            leverage,
            initial_capital,
            fee,
            data_dir,
            out_dir,
        } => {
            let config = match config {
                Some(path) => BacktestConfig::from_toml_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => flags_to_config(
                    tokens,
                    strategy,
                    start.as_deref(),
                    end.as_deref(),
                    leverage,
                    initial_capital,
                    fee,
                    data_dir,
                )?,
            };
            run(&config, &out_dir)
        }
    }
}

fn fetch(
    query_id: u64,
    column: &str,
    token: &str,
    data_dir: &Path,
    api_key: Option<String>,
) -> Result<()> {
    let api_key = match api_key.or_else(|| std::env::var("DUNE_API_KEY").ok()) {
        Some(key) => key,
        None => bail!("no Dune API key: pass --api-key or set DUNE_API_KEY"),
    };

    let client = DuneClient::new(api_key);
    let observations = client
        .fetch_liquidity_index(query_id, column)
        .with_context(|| format!("fetching query {query_id}"))?;

    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(format!("{token}.csv"));
    write_token_csv(&path, &observations)?;
    println!(
        "wrote {} observations to {}",
        observations.len(),
        path.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn flags_to_config(
    tokens: Vec<String>,
    strategy: StrategyKind,
    start: Option<&str>,
    end: Option<&str>,
    leverage: f64,
    initial_capital: f64,
    fee: f64,
    data_dir: PathBuf,
) -> Result<BacktestConfig> {
    let strategy = match strategy {
        StrategyKind::LongRate => StrategyConfig::LongRate,
        StrategyKind::Momentum => StrategyConfig::Momentum {
            trend_lookback: 15,
            apy_lookback: 5,
            buffer: 1.0,
            alpha: 0.8,
            trade_trend: false,
        },
        StrategyKind::MomentumTrend => StrategyConfig::Momentum {
            trend_lookback: 15,
            apy_lookback: 5,
            buffer: 1.0,
            alpha: 0.8,
            trade_trend: true,
        },
        StrategyKind::StatArb => StrategyConfig::StatArbPairs {
            pair: None,
            lookback_window: 30,
            apy_lookback: 5,
            deviations: 1.0,
        },
    };

    Ok(BacktestConfig {
        data_dir,
        tokens,
        start: start.map(parse_instant).transpose()?,
        end: end.map(parse_instant).transpose()?,
        leverage,
        initial_capital,
        fee,
        exit_policy: Default::default(),
        resample_daily: true,
        strategy,
    })
}

/// Accept dates with or without a time component.
fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    bail!("unparseable date '{raw}': expected YYYY-MM-DD or \"YYYY-MM-DD HH:MM:SS\"")
}

fn run(config: &BacktestConfig, out_dir: &Path) -> Result<()> {
    let result = run_backtest(config).context("backtest failed")?;
    let dir = save_artifacts(&result, out_dir)?;
    print_summary(&result);
    println!("\nartifacts saved to {}", dir.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!("Backtest summary:");
    println!("  run id:        {}", &result.run_id[..12.min(result.run_id.len())]);
    println!("  tokens:        {}", result.tokens.join(", "));
    println!("  bars:          {}", result.bar_count);
    if let Some(point) = result.equity_curve.last() {
        println!("  final equity:  {:.10}", point.equity);
    }
    println!("  sharpe:        {:.4}", result.stats.sharpe);
    println!(
        "  max drawdown:  {:.6} over {} bars",
        result.stats.max_drawdown, result.stats.drawdown_duration
    );
}
