//! StratLab CLI — backtests, parameter search, live bar streaming.
//!
//! Commands:
//! - `backtest` — run one backtest from a TOML config and export NAV/trades
//! - `optimize` — walk-forward parameter search (surrogate or genetic)
//! - `stream` — connect to a live kline websocket and print closed bars

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use stratlab_core::engine::EngineConfig;
use stratlab_core::feed::{BarFeed, FeedPoll, LiveFeed, LiveFeedConfig};
use stratlab_core::signals::SignalSpec;
use stratlab_core::domain::{ParamValue, ParamVector};
use stratlab_runner::{
    load_bars, run_backtest, run_walk_forward, write_history_csv, write_nav_csv, write_trades_csv,
    GaSearch, OptimizerSection, ParamDim, ParamSpace, RunConfig, SurrogateSearch, Summary,
};

#[derive(Parser)]
#[command(name = "stratlab", about = "StratLab — bar-driven strategy lab")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one backtest from a TOML config file.
    Backtest {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Write the NAV series to this CSV file.
        #[arg(long)]
        nav_out: Option<PathBuf>,

        /// Write the trade log to this CSV file.
        #[arg(long)]
        trades_out: Option<PathBuf>,
    },
    /// Walk-forward parameter search over the configured strategy.
    Optimize {
        /// Path to a TOML config file (requires [walk_forward]).
        #[arg(long)]
        config: PathBuf,

        /// Search strategy.
        #[arg(long, value_enum, default_value_t = Searcher::Surrogate)]
        searcher: Searcher,

        /// Write the evaluation history to this CSV file.
        #[arg(long)]
        history_out: Option<PathBuf>,
    },
    /// Stream closed bars from a live kline websocket.
    Stream {
        /// Websocket URL, e.g. wss://stream.binance.com:9443/ws/btcusdt@kline_1m
        #[arg(long)]
        url: String,

        /// Stop after this many bars (0 = run until interrupted).
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Searcher {
    Surrogate,
    Genetic,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match Cli::parse().command {
        Commands::Backtest {
            config,
            nav_out,
            trades_out,
        } => cmd_backtest(&config, nav_out.as_deref(), trades_out.as_deref()),
        Commands::Optimize {
            config,
            searcher,
            history_out,
        } => cmd_optimize(&config, searcher, history_out.as_deref()),
        Commands::Stream { url, limit } => cmd_stream(url, limit),
    }
}

fn cmd_backtest(
    config_path: &std::path::Path,
    nav_out: Option<&std::path::Path>,
    trades_out: Option<&std::path::Path>,
) -> Result<()> {
    let config = RunConfig::load(config_path).context("loading run config")?;
    let bars = load_bars(&config.data.path).context("loading bar series")?;
    if bars.is_empty() {
        bail!("bar series {} is empty", config.data.path.display());
    }

    let report = run_backtest(&config.engine, &bars);
    let periods = config
        .walk_forward
        .as_ref()
        .map_or(2190.0, |wf| wf.periods_per_year);
    let summary = Summary::compute(&report, periods);
    print_summary("backtest", &summary);

    if let Some(path) = nav_out {
        write_nav_csv(path, &report.nav_records)?;
        info!(path = %path.display(), "NAV series written");
    }
    if let Some(path) = trades_out {
        write_trades_csv(path, &report.trades)?;
        info!(path = %path.display(), "trade log written");
    }
    Ok(())
}

fn cmd_optimize(
    config_path: &std::path::Path,
    searcher: Searcher,
    history_out: Option<&std::path::Path>,
) -> Result<()> {
    let config = RunConfig::load(config_path).context("loading run config")?;
    let Some(walk_forward) = config.walk_forward.clone() else {
        bail!("optimize requires a [walk_forward] section with a split_date");
    };
    let optimizer = config.optimizer.clone().unwrap_or_default();
    let bars = load_bars(&config.data.path).context("loading bar series")?;

    let space = space_for(&config.engine)?;
    let engine = config.engine.clone();
    let build = move |params: &ParamVector| apply_params(&engine, params);

    let report = match searcher {
        Searcher::Surrogate => {
            let search = SurrogateSearch::new(optimizer.budget, optimizer.seed);
            run_walk_forward(&bars, &walk_forward, &space, &search, build)?
        }
        Searcher::Genetic => {
            let search = ga_from(&optimizer);
            run_walk_forward(&bars, &walk_forward, &space, &search, build)?
        }
    };

    println!("best parameters:");
    for (name, value) in report.best.iter() {
        println!("  {name} = {value}");
    }
    print_summary("in-sample", &report.in_sample);
    print_summary("out-of-sample", &report.out_of_sample);

    if let Some(path) = history_out {
        write_history_csv(path, &report.history)?;
        info!(path = %path.display(), evaluations = report.history.len(), "history written");
    }
    Ok(())
}

fn cmd_stream(url: String, limit: usize) -> Result<()> {
    let mut feed = LiveFeed::connect(LiveFeedConfig {
        url,
        ..LiveFeedConfig::default()
    })
    .context("connecting live feed")?;

    let mut seen = 0usize;
    loop {
        match feed.next_bar() {
            FeedPoll::Bar(bar) => {
                println!(
                    "{}  o={} h={} l={} c={} v={}",
                    bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume
                );
                seen += 1;
                if limit > 0 && seen >= limit {
                    return Ok(());
                }
            }
            FeedPoll::Pending => continue,
            FeedPoll::Finished => return Ok(()),
        }
    }
}

/// Default search space for the configured signal family.
fn space_for(engine: &EngineConfig) -> Result<ParamSpace> {
    let trailing = ParamDim::new(
        "trailing_stop_pct",
        vec![
            ParamValue::Float(0.03),
            ParamValue::Float(0.05),
            ParamValue::Float(0.07),
            ParamValue::Float(0.10),
        ],
    );
    let dims = match &engine.signal {
        SignalSpec::MaInflection { .. } => vec![
            ParamDim::new(
                "period",
                vec![
                    ParamValue::Int(20),
                    ParamValue::Int(40),
                    ParamValue::Int(60),
                    ParamValue::Int(90),
                ],
            ),
            trailing,
        ],
        SignalSpec::RegressionBreakout { .. } => vec![
            ParamDim::new(
                "lookback",
                vec![
                    ParamValue::Int(10),
                    ParamValue::Int(20),
                    ParamValue::Int(30),
                    ParamValue::Int(60),
                ],
            ),
            trailing,
        ],
        // Rule masks search the inclusion genome itself.
        SignalSpec::RuleMask { mask, .. } => (0..mask.len())
            .map(|i| ParamDim::binary(format!("rule_{i}")))
            .collect(),
    };
    Ok(ParamSpace::new(dims)?)
}

/// Overlay searched parameters onto the configured engine.
fn apply_params(base: &EngineConfig, params: &ParamVector) -> EngineConfig {
    let mut config = base.clone();
    if let Ok(pct) = params.get_float("trailing_stop_pct") {
        config.trailing_stop_pct = pct;
    }
    match &mut config.signal {
        SignalSpec::MaInflection { period, .. } => {
            if let Ok(p) = params.get_int("period") {
                *period = p as usize;
            }
        }
        SignalSpec::RegressionBreakout { lookback } => {
            if let Ok(l) = params.get_int("lookback") {
                *lookback = l as usize;
            }
        }
        SignalSpec::RuleMask { mask, .. } => {
            for (i, gene) in mask.iter_mut().enumerate() {
                if let Ok(v) = params.get_int(&format!("rule_{i}")) {
                    *gene = v != 0;
                }
            }
        }
    }
    config
}

fn ga_from(optimizer: &OptimizerSection) -> GaSearch {
    GaSearch {
        population: optimizer.population,
        generations: optimizer.generations,
        mutation_rate: optimizer.mutation_rate,
        seed: optimizer.seed,
        ..GaSearch::default()
    }
}

fn print_summary(label: &str, summary: &Summary) {
    println!("{label}:");
    println!("  total pnl:    {:.2}", summary.total_pnl);
    println!("  sharpe:       {:.3}", summary.sharpe);
    println!("  max drawdown: {:.2}%", summary.max_drawdown * 100.0);
    println!(
        "  win rate:     {:.1}% ({} trades)",
        summary.win_rate * 100.0,
        summary.trade_count
    );
    println!("  final nav:    {:.2}", summary.final_nav);
}
