//! QuoteLab CLI — score strategies against a quote dataset.
//!
//! Commands:
//! - `run` — replay one built-in strategy over a CSV and print its record
//! - `signals` — evaluate the vectorized momentum signal on one product
//! - `contest` — score every built-in preset in parallel and print standings

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use quotelab_core::strategy::{MomentumSignal, StrategyPreset};
use quotelab_runner::{
    evaluate_entries, export_json, export_leaderboard_csv, run_entry, run_signal_entry,
    ContestEntry, RunConfig, RunOutcome, RunRecord, SignalReport,
};

#[derive(Parser)]
#[command(
    name = "quotelab",
    about = "QuoteLab CLI — deterministic strategy-competition scoring"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay one strategy over a quote CSV and print its run record.
    Run {
        /// Path to the quote CSV (long or wide format).
        #[arg(long)]
        data: PathBuf,

        /// Strategy preset: buy-and-hold, momentum, random, random:<seed>.
        #[arg(long, default_value = "buy-and-hold")]
        strategy: String,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Initial cash override.
        #[arg(long)]
        cash: Option<f64>,

        /// Leverage limit override.
        #[arg(long)]
        leverage: Option<f64>,

        /// Write the run outcome as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Evaluate the vectorized momentum signal against one product.
    Signals {
        /// Path to the quote CSV.
        #[arg(long)]
        data: PathBuf,

        /// Product to score against. Defaults to the first of the universe.
        #[arg(long)]
        product: Option<String>,

        /// Momentum lookback in periods.
        #[arg(long, default_value_t = 5)]
        lookback: usize,

        /// Transaction cost in basis points per unit of signal change.
        #[arg(long)]
        cost_bps: Option<f64>,
    },
    /// Score every built-in preset against the dataset and print standings.
    Contest {
        /// Path to the quote CSV.
        #[arg(long)]
        data: PathBuf,

        /// Path to a TOML run config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Evaluate entries sequentially instead of in parallel.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Write the standings as CSV to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            data,
            strategy,
            config,
            cash,
            leverage,
            output,
        } => cmd_run(&data, &strategy, config.as_deref(), cash, leverage, output),
        Commands::Signals {
            data,
            product,
            lookback,
            cost_bps,
        } => cmd_signals(&data, product.as_deref(), lookback, cost_bps),
        Commands::Contest {
            data,
            config,
            sequential,
            output,
        } => cmd_contest(&data, config.as_deref(), sequential, output),
    }
}

fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    match path {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(RunConfig::default()),
    }
}

fn cmd_run(
    data: &Path,
    strategy: &str,
    config_path: Option<&Path>,
    cash: Option<f64>,
    leverage: Option<f64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let Some(preset) = StrategyPreset::parse(strategy) else {
        bail!("unknown strategy '{strategy}'. Valid: buy-and-hold, momentum, random, random:<seed>");
    };

    let mut config = load_config(config_path)?;
    if let Some(cash) = cash {
        config.initial_cash = cash;
    }
    if let Some(leverage) = leverage {
        config.leverage_limit = leverage;
    }

    let raw = std::fs::read(data)
        .with_context(|| format!("failed to read dataset {}", data.display()))?;
    let outcome = RunOutcome::from_result(run_entry(&raw, &preset, &config));

    if let Some(path) = &output {
        std::fs::write(path, export_json(&outcome)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Outcome saved to: {}", path.display());
    }

    match &outcome {
        RunOutcome::Completed(record) => {
            print_record(strategy, record);
            Ok(())
        }
        RunOutcome::Failed(failure) => {
            eprintln!("Run failed: {}", failure.error);
            std::process::exit(1);
        }
    }
}

fn cmd_signals(
    data: &Path,
    product: Option<&str>,
    lookback: usize,
    cost_bps: Option<f64>,
) -> Result<()> {
    let mut config = RunConfig::default();
    if let Some(cost_bps) = cost_bps {
        config.cost_bps = cost_bps;
    }

    let raw = std::fs::read(data)
        .with_context(|| format!("failed to read dataset {}", data.display()))?;
    let mut strategy = MomentumSignal { lookback };
    let report = run_signal_entry(&raw, &mut strategy, product, &config)?;
    print_signal_report(product.unwrap_or("(first product)"), &report);
    Ok(())
}

fn cmd_contest(
    data: &Path,
    config_path: Option<&Path>,
    sequential: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;
    let raw = std::fs::read(data)
        .with_context(|| format!("failed to read dataset {}", data.display()))?;

    let entries: Vec<ContestEntry> = StrategyPreset::all()
        .into_iter()
        .map(|(name, preset)| ContestEntry::new(name, Box::new(preset) as _))
        .collect();
    let board = evaluate_entries(&raw, &entries, &config, !sequential);

    println!();
    println!("=== Contest Standings ===");
    println!(
        "{:<5} {:<16} {:<10} {:>10} {:>14} {:>10}",
        "Rank", "Entry", "Status", "Score", "PnL", "Return"
    );
    println!("{}", "-".repeat(70));
    for (idx, entry) in board.standings().iter().enumerate() {
        match &entry.outcome {
            RunOutcome::Completed(record) => println!(
                "{:<5} {:<16} {:<10} {:>10.4} {:>14.2} {:>9.2}%",
                idx + 1,
                entry.name,
                "completed",
                record.score,
                record.pnl,
                record.percent_return
            ),
            RunOutcome::Failed(failure) => println!(
                "{:<5} {:<16} {:<10} {:>10} {:>14} {:>10}  ({})",
                idx + 1,
                entry.name,
                "failed",
                "-",
                "-",
                "-",
                failure.error
            ),
        }
    }
    println!();

    if let Some(path) = &output {
        std::fs::write(path, export_leaderboard_csv(&board)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Standings saved to: {}", path.display());
    }
    Ok(())
}

fn print_record(strategy: &str, record: &RunRecord) {
    println!();
    println!("=== Run Record ===");
    println!("Strategy:       {strategy}");
    println!("Run id:         {}", record.run_id);
    println!("Universe:       {}", record.universe.join(", "));
    println!(
        "Batches:        {} ({} failed)",
        record.batches_run, record.failed_batches
    );
    println!();
    println!("--- Performance ---");
    println!("Score:          {:.4}", record.score);
    println!("Sharpe:         {:.4}", record.sharpe_ratio);
    println!("PnL:            {:.2}", record.pnl);
    println!("Return:         {:.2}%", record.percent_return);
    println!("Max Drawdown:   {:.2}%", record.max_drawdown * 100.0);
    println!("Final NAV:      {:.2}", record.final_nav);
    println!("Duration:       {:.3}s", record.duration_secs);
    println!();
}

fn print_signal_report(product: &str, report: &SignalReport) {
    println!();
    println!("=== Signal Report ===");
    println!("Product:        {product}");
    println!("Score:          {:.4}", report.score);
    println!("Sharpe:         {:.4}", report.sharpe);
    println!("Ann. Return:    {:.2}%", report.ann_return * 100.0);
    println!("Ann. Vol:       {:.2}%", report.ann_vol * 100.0);
    println!("Total Return:   {:.2}%", report.total_return * 100.0);
    println!("Max Drawdown:   {:.2}%", report.max_drawdown * 100.0);
    println!("Turnover:       {:.1}", report.turnover);
    println!();
}
