//! FutLab CLI — run, optimize, and params commands.
//!
//! Commands:
//! - `run`: execute one backtest from a TOML config and save artifacts
//! - `optimize`: random-search the strategy params on the configured data
//! - `params`: write a starter config with default params

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futlab_core::StrategyParams;
use futlab_runner::data_loader::{load_bars, LoadOptions};
use futlab_runner::export::save_artifacts;
use futlab_runner::optimize::{DEFAULT_SEED, DEFAULT_TRIALS};
use futlab_runner::{
    load_best_params, optimize, run_backtest_from_data, save_best_params, BacktestConfig,
    BacktestResult, SearchSpace,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "futlab",
    about = "FutLab CLI: bar-by-bar futures momentum backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Replace the config's [params] with a saved best-params JSON file.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Use a deterministic synthetic series instead of the CSV (results are tagged).
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Output directory for result artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Search strategy params that maximize final cumulative P&L.
    Optimize {
        /// Path to a TOML config file. Its [params] section is ignored.
        #[arg(long)]
        config: PathBuf,

        /// Number of trials.
        #[arg(long, default_value_t = DEFAULT_TRIALS)]
        trials: usize,

        /// Master seed for trial sampling.
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Where to write the best params.
        #[arg(long, default_value = "best_params.json")]
        out: PathBuf,

        /// Use a deterministic synthetic series instead of the CSV.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Write a starter config with default params.
    Params {
        /// Output TOML file.
        #[arg(long)]
        out: PathBuf,

        /// Data path to put in the [backtest] section.
        #[arg(long, default_value = "train.csv")]
        data_path: PathBuf,

        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            params,
            synthetic,
            output_dir,
        } => run_backtest_cmd(&config, params.as_deref(), synthetic, &output_dir),
        Commands::Optimize {
            config,
            trials,
            seed,
            out,
            synthetic,
        } => run_optimize_cmd(&config, trials, seed, &out, synthetic),
        Commands::Params {
            out,
            data_path,
            force,
        } => run_params_cmd(&out, data_path, force),
    }
}

fn load_options(config: &BacktestConfig, synthetic: bool) -> LoadOptions {
    LoadOptions {
        index_column: config.backtest.index_column.clone(),
        synthetic,
        ..LoadOptions::default()
    }
}

fn run_backtest_cmd(
    config_path: &Path,
    params_path: Option<&Path>,
    synthetic: bool,
    output_dir: &Path,
) -> Result<()> {
    let mut config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    if let Some(path) = params_path {
        let map = load_best_params(path)?;
        config.params = StrategyParams::from_map(&map)
            .with_context(|| format!("invalid params in {}", path.display()))?;
    }

    let data = load_bars(&config.backtest.data_path, &load_options(&config, synthetic))?;
    let result = run_backtest_from_data(
        &data,
        &config.params,
        &config.constants,
        config.backtest.initial_asset_value,
    )?;

    print_summary(&result);

    let run_dir = save_artifacts(&result, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_optimize_cmd(
    config_path: &Path,
    trials: usize,
    seed: u64,
    out: &Path,
    synthetic: bool,
) -> Result<()> {
    if trials == 0 {
        bail!("--trials must be at least 1");
    }
    let config = BacktestConfig::from_file(config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    let data = load_bars(&config.backtest.data_path, &load_options(&config, synthetic))?;

    let result = optimize(
        &data.bars,
        &SearchSpace::default(),
        trials,
        seed,
        &config.constants,
        config.backtest.initial_asset_value,
    )?;

    let (Some(best), Some(value)) = (result.best_params(), result.best_value()) else {
        bail!("all {trials} trials failed");
    };
    save_best_params(out, best)?;

    println!();
    println!("=== Optimization Result ===");
    println!("Trials:         {} ({} failed)", trials, result.failed_count());
    println!("Best trial:     {}", result.best.unwrap_or_default());
    println!("Best P&L:       {value:.2}");
    for (name, v) in best {
        println!("  {name:<30}{v}");
    }
    if data.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!("Best params saved to: {}", out.display());
    Ok(())
}

fn run_params_cmd(out: &Path, data_path: PathBuf, force: bool) -> Result<()> {
    if out.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", out.display());
    }
    let toml = BacktestConfig::template(data_path).to_toml()?;
    std::fs::write(out, toml).with_context(|| format!("writing {}", out.display()))?;
    println!("Wrote template config to {}", out.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Run:            {}", result.fingerprint.short_id());
    match (result.start, result.end) {
        (Some(start), Some(end)) => println!("Period:         {start} to {end}"),
        _ => println!("Period:         (no bars after warmup)"),
    }
    println!(
        "Bars:           {} ({} warmup)",
        result.bar_count, result.warmup_bars
    );
    println!(
        "Entries:        {} opened, {} added",
        result.entries_opened, result.entries_added
    );
    println!("Closes:         {}", m.close_count);
    println!();
    println!("--- Performance ---");
    println!("Cumulative P&L: {:.2}", m.final_cumulative_pnl);
    println!("Final Asset:    {:.2}", result.final_asset_value());
    println!("Total Return:   {:.2}%", m.total_return * 100.0);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Sharpe/bar:     {:.4}", m.sharpe);
    println!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Fees:           {:.2}", m.fees_paid);
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
