//! Reporting and export — JSON, CSV, and Markdown artifacts.
//!
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: per-bar records and the close log
//! - **Markdown**: a one-page run report
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use futlab_core::domain::ExitRecord;
use futlab_core::BarRecord;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Per-bar records as CSV.
///
/// Columns: datetime, asset, pnl, cumulative_pnl, position, entry_price,
/// open_contracts. `position` and `entry_price` are empty when flat.
pub fn export_records_csv(records: &[BarRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "datetime",
        "asset",
        "pnl",
        "cumulative_pnl",
        "position",
        "entry_price",
        "open_contracts",
    ])?;

    for r in records {
        wtr.write_record([
            &r.timestamp.format(DATETIME_FORMAT).to_string(),
            &format!("{:.2}", r.asset_value),
            &format!("{:.2}", r.pnl),
            &format!("{:.2}", r.cumulative_pnl),
            &r.position.map(|s| s.to_string()).unwrap_or_default(),
            &r.entry_price.map(|p| p.to_string()).unwrap_or_default(),
            &r.open_contracts.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// The close log as CSV, one row per full or partial close.
pub fn export_exits_csv(exits: &[ExitRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "datetime",
        "bar_index",
        "side",
        "kind",
        "contracts",
        "entry_price",
        "exit_price",
        "pnl",
    ])?;

    for e in exits {
        wtr.write_record([
            &e.timestamp.format(DATETIME_FORMAT).to_string(),
            &e.bar_index.to_string(),
            &e.side.to_string(),
            exit_kind_label(e),
            &e.contracts.to_string(),
            &e.entry_price.to_string(),
            &e.exit_price.to_string(),
            &format!("{:.2}", e.pnl),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn exit_kind_label(e: &ExitRecord) -> &'static str {
    use futlab_core::domain::ExitKind;
    match e.kind {
        ExitKind::StopLoss => "stop_loss",
        ExitKind::PartialTakeProfit => "partial_take_profit",
        ExitKind::TrailingStop => "trailing_stop",
    }
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one run.
///
/// Creates `run_{short_id}/` under `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `records.csv`: per-bar records
/// - `exits.csv`: close log
/// - `report.md`: Markdown summary
///
/// The directory name comes from the run fingerprint, so re-running the same
/// config on the same data overwrites the same artifacts.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(format!("run_{}", result.fingerprint.short_id()));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let write = |name: &str, content: String| -> Result<()> {
        let path = run_dir.join(name);
        std::fs::write(&path, content).with_context(|| format!("failed to write {}", path.display()))
    };
    write("manifest.json", export_json(result)?)?;
    write("records.csv", export_records_csv(&result.records)?)?;
    write("exits.csv", export_exits_csv(&result.exits)?)?;
    write("report.md", generate_report(result))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Markdown report for one run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run | {} |\n", result.fingerprint.short_id()));
    let period = match (result.start, result.end) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        _ => "(no bars after warmup)".to_string(),
    };
    md.push_str(&format!("| Period | {period} |\n"));
    md.push_str(&format!(
        "| Initial Asset Value | {:.2} |\n",
        result.initial_asset_value
    ));
    md.push_str(&format!(
        "| Bars | {} ({} warmup) |\n",
        result.bar_count, result.warmup_bars
    ));
    md.push_str(&format!(
        "| Dataset Hash | {} |\n",
        result.fingerprint.dataset_hash
    ));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    md.push_str("## Parameters\n\n");
    md.push_str("| Name | Value |\n");
    md.push_str("| --- | --- |\n");
    for (name, value) in result.params.to_map() {
        md.push_str(&format!("| {name} | {value} |\n"));
    }
    md.push('\n');

    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Cumulative P&L | {:.2} |\n",
        m.final_cumulative_pnl
    ));
    md.push_str(&format!(
        "| Final Asset Value | {:.2} |\n",
        result.final_asset_value()
    ));
    md.push_str(&format!(
        "| Total Return | {:.2}% |\n",
        m.total_return * 100.0
    ));
    md.push_str(&format!(
        "| Max Drawdown | {:.2}% |\n",
        m.max_drawdown * 100.0
    ));
    md.push_str(&format!("| Sharpe (per bar) | {:.4} |\n", m.sharpe));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push_str(&format!(
        "| Closes | {} ({} contracts) |\n",
        m.close_count, m.contracts_closed
    ));
    md.push_str(&format!("| Fees | {:.2} |\n", m.fees_paid));
    md.push_str(&format!(
        "| Entries | {} opened, {} added |\n",
        result.entries_opened, result.entries_added
    ));
    md.push_str(&format!(
        "| Max Consecutive Losses | {} |\n",
        m.max_consecutive_losses
    ));
    md.push('\n');

    md
}
