//! Reporting and export: JSON and CSV artifact generation.
//!
//! Provides two export formats for replay reports:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape, equity curve, and decision log for external tools
//!
//! Persisted reports carry a `schema_version` field. Newer versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use replaylab_core::domain::{EquityPoint, Trade};
use replaylab_core::engine::DecisionRecord;
use tracing::info;

use crate::runner::{short_id, ReplayReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &ReplayReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize ReplayReport to JSON")
}

/// Deserialize a `ReplayReport`, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<ReplayReport> {
    let report: ReplayReport =
        serde_json::from_str(json).context("failed to deserialize ReplayReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Columns: side, entry_bar, entry_time, entry_price, exit_bar, exit_time,
/// exit_price, exit_reason, size, leverage, margin_used, commission, pnl,
/// pnl_pct, bars_held
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "side",
        "entry_bar",
        "entry_time",
        "entry_price",
        "exit_bar",
        "exit_time",
        "exit_price",
        "exit_reason",
        "size",
        "leverage",
        "margin_used",
        "commission",
        "pnl",
        "pnl_pct",
        "bars_held",
    ])?;

    for t in trades {
        wtr.write_record([
            t.side.to_string(),
            t.entry_bar.to_string(),
            t.entry_time.to_rfc3339(),
            format!("{:.6}", t.entry_price),
            t.exit_bar.to_string(),
            t.exit_time.to_rfc3339(),
            format!("{:.6}", t.exit_price),
            t.exit_reason.to_string(),
            format!("{:.8}", t.size),
            format!("{:.2}", t.leverage),
            format!("{:.2}", t.margin_used),
            format!("{:.4}", t.total_commission()),
            format!("{:.4}", t.pnl),
            format!("{:.4}", t.pnl_pct),
            t.bars_held().to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "timestamp", "cash", "unrealized_pnl", "equity"])?;
    for (i, p) in equity_curve.iter().enumerate() {
        wtr.write_record([
            i.to_string(),
            p.timestamp.to_rfc3339(),
            format!("{:.4}", p.cash),
            format!("{:.4}", p.unrealized_pnl),
            format!("{:.4}", p.equity),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Non-HOLD decisions only; `position_after` is `flat` when no position remains.
pub fn export_decisions_csv(decisions: &[DecisionRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "bar_index",
        "timestamp",
        "price",
        "action",
        "confidence",
        "position_after",
        "reasoning",
    ])?;
    for d in decisions {
        wtr.write_record([
            d.bar_index.to_string(),
            d.timestamp.to_rfc3339(),
            format!("{:.6}", d.price),
            d.decision.action.to_string(),
            d.decision.confidence.map(|c| format!("{c:.4}")).unwrap_or_default(),
            d.position_after.map_or_else(|| "flat".to_string(), |s| s.to_string()),
            d.decision.reasoning.clone().unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one run.
///
/// Creates `<output_dir>/<run_id prefix>/` containing:
/// - `report.json`: the full `ReplayReport`
/// - `trades.csv`: trade tape
/// - `equity.csv`: bar-by-bar equity curve
/// - `decisions.csv`: non-HOLD decisions
///
/// Re-running an identical config overwrites the same directory.
pub fn save_artifacts(report: &ReplayReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(short_id(&report.run_id));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join("report.json"), &export_json(report)?)?;
    write(&run_dir.join("trades.csv"), &export_trades_csv(&report.result.trades)?)?;
    write(&run_dir.join("equity.csv"), &export_equity_csv(&report.result.equity_curve)?)?;
    write(&run_dir.join("decisions.csv"), &export_decisions_csv(&report.result.decisions)?)?;

    info!(dir = %run_dir.display(), "saved artifacts");
    Ok(run_dir)
}

/// Load a `ReplayReport` from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<ReplayReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Text summary ───────────────────────────────────────────────────

/// One-line summary used by the CLI's `run` and `compare` output.
pub fn summary_line(report: &ReplayReport) -> String {
    let m = &report.metrics;
    format!(
        "{:<12} {:<24} trades={:<4} win={:>5.1}% return={:>8.2}% maxdd={:>6.2}% sharpe={:>6.2} pf={:>6.2}{}",
        short_id(&report.run_id),
        report.agent,
        m.total_trades,
        m.win_rate_pct,
        m.return_pct,
        m.max_drawdown_pct,
        m.sharpe_ratio,
        m.profit_factor,
        if report.result.cancelled { " (cancelled)" } else { "" },
    )
}
