//! Artifact export — JSON manifest and equity-curve CSV.
//!
//! Persisted artifacts carry a `schema_version` field; unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use irslab_core::performance::EquityPoint;

use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema
/// versions.
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

/// Export the equity curve as CSV.
///
/// Columns: timestamp, total, returns, equity.
pub fn export_equity_csv(equity_curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "total", "returns", "equity"])?;
    for point in equity_curve {
        wtr.write_record([
            point.timestamp.to_rfc3339(),
            format!("{:.12}", point.total),
            format!("{:.12}", point.returns),
            format!("{:.12}", point.equity),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Save the artifact set for one run under `output_dir`.
///
/// Creates `{output_dir}/{run_id prefix}/` containing:
/// - `manifest.json` — the full `BacktestResult`
/// - `equity_curve.csv` — the time-indexed curve
///
/// Returns the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let dir = output_dir.join(short_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create artifact dir {}", dir.display()))?;

    let manifest = export_json(result)?;
    std::fs::write(dir.join("manifest.json"), manifest).context("failed to write manifest")?;

    let equity = export_equity_csv(&result.equity_curve)?;
    std::fs::write(dir.join("equity_curve.csv"), equity)
        .context("failed to write equity curve")?;

    Ok(dir)
}
