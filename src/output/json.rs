//! JSON summary output

use super::RunSummary;
use anyhow::{Context, Result};
use std::path::Path;

/// Write the run summary as pretty-printed JSON.
///
/// Creates the parent directory if it does not exist yet.
pub fn write_summary(summary: &RunSummary, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
        }
    }

    let rendered =
        serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?;

    std::fs::write(path, rendered)
        .with_context(|| format!("Failed to write JSON output: {}", path.display()))?;

    Ok(())
}
