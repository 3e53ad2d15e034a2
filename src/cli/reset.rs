//! CLI `history clear` and `settings reset` — destructive commands behind a confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use ai_explainer::blob::BlobStore;
use ai_explainer::history::HistoryStore;
use ai_explainer::prompt::GlobalSettings;

/// Delete every history record after user confirmation.
pub fn clear_history(history: &HistoryStore, yes: bool) -> Result<()> {
    let count = history.count()?;
    if count == 0 {
        println!("History is already empty.");
        return Ok(());
    }
    if !yes {
        confirm(&format!(
            "WARNING: This will permanently delete all {count} history record(s)."
        ))?;
    }
    history.clear_all()?;
    println!("History cleared.");
    Ok(())
}

/// Drop all stored settings and prompts after user confirmation.
pub fn reset_settings(blobs: &dyn BlobStore, yes: bool) -> Result<()> {
    if !yes {
        confirm("WARNING: This will delete the API settings and every saved prompt.")?;
    }
    GlobalSettings::reset(blobs)?;
    println!("Settings reset to defaults.");
    Ok(())
}

fn confirm(warning: &str) -> Result<()> {
    println!("{warning}");
    print!("\nType YES to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    if input.trim() != "YES" {
        bail!("cancelled");
    }
    Ok(())
}
