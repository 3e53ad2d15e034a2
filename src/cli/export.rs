//! CLI `history export` and `history take` — Markdown export and viewer handoff.

use anyhow::{bail, Result};

use ai_explainer::blob::handoff::{self, VIEWER_PREFIX};
use ai_explainer::blob::BlobStore;
use ai_explainer::history::time::now_display;
use ai_explainer::history::{HistoryStore, ViewerPayload};

/// Print a record as Markdown, or stash it for the viewer with `handoff`.
pub fn export(history: &HistoryStore, blobs: &dyn BlobStore, id: i64, handoff: bool) -> Result<()> {
    let Some(record) = history.get(id)? else {
        bail!("no history record #{id}");
    };
    let exported_at = now_display();

    if handoff {
        let key = handoff::stash(blobs, VIEWER_PREFIX, &record.viewer_payload(&exported_at))?;
        println!("{key}");
        eprintln!("Stashed record #{id} for the viewer. Read it once with `history take {key}`.");
    } else {
        println!("{}", record.to_markdown(&exported_at));
    }
    Ok(())
}

/// Read and remove a stashed viewer payload.
pub fn take(blobs: &dyn BlobStore, key: &str) -> Result<()> {
    let Some(payload) = handoff::take::<ViewerPayload>(blobs, key)? else {
        bail!("no pending export under {key:?} (already taken?)");
    };

    println!("# {}", payload.title);
    println!();
    println!("**Time:** {}", payload.timestamp);
    if !payload.source.is_empty() {
        println!("**Source:** {}", payload.source);
    }
    println!();
    println!("{}", payload.content);
    println!();
    println!("---");
    println!("*Exported at: {}*", payload.export_time);
    Ok(())
}
