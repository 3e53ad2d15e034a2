//! CLI `doctor` command — report on storage, settings, and history health.

use anyhow::{Context, Result};

use ai_explainer::blob::{BlobStore, FileBlobStore, Scope};
use ai_explainer::config::ExplainerConfig;
use ai_explainer::history::image::TableImage;
use ai_explainer::history::store::{LEGACY_KEY, TABLE_KEY};
use ai_explainer::prompt::{load_prompts, GlobalSettings};

/// Inspect the data directory without modifying it and print a health report.
pub fn doctor(config: &ExplainerConfig) -> Result<()> {
    let dir = config.resolved_data_dir();
    let store = FileBlobStore::open(&dir)
        .with_context(|| format!("failed to open data dir: {}", dir.display()))?;

    println!("AI Explainer Health Report");
    println!("==========================");
    println!();
    println!("Data dir:          {}", dir.display());
    for scope in [Scope::Sync, Scope::Local] {
        let path = store.scope_path(scope);
        let size = std::fs::metadata(&path).map(|m| m.len()).ok();
        match size {
            Some(size) => println!(
                "  {:<6} storage:  {} ({} of {})",
                scope.as_str(),
                path.display(),
                format_bytes(size),
                format_bytes(scope.default_quota().total_bytes as u64),
            ),
            None => println!("  {:<6} storage:  (empty)", scope.as_str()),
        }
    }
    println!();

    let settings = GlobalSettings::load(&store).context("settings are unreadable")?;
    println!("Settings:");
    println!("  Endpoint:        {}", settings.endpoint());
    println!("  Model:           {}", settings.model().unwrap_or("(default)"));
    let key_status = match (&config.api_key_override, settings.api_key()) {
        (Some(_), _) => "set (EXPLAINER_API_KEY)",
        (None, Some(_)) => "set",
        (None, None) => "NOT SET",
    };
    println!("  API key:         {key_status}");
    match load_prompts(&store) {
        Ok(prompts) => println!("  Saved prompts:   {}", prompts.len()),
        Err(e) => println!("  Saved prompts:   UNREADABLE ({e})"),
    }
    println!();

    println!("History:");
    match store.get_one(Scope::Local, TABLE_KEY)? {
        None => println!("  Table:           (not created yet)"),
        Some(value) => match TableImage::decode(value) {
            Ok(image) => {
                println!("  Table:           OK");
                println!("  Records:         {}", image.records.len());
                println!("  Next id:         {}", image.next_id);
            }
            Err(e) => {
                println!("  Table:           CORRUPT ({e})");
                println!("  The next history command will set it aside and start empty.");
            }
        },
    }
    match store.get_one(Scope::Local, LEGACY_KEY)? {
        Some(serde_json::Value::Array(items)) if !items.is_empty() => {
            println!("  Pending import:  {} record(s); run `ai-explainer history migrate`", items.len());
        }
        _ => println!("  Pending import:  none"),
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
