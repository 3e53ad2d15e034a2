//! CLI `history` commands that read or prune the store.

use anyhow::{bail, Result};

use ai_explainer::history::{HistoryRecord, HistoryStore};

use super::preview;

const PREVIEW_CHARS: usize = 80;

pub fn list(history: &HistoryStore, limit: Option<usize>) -> Result<()> {
    let records = history.list_all(limit)?;
    if records.is_empty() {
        println!("No history yet.");
        return Ok(());
    }
    let total = history.count()?;
    println!("Showing {} of {} record(s)\n", records.len(), total);
    print_records(&records);
    Ok(())
}

pub fn search(history: &HistoryStore, query: &str, prompt: Option<&str>) -> Result<()> {
    let records = history.search(query, prompt)?;
    if records.is_empty() {
        println!("No results found.");
        return Ok(());
    }
    println!("Found {} result(s)\n", records.len());
    print_records(&records);
    Ok(())
}

pub fn show(history: &HistoryStore, id: i64) -> Result<()> {
    let Some(record) = history.get(id)? else {
        bail!("no history record #{id}");
    };

    println!("Record #{}", record.id);
    println!("{}", "=".repeat(40));
    println!("  Time:      {}", record.created_at_display);
    println!("  Type:      {}", record.context_type);
    println!("  Prompt:    {}", record.prompt_name.as_deref().unwrap_or("-"));
    println!("  Source:    {}", record.source_info.as_deref().unwrap_or("-"));
    if let Some(url) = &record.page_url {
        println!("  Page:      {url}");
    }
    if let Some(title) = &record.page_title {
        println!("  Title:     {title}");
    }
    if record.image_data.is_some() {
        println!("  Image:     embedded data URL");
    }
    println!();
    println!("{}", record.body_markdown());
    Ok(())
}

pub fn delete(history: &HistoryStore, id: i64) -> Result<()> {
    if history.delete_by_id(id)? {
        println!("Deleted record #{id}.");
    } else {
        println!("No history record #{id}; nothing deleted.");
    }
    Ok(())
}

pub fn prompts(history: &HistoryStore) -> Result<()> {
    let names = history.distinct_prompt_names()?;
    if names.is_empty() {
        println!("No prompts used yet.");
    }
    for name in names {
        println!("  {name}");
    }
    Ok(())
}

pub fn migrate(history: &HistoryStore) -> Result<()> {
    let imported = history.migrate_legacy()?;
    if imported == 0 {
        println!("Nothing to migrate.");
    } else {
        println!("Imported {imported} record(s) from legacy history.");
    }
    Ok(())
}

fn print_records(records: &[HistoryRecord]) {
    for record in records {
        println!(
            "  #{} [{}] {} ({})",
            record.id,
            record.context_type,
            record.prompt_name.as_deref().unwrap_or("-"),
            record.created_at_display,
        );
        if let Some(source) = &record.source_info {
            println!("     {}", preview(source, PREVIEW_CHARS));
        }
        println!("     {}", preview(&record.explanation, PREVIEW_CHARS));
        println!();
    }
}
