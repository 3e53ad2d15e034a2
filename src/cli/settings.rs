//! CLI `settings` commands.

use anyhow::{Context, Result};

use ai_explainer::blob::BlobStore;
use ai_explainer::prompt::{preset, GlobalSettings, PRESETS};

use super::App;

pub fn show(blobs: &dyn BlobStore) -> Result<()> {
    let settings = GlobalSettings::load(blobs)?;
    println!("apiEndpoint         {}", settings.endpoint());
    println!(
        "apiKey              {}",
        settings.api_key().map(mask).unwrap_or_else(|| "(not set)".into())
    );
    println!("apiModel            {}", settings.model().unwrap_or("(default)"));
    println!("maxTokens           {}", settings.max_tokens());
    println!("systemPrompt        {}", settings.system_prompt());
    println!(
        "userPromptTemplate  {}",
        settings.user_prompt_template().unwrap_or("(default)").replace('\n', "\\n")
    );
    Ok(())
}

/// Set one field and save. Saving validates the whole settings set.
pub fn set(blobs: &dyn BlobStore, key: &str, value: &str) -> Result<()> {
    let mut settings = GlobalSettings::load(blobs)?;
    settings.set_field(key, value)?;
    settings.save(blobs)?;
    println!("Saved {key}.");
    Ok(())
}

/// Fill endpoint, model and token budget from a known provider.
pub fn apply_preset(blobs: &dyn BlobStore, name: &str, api_key: Option<&str>) -> Result<()> {
    let chosen = preset(name).with_context(|| {
        let names: Vec<&str> = PRESETS.iter().map(|p| p.name).collect();
        format!("unknown preset {name:?}; expected one of {}", names.join(", "))
    })?;

    let mut settings = GlobalSettings::load(blobs)?;
    settings.apply_preset(chosen);
    if let Some(key) = api_key {
        settings.set_field("apiKey", key)?;
    }
    settings
        .save(blobs)
        .context("preset applied but settings are incomplete; set apiKey as well")?;
    println!("Applied preset {} ({}).", chosen.name, chosen.model);
    Ok(())
}

/// Send a short request with the current settings.
pub async fn test(app: &App) -> Result<()> {
    let explainer = app.explainer()?;
    println!("Testing connection...");
    let reply = explainer.test_connection().await?;
    println!("Connection OK. Model replied: {}", super::preview(&reply, 80));
    Ok(())
}

fn mask(key: &str) -> String {
    let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("****{visible}")
}
