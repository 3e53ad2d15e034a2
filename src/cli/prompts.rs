//! CLI `prompts` commands — manage the saved prompt templates.

use anyhow::{bail, Result};

use ai_explainer::blob::BlobStore;
use ai_explainer::prompt::{load_prompts, save_prompts, PromptConfig, Tunable, TEXT_PLACEHOLDER};

pub fn list(blobs: &dyn BlobStore) -> Result<()> {
    let prompts = load_prompts(blobs)?;
    if prompts.is_empty() {
        println!("No saved prompts. The global template is used.");
        return Ok(());
    }
    for prompt in &prompts {
        println!("  {}", prompt.name);
        println!("     template:    {}", prompt.template.replace('\n', "\\n"));
        println!("     model:       {}", show(&prompt.model));
        println!("     max tokens:  {}", show(&prompt.max_tokens));
        println!("     system:      {}", show(&prompt.system_prompt));
        println!();
    }
    Ok(())
}

pub struct NewPrompt<'a> {
    pub name: &'a str,
    pub template: &'a str,
    pub model: Option<&'a str>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<&'a str>,
}

/// Add a prompt, or replace the one with the same name.
pub fn add(blobs: &dyn BlobStore, new: NewPrompt<'_>) -> Result<()> {
    let name = new.name.trim();
    if name.is_empty() {
        bail!("prompt name must not be empty");
    }
    if !new.template.contains(TEXT_PLACEHOLDER) {
        eprintln!(
            "note: template has no {TEXT_PLACEHOLDER} placeholder; it can only be used for images"
        );
    }

    let mut prompt = PromptConfig::new(name, new.template);
    prompt.model = explicit(new.model.map(str::to_string));
    prompt.max_tokens = explicit(new.max_tokens);
    prompt.system_prompt = explicit(new.system_prompt.map(str::to_string));

    let mut prompts = load_prompts(blobs)?;
    let replaced = match prompts.iter_mut().find(|p| p.name == name) {
        Some(existing) => {
            *existing = prompt;
            true
        }
        None => {
            prompts.push(prompt);
            false
        }
    };
    save_prompts(blobs, &prompts)?;
    println!("{} prompt {name:?}.", if replaced { "Updated" } else { "Added" });
    Ok(())
}

pub fn remove(blobs: &dyn BlobStore, name: &str) -> Result<()> {
    let mut prompts = load_prompts(blobs)?;
    let before = prompts.len();
    prompts.retain(|p| p.name != name);
    if prompts.len() == before {
        bail!("no prompt named {name:?}");
    }
    save_prompts(blobs, &prompts)?;
    println!("Removed prompt {name:?}.");
    Ok(())
}

fn explicit<T>(value: Option<T>) -> Tunable<T> {
    value.map_or(Tunable::Inherit, Tunable::Explicit)
}

fn show<T: std::fmt::Display>(value: &Tunable<T>) -> String {
    match value.explicit() {
        Some(v) => v.to_string().replace('\n', "\\n"),
        None => "(global)".into(),
    }
}
