mod cli;

use ai_explainer::config;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ai-explainer", version, about = "Explain text, pages, and images with an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Explain a piece of text
    Explain {
        text: String,
        /// Saved prompt to use instead of the global template
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Extract a page (HTML file or URL) and explain its content
    Page {
        source: String,
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Explain an image by URL
    Image {
        url: String,
        /// File containing the image as a data: URL, sent instead of the URL
        #[arg(long)]
        data_file: Option<PathBuf>,
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Print the Markdown extracted from a page (HTML file or URL)
    Extract { source: String },
    /// Browse and manage the explanation history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Show or change the API settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Manage saved prompt templates
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },
    /// Check storage, settings, and history health
    Doctor,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List records, most recent first
    List {
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Search text, explanation, prompt, source, and title (case-insensitive)
    Search {
        #[arg(default_value = "")]
        query: String,
        /// Only records made with this prompt
        #[arg(short, long)]
        prompt: Option<String>,
    },
    /// Show one record in full
    Show { id: i64 },
    /// Delete one record
    Delete { id: i64 },
    /// Delete every record
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// List prompt names used in history
    Prompts,
    /// Export a record as Markdown
    Export {
        id: i64,
        /// Stash for the viewer and print the one-shot key instead
        #[arg(long)]
        handoff: bool,
    },
    /// Read and remove a stashed export
    Take { key: String },
    /// Import records left in the legacy or session-only list
    Migrate,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Set one setting (apiEndpoint, apiKey, apiModel, maxTokens, systemPrompt, userPromptTemplate)
    Set { key: String, value: String },
    /// Apply a provider preset (openai, azure, zhipu, tongyi)
    Preset {
        name: String,
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Send a test request with the current settings
    Test,
    /// Delete all settings and prompts
    Reset {
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum PromptsAction {
    /// List saved prompts
    List,
    /// Add or replace a prompt; the template should contain {text}
    Add {
        name: String,
        template: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        system_prompt: Option<String>,
    },
    /// Remove a prompt by name
    Remove { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::ExplainerConfig::load()?;

    // Log to stderr so stdout carries only command output.
    let filter = EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app = cli::App::open(config)?;
    let blobs = app.blobs.as_ref();

    match cli.command {
        Command::Explain { text, prompt } => {
            cli::explain::explain_text(&app, &text, prompt.as_deref()).await?;
        }
        Command::Page { source, prompt } => {
            cli::explain::explain_page(&app, &source, prompt.as_deref()).await?;
        }
        Command::Image {
            url,
            data_file,
            prompt,
        } => {
            cli::explain::explain_image(&app, &url, data_file.as_deref(), prompt.as_deref())
                .await?;
        }
        Command::History { action } => match action {
            HistoryAction::List { limit } => cli::history::list(&app.history, limit)?,
            HistoryAction::Search { query, prompt } => {
                cli::history::search(&app.history, &query, prompt.as_deref())?
            }
            HistoryAction::Show { id } => cli::history::show(&app.history, id)?,
            HistoryAction::Delete { id } => cli::history::delete(&app.history, id)?,
            HistoryAction::Clear { yes } => cli::reset::clear_history(&app.history, yes)?,
            HistoryAction::Prompts => cli::history::prompts(&app.history)?,
            HistoryAction::Export { id, handoff } => {
                cli::export::export(&app.history, blobs, id, handoff)?
            }
            HistoryAction::Take { key } => cli::export::take(blobs, &key)?,
            HistoryAction::Migrate => cli::history::migrate(&app.history)?,
        },
        Command::Settings { action } => match action {
            SettingsAction::Show => cli::settings::show(blobs)?,
            SettingsAction::Set { key, value } => cli::settings::set(blobs, &key, &value)?,
            SettingsAction::Preset { name, api_key } => {
                cli::settings::apply_preset(blobs, &name, api_key.as_deref())?
            }
            SettingsAction::Test => cli::settings::test(&app).await?,
            SettingsAction::Reset { yes } => cli::reset::reset_settings(blobs, yes)?,
        },
        Command::Prompts { action } => match action {
            PromptsAction::List => cli::prompts::list(blobs)?,
            PromptsAction::Add {
                name,
                template,
                model,
                max_tokens,
                system_prompt,
            } => cli::prompts::add(
                blobs,
                cli::prompts::NewPrompt {
                    name: &name,
                    template: &template,
                    model: model.as_deref(),
                    max_tokens,
                    system_prompt: system_prompt.as_deref(),
                },
            )?,
            PromptsAction::Remove { name } => cli::prompts::remove(blobs, &name)?,
        },
        Command::Extract { source } => cli::extract(&app.config, &source).await?,
        Command::Doctor => cli::doctor::doctor(&app.config)?,
    }

    Ok(())
}
