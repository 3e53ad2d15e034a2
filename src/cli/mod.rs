pub mod doctor;
pub mod explain;
pub mod export;
pub mod history;
pub mod prompts;
pub mod reset;
pub mod settings;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use ai_explainer::blob::{BlobStore, FileBlobStore};
use ai_explainer::config::ExplainerConfig;
use ai_explainer::explainer::Explainer;
use ai_explainer::extract::{self, ExtractedPage};
use ai_explainer::history::HistoryStore;
use ai_explainer::llm::HttpBackend;

/// Stores opened from the configured data directory.
pub struct App {
    pub config: ExplainerConfig,
    pub blobs: Arc<dyn BlobStore>,
    pub history: Arc<HistoryStore>,
}

impl App {
    pub fn open(config: ExplainerConfig) -> Result<Self> {
        let dir = config.resolved_data_dir();
        let store = FileBlobStore::open(&dir)
            .with_context(|| format!("failed to open data dir: {}", dir.display()))?;
        let blobs: Arc<dyn BlobStore> = Arc::new(store);
        let history = Arc::new(HistoryStore::new(Arc::clone(&blobs)));
        Ok(Self {
            config,
            blobs,
            history,
        })
    }

    pub fn explainer(&self) -> Result<Explainer> {
        let backend = HttpBackend::new(self.config.http_timeout())?;
        Ok(Explainer::new(
            Arc::clone(&self.blobs),
            Arc::clone(&self.history),
            Arc::new(backend),
        )
        .with_api_key(self.config.api_key_override.clone()))
    }
}

/// Where a page came from, for record provenance.
pub struct LoadedPage {
    pub page: ExtractedPage,
    pub url: String,
}

/// Extract a page from a local HTML file or an `http(s)` URL.
pub async fn load_page(config: &ExplainerConfig, source: &str) -> Result<LoadedPage> {
    let (html, url) = if source.starts_with("http://") || source.starts_with("https://") {
        (fetch(config, source).await?, source.to_string())
    } else {
        let path = Path::new(source);
        let html = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        (html, format!("file://{}", absolute.display()))
    };

    let page = extract::extract_page(&html, &config.extract_options());
    Ok(LoadedPage { page, url })
}

async fn fetch(config: &ExplainerConfig, url: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "fetch failed with HTTP {}",
        response.status()
    );

    response.text().await.context("error reading response")
}

/// Print the first `max` characters of `text` on one line.
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &flat[..cut]),
        None => flat,
    }
}

/// Print the extracted Markdown of a page.
pub async fn extract(config: &ExplainerConfig, source: &str) -> Result<()> {
    let loaded = load_page(config, source).await?;
    if let Some(title) = &loaded.page.title {
        eprintln!("Title: {title}");
    }
    println!("{}", loaded.page.markdown);
    Ok(())
}
