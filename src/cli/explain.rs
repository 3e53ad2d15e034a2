//! CLI `explain`, `page`, and `image` commands.

use anyhow::{bail, Context, Result};
use std::path::Path;

use ai_explainer::explainer::{ExplainRequest, Explanation, Provenance, Stored, Subject};
use ai_explainer::prompt::find_prompt;

use super::{load_page, App};

/// Explain a text selection.
pub async fn explain_text(app: &App, text: &str, prompt: Option<&str>) -> Result<()> {
    if text.trim().is_empty() {
        bail!("nothing to explain: text is empty");
    }
    let request = ExplainRequest::new(Subject::Text(text.to_string()));
    run(app, request, prompt).await
}

/// Extract a page and explain its content.
pub async fn explain_page(app: &App, source: &str, prompt: Option<&str>) -> Result<()> {
    let loaded = load_page(&app.config, source).await?;
    let request = ExplainRequest::new(Subject::Page {
        markdown: loaded.page.markdown,
    })
    .with_provenance(Provenance {
        page_url: Some(loaded.url),
        page_title: loaded.page.title,
    });
    run(app, request, prompt).await
}

/// Explain an image. `data_file` holds the image as a `data:` URL.
pub async fn explain_image(
    app: &App,
    url: &str,
    data_file: Option<&Path>,
    prompt: Option<&str>,
) -> Result<()> {
    let data = match data_file {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let data = data.trim().to_string();
            if !data.starts_with("data:") {
                bail!("{} does not contain a data: URL", path.display());
            }
            Some(data)
        }
        None => None,
    };
    let request = ExplainRequest::new(Subject::Image {
        url: url.to_string(),
        data,
    });
    run(app, request, prompt).await
}

async fn run(app: &App, mut request: ExplainRequest, prompt: Option<&str>) -> Result<()> {
    if let Some(name) = prompt {
        let config = find_prompt(app.blobs.as_ref(), name)?
            .with_context(|| format!("no prompt named {name:?}; see `prompts list`"))?;
        request = request.with_prompt(config);
    }

    // Session-only records from an earlier run go in before this one.
    if let Err(e) = app.history.migrate_legacy() {
        tracing::warn!(error = %e, "legacy history migration failed");
    }

    let explainer = app.explainer()?;
    let explanation: Explanation = tokio::select! {
        result = explainer.explain(request) => result?,
        _ = tokio::signal::ctrl_c() => bail!("cancelled"),
    };

    println!("{}", explanation.text);
    match explanation.stored {
        Stored::Durable(id) => eprintln!("\nSaved to history as #{id}."),
        Stored::SessionOnly => eprintln!(
            "\nWARNING: history could not be saved. This explanation is kept for this session only \
             and will be imported by `history migrate` once storage works again."
        ),
    }
    Ok(())
}
