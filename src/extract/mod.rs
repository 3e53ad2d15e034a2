//! Whole-page content extraction: HTML in, bounded Markdown out.
//!
//! The page is parsed into its own tree, so the caller's document is never
//! touched. Chrome (navigation, banners, widgets, hidden elements, the
//! explainer's own UI) is skipped, the rest is written as Markdown, tidied, and
//! capped at [`ExtractOptions::max_chars`] characters. The result is lossy by
//! intent: it is LLM input, not a faithful conversion.

pub mod filter;
pub mod markdown;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

use markdown::MarkdownWriter;

/// Default character limit for extracted Markdown.
pub const DEFAULT_MAX_CHARS: usize = 8000;

/// Id of the explainer's injected UI root.
pub const DEFAULT_SELF_ROOT_ID: &str = "ai-explainer-sidebar";

/// Returned instead of an empty string when nothing survives extraction.
pub const NO_CONTENT: &str = "No readable content could be extracted from this page.";

static EXCESS_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub max_chars: usize,
    /// Element id to exclude so the explainer never captures its own UI.
    pub self_root_id: Option<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            self_root_id: Some(DEFAULT_SELF_ROOT_ID.to_string()),
        }
    }
}

/// Markdown body and `<title>` of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedPage {
    pub markdown: String,
    pub title: Option<String>,
}

/// Parse `html` once and return both its Markdown and its title.
pub fn extract_page(html: &str, options: &ExtractOptions) -> ExtractedPage {
    let document = Html::parse_document(html);
    let markdown = render(&document, options);
    let title = find_title(&document);
    tracing::debug!(
        html_bytes = html.len(),
        markdown_chars = markdown.chars().count(),
        has_title = title.is_some(),
        "page extracted"
    );
    ExtractedPage { markdown, title }
}

/// Convert a page to bounded Markdown.
pub fn extract_markdown(html: &str, options: &ExtractOptions) -> String {
    render(&Html::parse_document(html), options)
}

/// The trimmed `<title>` of a page, if it has a non-empty one.
pub fn page_title(html: &str) -> Option<String> {
    find_title(&Html::parse_document(html))
}

fn render(document: &Html, options: &ExtractOptions) -> String {
    let root = body(document).unwrap_or_else(|| document.root_element());
    let writer = MarkdownWriter::new(options.self_root_id.as_deref());
    let raw = writer.render_root(root);
    let tidy = tidy(&raw);
    if tidy.is_empty() {
        return NO_CONTENT.to_string();
    }
    truncate(tidy, options.max_chars)
}

fn body(document: &Html) -> Option<ElementRef<'_>> {
    document
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
}

fn find_title(document: &Html) -> Option<String> {
    let head = document
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "head")?;
    let title = head
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "title")?;
    let text = title.text().collect::<Vec<_>>().join(" ");
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Trim every line, then collapse runs of blank lines to a single blank line.
fn tidy(raw: &str) -> String {
    let trimmed = raw.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    EXCESS_BLANK_LINES
        .replace_all(&trimmed, "\n\n")
        .trim()
        .to_string()
}

fn truncate(markdown: String, max_chars: usize) -> String {
    match markdown.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            tracing::debug!(max_chars, "extracted markdown truncated");
            format!(
                "{}\n\n[Content truncated at {max_chars} characters]",
                &markdown[..cut]
            )
        }
        None => markdown,
    }
}
