//! Markdown rendering of a history record, for copying and for the viewer.

use serde::{Deserialize, Serialize};

use super::types::{ContextType, HistoryRecord};

const DEFAULT_TITLE: &str = "AI analysis";

/// Payload handed to the Markdown viewer through a one-shot blob key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerPayload {
    pub title: String,
    pub timestamp: String,
    /// Markdown link to the originating page, or empty.
    pub source: String,
    pub content: String,
    pub export_time: String,
    pub context_type: ContextType,
}

impl HistoryRecord {
    /// Title used for exports: the prompt name, or a generic label.
    pub fn export_title(&self) -> &str {
        self.prompt_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_TITLE)
    }

    /// `[title](url)`, `<url>`, or `None` when the record has no page URL.
    pub fn source_link(&self) -> Option<String> {
        let url = self.page_url.as_deref().filter(|u| !u.is_empty())?;
        match self.page_title.as_deref().filter(|t| !t.is_empty()) {
            Some(title) => Some(format!("[{title}]({url})")),
            None => Some(format!("<{url}>")),
        }
    }

    /// The analyzed content and the explanation as Markdown sections.
    pub fn body_markdown(&self) -> String {
        let mut out = String::new();
        if self.context_type == ContextType::Image {
            out.push_str("## Selected image\n\n");
            out.push_str(&format!("![image]({})\n\n", self.text));
        } else {
            out.push_str("## Selected text\n\n");
            if self.text.contains('\n') || self.text.contains('`') {
                out.push_str(&format!("```\n{}\n```\n\n", self.text));
            } else {
                out.push_str(&format!("{}\n\n", self.text));
            }
        }
        out.push_str(&format!("## AI explanation\n\n{}\n\n", self.explanation));
        out
    }

    /// Full standalone Markdown document for this record.
    pub fn to_markdown(&self, exported_at: &str) -> String {
        let mut out = format!("# {}\n\n", self.export_title());
        out.push_str(&format!("**Time:** {}\n\n", self.created_at_display));
        if let Some(source) = self.source_link() {
            out.push_str(&format!("**Source:** {source}\n\n"));
        }
        out.push_str(&self.body_markdown());
        out.push_str(&format!("---\n\n*Exported at: {exported_at}*"));
        out
    }

    pub fn viewer_payload(&self, exported_at: &str) -> ViewerPayload {
        ViewerPayload {
            title: self.export_title().to_string(),
            timestamp: self.created_at_display.clone(),
            source: self.source_link().unwrap_or_default(),
            content: self.body_markdown(),
            export_time: exported_at.to_string(),
            context_type: self.context_type,
        }
    }
}
