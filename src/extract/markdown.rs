//! Typed tree walk from parsed HTML to Markdown.
//!
//! Each element is classified into a closed [`Tag`] set. Tags with a Markdown
//! form emit it; everything else is a transparent container whose children are
//! rendered in place.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Node};

use super::filter;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));
static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Heading(usize),
    Paragraph,
    Strong,
    Emphasis,
    Code,
    Pre,
    Anchor,
    Image,
    UnorderedList,
    OrderedList,
    ListItem,
    Blockquote,
    Table,
    LineBreak,
    Rule,
    /// Block-level container: rendered on its own line, no markup.
    Block,
    /// Anything else: children rendered inline, no markup.
    Transparent,
}

impl Tag {
    pub fn from_name(name: &str) -> Self {
        match name {
            "h1" => Self::Heading(1),
            "h2" => Self::Heading(2),
            "h3" => Self::Heading(3),
            "h4" => Self::Heading(4),
            "h5" => Self::Heading(5),
            "h6" => Self::Heading(6),
            "p" => Self::Paragraph,
            "strong" | "b" => Self::Strong,
            "em" | "i" => Self::Emphasis,
            "code" | "kbd" | "samp" => Self::Code,
            "pre" => Self::Pre,
            "a" => Self::Anchor,
            "img" => Self::Image,
            "ul" => Self::UnorderedList,
            "ol" => Self::OrderedList,
            "li" => Self::ListItem,
            "blockquote" => Self::Blockquote,
            "table" => Self::Table,
            "br" => Self::LineBreak,
            "hr" => Self::Rule,
            "div" | "section" | "article" | "main" | "figure" | "figcaption" | "address"
            | "details" | "summary" | "dl" | "dt" | "dd" | "body" => Self::Block,
            _ => Self::Transparent,
        }
    }
}

pub struct MarkdownWriter<'a> {
    self_root_id: Option<&'a str>,
}

impl<'a> MarkdownWriter<'a> {
    pub fn new(self_root_id: Option<&'a str>) -> Self {
        Self { self_root_id }
    }

    /// Render the children of `root`. The root itself is never filtered out.
    pub fn render_root(&self, root: ElementRef<'_>) -> String {
        self.children(root)
    }

    fn children(&self, element: ElementRef<'_>) -> String {
        let mut out = String::new();
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push_str(&WHITESPACE.replace_all(text, " ")),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        out.push_str(&self.element(child));
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn element(&self, element: ElementRef<'_>) -> String {
        if filter::is_noise(element.value(), self.self_root_id) {
            return String::new();
        }

        match Tag::from_name(element.value().name()) {
            Tag::Heading(level) => {
                let text = single_line(&self.children(element));
                if text.is_empty() {
                    String::new()
                } else {
                    format!("\n\n{} {}\n\n", "#".repeat(level), text)
                }
            }
            Tag::Paragraph => format!("\n\n{}\n\n", self.children(element)),
            Tag::Strong => wrap_inline(&self.children(element), "**"),
            Tag::Emphasis => wrap_inline(&self.children(element), "*"),
            Tag::Code => {
                let code: String = element.text().collect();
                let code = single_line(&code);
                if code.is_empty() {
                    String::new()
                } else {
                    format!("`{code}`")
                }
            }
            Tag::Pre => self.fenced(element),
            Tag::Anchor => self.anchor(element),
            Tag::Image => image(element),
            Tag::UnorderedList => self.list(element, false),
            Tag::OrderedList => self.list(element, true),
            Tag::ListItem => format!("\n- {}\n", single_block(&self.children(element))),
            Tag::Blockquote => self.blockquote(element),
            Tag::Table => self.table(element),
            Tag::LineBreak => "\n".to_string(),
            Tag::Rule => "\n\n---\n\n".to_string(),
            Tag::Block => format!("\n{}\n", self.children(element)),
            Tag::Transparent => self.children(element),
        }
    }

    fn fenced(&self, element: ElementRef<'_>) -> String {
        let code: String = element.text().collect();
        let code = code.trim_matches('\n');
        if code.trim().is_empty() {
            return String::new();
        }
        let language = element
            .children()
            .filter_map(ElementRef::wrap)
            .find(|c| c.value().name() == "code")
            .and_then(|c| {
                c.value()
                    .classes()
                    .find_map(|class| class.strip_prefix("language-"))
                    .map(str::to_string)
            })
            .unwrap_or_default();
        format!("\n\n```{language}\n{code}\n```\n\n")
    }

    fn anchor(&self, element: ElementRef<'_>) -> String {
        let inner = self.children(element);
        let text = single_line(&inner);
        let href = element
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty() && !h.to_ascii_lowercase().starts_with("javascript:"));

        match href {
            Some(href) if !text.is_empty() => {
                let (lead, trail) = edge_spaces(&inner);
                format!("{lead}[{text}]({href}){trail}")
            }
            _ => inner,
        }
    }

    fn list(&self, element: ElementRef<'_>, ordered: bool) -> String {
        let mut number: i64 = element
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);

        let mut lines = Vec::new();
        for item in element.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" || filter::is_noise(item.value(), self.self_root_id) {
                continue;
            }
            let content = single_block(&self.children(item));
            if content.is_empty() {
                continue;
            }
            let marker = if ordered {
                let m = format!("{number}.");
                number = number.saturating_add(1);
                m
            } else {
                "-".to_string()
            };
            lines.push(format!("{marker} {content}"));
        }

        if lines.is_empty() {
            String::new()
        } else {
            format!("\n\n{}\n\n", lines.join("\n"))
        }
    }

    fn blockquote(&self, element: ElementRef<'_>) -> String {
        let inner = tidy_lines(&self.children(element));
        let inner = BLANK_RUNS.replace_all(&inner, "\n\n");
        if inner.is_empty() {
            return String::new();
        }
        let quoted: Vec<String> = inner
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect();
        format!("\n\n{}\n\n", quoted.join("\n"))
    }

    fn table(&self, element: ElementRef<'_>) -> String {
        let mut rows: Vec<ElementRef<'_>> = Vec::new();
        for child in element.children().filter_map(ElementRef::wrap) {
            match child.value().name() {
                "tr" => rows.push(child),
                "thead" | "tbody" | "tfoot" => rows.extend(
                    child
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|r| r.value().name() == "tr"),
                ),
                _ => {}
            }
        }

        let mut lines = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let cells: Vec<(bool, String)> = row
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|c| matches!(c.value().name(), "th" | "td"))
                .filter(|c| !filter::is_noise(c.value(), self.self_root_id))
                .map(|c| {
                    let text = single_line(&self.children(c)).replace('|', "\\|");
                    (c.value().name() == "th", text)
                })
                .collect();
            if cells.is_empty() {
                continue;
            }

            let texts: Vec<&str> = cells.iter().map(|(_, t)| t.as_str()).collect();
            lines.push(format!("| {} |", texts.join(" | ")));

            if index == 0 && cells.iter().any(|(header, _)| *header) {
                let separator = vec!["---"; cells.len()].join(" | ");
                lines.push(format!("| {separator} |"));
            }
        }

        if lines.is_empty() {
            String::new()
        } else {
            format!("\n\n{}\n\n", lines.join("\n"))
        }
    }
}

fn image(element: ElementRef<'_>) -> String {
    let el = element.value();
    let alt = el.attr("alt").map(single_line).unwrap_or_default();
    let src = el
        .attr("src")
        .or_else(|| el.attr("data-src"))
        .map(str::trim)
        .unwrap_or("");

    // Inline data URIs cost thousands of tokens and carry nothing readable.
    if src.is_empty() || src.starts_with("data:") {
        return alt;
    }
    format!("![{alt}]({src})")
}

/// Surround trimmed inline content with `marker`, keeping outer spacing.
fn wrap_inline(inner: &str, marker: &str) -> String {
    let text = single_line(inner);
    if text.is_empty() {
        return inner.to_string();
    }
    let (lead, trail) = edge_spaces(inner);
    format!("{lead}{marker}{text}{marker}{trail}")
}

fn edge_spaces(s: &str) -> (&'static str, &'static str) {
    let lead = if s.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if s.ends_with(char::is_whitespace) { " " } else { "" };
    (lead, trail)
}

/// Collapse all whitespace, including newlines, to single spaces.
fn single_line(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Trim every line and drop blank lines between them.
fn single_block(s: &str) -> String {
    BLANK_LINES.replace_all(&tidy_lines(s), "\n").into_owned()
}

/// Trim every line and the whole block.
fn tidy_lines(s: &str) -> String {
    s.lines().map(str::trim).collect::<Vec<_>>().join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_classification() {
        assert_eq!(Tag::from_name("h3"), Tag::Heading(3));
        assert_eq!(Tag::from_name("b"), Tag::Strong);
        assert_eq!(Tag::from_name("span"), Tag::Transparent);
        assert_eq!(Tag::from_name("section"), Tag::Block);
    }

    #[test]
    fn wrap_inline_keeps_outer_spaces() {
        assert_eq!(wrap_inline(" bold ", "**"), " **bold** ");
        assert_eq!(wrap_inline("   ", "**"), "   ");
    }

    #[test]
    fn single_block_drops_inner_blank_lines() {
        assert_eq!(single_block("  a \n\n\n  b  "), "a\nb");
    }
}
