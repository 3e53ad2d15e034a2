//! Noise filtering: which elements never contribute page content.

use scraper::node::Element;

/// Element kinds dropped outright: code, media, metadata, and page chrome.
const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "object", "embed", "video", "audio",
    "canvas", "svg", "meta", "link", "nav", "header", "footer", "aside", "form", "button",
    "dialog",
];

/// ARIA landmark roles for navigation and chrome.
const NOISE_ROLES: &[&str] = &[
    "navigation",
    "banner",
    "contentinfo",
    "complementary",
    "dialog",
    "alertdialog",
    "search",
];

/// Substrings of class names or ids that mark banners, widgets and side content.
const NOISE_PATTERNS: &[&str] = &[
    "cookie",
    "consent",
    "gdpr",
    "popup",
    "modal",
    "overlay",
    "newsletter",
    "share",
    "social",
    "comment",
    "related",
    "recommend",
    "sidebar",
    "navbar",
    "breadcrumb",
    "advert",
    "site-header",
    "site-footer",
];

/// `true` if the element and its subtree should be skipped.
pub fn is_noise(element: &Element, self_root_id: Option<&str>) -> bool {
    if let (Some(own), Some(id)) = (self_root_id, element.id()) {
        if own == id {
            return true;
        }
    }

    NOISE_TAGS.contains(&element.name())
        || has_noise_role(element)
        || has_noise_name(element)
        || is_hidden(element)
}

fn has_noise_role(element: &Element) -> bool {
    element
        .attr("role")
        .map(|role| {
            role.split_ascii_whitespace()
                .any(|r| NOISE_ROLES.contains(&r.to_ascii_lowercase().as_str()))
        })
        .unwrap_or(false)
}

fn has_noise_name(element: &Element) -> bool {
    let matches = |token: &str| {
        let token = token.to_ascii_lowercase();
        NOISE_PATTERNS.iter().any(|p| token.contains(p))
    };
    element.id().is_some_and(matches) || element.classes().any(matches)
}

/// Hidden via the `hidden` attribute or an inline style that makes it invisible.
pub fn is_hidden(element: &Element) -> bool {
    if element.attr("hidden").is_some() {
        return true;
    }
    let Some(style) = element.attr("style") else {
        return false;
    };

    style.split(';').any(|decl| {
        let Some((prop, value)) = decl.split_once(':') else {
            return false;
        };
        let prop = prop.trim().to_ascii_lowercase();
        let value = value
            .trim()
            .trim_end_matches("!important")
            .trim()
            .to_ascii_lowercase();
        match prop.as_str() {
            "display" => value == "none",
            "visibility" => value == "hidden" || value == "collapse",
            "opacity" => value.parse::<f32>().map(|v| v <= 0.0).unwrap_or(false),
            _ => false,
        }
    })
}
