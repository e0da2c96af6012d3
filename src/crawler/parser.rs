//! HTML parser for extracting readable text and links
//!
//! This module handles parsing HTML content to extract:
//! - The main readable text of the page
//! - Links to follow (from <a> tags)

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Content containers tried in order; the first match becomes the text root
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "main article",
    ".blog-content",
    ".post-content",
    "main",
    ".content",
    "#content",
    "body",
];

/// Elements whose text never counts as page content
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "pre", "code", "nav", "footer", "header", "aside",
];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Readable text with whitespace collapsed
    pub text: String,

    /// Unique absolute http(s) links, in first-seen order
    pub links: Vec<String>,
}

/// Parses HTML content and extracts its text and links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only anchors
/// - Anything that is not HTTP(S) after resolution
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The page's final URL, for resolving relative links
///
/// # Example
///
/// ```
/// use sumi_harvest::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><body><p>Hi</p><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.text, "Hi Link");
/// assert_eq!(parsed.links, vec!["https://example.com/page".to_string()]);
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        text: extract_text(&document),
        links: extract_links(&document, base_url),
    }
}

/// Finds the main content container of the document
fn content_root(document: &Html) -> Option<ElementRef<'_>> {
    CONTENT_SELECTORS.iter().find_map(|selector| {
        Selector::parse(selector)
            .ok()
            .and_then(|selector| document.select(&selector).next())
    })
}

/// Extracts readable text from the content root, skipping chrome and code
fn extract_text(document: &Html) -> String {
    let Some(root) = content_root(document) else {
        return String::new();
    };

    let mut raw = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        // Only chrome inside the root counts; the root's own wrappers do not
        let excluded = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != root.id())
            .any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |element| EXCLUDED_TAGS.contains(&element.name()))
            });
        if excluded {
            continue;
        }

        raw.push_str(text);
        raw.push(' ');
    }

    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if element.value().attr("download").is_some() {
            continue;
        }

        if let Some(href) = element.value().attr("href") {
            if let Some(absolute_url) = resolve_href(href, base_url) {
                if seen.insert(absolute_url.clone()) {
                    links.push(absolute_url);
                }
            }
        }
    }

    links
}

/// Resolves a link href to an absolute http(s) URL string
fn resolve_href(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if matches!(absolute_url.scheme(), "http" | "https") => {
            Some(absolute_url.to_string())
        }
        _ => None,
    }
}
