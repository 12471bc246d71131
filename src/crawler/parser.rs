//! HTML parser for extracting body text and anchors
//!
//! This module handles parsing fetched HTML into:
//! - The visible body text, handed to the tokenizer
//! - Outgoing anchors (absolute URL, host, anchor text), capped per page

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text never reaches the index
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Elements that break the surrounding text into separate words
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6",
    "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section", "summary", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

/// An outgoing hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Absolute http(s) target
    pub url: String,

    /// Lowercased host of the target
    pub domain: String,

    /// Visible link text with whitespace collapsed
    pub text: String,
}

/// Extracted content of an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Text of the `<body>` with whitespace collapsed
    pub text: String,

    /// Anchors in document order, at most `max_links` of them
    pub anchors: Vec<Anchor>,
}

/// Parses HTML content and extracts body text and anchors
///
/// # Link Extraction Rules
///
/// - Only `<a href="...">` elements are considered
/// - Relative hrefs are resolved against `base_url`
/// - Targets that are not http/https after resolution are skipped
/// - Extraction stops once `max_links` anchors were collected
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `base_url` - The base URL for resolving relative links
/// * `max_links` - Per-page anchor cap
///
/// # Example
///
/// ```
/// use ripple_search::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><body><p>Hello</p><a href="/page">Next page</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url, 100);
/// assert_eq!(parsed.anchors[0].url, "https://example.com/page");
/// assert_eq!(parsed.anchors[0].text, "Next page");
/// ```
pub fn parse_html(html: &str, base_url: &Url, max_links: usize) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        text: extract_body_text(&document),
        anchors: extract_anchors(&document, base_url, max_links),
    }
}

/// Collects the text nodes of `<body>`, skipping script-like elements
fn extract_body_text(document: &Html) -> String {
    let Ok(body_selector) = Selector::parse("body") else {
        return String::new();
    };

    let mut raw = String::new();
    for body in document.select(&body_selector) {
        collect_text(body, &mut raw);
    }
    collapse_whitespace(&raw)
}

/// Appends the text under `element` to `out`
///
/// Adjacent inline text is joined as written; block elements and `<br>` are
/// set off by whitespace.
fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(child_element) => {
                let name = child_element.name();
                if HIDDEN_ELEMENTS.contains(&name) {
                    continue;
                }

                let separated = BLOCK_ELEMENTS.contains(&name);
                if separated {
                    out.push(' ');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, out);
                }
                if separated {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extracts capped, resolved anchors from the document
fn extract_anchors(document: &Html, base_url: &Url, max_links: usize) -> Vec<Anchor> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = resolve_link(href, base_url)?;
            let domain = url.host_str()?.to_lowercase();
            let mut raw = String::new();
            collect_text(element, &mut raw);
            let text = collapse_whitespace(&raw);

            Some(Anchor {
                url: url.to_string(),
                domain,
                text,
            })
        })
        .take(max_links)
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - empty hrefs
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution (javascript:, mailto:, data:, ...)
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url),
        _ => None,
    }
}
