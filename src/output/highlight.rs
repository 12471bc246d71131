//! Highlighted copies of search results
//!
//! For every ranked url of a query the page is fetched again, its body is
//! tokenized and written out as a small HTML document in which every token
//! equal (ignoring case) to a query term is wrapped in `<mark>`.

use crate::crawler::Fetcher;
use crate::search::QueryMatcher;
use crate::text::{query_terms, tokenize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Files written and urls skipped by one highlight run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightReport {
    pub written: Vec<PathBuf>,
    pub skipped: Vec<String>,
}

/// Writes highlighted documents for ranked query results
pub struct Highlighter {
    matcher: QueryMatcher,
    fetcher: Fetcher,
    output_dir: PathBuf,
}

impl Highlighter {
    /// Creates a highlighter writing into `output_dir`
    pub fn new(matcher: QueryMatcher, fetcher: Fetcher, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            matcher,
            fetcher,
            output_dir: output_dir.into(),
        }
    }

    /// Ranks the query and writes one document per result
    ///
    /// Pages are always fetched live. A page that cannot be fetched is
    /// recorded in `skipped` and the batch continues.
    ///
    /// # Returns
    ///
    /// * `Ok(HighlightReport)` - Paths written and urls skipped
    /// * `Err(SearchError)` - Ranking failed or a file could not be written
    pub async fn highlight(&self, query: &str) -> crate::Result<HighlightReport> {
        let matcher = self.matcher.clone();
        let owned_query = query.to_string();
        let ranked = tokio::task::spawn_blocking(move || matcher.ranked(&owned_query)).await??;

        let terms = query_terms(query);
        let mut report = HighlightReport::default();
        if ranked.is_empty() {
            return Ok(report);
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;

        for result in ranked {
            let page = match self.fetcher.fetch(&result.url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!("Skipping highlight of {}: {}", result.url, e);
                    report.skipped.push(result.url);
                    continue;
                }
            };

            let path = document_path(&self.output_dir, &result.url);
            let html = render_highlighted(&result.url, &page.content.text, &terms);
            tokio::fs::write(&path, html).await?;

            tracing::debug!("Wrote {}", path.display());
            report.written.push(path);
        }

        tracing::info!(
            "Highlighted {} pages ({} skipped)",
            report.written.len(),
            report.skipped.len()
        );
        Ok(report)
    }
}

/// Stable key of a url: the first 16 hex digits of its SHA-256
pub fn document_key(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Location of the highlighted document for a url
pub fn document_path(output_dir: &Path, url: &str) -> PathBuf {
    output_dir.join(format!("highlighted_{}.html", document_key(url)))
}

/// Renders the tokens of `text` with query terms marked
///
/// `terms` must already be lowercased.
pub fn render_highlighted(url: &str, text: &str, terms: &[String]) -> String {
    let body = tokenize(text)
        .map(|(_, token)| {
            if terms.iter().any(|term| *term == token.to_lowercase()) {
                format!("<mark>{}</mark>", token)
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<p>{}</p>\n</body>\n</html>\n",
        escape_html(url),
        body
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
