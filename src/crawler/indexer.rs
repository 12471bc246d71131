//! Writes a fetched page into the index
//!
//! Body tokens become word locations, anchors become links and their text
//! becomes link words. The whole page goes to the store in one write, so a
//! page that fails in storage leaves nothing behind.

use crate::crawler::fetcher::Page;
use crate::storage::{IndexStore, OutgoingLink, PageDocument, StorageResult};
use crate::text::tokenize;

/// Indexes one page and returns the absolute URLs it links to
///
/// # Arguments
///
/// * `store` - The index store
/// * `page` - A successfully fetched page
///
/// # Returns
///
/// * `Ok(Vec<String>)` - Link targets in document order (may repeat)
/// * `Err(StorageError)` - The write failed and nothing of the page was stored
pub fn index_page(store: &dyn IndexStore, page: &Page) -> StorageResult<Vec<String>> {
    let document = page_document(page);
    store.write_page(&document)?;

    tracing::debug!(
        "Indexed {} with {} outgoing links",
        page.url,
        document.links.len()
    );

    Ok(document.links.into_iter().map(|link| link.url).collect())
}

fn page_document(page: &Page) -> PageDocument {
    PageDocument {
        url: page.url.clone(),
        domain: page.domain.clone(),
        words: words(&page.content.text),
        links: page
            .content
            .anchors
            .iter()
            .map(|anchor| OutgoingLink {
                url: anchor.url.clone(),
                domain: anchor.domain.clone(),
                words: words(&anchor.text),
            })
            .collect(),
    }
}

fn words(text: &str) -> Vec<String> {
    tokenize(text).map(|(_, token)| token.to_string()).collect()
}
