//! Text segmentation
//!
//! Pure helpers shared by the indexer, the query matcher and the highlighter:
//! - `tokenize` splits text into ordinal-indexed word tokens
//! - `is_preposition` tests membership in the fixed stop-word set
//! - `query_terms` turns a query into its distinct lowercased terms

mod stopwords;
mod tokenizer;

pub use stopwords::is_preposition;
pub use tokenizer::{query_terms, tokenize, Token};
