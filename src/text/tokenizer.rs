use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Latin and Cyrillic letters plus ASCII digits. `Ёё` sit outside the `А-я` range.
    static ref WORD: Regex = Regex::new(r"[A-Za-zА-Яа-яЁё0-9]+").expect("valid regex");
}

/// A token and its 0-based ordinal among the tokens of the same text
pub type Token<'a> = (usize, &'a str);

/// Splits text into maximal runs of letters and digits
///
/// Punctuation and whitespace only separate tokens. The index is the ordinal
/// of the token in the stream, not a character offset. Case is preserved.
///
/// # Example
///
/// ```
/// use ripple_search::text::tokenize;
///
/// let tokens: Vec<_> = tokenize("Hello, world! 2024").collect();
/// assert_eq!(tokens, vec![(0, "Hello"), (1, "world"), (2, "2024")]);
/// ```
pub fn tokenize(text: &str) -> impl Iterator<Item = Token<'_>> {
    WORD.find_iter(text).map(|m| m.as_str()).enumerate()
}

/// Returns the distinct lowercased terms of a query, in first-seen order
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for (_, token) in tokenize(query) {
        let term = token.to_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}
