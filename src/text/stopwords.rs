use lazy_static::lazy_static;
use std::collections::HashSet;

lazy_static! {
    static ref PREPOSITIONS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "без", "безо", "близ", "в", "во", "вместо", "вне", "для", "до", "за",
            "из", "изо", "из-за", "из-под", "к", "ко", "кроме", "между", "меж",
            "на", "над", "надо", "о", "об", "обо", "от", "ото", "перед", "передо",
            "пред", "предо", "по", "под", "подо", "при", "про", "ради", "с", "со",
            "сквозь", "среди", "у", "через", "чрез",
        ];
        words.iter().copied().collect()
    };
}

/// Returns true if the token is one of the fixed Russian prepositions
///
/// Matching is case-sensitive against the lowercase set, so callers lowercase first.
/// The result only flags a word; nothing is filtered on it.
pub fn is_preposition(token: &str) -> bool {
    PREPOSITIONS.contains(token)
}
