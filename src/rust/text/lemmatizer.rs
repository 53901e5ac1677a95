use std::collections::HashMap;

use lazy_static::lazy_static;

lazy_static! {
    /// Irregular plurals that suffix rules cannot recover.
    static ref EXCEPTIONS: HashMap<&'static str, &'static str> = [
        ("children", "child"),
        ("men", "man"),
        ("women", "woman"),
        ("feet", "foot"),
        ("teeth", "tooth"),
        ("mice", "mouse"),
        ("geese", "goose"),
        ("criteria", "criterion"),
        ("analyses", "analysis"),
        ("businesses", "business"),
    ]
    .into_iter()
    .collect();
}

/// Upper bound on rewrite passes; every rule shortens the word or maps it to
/// a fixed point, so real words settle in one or two passes.
const MAX_PASSES: usize = 8;

/// Noun lemmatizer in the WordNet style: an exception table followed by
/// detachment rules for regular plural suffixes.
///
/// Rules are applied until the word stops changing, so the output is always
/// a fixed point: `lemmatize(lemmatize(w)) == lemmatize(w)`.
#[derive(Debug, Clone, Default)]
pub struct Lemmatizer;

impl Lemmatizer {
    pub fn new() -> Self {
        Self
    }

    /// Reduces `word` (lowercase ASCII) to its dictionary base form.
    pub fn lemmatize(&self, word: &str) -> String {
        let mut current = word.to_string();
        for _ in 0..MAX_PASSES {
            match Self::rewrite(&current) {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    fn rewrite(word: &str) -> Option<String> {
        if let Some(base) = EXCEPTIONS.get(word) {
            return Some((*base).to_string());
        }

        let len = word.len();
        if len > 4 && word.ends_with("sses") {
            return Some(word[..len - 2].to_string());
        }
        if len > 4 && word.ends_with("ies") {
            return Some(format!("{}y", &word[..len - 3]));
        }
        if len > 4 && (word.ends_with("xes") || word.ends_with("ches") || word.ends_with("shes")) {
            return Some(word[..len - 2].to_string());
        }
        if len > 3 && word.ends_with('s') {
            let prev = word.as_bytes()[len - 2];
            if !matches!(prev, b's' | b'u' | b'i') {
                return Some(word[..len - 1].to_string());
            }
        }
        None
    }
}
