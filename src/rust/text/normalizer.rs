use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::lemmatizer::Lemmatizer;
use super::stopwords::is_stopword;

lazy_static! {
    static ref URL_PATTERN: Regex = Regex::new(r"http\S+|www\.\S+").expect("valid URL pattern");
    static ref TAG_PATTERN: Regex = Regex::new(r"<[^>]*>").expect("valid tag pattern");
}

/// Text that has passed through [`TextNormalizer::normalize`].
///
/// Only lowercase ASCII letters separated by single spaces; never has
/// leading or trailing whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }

    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercases, strips URLs and markup, drops stopwords and lemmatizes.
///
/// Pure and infallible; normalizing an already normalized string returns it
/// unchanged.
#[derive(Debug, Clone, Default)]
pub struct TextNormalizer {
    lemmatizer: Lemmatizer,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            lemmatizer: Lemmatizer::new(),
        }
    }

    pub fn normalize(&self, text: &str) -> NormalizedText {
        let lowered = text.to_lowercase();
        let without_urls = URL_PATTERN.replace_all(&lowered, " ");
        let without_tags = TAG_PATTERN.replace_all(&without_urls, " ");

        let letters_only: String = without_tags
            .chars()
            .map(|c| if c.is_ascii_lowercase() { c } else { ' ' })
            .collect();

        let tokens: Vec<String> = letters_only
            .split_whitespace()
            .filter(|word| !is_stopword(word))
            .map(|word| self.lemmatizer.lemmatize(word))
            // a lemma may itself be a stopword
            .filter(|lemma| !is_stopword(lemma))
            .collect();

        NormalizedText(tokens.join(" "))
    }
}
