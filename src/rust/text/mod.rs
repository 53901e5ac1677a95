//! Deterministic text cleanup shared by training and inference.
//!
//! Both paths must see byte-identical normalization, otherwise the fitted
//! vocabulary and the inference-time tokens drift apart.

mod lemmatizer;
mod normalizer;
mod stopwords;

pub use lemmatizer::Lemmatizer;
pub use normalizer::{NormalizedText, TextNormalizer};
pub use stopwords::is_stopword;
