use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::error::ClassifierError;
use super::utils::normalize_vector;
use crate::text::NormalizedText;

/// Fixed-dimension sparse vector; entries are sorted by index and never
/// contain an index at or beyond `dimension`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    dimension: usize,
    entries: Vec<(usize, f64)>,
}

impl FeatureVector {
    /// Builds a vector from `(index, value)` pairs, rejecting out-of-range
    /// indices. Duplicate indices are summed.
    pub fn from_entries(dimension: usize, entries: Vec<(usize, f64)>) -> Result<Self, ClassifierError> {
        let mut merged: BTreeMap<usize, f64> = BTreeMap::new();
        for (index, value) in entries {
            if index >= dimension {
                return Err(ClassifierError::ValidationError(format!(
                    "Feature index {} out of range for dimension {}",
                    index, dimension
                )));
            }
            *merged.entry(index).or_insert(0.0) += value;
        }
        Ok(Self {
            dimension,
            entries: merged.into_iter().collect(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    /// Number of non-zero entries.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }
}

/// Learned text-to-vector transform, fitted during training and applied
/// unchanged during inference.
pub trait FeatureExtractor {
    /// Learns the vocabulary and term weights from a training corpus.
    fn fit(&mut self, corpus: &[NormalizedText]) -> Result<(), ClassifierError>;

    /// Maps a document to a vector of [`FeatureExtractor::dimension`] entries.
    ///
    /// # Errors
    /// - `NotFitted` if called before [`FeatureExtractor::fit`]
    fn transform(&self, text: &NormalizedText) -> Result<FeatureVector, ClassifierError>;

    /// Vocabulary size fixed at fit time; zero before fitting.
    fn dimension(&self) -> usize;

    fn fit_transform(&mut self, corpus: &[NormalizedText]) -> Result<Vec<FeatureVector>, ClassifierError> {
        self.fit(corpus)?;
        corpus.iter().map(|doc| self.transform(doc)).collect()
    }
}

/// Term frequency × inverse document frequency over a capped vocabulary.
///
/// The vocabulary keeps the `max_features` terms with the highest corpus
/// count (ties broken alphabetically) and is indexed alphabetically. IDF is
/// smoothed, `ln((1 + n) / (1 + df)) + 1`, and every output vector is L2
/// normalized. Terms shorter than two characters are ignored; terms absent
/// from the vocabulary contribute nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    max_features: usize,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    fitted: bool,
}

impl TfidfVectorizer {
    const MIN_TERM_LEN: usize = 2;

    pub fn new(max_features: usize) -> Self {
        Self {
            max_features,
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            fitted: false,
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Index of `term` in the fitted vocabulary.
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.term_index(term).and_then(|i| self.idf.get(i).copied())
    }

    /// Checks that a fitted vocabulary maps its terms one-to-one onto the
    /// IDF table. Deserialized vectorizers must pass before use.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        if !self.fitted {
            return Ok(());
        }
        if self.idf.len() != self.vocabulary.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Vocabulary has {} terms but {} IDF weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        let mut seen = vec![false; self.idf.len()];
        for (term, &index) in &self.vocabulary {
            match seen.get_mut(index) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => {
                    return Err(ClassifierError::ValidationError(format!(
                        "Term {:?} reuses vocabulary index {}",
                        term, index
                    )))
                }
                None => {
                    return Err(ClassifierError::ValidationError(format!(
                        "Term {:?} has index {} beyond {} IDF weights",
                        term,
                        index,
                        self.idf.len()
                    )))
                }
            }
        }
        Ok(())
    }

    fn terms(doc: &NormalizedText) -> impl Iterator<Item = &str> {
        doc.tokens().filter(|t| t.len() >= Self::MIN_TERM_LEN)
    }
}

impl FeatureExtractor for TfidfVectorizer {
    fn fit(&mut self, corpus: &[NormalizedText]) -> Result<(), ClassifierError> {
        if corpus.is_empty() {
            return Err(ClassifierError::ValidationError("Cannot fit vectorizer on an empty corpus".into()));
        }

        let mut term_counts: HashMap<&str, usize> = HashMap::new();
        let mut doc_freq: HashMap<&str, usize> = HashMap::new();
        for doc in corpus {
            let mut seen: HashSet<&str> = HashSet::new();
            for term in Self::terms(doc) {
                *term_counts.entry(term).or_insert(0) += 1;
                if seen.insert(term) {
                    *doc_freq.entry(term).or_insert(0) += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(ClassifierError::ValidationError("Corpus contains no usable terms".into()));
        }

        let mut ranked: Vec<(&str, usize)> = term_counts.into_iter().collect();
        ranked.sort_by_key(|&(term, count)| (Reverse(count), term));
        ranked.truncate(self.max_features);

        let mut selected: Vec<&str> = ranked.into_iter().map(|(term, _)| term).collect();
        selected.sort_unstable();

        let n_docs = corpus.len() as f64;
        let mut vocabulary = HashMap::with_capacity(selected.len());
        let mut idf = Vec::with_capacity(selected.len());
        for (index, term) in selected.iter().enumerate() {
            let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n_docs) / (1.0 + df)).ln() + 1.0);
            vocabulary.insert((*term).to_string(), index);
        }

        info!("Fitted TF-IDF vocabulary with {} terms from {} documents", vocabulary.len(), corpus.len());
        self.vocabulary = vocabulary;
        self.idf = idf;
        self.fitted = true;
        Ok(())
    }

    fn transform(&self, text: &NormalizedText) -> Result<FeatureVector, ClassifierError> {
        if !self.fitted {
            return Err(ClassifierError::NotFitted);
        }

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        let mut unknown = 0usize;
        for term in Self::terms(text) {
            match self.vocabulary.get(term) {
                Some(&index) => *counts.entry(index).or_insert(0.0) += 1.0,
                None => unknown += 1,
            }
        }
        if unknown > 0 {
            debug!("{} out-of-vocabulary terms ignored", unknown);
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, tf)| (index, tf * self.idf[index]))
            .collect();
        normalize_vector(&mut entries);

        Ok(FeatureVector {
            dimension: self.vocabulary.len(),
            entries,
        })
    }

    fn dimension(&self) -> usize {
        self.vocabulary.len()
    }
}
