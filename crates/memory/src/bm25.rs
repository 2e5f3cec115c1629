//! BM25 ranking over an in-memory corpus.
//!
//! For each query term:
//!
//! ```text
//! score += idf(term) * tf * (k1 + 1) / (tf + k1 * (1 - b + b * docLen / avgDocLen))
//! idf(term) = ln((N - df + 0.5) / (df + 0.5) + 1)
//! ```
//!
//! `tf` counts exact token matches in the document. `df` counts documents
//! whose lower-cased text *contains* the term as a substring, so a term that
//! is a prefix of longer words is counted in more documents than it occurs in
//! as a token. Existing rankings depend on this, keep it.

use crate::text::tokenize;

/// Term-frequency saturation.
pub const DEFAULT_K1: f32 = 1.5;

/// Length normalization strength.
pub const DEFAULT_B: f32 = 0.75;

/// A tokenized corpus ready to be scored against queries.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    k1: f32,
    b: f32,
    docs: Vec<IndexedDoc>,
    avg_doc_len: f32,
}

#[derive(Debug, Clone)]
struct IndexedDoc {
    lowered: String,
    tokens: Vec<String>,
}

impl Bm25Index {
    /// Index documents with the default parameters (k1 = 1.5, b = 0.75).
    pub fn new<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::with_params(documents, DEFAULT_K1, DEFAULT_B)
    }

    pub fn with_params<I, S>(documents: I, k1: f32, b: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let docs: Vec<IndexedDoc> = documents
            .into_iter()
            .map(|d| IndexedDoc {
                lowered: d.as_ref().to_lowercase(),
                tokens: tokenize(d.as_ref()),
            })
            .collect();

        let total_len: usize = docs.iter().map(|d| d.tokens.len()).sum();
        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f32 / docs.len() as f32
        };

        Self {
            k1,
            b,
            docs,
            avg_doc_len,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Number of documents whose lower-cased text contains `term`.
    pub fn document_frequency(&self, term: &str) -> usize {
        self.docs.iter().filter(|d| d.lowered.contains(term)).count()
    }

    pub fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = self.document_frequency(term) as f32;
        ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
    }

    /// Score every document against `query`, in corpus order.
    pub fn score_all(&self, query: &str) -> Vec<f32> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return vec![0.0; self.docs.len()];
        }

        let idfs: Vec<f32> = terms.iter().map(|t| self.idf(t)).collect();
        // All documents empty: avoid dividing by zero, length term becomes 1.
        let avg_len = if self.avg_doc_len > 0.0 {
            self.avg_doc_len
        } else {
            1.0
        };

        self.docs
            .iter()
            .map(|doc| {
                let doc_len = doc.tokens.len() as f32;
                terms
                    .iter()
                    .zip(&idfs)
                    .map(|(term, idf)| {
                        let tf = doc.tokens.iter().filter(|t| *t == term).count() as f32;
                        if tf == 0.0 {
                            return 0.0;
                        }
                        let norm = self.k1 * (1.0 - self.b + self.b * doc_len / avg_len);
                        idf * tf * (self.k1 + 1.0) / (tf + norm)
                    })
                    .sum()
            })
            .collect()
    }
}
