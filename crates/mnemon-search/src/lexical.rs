// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory inverted index with BM25 ranking.
//!
//! Terms are lowercased alphanumeric runs. The index keeps per-term,
//! per-document frequencies plus document lengths, enough to evaluate the
//! standard BM25 formula (k1 = 1.2, b = 0.75) against a candidate set.

use std::collections::{HashMap, HashSet};

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Inverted term-frequency index over chunk contents.
#[derive(Debug, Default)]
pub struct LexicalIndex {
    /// term -> document id -> term frequency.
    postings: HashMap<String, HashMap<String, u32>>,
    /// document id -> distinct terms (for cheap removal on upsert).
    doc_terms: HashMap<String, Vec<String>>,
    /// document id -> token count.
    doc_lens: HashMap<String, u32>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a document, replacing any previous content under the same id.
    pub fn insert(&mut self, id: &str, text: &str) {
        self.remove(id);
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return;
        }
        self.doc_lens.insert(id.to_string(), tokens.len() as u32);
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *counts.entry(token).or_insert(0) += 1;
        }
        let mut terms = Vec::with_capacity(counts.len());
        for (term, tf) in counts {
            self.postings
                .entry(term.clone())
                .or_default()
                .insert(id.to_string(), tf);
            terms.push(term);
        }
        self.doc_terms.insert(id.to_string(), terms);
    }

    /// Remove a document from the index; unknown ids are a no-op.
    pub fn remove(&mut self, id: &str) {
        let Some(terms) = self.doc_terms.remove(id) else {
            return;
        };
        self.doc_lens.remove(id);
        for term in terms {
            if let Some(docs) = self.postings.get_mut(&term) {
                docs.remove(id);
                if docs.is_empty() {
                    self.postings.remove(&term);
                }
            }
        }
    }

    /// Raw BM25 scores for the query, restricted to `candidates`.
    ///
    /// Documents in the candidate set that match no query term are absent
    /// from the returned map (their score is zero).
    pub fn scores(&self, query: &str, candidates: &HashSet<String>) -> HashMap<String, f32> {
        let mut out: HashMap<String, f32> = HashMap::new();
        let doc_count = self.doc_lens.len();
        if doc_count == 0 {
            return out;
        }
        let total_len: u64 = self.doc_lens.values().map(|&l| u64::from(l)).sum();
        let avg_len = total_len as f32 / doc_count as f32;

        for term in tokenize(query) {
            let Some(docs) = self.postings.get(&term) else {
                continue;
            };
            let df = docs.len() as f32;
            let idf = (((doc_count as f32 - df + 0.5) / (df + 0.5)) + 1.0).ln();
            for (id, &tf) in docs {
                if !candidates.contains(id) {
                    continue;
                }
                let doc_len = self.doc_lens.get(id).copied().unwrap_or(0) as f32;
                let tf = tf as f32;
                let denom = tf + K1 * (1.0 - B + B * doc_len / avg_len);
                *out.entry(id.clone()).or_insert(0.0) += idf * (tf * (K1 + 1.0)) / denom;
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.doc_lens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_lens.is_empty()
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.doc_terms.clear();
        self.doc_lens.clear();
    }
}

/// Lowercased alphanumeric runs.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
