use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}_]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    // Stopword list shipped with the search widget's English language data.
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","and","are","as","at","be","but","by","for","if","in","into","is","it",
            "near","no","not","of","on","or","such","that","the","their","then","there",
            "these","they","this","to","was","will","with",
        ];
        words.iter().copied().collect()
    };
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// A query word: the lowercased surface form and its stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub word: String,
    pub stem: String,
}

impl QueryTerm {
    /// Keys to try in the term tables: the stem first, then the raw word if it differs.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.stem.as_str()).chain((self.word != self.stem).then_some(self.word.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub terms: Vec<QueryTerm>,
    pub excluded: Vec<QueryTerm>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool { self.terms.is_empty() }
}

/// Split a user query into search words and `-word` exclusions.
///
/// Text is NFKC-normalized and lowercased, split on anything other than
/// letters, digits and `_`, then stopwords and purely numeric words are
/// dropped. Remaining words are stemmed; repeated stems are kept once.
pub fn tokenize_query(query: &str) -> ParsedQuery {
    let normalized = query.nfkc().collect::<String>().to_lowercase();
    let mut parsed = ParsedQuery::default();
    let mut seen: HashSet<(bool, String)> = HashSet::new();
    for chunk in normalized.split_whitespace() {
        let (exclude, chunk) = match chunk.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, chunk),
        };
        for mat in RE.find_iter(chunk) {
            let word = mat.as_str();
            if is_stopword(word) || word.chars().all(|c| c.is_ascii_digit()) { continue; }
            let stem = STEMMER.stem(word).to_string();
            if !seen.insert((exclude, stem.clone())) { continue; }
            let term = QueryTerm { word: word.to_string(), stem };
            if exclude { parsed.excluded.push(term) } else { parsed.terms.push(term) }
        }
    }
    parsed
}
