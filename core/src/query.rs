//! Resolve user queries against a loaded index, ranking hits the way the
//! documentation search widget does.

use crate::tokenizer::{tokenize_query, ParsedQuery, QueryTerm};
use crate::{DocId, ObjName, ObjectEntry, Postings, SearchIndex};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Widget scoring constants.
pub mod score {
    pub const TERM: i32 = 5;
    pub const PARTIAL_TERM: i32 = 2;
    pub const TITLE: i32 = 15;
    pub const PARTIAL_TITLE: i32 = 7;
    pub const OBJ_NAME_MATCH: i32 = 11;
    pub const OBJ_PARTIAL_MATCH: i32 = 6;

    pub fn obj_priority(priority: i32) -> i32 {
        match priority {
            0 => 15,
            1 => 5,
            2 => -5,
            _ => 0,
        }
    }
}

/// Partial matching only kicks in for words at least this long.
const MIN_PARTIAL_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: i32,
    pub docname: String,
    pub filename: String,
    pub title: String,
    /// Set for object hits: the anchor inside the document and the object's label.
    pub anchor: Option<String>,
    pub description: Option<String>,
}

/// Exact-term lookup in `terms`.
pub fn lookup<'a>(index: &'a SearchIndex, term: &str) -> &'a [DocId] {
    index.docs_for_term(term)
}

/// Exact-term lookup in `titleterms`.
pub fn lookup_title<'a>(index: &'a SearchIndex, term: &str) -> &'a [DocId] {
    index.docs_for_title_term(term)
}

pub fn search(index: &SearchIndex, query: &str) -> Vec<SearchHit> {
    let parsed = tokenize_query(query);
    if parsed.is_empty() {
        return Vec::new();
    }
    let mut hits = object_hits(index, &parsed);
    hits.extend(term_hits(index, &parsed));
    hits.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then_with(|| a.doc_id.cmp(&b.doc_id))
    });
    tracing::debug!(query, hits = hits.len(), "resolved query");
    hits
}

fn exact<'a>(table: &'a BTreeMap<String, Postings>, term: &QueryTerm) -> Option<Vec<&'a Postings>> {
    let found: Vec<&Postings> = term.keys().filter_map(|k| table.get(k)).collect();
    (!found.is_empty()).then_some(found)
}

fn partial<'a>(table: &'a BTreeMap<String, Postings>, term: &QueryTerm) -> Vec<&'a Postings> {
    if term.stem.chars().count() < MIN_PARTIAL_LEN {
        return Vec::new();
    }
    table
        .iter()
        .filter(|(key, _)| term.keys().any(|k| key.contains(k)))
        .map(|(_, postings)| postings)
        .collect()
}

/// Per-word matches: exact keys score full, and only when a table has no exact
/// key does substring matching against that table apply.
fn word_scores(index: &SearchIndex, term: &QueryTerm) -> HashMap<DocId, i32> {
    let mut scores: HashMap<DocId, i32> = HashMap::new();
    let tables = [(&index.terms, score::TERM, score::PARTIAL_TERM), (&index.titleterms, score::TITLE, score::PARTIAL_TITLE)];
    for (table, full, part) in tables {
        let (lists, value) = match exact(table, term) {
            Some(lists) => (lists, full),
            None => (partial(table, term), part),
        };
        for postings in lists {
            for &doc in postings.as_slice() {
                let s = scores.entry(doc).or_insert(value);
                *s = (*s).max(value);
            }
        }
    }
    scores
}

fn term_hits(index: &SearchIndex, parsed: &ParsedQuery) -> Vec<SearchHit> {
    let per_word: Vec<HashMap<DocId, i32>> = parsed.terms.iter().map(|t| word_scores(index, t)).collect();
    let required_all = parsed.terms.len();
    let required_long = parsed.terms.iter().filter(|t| t.stem.chars().count() >= MIN_PARTIAL_LEN).count();

    let excluded: HashSet<DocId> = parsed
        .excluded
        .iter()
        .flat_map(|t| t.keys().flat_map(move |k| index.docs_for_term(k).iter().chain(index.docs_for_title_term(k))))
        .copied()
        .collect();

    let mut matched: HashMap<DocId, (usize, i32)> = HashMap::new();
    for scores in &per_word {
        for (&doc, &s) in scores {
            let e = matched.entry(doc).or_insert((0, i32::MIN));
            e.0 += 1;
            e.1 = e.1.max(s);
        }
    }

    matched
        .into_iter()
        .filter(|(_, (count, _))| *count == required_all || *count == required_long)
        .filter(|(doc, _)| !excluded.contains(doc))
        .filter_map(|(doc, (_, score))| {
            let d = index.document(doc)?;
            Some(SearchHit {
                doc_id: doc,
                score,
                docname: d.docname.to_string(),
                filename: d.filename.to_string(),
                title: d.title.to_string(),
                anchor: None,
                description: None,
            })
        })
        .collect()
}

/// Object hits: every query word is matched against `prefix.name`, and the
/// remaining words must appear in the object's prefix, name, label or page title.
fn object_hits(index: &SearchIndex, parsed: &ParsedQuery) -> Vec<SearchHit> {
    if index.objects.is_empty() {
        return Vec::new();
    }
    let words: Vec<&str> = parsed.terms.iter().map(|t| t.word.as_str()).collect();
    let mut hits = Vec::new();
    for needle in &words {
        for (prefix, entries) in &index.objects {
            for entry in entries {
                if let Some(hit) = object_hit(index, prefix, entry, needle, &words) {
                    hits.push(hit);
                }
            }
        }
    }
    hits
}

fn object_hit(index: &SearchIndex, prefix: &str, entry: &ObjectEntry, needle: &str, words: &[&str]) -> Option<SearchHit> {
    let name = entry.name();
    let full = if prefix.is_empty() { name.to_string() } else { format!("{prefix}.{name}") };
    let full_lower = full.to_lowercase();
    if !full_lower.contains(needle) {
        return None;
    }
    let last = full_lower.rsplit('.').next().unwrap_or(full_lower.as_str());
    let base = if full_lower == needle || last == needle {
        score::OBJ_NAME_MATCH
    } else if last.contains(needle) {
        score::OBJ_PARTIAL_MATCH
    } else {
        0
    };

    let d = index.document(entry.doc())?;
    let objname = index.objname(entry.objtype());
    let label = objname.map(ObjName::label).unwrap_or_default();
    let haystack = format!("{prefix} {name} {label} {}", d.title).to_lowercase();
    if words.iter().any(|w| w != &needle && !haystack.contains(w)) {
        return None;
    }

    let anchor = match entry.anchor() {
        "" => full.clone(),
        "-" => match objname {
            Some(n) => format!("{}-{full}", n.kind()),
            None => full.clone(),
        },
        a => a.to_string(),
    };
    Some(SearchHit {
        doc_id: entry.doc(),
        score: base + score::obj_priority(entry.priority()),
        docname: d.docname.to_string(),
        filename: d.filename.to_string(),
        title: full,
        anchor: Some(anchor),
        description: objname.map(|n| format!("{}, in {}", n.label(), d.title)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SearchIndex {
        let mut idx = SearchIndex {
            docnames: vec!["intro".into(), "installation".into(), "tutorials/quickstart".into()],
            filenames: vec!["intro.md".into(), "installation.md".into(), "tutorials/quickstart.md".into()],
            titles: vec!["Philote-Python".into(), "Installation".into(), "Quick Start".into()],
            ..Default::default()
        };
        idx.terms.insert("philot".into(), vec![1, 2].into());
        idx.terms.insert("grpc".into(), vec![1, 2].into());
        idx.terms.insert("grpcio".into(), vec![1].into());
        idx.terms.insert("server".into(), vec![2].into());
        idx.titleterms.insert("philot".into(), vec![0].into());
        idx.titleterms.insert("instal".into(), vec![1].into());
        idx.titleterms.insert("quick".into(), vec![2].into());
        idx
    }

    #[test]
    fn title_matches_outrank_body_matches() {
        let hits = search(&sample(), "Philote");
        let ids: Vec<DocId> = hits.iter().map(|h| h.doc_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(hits[0].score, score::TITLE);
        assert_eq!(hits[1].score, score::TERM);
    }

    #[test]
    fn all_words_must_match() {
        let hits = search(&sample(), "grpc server");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].docname, "tutorials/quickstart");
    }

    #[test]
    fn partial_match_when_no_exact_key() {
        let hits = search(&sample(), "quic");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 2);
        assert_eq!(hits[0].score, score::PARTIAL_TITLE);

        let hits = search(&sample(), "grpci");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 1);
        assert_eq!(hits[0].score, score::PARTIAL_TERM);

        assert!(search(&sample(), "io").is_empty(), "short words skip partial matching");
    }

    #[test]
    fn exclusions_drop_documents() {
        let hits = search(&sample(), "grpc -server");
        assert_eq!(hits.iter().map(|h| h.doc_id).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn stopwords_only_query_is_empty() {
        assert!(search(&sample(), "the and of").is_empty());
        assert!(search(&sample(), "").is_empty());
    }

    #[test]
    fn raw_word_resolves_when_stem_is_absent() {
        let mut idx = SearchIndex {
            docnames: vec!["intro".into()],
            filenames: vec!["intro.md".into()],
            titles: vec!["Philote-Python".into()],
            ..Default::default()
        };
        idx.terms.insert("philote".into(), vec![0].into());
        assert_eq!(lookup(&idx, "philote"), &[0]);
        let hits = search(&idx, "philote");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc_id, 0);
    }

    #[test]
    fn short_words_do_not_count_toward_matching() {
        let mut idx = sample();
        idx.terms.insert("us".into(), vec![0].into());
        // Matching as many words as there are 3+ character stems is enough,
        // whichever words those are.
        let mut ids: Vec<DocId> = search(&idx, "us grpc").into_iter().map(|h| h.doc_id).collect();
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    fn with_objects() -> SearchIndex {
        let mut idx = sample();
        idx.objects.insert(
            "philote_mdo.general".into(),
            vec![
                ObjectEntry(2, 0, 1, "-".into(), "ExplicitDiscipline".into()),
                ObjectEntry(1, 0, 0, "".into(), "ImplicitDiscipline".into()),
            ],
        );
        idx.objtypes.insert("0".into(), "py:class".into());
        idx.objnames.insert("0".into(), ObjName("py".into(), "class".into(), "Python class".into()));
        idx
    }

    #[test]
    fn objects_are_matched_by_name() {
        let idx = with_objects();

        let hits = search(&idx, "ExplicitDiscipline");
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.score, score::OBJ_NAME_MATCH + 5);
        assert_eq!(hit.title, "philote_mdo.general.ExplicitDiscipline");
        assert_eq!(hit.anchor.as_deref(), Some("class-philote_mdo.general.ExplicitDiscipline"));
        assert_eq!(hit.description.as_deref(), Some("Python class, in Quick Start"));

        let hits = search(&idx, "ImplicitDiscipline");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, score::OBJ_NAME_MATCH + 15);
        assert_eq!(hits[0].anchor.as_deref(), Some("philote_mdo.general.ImplicitDiscipline"));

        let hits = search(&idx, "explicitdisc");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].score, score::OBJ_PARTIAL_MATCH + 5);
    }

    #[test]
    fn prefix_only_object_match_scores_priority_alone() {
        let hits = search(&with_objects(), "general");
        assert_eq!(hits.len(), 2);
        let explicit = hits.iter().find(|h| h.doc_id == 2).unwrap();
        assert_eq!(explicit.score, 5);
        let implicit = hits.iter().find(|h| h.doc_id == 1).unwrap();
        assert_eq!(implicit.score, 15);
    }

    #[test]
    fn other_query_words_filter_object_hits() {
        let idx = with_objects();
        let hits = search(&idx, "explicitdiscipline quick");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "philote_mdo.general.ExplicitDiscipline");

        // "class" is found through the objnames label.
        assert_eq!(search(&idx, "implicitdiscipline class").len(), 1);
        assert!(search(&idx, "explicitdiscipline grpc").is_empty());
    }
}
