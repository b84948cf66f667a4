use crate::{DocId, IndexError, Postings, SearchIndex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Which inverted table a term reference came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TermTable {
    Terms,
    TitleTerms,
}

impl fmt::Display for TermTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermTable::Terms => f.write_str("terms"),
            TermTable::TitleTerms => f.write_str("titleterms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    LengthMismatch { docnames: usize, filenames: usize, titles: usize },
    DanglingTermRef { table: TermTable, term: String, doc: DocId },
    UnsortedPostings { table: TermTable, term: String },
    DanglingObjectRef { prefix: String, doc: DocId },
    UnknownObjectType { prefix: String, objtype: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::LengthMismatch { docnames, filenames, titles } => write!(
                f,
                "document tables differ in length: docnames={docnames} filenames={filenames} titles={titles}"
            ),
            Violation::DanglingTermRef { table, term, doc } => {
                write!(f, "{table}[{term:?}] references missing document {doc}")
            }
            Violation::UnsortedPostings { table, term } => {
                write!(f, "{table}[{term:?}] is not strictly increasing")
            }
            Violation::DanglingObjectRef { prefix, doc } => {
                write!(f, "objects[{prefix:?}] references missing document {doc}")
            }
            Violation::UnknownObjectType { prefix, objtype } => {
                write!(f, "objects[{prefix:?}] uses undeclared object type {objtype}")
            }
        }
    }
}

/// Every structural problem in `index`, in table order. Empty means valid.
pub fn check(index: &SearchIndex) -> Vec<Violation> {
    let mut out = Vec::new();
    let (docnames, filenames, titles) = (index.docnames.len(), index.filenames.len(), index.titles.len());
    if docnames != filenames || docnames != titles {
        out.push(Violation::LengthMismatch { docnames, filenames, titles });
    }
    let num_docs = docnames as u64;

    check_table(TermTable::Terms, &index.terms, num_docs, &mut out);
    check_table(TermTable::TitleTerms, &index.titleterms, num_docs, &mut out);

    for (prefix, entries) in &index.objects {
        for entry in entries {
            if u64::from(entry.doc()) >= num_docs {
                out.push(Violation::DanglingObjectRef { prefix: prefix.clone(), doc: entry.doc() });
            }
            if !index.objtypes.contains_key(&entry.objtype().to_string()) {
                out.push(Violation::UnknownObjectType { prefix: prefix.clone(), objtype: entry.objtype() });
            }
        }
    }

    for v in &out {
        tracing::warn!(violation = %v, "search index violation");
    }
    out
}

fn check_table(table: TermTable, terms: &BTreeMap<String, Postings>, num_docs: u64, out: &mut Vec<Violation>) {
    for (term, postings) in terms {
        let docs = postings.as_slice();
        for &doc in docs {
            if u64::from(doc) >= num_docs {
                out.push(Violation::DanglingTermRef { table, term: term.clone(), doc });
            }
        }
        if docs.windows(2).any(|w| w[0] >= w[1]) {
            out.push(Violation::UnsortedPostings { table, term: term.clone() });
        }
    }
}

/// Like [`check`], but fails on the first violation.
pub fn ensure_valid(index: &SearchIndex) -> Result<(), IndexError> {
    match check(index).into_iter().next() {
        Some(v) => Err(IndexError::Invalid(v)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectEntry;

    fn two_docs() -> SearchIndex {
        SearchIndex {
            docnames: vec!["intro".into(), "installation".into()],
            filenames: vec!["intro.md".into(), "installation.md".into()],
            titles: vec!["Philote-Python".into(), "Installation".into()],
            ..Default::default()
        }
    }

    #[test]
    fn clean_index_has_no_violations() {
        let mut idx = two_docs();
        idx.terms.insert("philot".into(), vec![0, 1].into());
        idx.titleterms.insert("instal".into(), vec![1].into());
        assert!(check(&idx).is_empty());
        assert!(ensure_valid(&idx).is_ok());
    }

    #[test]
    fn reports_length_mismatch() {
        let mut idx = two_docs();
        idx.titles.pop();
        assert_eq!(check(&idx), vec![Violation::LengthMismatch { docnames: 2, filenames: 2, titles: 1 }]);
    }

    #[test]
    fn reports_out_of_range_and_unsorted_postings() {
        let mut idx = two_docs();
        idx.terms.insert("grpc".into(), vec![1, 0].into());
        idx.titleterms.insert("unit".into(), vec![2].into());
        let v = check(&idx);
        assert!(v.contains(&Violation::UnsortedPostings { table: TermTable::Terms, term: "grpc".into() }));
        assert!(v.contains(&Violation::DanglingTermRef { table: TermTable::TitleTerms, term: "unit".into(), doc: 2 }));
        assert!(matches!(ensure_valid(&idx), Err(IndexError::Invalid(_))));
    }

    #[test]
    fn reports_bad_objects() {
        let mut idx = two_docs();
        idx.objects.insert(
            "philote_mdo.general".into(),
            vec![ObjectEntry(5, 0, 1, String::new(), "ExplicitDiscipline".into())],
        );
        let v = check(&idx);
        assert_eq!(v.len(), 2);
        assert!(v.contains(&Violation::DanglingObjectRef { prefix: "philote_mdo.general".into(), doc: 5 }));
        assert!(v.contains(&Violation::UnknownObjectType { prefix: "philote_mdo.general".into(), objtype: 0 }));
    }

    #[test]
    fn violation_messages_name_the_table() {
        let v = Violation::DanglingTermRef { table: TermTable::TitleTerms, term: "unit".into(), doc: 9 };
        assert_eq!(v.to_string(), r#"titleterms["unit"] references missing document 9"#);
    }
}
