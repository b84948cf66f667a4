//! Process-wide registration of the active search index.
//!
//! The slot is either empty ("not yet loaded") or holds one immutable index.
//! Registering again replaces the stored reference; readers holding an
//! earlier `Arc` keep their snapshot.

use crate::{loader, IndexError, SearchIndex};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::sync::Arc;

lazy_static! {
    static ref CURRENT: RwLock<Option<Arc<SearchIndex>>> = RwLock::new(None);
}

pub fn set_index(index: SearchIndex) -> Arc<SearchIndex> {
    let index = Arc::new(index);
    let previous = CURRENT.write().replace(Arc::clone(&index));
    tracing::info!(docs = index.num_docs(), terms = index.terms.len(), replaced = previous.is_some(), "search index registered");
    index
}

pub fn current() -> Option<Arc<SearchIndex>> {
    CURRENT.read().clone()
}

pub fn is_loaded() -> bool {
    CURRENT.read().is_some()
}

/// Drop the registered index, returning it if there was one.
pub fn clear() -> Option<Arc<SearchIndex>> {
    CURRENT.write().take()
}

/// Parse a `searchindex.js` body and register it.
pub fn load_js(src: &str) -> Result<Arc<SearchIndex>, IndexError> {
    Ok(set_index(loader::parse_js(src)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    // The slot is global, so the whole lifecycle runs in one test.
    #[test]
    fn lifecycle_is_idempotent() {
        clear();
        assert!(!is_loaded());
        assert!(current().is_none());

        let src = r#"Search.setIndex({"docnames": ["intro"], "filenames": ["intro.md"], "titles": ["Philote-Python"], "terms": {"philote": 0}})"#;
        let first = load_js(src).unwrap();
        assert!(is_loaded());
        assert_eq!(current().unwrap().docs_for_term("philote"), &[0]);

        let second = load_js(src).unwrap();
        assert_eq!(*first, *second);
        assert_eq!(*current().unwrap(), *first);

        let mut other = SearchIndex::new();
        other.docnames.push("installation".into());
        set_index(other);
        assert_eq!(current().unwrap().docnames, vec!["installation"]);
        // Earlier readers are unaffected by replacement.
        assert_eq!(first.docnames, vec!["intro"]);

        assert!(load_js("not an index").is_err());
        assert_eq!(current().unwrap().docnames, vec!["installation"]);

        assert!(clear().is_some());
        assert!(!is_loaded());
    }
}
