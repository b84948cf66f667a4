//! Loading, checking and querying documentation search indexes
//! (`searchindex.js` files written by the documentation generator).

pub mod error;
pub mod index;
pub mod loader;
pub mod persist;
pub mod query;
pub mod registry;
pub mod tokenizer;
pub mod validate;

pub use error::IndexError;
pub use index::{DocId, Document, ObjName, ObjectEntry, Postings, SearchIndex};
