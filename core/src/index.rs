use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

pub type DocId = u32;

/// Ordered document ids for one term.
///
/// The generator writes a bare integer when a term occurs in a single
/// document and an array otherwise; both shapes load into the same value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Postings(pub Vec<DocId>);

impl Postings {
    pub fn as_slice(&self) -> &[DocId] { &self.0 }
}

impl From<Vec<DocId>> for Postings {
    fn from(v: Vec<DocId>) -> Self { Self(v) }
}

impl Serialize for Postings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() && self.0.len() == 1 {
            serializer.serialize_u32(self.0[0])
        } else {
            self.0.serialize(serializer)
        }
    }
}

struct PostingsVisitor;

impl<'de> Visitor<'de> for PostingsVisitor {
    type Value = Postings;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a document index or a list of document indices")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Postings, E> {
        let doc = DocId::try_from(v).map_err(|_| E::custom(format!("document index {v} out of range")))?;
        Ok(Postings(vec![doc]))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Postings, E> {
        let v = u64::try_from(v).map_err(|_| E::custom(format!("negative document index {v}")))?;
        self.visit_u64(v)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Postings, A::Error> {
        let mut docs = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(doc) = seq.next_element::<DocId>()? {
            docs.push(doc);
        }
        Ok(Postings(docs))
    }
}

impl<'de> Deserialize<'de> for Postings {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(PostingsVisitor)
        } else {
            deserializer.deserialize_seq(PostingsVisitor)
        }
    }
}

/// `[doc, objtype, priority, anchor, name]` entry of `objects[prefix]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEntry(pub DocId, pub u32, pub i32, pub String, pub String);

impl ObjectEntry {
    pub fn doc(&self) -> DocId { self.0 }
    pub fn objtype(&self) -> u32 { self.1 }
    pub fn priority(&self) -> i32 { self.2 }
    pub fn anchor(&self) -> &str { &self.3 }
    pub fn name(&self) -> &str { &self.4 }
}

/// Objects under one prefix. Newer generators write a list of
/// [`ObjectEntry`]; older ones write `{name: [doc, objtype, priority, anchor]}`.
struct PrefixObjects(Vec<ObjectEntry>);

struct PrefixObjectsVisitor;

impl<'de> Visitor<'de> for PrefixObjectsVisitor {
    type Value = PrefixObjects;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a list of object entries or a map of object name to entry")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<PrefixObjects, A::Error> {
        let mut entries = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(entry) = seq.next_element::<ObjectEntry>()? {
            entries.push(entry);
        }
        Ok(PrefixObjects(entries))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PrefixObjects, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((name, (doc, objtype, priority, anchor))) = map.next_entry::<String, (DocId, u32, i32, String)>()? {
            entries.push(ObjectEntry(doc, objtype, priority, anchor, name));
        }
        Ok(PrefixObjects(entries))
    }
}

impl<'de> Deserialize<'de> for PrefixObjects {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_any(PrefixObjectsVisitor)
        } else {
            deserializer.deserialize_seq(PrefixObjectsVisitor)
        }
    }
}

fn deserialize_objects<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, Vec<ObjectEntry>>, D::Error> {
    let by_prefix = BTreeMap::<String, PrefixObjects>::deserialize(deserializer)?;
    Ok(by_prefix.into_iter().map(|(prefix, objects)| (prefix, objects.0)).collect())
}

/// `[domain, kind, label]` entry of `objnames`, e.g. `["py", "function", "Python function"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjName(pub String, pub String, pub String);

impl ObjName {
    pub fn kind(&self) -> &str { &self.1 }
    pub fn label(&self) -> &str { &self.2 }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub docnames: Vec<String>,
    pub filenames: Vec<String>,
    pub titles: Vec<String>,
    pub terms: BTreeMap<String, Postings>,
    #[serde(default, deserialize_with = "deserialize_objects")]
    pub objects: BTreeMap<String, Vec<ObjectEntry>>,
    #[serde(default)]
    pub objtypes: BTreeMap<String, String>,
    #[serde(default)]
    pub objnames: BTreeMap<String, ObjName>,
    #[serde(default)]
    pub titleterms: BTreeMap<String, Postings>,
    #[serde(default)]
    pub envversion: BTreeMap<String, u32>,
}

/// One document, seen through the parallel tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Document<'a> {
    pub id: DocId,
    pub docname: &'a str,
    pub filename: &'a str,
    pub title: &'a str,
}

impl SearchIndex {
    pub fn new() -> Self { Self::default() }

    /// Number of documents, taken from `docnames`.
    pub fn num_docs(&self) -> usize { self.docnames.len() }

    pub fn document(&self, id: DocId) -> Option<Document<'_>> {
        let i = id as usize;
        Some(Document {
            id,
            docname: self.docnames.get(i)?,
            filename: self.filenames.get(i)?,
            title: self.titles.get(i)?,
        })
    }

    /// Documents present in all three tables, in index order.
    pub fn documents(&self) -> impl Iterator<Item = Document<'_>> + '_ {
        (0..self.num_docs() as DocId).filter_map(move |id| self.document(id))
    }

    pub fn docs_for_term(&self, term: &str) -> &[DocId] {
        self.terms.get(term).map(Postings::as_slice).unwrap_or(&[])
    }

    pub fn docs_for_title_term(&self, term: &str) -> &[DocId] {
        self.titleterms.get(term).map(Postings::as_slice).unwrap_or(&[])
    }

    pub fn envversion(&self, name: &str) -> Option<u32> {
        self.envversion.get(name).copied()
    }

    /// `objnames` entry for an object type id, if the generator emitted one.
    pub fn objname(&self, objtype: u32) -> Option<&ObjName> {
        self.objnames.get(&objtype.to_string())
    }
}
