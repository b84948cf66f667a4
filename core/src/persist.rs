use crate::{loader, validate, IndexError, SearchIndex};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub num_title_terms: u32,
    pub created_at: String,
    pub version: u32,
    /// `envversion["sphinx"]` of the source index, when present.
    pub generator: Option<u32>,
}

impl MetaFile {
    pub fn describe(index: &SearchIndex) -> Self {
        Self {
            num_docs: index.num_docs() as u32,
            num_terms: index.terms.len() as u32,
            num_title_terms: index.titleterms.len() as u32,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            version: SNAPSHOT_VERSION,
            generator: index.envversion("sphinx"),
        }
    }
}

/// Layout of a snapshot directory.
pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    /// True when `root` looks like a snapshot directory.
    pub fn is_snapshot(&self) -> bool { self.index().is_file() }
}

/// Read a `searchindex.js` (or bare JSON) file.
pub fn read_index_file<P: AsRef<Path>>(path: P) -> Result<SearchIndex> {
    let path = path.as_ref();
    let src = fs::read_to_string(path).map_err(|e| IndexError::io(path, e))?;
    let index = loader::parse(&src)?;
    tracing::debug!(path = %path.display(), docs = index.num_docs(), "read index file");
    Ok(index)
}

pub fn write_index_file<P: AsRef<Path>>(path: P, index: &SearchIndex) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir)?;
    }
    let mut f = File::create(path).map_err(|e| IndexError::io(path, e))?;
    f.write_all(loader::to_js(index)?.as_bytes())?;
    Ok(())
}

pub fn save_snapshot(paths: &IndexPaths, index: &SearchIndex) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.index())?;
    let bytes = bincode::serialize(index).map_err(IndexError::from)?;
    f.write_all(&bytes)?;
    let meta = MetaFile::describe(index);
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), docs = meta.num_docs, terms = meta.num_terms, "snapshot written");
    Ok(meta)
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<SearchIndex> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        anyhow::bail!("unsupported snapshot version {} (expected {})", meta.version, SNAPSHOT_VERSION);
    }
    let mut f = File::open(paths.index()).map_err(|e| IndexError::io(paths.index(), e))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let index: SearchIndex = bincode::deserialize(&buf).map_err(IndexError::from)?;
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).map_err(|e| IndexError::io(paths.meta(), e))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Load a snapshot directory, or an index file for any other path.
pub fn open<P: AsRef<Path>>(path: P) -> Result<SearchIndex> {
    let paths = IndexPaths::new(&path);
    if paths.is_snapshot() {
        load_snapshot(&paths)
    } else {
        read_index_file(path)
    }
}

/// [`open`], then reject the index if any structural check fails.
pub fn open_strict<P: AsRef<Path>>(path: P) -> Result<SearchIndex> {
    let index = open(path)?;
    validate::ensure_valid(&index)?;
    Ok(index)
}
