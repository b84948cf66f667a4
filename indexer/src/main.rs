use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use searchindex::persist::{self, IndexPaths};
use searchindex::query::{lookup, lookup_title, search};
use searchindex::{registry, validate, SearchIndex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

const INDEX_FILE_NAME: &str = "searchindex.js";

#[derive(Parser)]
#[command(name = "searchindex")]
#[command(about = "Inspect, check and query documentation search indexes", long_about = None)]
struct Cli {
    /// Refuse to load an index that fails the structural checks
    #[arg(long, global = true, default_value_t = false)]
    strict: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the document table and index sizes
    Inspect {
        /// searchindex.js, JSON file or snapshot directory
        #[arg(long)]
        index: PathBuf,
        /// Emit JSON instead of text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Check structural invariants; exits non-zero on any violation
    Validate {
        #[arg(long, conflicts_with = "root", required_unless_present = "root")]
        index: Option<PathBuf>,
        /// Check every searchindex.js below this directory
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// List documents containing an exact term
    Lookup {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        term: String,
        /// Look in title terms instead of body terms
        #[arg(long, default_value_t = false)]
        titles: bool,
    },
    /// Run a query the way the documentation search box does
    Search {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = 10)]
        k: usize,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Write a binary snapshot directory
    Snapshot {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Write the index back out as searchindex.js
    Emit {
        #[arg(long)]
        index: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct Summary<'a> {
    documents: Vec<searchindex::Document<'a>>,
    terms: usize,
    titleterms: usize,
    objects: usize,
    envversion: &'a BTreeMap<String, u32>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let strict = cli.strict;

    match cli.command {
        Commands::Inspect { index, json } => inspect(&index, json, strict),
        Commands::Validate { index, root } => match (index, root) {
            (Some(index), _) => validate_paths(&[index]),
            (None, Some(root)) => validate_paths(&find_index_files(&root)),
            (None, None) => bail!("either --index or --root is required"),
        },
        Commands::Lookup { index, term, titles } => {
            let index = load(&index, strict)?;
            let docs = if titles { lookup_title(&index, &term) } else { lookup(&index, &term) };
            for &doc in docs {
                if let Some(d) = index.document(doc) {
                    println!("{}\t{}\t{}", d.id, d.docname, d.title);
                }
            }
            Ok(())
        }
        Commands::Search { index, query, k, json } => {
            let index = load(&index, strict)?;
            let hits: Vec<_> = search(&index, &query).into_iter().take(k.max(1)).collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                for h in hits {
                    println!("{:>4}  {}\t{}", h.score, h.docname, h.title);
                }
            }
            Ok(())
        }
        Commands::Snapshot { index, output } => {
            let index = load(&index, strict)?;
            let meta = persist::save_snapshot(&IndexPaths::new(&output), &index)?;
            tracing::info!(output = %output.display(), docs = meta.num_docs, "snapshot complete");
            Ok(())
        }
        Commands::Emit { index, output } => {
            let index = load(&index, strict)?;
            persist::write_index_file(&output, &index)?;
            tracing::info!(output = %output.display(), "index written");
            Ok(())
        }
    }
}

/// Open an index and make it the process-wide one.
fn load(path: &Path, strict: bool) -> Result<std::sync::Arc<SearchIndex>> {
    let index = if strict { persist::open_strict(path)? } else { persist::open(path)? };
    Ok(registry::set_index(index))
}

fn inspect(path: &Path, json: bool, strict: bool) -> Result<()> {
    let index = load(path, strict)?;
    let summary = Summary {
        documents: index.documents().collect(),
        terms: index.terms.len(),
        titleterms: index.titleterms.len(),
        objects: index.objects.values().map(Vec::len).sum(),
        envversion: &index.envversion,
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    for d in &summary.documents {
        println!("{:>3}  {:<40} {}", d.id, d.filename, d.title);
    }
    println!("terms: {}  titleterms: {}  objects: {}", summary.terms, summary.titleterms, summary.objects);
    if let Some(v) = index.envversion("sphinx") {
        println!("generator version: {v}");
    }
    Ok(())
}

fn find_index_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && e.file_name() == INDEX_FILE_NAME)
        .map(|e| e.into_path())
        .collect()
}

fn validate_paths(paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        bail!("no {INDEX_FILE_NAME} files found");
    }
    let mut failed = 0usize;
    for path in paths {
        let index = persist::open(path)?;
        let violations = validate::check(&index);
        if violations.is_empty() {
            println!("ok\t{}", path.display());
        } else {
            failed += 1;
            for v in &violations {
                println!("error\t{}\t{v}", path.display());
            }
        }
    }
    tracing::info!(checked = paths.len(), failed, "validation complete");
    if failed > 0 {
        bail!("{failed} of {} index files failed validation", paths.len());
    }
    Ok(())
}
