//! Loom CLI: one-shot enrichment and metadata inspection.
//!
//! Usage:
//!   loom enrich --root DIR --engine CMD [--arg ARG]... [--db path] <paths>...
//!   loom show <path> [--db path] [--uri-prefix URI]
//!   loom stats [--db path]

use clap::{Parser, Subcommand};
use loom::graph::vocab::extracted_from;
use loom::pipeline::content_uri;
use loom::{
    CommandEngine, EnrichmentPipeline, EventKind, FsRepository, MetadataGraph, MetadataStore,
    NodePath, OpenStore, PipelineConfig, RawEvent, SqliteStore, Term,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "loom",
    version,
    about = "Change-driven content enrichment pipeline"
)]
struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich files below a directory into the metadata store
    Enrich {
        /// Directory the node paths are relative to
        #[arg(long)]
        root: PathBuf,
        /// Enhancement engine executable
        #[arg(long)]
        engine: String,
        /// Argument passed to the engine (repeatable)
        #[arg(long = "arg", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Pipeline configuration (YAML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Kill the engine after this many seconds per file
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Files to enrich, relative to --root
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print the metadata stored for a node as JSON
    Show {
        /// Node path, e.g. /docs/a.txt
        path: String,
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
        /// Prefix of canonical content URIs
        #[arg(long, default_value = "urn:loom:content")]
        uri_prefix: String,
    },
    /// Print the number of stored statements
    Stats {
        /// Path to SQLite database file
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

/// Get the default database path (~/.local/share/loom/metadata.db)
fn default_db_path() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    let loom_dir = data_dir.join("loom");
    std::fs::create_dir_all(&loom_dir).ok();
    loom_dir.join("metadata.db")
}

fn open_store(db: Option<PathBuf>) -> Result<SqliteStore, String> {
    let db_path = db.unwrap_or_else(default_db_path);
    SqliteStore::open(&db_path).map_err(|e| format!("Failed to open database: {}", e))
}

#[allow(clippy::too_many_arguments)]
async fn cmd_enrich(
    root: PathBuf,
    engine: String,
    args: Vec<String>,
    db: Option<PathBuf>,
    config: Option<PathBuf>,
    timeout_secs: Option<u64>,
    paths: Vec<PathBuf>,
) -> i32 {
    let config = match config {
        Some(path) => match PipelineConfig::load(&path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
        None => PipelineConfig::default(),
    };
    let store = match open_store(db) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let mut engine = CommandEngine::new(engine).with_args(args);
    if let Some(secs) = timeout_secs {
        engine = engine.with_timeout(Duration::from_secs(secs));
    }
    let repository = Arc::new(FsRepository::new(&root));
    let layout = config.layout();

    let mut events = Vec::with_capacity(paths.len());
    for path in &paths {
        match repository.node_path(&root.join(path)) {
            Ok(node) => events.push(RawEvent::new(
                EventKind::PropertyChanged,
                layout.payload_path(&node),
            )),
            Err(e) => eprintln!("Warning: skipping '{}': {}", path.display(), e),
        }
    }

    let pipeline = match EnrichmentPipeline::start(
        config,
        repository,
        Arc::new(engine),
        store,
    )
    .await
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let summary = pipeline.notify(events);
    if summary.dropped + summary.ignored > 0 {
        eprintln!(
            "Warning: {} of {} paths could not be enriched",
            summary.dropped + summary.ignored,
            paths.len()
        );
    }

    let code = match pipeline.flush().await {
        None => {
            println!("Nothing to enrich.");
            0
        }
        Some(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Error: {}", e),
            }
            if report.failed.is_empty() {
                0
            } else {
                1
            }
        }
    };

    if let Err(e) = pipeline.stop().await {
        eprintln!("Error: {}", e);
        return 1;
    }
    code
}

fn cmd_show(store: &SqliteStore, path: &str, uri_prefix: &str) -> i32 {
    let node = match NodePath::parse(path) {
        Ok(n) => n,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let uri = Term::Iri(content_uri(uri_prefix, &node));

    let mut subjects = match store.subjects_with(&extracted_from(), &uri) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    subjects.push(uri);

    let mut graph = MetadataGraph::new();
    for subject in &subjects {
        match store.statements_with_subject(subject) {
            Ok(statements) => graph.extend(statements),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    }

    if graph.is_empty() {
        eprintln!("No metadata stored for '{}'", node);
        return 1;
    }
    match serde_json::to_string_pretty(&graph) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_stats(store: &SqliteStore) -> i32 {
    match store.len() {
        Ok(n) => {
            println!("{} statements", n);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let code = match cli.command {
        Commands::Enrich {
            root,
            engine,
            args,
            db,
            config,
            timeout_secs,
            paths,
        } => cmd_enrich(root, engine, args, db, config, timeout_secs, paths).await,
        Commands::Show {
            path,
            db,
            uri_prefix,
        } => match open_store(db) {
            Ok(store) => cmd_show(&store, &path, &uri_prefix),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Stats { db } => match open_store(db) {
            Ok(store) => cmd_stats(&store),
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
    };
    std::process::exit(code);
}
