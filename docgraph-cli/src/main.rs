//! docgraph CLI - scrape, index and query Rust documentation
//!
//! # Commands
//!
//! ```bash
//! # Show what a source yields
//! docgraph scrape std
//! docgraph scrape crate --name tokio
//!
//! # Scrape every configured source and index it into the data dir
//! docgraph index
//!
//! # Index one local markdown file under a module
//! docgraph index --file notes/errors.md --type guide --module std
//!
//! # Hybrid search over the saved index
//! docgraph search "What is an Option?" -k 3
//!
//! # Graph neighbours plus similar documents of one node
//! docgraph related <node-id>
//! docgraph related <node-id> --edge-label contains
//!
//! # Remove orphans left by failed indexing runs
//! docgraph reconcile --dry-run
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;
use docgraph_lib::{
    config::Config,
    document::{keys, DocType},
    embed::{self, EmbeddingProvider},
    graph::{GraphStore, MemoryGraphStore, DOCUMENT_LABEL},
    index::{Indexer, Reconciler},
    scrape::{self, Scraper, Source},
    search::{HybridSearchEngine, SearchOptions},
    store::{MemoryVectorStore, VectorStore},
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

const VECTORS_FILE: &str = "vectors.json";
const GRAPH_FILE: &str = "graph.json";

#[derive(Parser)]
#[command(name = "docgraph")]
#[command(about = "Hybrid vector + graph retrieval over Rust documentation")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the index snapshots
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SourceArg {
    Std,
    Book,
    Crate,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape one source and print the documents it yields
    Scrape {
        source: SourceArg,

        /// Crate name (for the crate source)
        #[arg(long)]
        name: Option<String>,
    },

    /// Scrape every configured source and index it
    Index {
        /// Index this local markdown/HTML file instead of the configured sources
        #[arg(long)]
        file: Option<PathBuf>,

        /// Document type of the local file
        #[arg(long = "type", default_value = "guide")]
        doc_type: DocType,

        /// Module the local file belongs to
        #[arg(long)]
        module: Option<String>,
    },

    /// Hybrid search over the index
    Search {
        query: String,

        /// Number of results to return
        #[arg(short, long)]
        k: Option<usize>,

        /// Drop candidates scoring below this
        #[arg(long)]
        min_score: Option<f32>,
    },

    /// Documents related to a document node
    Related {
        /// Document node id
        node_id: String,

        /// Only follow graph edges with this label
        #[arg(long)]
        edge_label: Option<String>,
    },

    /// Find and remove orphaned vectors and nodes
    Reconcile {
        /// Report without deleting anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Embed text and show vector info
    Embed {
        /// Text to embed
        text: String,

        /// Treat as query (uses query prompt prefix)
        #[arg(short, long)]
        query: bool,
    },
}

fn data_dir(custom: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = custom {
        return Ok(dir);
    }
    ProjectDirs::from("org", "docgraph", "docgraph")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Opened stores, or empty ones when no snapshot has been saved yet
async fn open_stores(dir: &Path) -> Result<(Arc<MemoryVectorStore>, Arc<MemoryGraphStore>)> {
    let vectors = match MemoryVectorStore::open(dir.join(VECTORS_FILE)).await {
        Ok(store) => store,
        Err(e) if e.is_not_found() => MemoryVectorStore::new(),
        Err(e) => return Err(e).context("failed to open vector snapshot"),
    };
    let graph = match MemoryGraphStore::open(dir.join(GRAPH_FILE)).await {
        Ok(store) => store,
        Err(e) if e.is_not_found() => MemoryGraphStore::new(),
        Err(e) => return Err(e).context("failed to open graph snapshot"),
    };
    Ok((Arc::new(vectors), Arc::new(graph)))
}

async fn save_stores(
    dir: &Path,
    vectors: &MemoryVectorStore,
    graph: &MemoryGraphStore,
) -> Result<()> {
    vectors
        .save(dir.join(VECTORS_FILE))
        .await
        .context("failed to save vector snapshot")?;
    graph
        .save(dir.join(GRAPH_FILE))
        .await
        .context("failed to save graph snapshot")?;
    Ok(())
}

fn preview(text: &str, max: usize) -> String {
    let preview: String = text.chars().take(max).collect();
    let ellipsis = if text.chars().count() > max { "..." } else { "" };
    format!("{preview}{ellipsis}")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref())?;
    let dir = data_dir(cli.data_dir)?;

    match cli.command {
        Commands::Scrape { source, name } => {
            let source = match source {
                SourceArg::Std => Source::Std,
                SourceArg::Book => Source::Book,
                SourceArg::Crate => Source::Crate(
                    name.ok_or_else(|| anyhow!("--name is required for the crate source"))?,
                ),
            };

            let scraper = Scraper::new(config.sources)?;
            let docs = scraper.scrape(&source).await?;

            println!("Scraped {} document(s) from {source}:\n", docs.len());
            for doc in &docs {
                let module = doc.metadata.module_name().unwrap_or("-");
                println!("[{}] {} ({module})", doc.doc_type, doc.title);
                println!("  {}", doc.url);
                if !doc.content.is_empty() {
                    println!("  {}", preview(&doc.content, 120));
                }
            }
        }

        Commands::Index {
            file,
            doc_type,
            module,
        } => {
            let embedder = embed::from_config(&config.embedding)?;
            println!("Using embedding model {}", embedder.model_name());
            let (vectors, graph) = open_stores(&dir).await?;
            let indexer = Indexer::new(embedder, vectors.clone(), graph.clone());

            if let Some(file) = file {
                let doc = scrape::load_file(&file, doc_type, module)
                    .await
                    .with_context(|| format!("failed to load {}", file.display()))?;
                let indexed = indexer.index_document(&doc).await?;
                save_stores(&dir, &vectors, &graph).await?;
                println!("Indexed '{}' as node {}", doc.title, indexed.node.id);
                return Ok(());
            }

            let scraper = Scraper::new(config.sources)?;
            let sources = scraper.configured_sources();
            println!("Indexing {} source(s)...", sources.len());
            let report = indexer
                .index_stream(scraper.documents(sources), config.indexing.concurrency)
                .await;

            save_stores(&dir, &vectors, &graph).await?;
            let outcome = if report.is_complete() { "Done!" } else { "Finished with failures." };
            println!(
                "{outcome} Indexed {} document(s), {} failure(s). Index holds {} vector(s) in {}",
                report.indexed.len(),
                report.failures.len(),
                vectors.len().await?,
                dir.display()
            );
            for failure in &report.failures {
                println!(
                    "  failed {}: {}",
                    failure.url.as_deref().unwrap_or("<source>"),
                    failure.error
                );
            }
        }

        Commands::Search { query, k, min_score } => {
            let embedder = embed::from_config(&config.embedding)?;
            let (vectors, graph) = open_stores(&dir).await?;
            let engine = HybridSearchEngine::new(embedder, vectors, graph);

            let mut options = SearchOptions::from(&config.search);
            if let Some(k) = k {
                options.limit = k;
            }
            if min_score.is_some() {
                options.min_score = min_score;
            }

            println!("Searching: '{query}' (k={})", options.limit);
            let results = match engine.search_with(&query, &options).await {
                Ok(results) => results,
                Err(e) => {
                    warn!("Search failed: {}", e);
                    Vec::new()
                }
            };

            if results.is_empty() {
                println!("\nno results");
                return Ok(());
            }

            println!("\n=== Results ===\n");
            for (i, result) in results.iter().enumerate() {
                println!("#{} (score: {:.4})", i + 1, result.score);
                println!("  {}", result.node.prop(keys::TITLE).unwrap_or("<untitled>"));
                println!("  {}", result.node.prop(keys::URL).unwrap_or("-"));
                println!("  node: {}\n", result.node.id);
            }
        }

        Commands::Related {
            node_id,
            edge_label,
        } => {
            let embedder = embed::from_config(&config.embedding)?;
            let (vectors, graph) = open_stores(&dir).await?;
            let engine = HybridSearchEngine::new(embedder, vectors, graph)
                .with_related_limit(config.search.related_limit);

            let related = engine
                .related_documents(&node_id, edge_label.as_deref())
                .await?;
            println!("{} node(s) related to {node_id}:\n", related.len());
            for node in &related {
                let name = node
                    .prop(keys::TITLE)
                    .or_else(|| node.prop(keys::NAME))
                    .unwrap_or("-");
                println!("[{}] {name} ({})", node.label, node.id);
            }
        }

        Commands::Reconcile { dry_run } => {
            let (vectors, graph) = open_stores(&dir).await?;
            let reconciler = Reconciler::new(vectors.clone(), graph.clone());
            let report = reconciler.sweep(dry_run).await?;

            if report.is_clean() {
                println!("Index is consistent");
                return Ok(());
            }

            let verb = if report.applied { "Removed" } else { "Found" };
            println!("{verb} {} orphan vector(s)", report.orphan_vectors.len());
            println!("{verb} {} orphan node(s)", report.orphan_nodes.len());
            println!("{verb} {} empty module(s)", report.empty_modules.len());

            if report.applied {
                save_stores(&dir, &vectors, &graph).await?;
                println!(
                    "Saved: {} vector(s), {} document node(s)",
                    vectors.len().await?,
                    graph.nodes_with_label(DOCUMENT_LABEL).await?.len()
                );
            }
        }

        Commands::Embed { text, query } => {
            let embedder = embed::from_config(&config.embedding)?;
            println!("Using embedding model {}", embedder.model_name());

            let embedding = if query {
                println!("Embedding as query: {}", text);
                embedder.embed_query(&text).await?
            } else {
                println!("Embedding as document: {}", text);
                embedder.embed(&text).await?
            };

            println!("\nEmbedding stats:");
            println!("  Dimensions: {}", embedding.len());
            println!("  First 5 values: {:?}", &embedding[..embedding.len().min(5)]);
            println!("  Min: {:.4}", embedding.iter().cloned().fold(f32::INFINITY, f32::min));
            println!("  Max: {:.4}", embedding.iter().cloned().fold(f32::NEG_INFINITY, f32::max));
        }
    }

    Ok(())
}
