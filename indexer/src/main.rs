mod source;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use selfindex::tokenizer::by_name;
use selfindex::{
    delete_index, footprint, list_indices, Compression, EngineConfig, IndexDescriptor, Optimization, QueryStrategy,
    Representation, SearchEngine, Storage,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build, query and manage self-built inverted indexes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IndexArgs {
    /// Directory holding persisted indexes
    #[arg(long, default_value = "./index")]
    root: PathBuf,
    /// Short identifier of the index variant, e.g. SelfIndex_i3d1c2qDoes
    #[arg(long)]
    variant: Option<String>,
    #[arg(long, value_enum, default_value_t = Tokenizer::English)]
    tokenizer: Tokenizer,
    /// JSON file with engine settings
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Per-dimension alternative to `--variant`.
#[derive(Args)]
struct Dimensions {
    #[arg(long, value_enum, default_value_t = RepresentationArg::Boolean)]
    representation: RepresentationArg,
    #[arg(long, value_enum, default_value_t = StorageArg::Custom)]
    storage: StorageArg,
    #[arg(long, value_enum, default_value_t = CompressionArg::None)]
    compression: CompressionArg,
    #[arg(long, value_enum, default_value_t = StrategyArg::Taat)]
    strategy: StrategyArg,
    #[arg(long, value_enum, default_value_t = OptimizationArg::None)]
    optimization: OptimizationArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from JSON/JSONL files or a directory and persist it
    Build {
        #[command(flatten)]
        index: IndexArgs,
        #[command(flatten)]
        dims: Dimensions,
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Index at most this many documents
        #[arg(long)]
        limit: Option<usize>,
        /// Tokenize batches on all cores
        #[arg(long, default_value_t = false)]
        parallel: bool,
    },
    /// Run a query against a persisted index
    Query {
        #[command(flatten)]
        index: IndexArgs,
        #[arg(long, short)]
        q: String,
        #[arg(long, short)]
        k: Option<usize>,
    },
    /// Add documents and remove ids, then persist
    Update {
        #[command(flatten)]
        index: IndexArgs,
        #[arg(long)]
        input: Option<PathBuf>,
        /// Document id to remove; repeatable
        #[arg(long)]
        remove: Vec<String>,
    },
    /// Remove documents by id, then persist
    Delete {
        #[command(flatten)]
        index: IndexArgs,
        #[arg(required = true)]
        doc_ids: Vec<String>,
    },
    /// List persisted indexes with their size on disk
    List {
        #[arg(long, default_value = "./index")]
        root: PathBuf,
    },
    /// List the document ids held by an index
    Files {
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Print index statistics as JSON
    Stats {
        #[command(flatten)]
        index: IndexArgs,
    },
    /// Delete a persisted index
    Drop {
        #[arg(long, default_value = "./index")]
        root: PathBuf,
        #[arg(long)]
        variant: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Tokenizer {
    English,
    Simple,
}

#[derive(Clone, Copy, ValueEnum)]
enum RepresentationArg {
    Boolean,
    Wordcount,
    Tfidf,
}

#[derive(Clone, Copy, ValueEnum)]
enum StorageArg {
    Custom,
    Sled,
    Terms,
}

#[derive(Clone, Copy, ValueEnum)]
enum CompressionArg {
    None,
    Varbyte,
    Deflate,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Taat,
    Daat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OptimizationArg {
    None,
    Skip,
    Threshold,
    Early,
}

impl Dimensions {
    fn descriptor(&self) -> Result<IndexDescriptor> {
        let representation = match self.representation {
            RepresentationArg::Boolean => Representation::Boolean,
            RepresentationArg::Wordcount => Representation::WordCount,
            RepresentationArg::Tfidf => Representation::TfIdf,
        };
        let storage = match self.storage {
            StorageArg::Custom => Storage::CustomInMemory,
            StorageArg::Sled => Storage::ExternalBackendA,
            StorageArg::Terms => Storage::ExternalBackendB,
        };
        let compression = match self.compression {
            CompressionArg::None => Compression::None,
            CompressionArg::Varbyte => Compression::CodecA,
            CompressionArg::Deflate => Compression::NativeCodec,
        };
        let strategy = match self.strategy {
            StrategyArg::Taat => QueryStrategy::TermAtATime,
            StrategyArg::Daat => QueryStrategy::DocumentAtATime,
        };
        let optimization = match self.optimization {
            OptimizationArg::None => Optimization::None,
            OptimizationArg::Skip => Optimization::SkipPointers,
            OptimizationArg::Threshold => Optimization::Thresholding,
            OptimizationArg::Early => Optimization::EarlyStopping,
        };
        Ok(IndexDescriptor::new(representation, storage, compression, strategy, optimization)?)
    }
}

impl IndexArgs {
    fn descriptor(&self, dims: Option<&Dimensions>) -> Result<IndexDescriptor> {
        match (&self.variant, dims) {
            (Some(v), _) => v.parse::<IndexDescriptor>().with_context(|| format!("bad --variant {v}")),
            (None, Some(dims)) => dims.descriptor(),
            (None, None) => Err(anyhow!("--variant is required")),
        }
    }

    fn config(&self) -> Result<EngineConfig> {
        let mut cfg = match &self.config {
            Some(path) => EngineConfig::from_json_file(path)?,
            None => EngineConfig::default(),
        };
        cfg.root = self.root.clone();
        Ok(cfg)
    }

    fn engine(&self, descriptor: IndexDescriptor, cfg: EngineConfig) -> Result<SearchEngine> {
        let name = match self.tokenizer {
            Tokenizer::English => "english",
            Tokenizer::Simple => "simple",
        };
        let tokenizer = by_name(name).ok_or_else(|| anyhow!("unknown tokenizer {name}"))?;
        Ok(SearchEngine::new(descriptor, cfg, tokenizer))
    }

    /// Engine with the persisted index for `--variant` loaded.
    fn open(&self) -> Result<SearchEngine> {
        let engine = self.engine(self.descriptor(None)?, self.config()?)?;
        engine.load()?;
        Ok(engine)
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { index, dims, input, limit, parallel } => {
            let descriptor = index.descriptor(Some(&dims))?;
            let mut cfg = index.config()?;
            cfg.parallel |= parallel;
            let engine = index.engine(descriptor, cfg)?;
            let docs = source::documents(source::input_files(&input));
            let report = match limit {
                Some(n) => engine.build(docs.take(n))?,
                None => engine.build(docs)?,
            };
            engine.save()?;
            tracing::info!(short_id = %descriptor.short_id(), "index build complete");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Query { index, q, k } => {
            let engine = index.open()?;
            let hits = match k {
                Some(k) => engine.query_top_k(&q, k)?,
                None => engine.query(&q)?,
            };
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Commands::Update { index, input, remove } => {
            let engine = index.open()?;
            let files = input.as_deref().map(source::input_files).unwrap_or_default();
            let report = engine.update(&remove, source::documents(files))?;
            engine.save()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Delete { index, doc_ids } => {
            let engine = index.open()?;
            let report = engine.delete(&doc_ids)?;
            engine.save()?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::List { root } => {
            for d in list_indices(&root)? {
                println!("{}\t{}\t{}", d.short_id(), footprint(&root, &d)?, d.long_id());
            }
        }
        Commands::Files { index } => {
            for id in index.open()?.list_indexed_files()? {
                println!("{id}");
            }
        }
        Commands::Stats { index } => {
            let engine = index.open()?;
            let mut stats = serde_json::to_value(engine.stats())?;
            stats["footprint_bytes"] = footprint(&index.root, engine.descriptor())?.into();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Drop { root, variant } => {
            let descriptor: IndexDescriptor = variant.parse()?;
            if delete_index(&root, &descriptor)? {
                tracing::info!(short_id = %descriptor.short_id(), "index deleted");
            } else {
                println!("no index named {}", descriptor.short_id());
            }
        }
    }
    Ok(())
}
