use anyhow::{anyhow, Result};
use axum::Router;
use clap::Parser;
use selfindex::error::PersistenceError;
use selfindex::tokenizer::by_name;
use selfindex::{EngineConfig, Error, IndexDescriptor, SearchEngine};
use selfindex_server::build_app;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Directory holding persisted indexes
    #[arg(long, default_value = "./index")]
    root: PathBuf,
    /// Short identifier of the index variant to serve
    #[arg(long, default_value_t = IndexDescriptor::default().short_id())]
    variant: String,
    /// Tokenizer the index was built with (english|simple)
    #[arg(long, default_value = "english")]
    tokenizer: String,
    /// JSON file with engine settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let descriptor: IndexDescriptor = args.variant.parse()?;
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    config.root = args.root.clone();
    let tokenizer = by_name(&args.tokenizer).ok_or_else(|| anyhow!("unknown tokenizer {}", args.tokenizer))?;
    let engine = SearchEngine::new(descriptor, config, tokenizer);
    match engine.load() {
        Ok(()) => {}
        Err(Error::Persistence(PersistenceError::IndexNotFound(short_id))) => {
            tracing::warn!(%short_id, "no persisted index yet, serving empty engine");
        }
        Err(e) => return Err(e.into()),
    }
    let app: Router = build_app(Arc::new(engine));

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, short_id = %descriptor.short_id(), "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
