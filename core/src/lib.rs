//! Self-built inverted-index search engine.
//!
//! An [`IndexDescriptor`] names one variant along five dimensions. A [`SearchEngine`]
//! built for it indexes a document stream, persists the result under the descriptor's
//! short id and answers boolean or ranked queries.

pub mod builder;
pub mod codec;
pub mod config;
pub mod descriptor;
pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod persist;
pub mod query;
pub mod scoring;
pub mod search;
pub mod tokenizer;

pub use builder::{BuildReport, CancellationToken};
pub use config::{DefaultOperator, EngineConfig};
pub use descriptor::{Compression, IndexDescriptor, Optimization, QueryStrategy, Representation, Storage};
pub use document::{DocMeta, Document};
pub use engine::{delete_index, footprint, list_indices, EngineState, EngineStats, SearchEngine, SearchHit};
pub use error::{Error, Result};
pub use tokenizer::{EnglishTokenizer, SimpleTokenizer, Tokenizer};
