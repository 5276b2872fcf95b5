//! Engine tuning knobs and on-disk format constants.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Magic bytes at the start of a single-file artifact.
pub const FORMAT_MAGIC: &[u8; 4] = b"SIDX";
/// Bumped whenever the persisted layout changes.
pub const FORMAT_VERSION: u32 = 1;
/// Upper bound on `k` for ranked queries.
pub const MAX_TOP_K: usize = 10_000;
/// Prefix shared by every short identifier of the self-built engine.
pub const CORE_NAME: &str = "SelfIndex";

/// How bare words without an explicit operator are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultOperator {
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding persisted artifacts.
    pub root: PathBuf,
    pub default_top_k: usize,
    /// Spacing of skip entries in every posting list.
    pub skip_interval: usize,
    /// Documents pulled per batch in a sharded build.
    pub batch_size: usize,
    /// Tokenize batches on the rayon pool.
    pub parallel: bool,
    /// Fraction of tombstoned documents that triggers compaction after an update.
    pub compaction_ratio: f64,
    pub default_operator: DefaultOperator,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./index"),
            default_top_k: 10,
            skip_interval: 8,
            batch_size: 1024,
            parallel: false,
            compaction_ratio: 0.25,
            default_operator: DefaultOperator::Or,
        }
    }
}

impl EngineConfig {
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf(), ..Self::default() }
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::File(e.to_string()))?;
        let cfg: EngineConfig = serde_json::from_str(&raw).map_err(|e| ConfigError::File(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.skip_interval == 0 {
            return Err(ConfigError::File("skip_interval must be positive".into()));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::File("batch_size must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.compaction_ratio) {
            return Err(ConfigError::File("compaction_ratio must be within [0, 1]".into()));
        }
        Ok(())
    }
}
