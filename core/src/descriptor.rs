//! The five-dimensional configuration that names one engine variant.
//!
//! A descriptor is a plain value: it is built once, validated, and passed explicitly to
//! every component that needs to know which variant it is serving.

use crate::config::CORE_NAME;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Representation {
    Boolean,
    WordCount,
    TfIdf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Storage {
    /// Single self-describing file.
    CustomInMemory,
    /// Embedded sled database.
    ExternalBackendA,
    /// Directory with one file per term.
    ExternalBackendB,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compression {
    None,
    /// Delta + variable-byte integers.
    CodecA,
    /// Deflate via flate2.
    NativeCodec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryStrategy {
    TermAtATime,
    DocumentAtATime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Optimization {
    None,
    SkipPointers,
    Thresholding,
    EarlyStopping,
}

impl Representation {
    pub const ALL: [Representation; 3] = [Representation::Boolean, Representation::WordCount, Representation::TfIdf];

    pub fn is_ranked(self) -> bool {
        !matches!(self, Representation::Boolean)
    }

    fn code(self) -> &'static str {
        match self {
            Representation::Boolean => "1",
            Representation::WordCount => "2",
            Representation::TfIdf => "3",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Representation::Boolean => "BOOLEAN",
            Representation::WordCount => "WORDCOUNT",
            Representation::TfIdf => "TFIDF",
        }
    }
}

impl Storage {
    pub const ALL: [Storage; 3] = [Storage::CustomInMemory, Storage::ExternalBackendA, Storage::ExternalBackendB];

    fn code(self) -> &'static str {
        match self {
            Storage::CustomInMemory => "1",
            Storage::ExternalBackendA => "2",
            Storage::ExternalBackendB => "3",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Storage::CustomInMemory => "CUSTOM",
            Storage::ExternalBackendA => "DB1",
            Storage::ExternalBackendB => "DB2",
        }
    }
}

impl Compression {
    pub const ALL: [Compression; 3] = [Compression::None, Compression::CodecA, Compression::NativeCodec];

    fn code(self) -> &'static str {
        match self {
            Compression::None => "1",
            Compression::CodecA => "2",
            Compression::NativeCodec => "3",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Compression::None => "NONE",
            Compression::CodecA => "CODE",
            Compression::NativeCodec => "CLIB",
        }
    }
}

impl QueryStrategy {
    pub const ALL: [QueryStrategy; 2] = [QueryStrategy::TermAtATime, QueryStrategy::DocumentAtATime];

    fn code(self) -> &'static str {
        match self {
            QueryStrategy::TermAtATime => "T",
            QueryStrategy::DocumentAtATime => "D",
        }
    }

    fn name(self) -> &'static str {
        match self {
            QueryStrategy::TermAtATime => "TERMatat",
            QueryStrategy::DocumentAtATime => "DOCatat",
        }
    }
}

impl Optimization {
    pub const ALL: [Optimization; 4] =
        [Optimization::None, Optimization::SkipPointers, Optimization::Thresholding, Optimization::EarlyStopping];

    fn code(self) -> &'static str {
        match self {
            Optimization::None => "0",
            Optimization::SkipPointers => "sp",
            Optimization::Thresholding => "th",
            Optimization::EarlyStopping => "es",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Optimization::None => "Null",
            Optimization::SkipPointers => "Skipping",
            Optimization::Thresholding => "Thresholding",
            Optimization::EarlyStopping => "EarlyStopping",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexDescriptor {
    pub representation: Representation,
    pub storage: Storage,
    pub compression: Compression,
    pub strategy: QueryStrategy,
    pub optimization: Optimization,
}

impl IndexDescriptor {
    /// Validates the tuple; some optimizations only make sense under a given strategy
    /// or for ranked representations.
    pub fn new(
        representation: Representation,
        storage: Storage,
        compression: Compression,
        strategy: QueryStrategy,
        optimization: Optimization,
    ) -> Result<Self, ConfigError> {
        let descriptor = Self { representation, storage, compression, strategy, optimization };
        if let Some(reason) = descriptor.invalid_reason() {
            return Err(ConfigError::InvalidCombination { short_id: descriptor.short_id(), reason });
        }
        Ok(descriptor)
    }

    fn invalid_reason(&self) -> Option<&'static str> {
        match (self.optimization, self.strategy, self.representation) {
            (Optimization::SkipPointers | Optimization::EarlyStopping, QueryStrategy::TermAtATime, _) => {
                Some("skip pointers and early stopping need document-at-a-time evaluation")
            }
            (Optimization::Thresholding | Optimization::EarlyStopping, _, Representation::Boolean) => {
                Some("score pruning needs a ranked representation")
            }
            _ => None,
        }
    }

    /// Every valid descriptor, in a stable order.
    pub fn all() -> Vec<IndexDescriptor> {
        let mut out = Vec::new();
        for r in Representation::ALL {
            for s in Storage::ALL {
                for c in Compression::ALL {
                    for q in QueryStrategy::ALL {
                        for o in Optimization::ALL {
                            if let Ok(d) = IndexDescriptor::new(r, s, c, q, o) {
                                out.push(d);
                            }
                        }
                    }
                }
            }
        }
        out
    }

    /// Canonical artifact name, e.g. `SelfIndex_i3d1c2qDoes`.
    pub fn short_id(&self) -> String {
        format!(
            "{}_i{}d{}c{}q{}o{}",
            CORE_NAME,
            self.representation.code(),
            self.storage.code(),
            self.compression.code(),
            self.strategy.code(),
            self.optimization.code()
        )
    }

    pub fn long_id(&self) -> String {
        format!(
            "core={}|index={}|datastore={}|compressor={}|qproc={}|optim={}",
            CORE_NAME,
            self.representation.name(),
            self.storage.name(),
            self.compression.name(),
            self.strategy.name(),
            self.optimization.name()
        )
    }
}

impl Default for IndexDescriptor {
    fn default() -> Self {
        Self {
            representation: Representation::Boolean,
            storage: Storage::CustomInMemory,
            compression: Compression::None,
            strategy: QueryStrategy::TermAtATime,
            optimization: Optimization::None,
        }
    }
}

impl fmt::Display for IndexDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.short_id(), self.long_id())
    }
}

fn pick<T: Copy>(all: &[T], code: &str, code_of: impl Fn(T) -> &'static str) -> Option<T> {
    all.iter().copied().find(|v| code_of(*v) == code)
}

impl FromStr for IndexDescriptor {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigError::UnknownIdentifier(s.to_string());
        let rest = s.strip_prefix(CORE_NAME).and_then(|r| r.strip_prefix("_i")).ok_or_else(unknown)?;
        let (i, rest) = rest.split_once('d').ok_or_else(unknown)?;
        let (d, rest) = rest.split_once('c').ok_or_else(unknown)?;
        let (c, rest) = rest.split_once('q').ok_or_else(unknown)?;
        let (q, o) = rest.split_once('o').ok_or_else(unknown)?;
        IndexDescriptor::new(
            pick(&Representation::ALL, i, Representation::code).ok_or_else(unknown)?,
            pick(&Storage::ALL, d, Storage::code).ok_or_else(unknown)?,
            pick(&Compression::ALL, c, Compression::code).ok_or_else(unknown)?,
            pick(&QueryStrategy::ALL, q, QueryStrategy::code).ok_or_else(unknown)?,
            pick(&Optimization::ALL, o, Optimization::code).ok_or_else(unknown)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn every_tuple() -> Vec<IndexDescriptor> {
        let mut out = Vec::new();
        for representation in Representation::ALL {
            for storage in Storage::ALL {
                for compression in Compression::ALL {
                    for strategy in QueryStrategy::ALL {
                        for optimization in Optimization::ALL {
                            out.push(IndexDescriptor { representation, storage, compression, strategy, optimization });
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn identifiers_are_injective() {
        let tuples = every_tuple();
        assert_eq!(tuples.len(), 216);
        let short: HashSet<String> = tuples.iter().map(|d| d.short_id()).collect();
        let long: HashSet<String> = tuples.iter().map(|d| d.long_id()).collect();
        assert_eq!(short.len(), tuples.len());
        assert_eq!(long.len(), tuples.len());
    }

    #[test]
    fn default_is_boolean_custom_taat() {
        let d = IndexDescriptor::default();
        assert_eq!(d.short_id(), "SelfIndex_i1d1c1qTo0");
        assert_eq!(
            d.long_id(),
            "core=SelfIndex|index=BOOLEAN|datastore=CUSTOM|compressor=NONE|qproc=TERMatat|optim=Null"
        );
    }

    #[test]
    fn short_id_parses_back() {
        for d in IndexDescriptor::all() {
            assert_eq!(d.short_id().parse::<IndexDescriptor>().unwrap(), d);
        }
    }

    #[test]
    fn rejects_inconsistent_tuples() {
        let err = IndexDescriptor::new(
            Representation::Boolean,
            Storage::CustomInMemory,
            Compression::None,
            QueryStrategy::DocumentAtATime,
            Optimization::Thresholding,
        );
        assert!(matches!(err, Err(ConfigError::InvalidCombination { .. })));

        let err = IndexDescriptor::new(
            Representation::TfIdf,
            Storage::CustomInMemory,
            Compression::None,
            QueryStrategy::TermAtATime,
            Optimization::SkipPointers,
        );
        assert!(err.is_err());
        assert!("SelfIndex_i9d1c1qTo0".parse::<IndexDescriptor>().is_err());
        assert!("Other_i1d1c1qTo0".parse::<IndexDescriptor>().is_err());
    }
}
