//! Configuration errors
//!
//! Every fault a chain can have is detected when it is built. Hashing itself
//! has no error path.

use thiserror::Error;

use crate::primitives::PrimitiveId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("primitive '{0}' is not registered")]
    MissingPrimitive(PrimitiveId),

    #[error("chain '{0}' has no stages")]
    EmptyChain(String),

    #[error("stage count {count} is out of range (1..={max})")]
    StageCount { count: usize, max: usize },

    #[error("permutation tables are limited to {max} stages, got {stages}")]
    TableTooLarge { stages: usize, max: usize },

    #[error("permutation table for {stages} stages needs {expected} entries, got {actual}")]
    TableLength {
        stages: usize,
        expected: u64,
        actual: usize,
    },

    #[error("permutation table entry {index} is not an ordering of {stages} stages")]
    MalformedTableEntry { index: usize, stages: usize },

    #[error("permutation orders {actual} stages but the chain permutes {expected}")]
    PermutationLength { expected: usize, actual: usize },

    #[error("midstate entry needs the permuted section to open the chain")]
    MidstateAfterPrefix,

    #[error("output window points at stage {stage} but the chain has {stages} stages")]
    OutputWindow { stage: usize, stages: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown primitive '{0}'")]
pub struct UnknownPrimitive(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown algorithm '{0}'")]
pub struct UnknownAlgorithm(pub String);
