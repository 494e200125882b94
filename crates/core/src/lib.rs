//! # chainhash core
//!
//! Proof-of-work hash chains for 80-byte block headers.
//!
//! A chain runs a list of 512-bit hash primitives back to back: stage 0
//! absorbs the header, every later stage absorbs the previous 64-byte chunk,
//! and the digest is the first 32 bytes of the final chunk, or of an earlier
//! stage when the chain names an output window. Chains may
//! reorder part of their stages per header timestamp; the ordering is the
//! `k`-th lexicographic permutation with `k = (timestamp - base) mod N!`.
//!
//! ## Contents
//!
//! - [`Jh512`]: a bit-sliced JH-512 over eight 128-bit lanes
//! - [`PrimitiveRegistry`]: the primitives a chain may name. JH, Grøstl,
//!   Skein, Keccak and SM3 are built in; others are registered by the caller
//! - [`GenerativeSelector`] and [`TableSelector`]: timestamp to ordering
//! - [`Chain`]: validated execution of a [`ChainSpec`]
//! - [`Algorithm`]: TimeTravel, TimeTravel10, Tribus and X13-SM3
//!
//! ## Example
//!
//! ```rust
//! use chainhash_core::{Chain, ChainSpec, PrimitiveId, PrimitiveRegistry, meets_difficulty_le};
//!
//! let registry = PrimitiveRegistry::with_builtin();
//! let spec = ChainSpec::fixed("jh-keccak", [PrimitiveId::Jh, PrimitiveId::Keccak]);
//! let chain = Chain::new(spec, &registry).unwrap();
//!
//! let header = [0u8; 80];
//! let digest = chain.hash(&header);
//! assert_eq!(digest, chain.hash(&header));
//!
//! // Nonce search reuses the per-timestamp work
//! let prepared = chain.prepare(&header);
//! assert_eq!(prepared.hash_nonce(0), digest);
//! let _ = meets_difficulty_le(&prepared.hash_nonce(1), 8);
//! ```

mod chain;
mod difficulty;
mod error;
pub mod header;
mod jh;
mod params;
mod permutation;
mod primitives;
mod variants;

pub use chain::{Chain, ChainSpec, Digest, OutputWindow, PermutedSection, PreparedHeader};
pub use difficulty::{
    Target, meets_difficulty, meets_difficulty_le, meets_target, target_from_compact,
};
pub use error::{ConfigError, UnknownAlgorithm, UnknownPrimitive};
pub use jh::Jh512;
pub use params::*;
pub use permutation::{
    GenerativeSelector, Permutation, PermutationSelector, PermutationTable, Strategy,
    TableSelector, factorial, next_permutation, permutation_index, timetravel_table,
};
pub use primitives::{
    Chunk, DigestPrimitive, GroestlPrimitive, HashContext, JhPrimitive, KeccakPrimitive,
    Primitive, PrimitiveId, PrimitiveRegistry, SkeinPrimitive, Sm3Primitive, ZeroExtended,
};
pub use variants::Algorithm;

#[cfg(test)]
mod test_support;
