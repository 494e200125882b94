//! chainhash miner library
//!
//! Host-side tooling around [`chainhash_core`]:
//!
//! - [`config`]: chains described in JSON files
//! - [`scan`]: multi-threaded nonce search over an 80-byte header
//!
//! # Example
//!
//! ```rust
//! use chainhash::algorithm::{Chain, PrimitiveRegistry};
//! use chainhash::config::ChainConfig;
//! use chainhash::scan::{Acceptance, Scanner};
//!
//! let config = ChainConfig::from_json(r#"{"name": "pair", "prefix": ["jh", "keccak"]}"#).unwrap();
//! let chain = Chain::new(config.to_spec().unwrap(), &PrimitiveRegistry::with_builtin()).unwrap();
//!
//! let outcome = Scanner::new(2, Acceptance::LeadingZeros(4)).scan(&chain, &[0u8; 80], 0, 1 << 12);
//! if let Some(solution) = outcome.solution {
//!     println!("nonce {} -> {}", solution.nonce, hex::encode(solution.digest));
//! }
//! ```

// Re-export the core algorithm
pub use chainhash_core as algorithm;

pub mod config;
pub mod scan;

// Convenience re-exports
pub use algorithm::{
    Algorithm, Chain, PrimitiveRegistry, meets_difficulty, meets_difficulty_le, meets_target,
};
