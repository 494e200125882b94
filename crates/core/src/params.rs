//! Chain and primitive parameters
//!
//! Block header layout follows the 80-byte Bitcoin-style header used by every
//! chain in this crate: the timestamp is the little-endian `u32` at word 17 and
//! the nonce the little-endian `u32` at word 19.

/// Block header size in bytes
pub const HEADER_SIZE: usize = 80;

/// Final digest size in bytes
pub const DIGEST_SIZE: usize = 32;

/// Size of the chunk handed from one stage to the next (512-bit digest)
pub const CHUNK_SIZE: usize = 64;

/// Header bytes absorbed into a midstate before the permuted chain runs
pub const MIDSTATE_LEN: usize = 64;

/// Header bytes left for stage 0 after the midstate (80 - 64)
pub const TAIL_LEN: usize = HEADER_SIZE - MIDSTATE_LEN;

/// Byte offset of the header timestamp
pub const TIMESTAMP_OFFSET: usize = 68;

/// Byte offset of the compact difficulty target
pub const BITS_OFFSET: usize = 72;

/// Byte offset of the header nonce
pub const NONCE_OFFSET: usize = 76;

/// Upper bound on chain stages a permutation can order (one nibble per stage)
pub const MAX_STAGES: usize = 16;

/// Largest stage count for which a full permutation table is generated
pub const MAX_TABLE_STAGES: usize = 9;

/// Genesis timestamp anchoring the TimeTravel permutation schedule
pub const TIMETRAVEL_BASE_TIMESTAMP: u32 = 1_492_973_331;

/// JH message block size in bytes
pub const JH_BLOCK_SIZE: usize = 64;

/// Number of E8 rounds
pub const JH_ROUNDS: usize = 42;
