//! Bit-sliced JH-512
//!
//! The 1024-bit state is held as eight 128-bit lanes. Lanes 0, 2, 4, 6 form the
//! even group and lanes 1, 3, 5, 7 the odd group. Every E8 round runs:
//!
//! 1. the S-box layer: one bit-sliced pair of 4-bit S-boxes per group, the
//!    selection bit taken from that group's half of the round constant,
//! 2. the MDS layer: an XOR-only 8-lane linear map,
//! 3. the swap layer on the odd group, with a granularity fixed by the round
//!    shape (`round % 7`): 1, 2, 4, 8, 16, 32 then 64 bits.
//!
//! Lanes load and store as little-endian words, so the layout matches the
//! SSE2 reference code byte for byte on any host.

mod constants;

use constants::{INITIAL_STATE_BYTES, ROUND_CONSTANT_BYTES};

use crate::params::{CHUNK_SIZE, JH_BLOCK_SIZE, JH_ROUNDS};

/// Lanes in the hash state
pub const LANES: usize = 8;

/// Distinct swap patterns cycled through by E8
pub const ROUND_SHAPES: usize = 7;

type Lanes = [u128; LANES];

const fn load_lane(bytes: &[u8], offset: usize) -> u128 {
    let mut word = [0u8; 16];
    let mut i = 0;
    while i < 16 {
        word[i] = bytes[offset + i];
        i += 1;
    }
    u128::from_le_bytes(word)
}

/// H(0) for the 512-bit output size
static INITIAL_STATE: Lanes = {
    let mut lanes = [0u128; LANES];
    let mut i = 0;
    while i < LANES {
        lanes[i] = load_lane(&INITIAL_STATE_BYTES, i * 16);
        i += 1;
    }
    lanes
};

/// E8 round constants as `[even half, odd half]`
static ROUND_CONSTANTS: [[u128; 2]; JH_ROUNDS] = {
    let mut constants = [[0u128; 2]; JH_ROUNDS];
    let mut r = 0;
    while r < JH_ROUNDS {
        constants[r] = [
            load_lane(&ROUND_CONSTANT_BYTES[r], 0),
            load_lane(&ROUND_CONSTANT_BYTES[r], 16),
        ];
        r += 1;
    }
    constants
};

const fn splat(byte: u8) -> u128 {
    u128::from_ne_bytes([byte; 16])
}

const MASK_BYTES: u128 = 0x00ff_00ff_00ff_00ff_00ff_00ff_00ff_00ff;
const MASK_HALFWORDS: u128 = 0x0000_ffff_0000_ffff_0000_ffff_0000_ffff;
const MASK_WORDS: u128 = 0x0000_0000_ffff_ffff_0000_0000_ffff_ffff;

/// Swap adjacent groups of `2^shape` bits throughout the lane.
#[inline(always)]
fn swap(x: u128, shape: usize) -> u128 {
    match shape {
        0 => ((x & splat(0xaa)) >> 1) | ((x & splat(0x55)) << 1),
        1 => ((x & splat(0xcc)) >> 2) | ((x & splat(0x33)) << 2),
        2 => ((x & splat(0xf0)) >> 4) | ((x & splat(0x0f)) << 4),
        3 => ((x & MASK_BYTES) << 8) | ((x >> 8) & MASK_BYTES),
        4 => ((x & MASK_HALFWORDS) << 16) | ((x >> 16) & MASK_HALFWORDS),
        5 => ((x & MASK_WORDS) << 32) | ((x >> 32) & MASK_WORDS),
        _ => x.rotate_left(64),
    }
}

/// Bit-sliced S-box pair over one lane group.
///
/// Each bit of `c` selects S0 or S1 for the 4-bit column at that position.
#[inline(always)]
fn sbox([mut m0, mut m1, mut m2, mut m3]: [u128; 4], c: u128) -> [u128; 4] {
    m3 = !m3;
    m0 ^= !m2 & c;
    let t = c ^ (m0 & m1);
    m0 ^= m3 & m2;
    m3 ^= !m1 & m2;
    m1 ^= m0 & m2;
    m2 ^= !m3 & m0;
    m0 ^= m1 | m3;
    m3 ^= m1 & m2;
    m2 ^= t;
    m1 ^= t & m0;
    [m0, m1, m2, m3]
}

#[inline(always)]
fn round(x: &mut Lanes, r: usize, shape: usize) {
    let [c_even, c_odd] = ROUND_CONSTANTS[r];
    let [e0, e1, e2, e3] = sbox([x[0], x[2], x[4], x[6]], c_even);
    let [o0, o1, o2, o3] = sbox([x[1], x[3], x[5], x[7]], c_odd);

    // MDS: the odd group absorbs the even group, then the reverse
    let o0 = o0 ^ e1;
    let o1 = o1 ^ e2;
    let o2 = o2 ^ e3 ^ e0;
    let o3 = o3 ^ e0;
    let e0 = e0 ^ o1;
    let e1 = e1 ^ o2;
    let e2 = e2 ^ o3 ^ o0;
    let e3 = e3 ^ o0;

    *x = [
        e0,
        swap(o0, shape),
        e1,
        swap(o1, shape),
        e2,
        swap(o2, shape),
        e3,
        swap(o3, shape),
    ];
}

/// The E8 permutation: six passes over the seven round shapes.
fn e8(x: &mut Lanes) {
    for base in (0..JH_ROUNDS).step_by(ROUND_SHAPES) {
        for shape in 0..ROUND_SHAPES {
            round(x, base + shape, shape);
        }
    }
}

fn load_block(block: &[u8]) -> [u128; 4] {
    let mut lanes = [0u128; 4];
    for (lane, bytes) in lanes.iter_mut().zip(block.chunks_exact(16)) {
        let mut word = [0u8; 16];
        word.copy_from_slice(bytes);
        *lane = u128::from_le_bytes(word);
    }
    lanes
}

/// F8: XOR the block into the first half, run E8, XOR it into the second half.
fn compress(x: &mut Lanes, block: &[u8]) {
    debug_assert_eq!(block.len(), JH_BLOCK_SIZE);
    let m = load_block(block);
    for (lane, word) in x[..4].iter_mut().zip(&m) {
        *lane ^= word;
    }
    e8(x);
    for (lane, word) in x[4..].iter_mut().zip(&m) {
        *lane ^= word;
    }
}

/// JH-512 hasher
///
/// Cloning a hasher that has absorbed a prefix yields a midstate that can be
/// resumed with different suffixes.
#[derive(Clone)]
pub struct Jh512 {
    state: Lanes,
    buffer: [u8; JH_BLOCK_SIZE],
    buffered: usize,
    /// Total bytes absorbed
    length: u64,
}

impl Jh512 {
    /// Create a hasher seeded with H(0)
    pub fn new() -> Self {
        Self {
            state: INITIAL_STATE,
            buffer: [0u8; JH_BLOCK_SIZE],
            buffered: 0,
            length: 0,
        }
    }

    /// Absorb `data`
    pub fn update(&mut self, mut data: &[u8]) {
        self.length = self.length.wrapping_add(data.len() as u64);

        if self.buffered > 0 {
            let take = (JH_BLOCK_SIZE - self.buffered).min(data.len());
            self.buffer[self.buffered..self.buffered + take].copy_from_slice(&data[..take]);
            self.buffered += take;
            data = &data[take..];
            if self.buffered < JH_BLOCK_SIZE {
                return;
            }
            let block = self.buffer;
            compress(&mut self.state, &block);
            self.buffered = 0;
        }

        let mut blocks = data.chunks_exact(JH_BLOCK_SIZE);
        for block in &mut blocks {
            compress(&mut self.state, block);
        }

        let rest = blocks.remainder();
        self.buffer[..rest.len()].copy_from_slice(rest);
        self.buffered = rest.len();
    }

    /// Pad, absorb the final block(s) and return the last four lanes.
    ///
    /// A message ending on a block boundary gets a single padding block
    /// (`0x80`, zeros, length). Otherwise the partial block carries the `0x80`
    /// marker and a second, otherwise zero block carries the length. The
    /// length field is 128-bit big-endian; its upper 64 bits are always zero
    /// here.
    pub fn finalize(mut self) -> [u8; CHUNK_SIZE] {
        let bit_length = self.length.wrapping_mul(8);
        let mut block = [0u8; JH_BLOCK_SIZE];

        if self.buffered == 0 {
            block[0] = 0x80;
        } else {
            block[..self.buffered].copy_from_slice(&self.buffer[..self.buffered]);
            block[self.buffered] = 0x80;
            compress(&mut self.state, &block);
            block = [0u8; JH_BLOCK_SIZE];
        }
        block[JH_BLOCK_SIZE - 8..].copy_from_slice(&bit_length.to_be_bytes());
        compress(&mut self.state, &block);

        let mut out = [0u8; CHUNK_SIZE];
        for (bytes, lane) in out.chunks_exact_mut(16).zip(&self.state[4..]) {
            bytes.copy_from_slice(&lane.to_le_bytes());
        }
        out
    }

    /// One-shot digest
    pub fn digest(data: &[u8]) -> [u8; CHUNK_SIZE] {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

impl Default for Jh512 {
    fn default() -> Self {
        Self::new()
    }
}
