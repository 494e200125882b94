//! Timestamp-driven stage orderings
//!
//! A chain with `N` permuted stages runs them in the order given by the
//! `k`-th permutation of `0..N` in lexicographic order, where
//! `k = (timestamp - base_timestamp) mod N!`. The subtraction wraps at 2^32
//! like the 32-bit header field it is computed from.
//!
//! Two selectors produce that ordering:
//!
//! - [`GenerativeSelector`] decodes the `k`-th successor of the identity
//!   under [`next_permutation`] directly from `k`,
//! - [`TableSelector`] looks entry `k` up in a [`PermutationTable`] of packed
//!   nibbles.
//!
//! Both agree on every index.

use std::fmt;
use std::sync::{Arc, LazyLock};

use tracing::debug;

use crate::error::ConfigError;
use crate::params::{MAX_STAGES, MAX_TABLE_STAGES, TIMETRAVEL_BASE_TIMESTAMP};

/// `n!`, for `n <= 20`
pub const fn factorial(n: usize) -> u64 {
    let mut acc = 1u64;
    let mut i = 2;
    while i <= n {
        acc *= i as u64;
        i += 1;
    }
    acc
}

/// Step `seq` to its lexicographic successor in place.
///
/// Returns `true` when `seq` was the last permutation and has wrapped back to
/// ascending order.
pub fn next_permutation(seq: &mut [u8]) -> bool {
    let Some(pivot) = seq.windows(2).rposition(|pair| pair[0] < pair[1]) else {
        seq.reverse();
        return true;
    };

    // seq[pivot + 1..] is non-increasing and holds at least one larger value
    let value = seq[pivot];
    let successor = seq[pivot + 1..]
        .iter()
        .rposition(|&v| v > value)
        .map_or(pivot + 1, |offset| pivot + 1 + offset);

    seq.swap(pivot, successor);
    seq[pivot + 1..].reverse();
    false
}

/// Permutation index for a header timestamp
pub fn permutation_index(timestamp: u32, base_timestamp: u32, stage_count: usize) -> u64 {
    u64::from(timestamp.wrapping_sub(base_timestamp)) % factorial(stage_count)
}

/// An ordering of up to [`MAX_STAGES`] stage indices
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permutation {
    order: [u8; MAX_STAGES],
    len: u8,
}

impl Permutation {
    /// `[0, 1, .., len - 1]`
    ///
    /// # Panics
    ///
    /// If `len` exceeds [`MAX_STAGES`].
    pub fn identity(len: usize) -> Self {
        assert!(len <= MAX_STAGES, "at most {MAX_STAGES} stages can be permuted");
        let mut order = [0u8; MAX_STAGES];
        for (i, slot) in order.iter_mut().enumerate().take(len) {
            *slot = i as u8;
        }
        Self {
            order,
            len: len as u8,
        }
    }

    /// The identity stepped forward `steps` times.
    ///
    /// Decoded from the factorial-base digits of `steps mod len!`, so the cost
    /// depends on `len` only.
    pub fn nth(len: usize, steps: u64) -> Self {
        let mut permutation = Self::identity(len);
        let mut rank = steps % factorial(len);
        for position in 0..len {
            let block = factorial(len - 1 - position);
            let pick = position + (rank / block) as usize;
            rank %= block;
            // remaining values stay ascending after the rotation
            permutation.order[position..=pick].rotate_right(1);
        }
        permutation
    }

    /// Build from explicit indices, rejecting anything that is not a bijection.
    pub fn from_slice(indices: &[u8]) -> Option<Self> {
        if indices.len() > MAX_STAGES || !is_bijection(indices) {
            return None;
        }
        let mut order = [0u8; MAX_STAGES];
        order[..indices.len()].copy_from_slice(indices);
        Some(Self {
            order,
            len: indices.len() as u8,
        })
    }

    pub fn len(&self) -> usize {
        usize::from(self.len)
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.order[..self.len()]
    }

    pub fn get(&self, position: usize) -> Option<u8> {
        self.as_slice().get(position).copied()
    }

    /// Move to the lexicographic successor; `true` on wrap-around.
    pub fn advance(&mut self) -> bool {
        let len = self.len();
        next_permutation(&mut self.order[..len])
    }

    /// Pack as nibbles, position `i` in bits `4i..4i + 4`.
    pub fn pack(&self) -> u64 {
        self.as_slice()
            .iter()
            .enumerate()
            .fold(0u64, |packed, (i, &stage)| packed | (u64::from(stage) << (4 * i)))
    }

    /// Inverse of [`Permutation::pack`]. `None` if the nibbles are not an
    /// ordering of `len` stages or bits above nibble `len` are set.
    pub fn unpack(packed: u64, len: usize) -> Option<Self> {
        if len > MAX_STAGES || (len < MAX_STAGES && packed >> (4 * len) != 0) {
            return None;
        }
        let mut indices = [0u8; MAX_STAGES];
        for (i, slot) in indices.iter_mut().enumerate().take(len) {
            *slot = ((packed >> (4 * i)) & 0xf) as u8;
        }
        Self::from_slice(&indices[..len])
    }
}

impl fmt::Debug for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

fn is_bijection(indices: &[u8]) -> bool {
    let mut seen = 0u32;
    for &index in indices {
        let index = usize::from(index);
        if index >= indices.len() || seen & (1 << index) != 0 {
            return false;
        }
        seen |= 1 << index;
    }
    true
}

/// Maps a header timestamp to a stage ordering
pub trait PermutationSelector: Send + Sync {
    fn stage_count(&self) -> usize;

    fn base_timestamp(&self) -> u32;

    fn select(&self, timestamp: u32) -> Permutation;

    fn index(&self, timestamp: u32) -> u64 {
        permutation_index(timestamp, self.base_timestamp(), self.stage_count())
    }
}

fn check_stage_count(stage_count: usize, max: usize) -> Result<(), ConfigError> {
    if stage_count == 0 || stage_count > max {
        return Err(ConfigError::StageCount {
            count: stage_count,
            max,
        });
    }
    Ok(())
}

/// Derives each ordering from its index, with no stored table
#[derive(Clone, Debug)]
pub struct GenerativeSelector {
    base_timestamp: u32,
    stage_count: usize,
}

impl GenerativeSelector {
    pub fn new(base_timestamp: u32, stage_count: usize) -> Result<Self, ConfigError> {
        check_stage_count(stage_count, MAX_STAGES)?;
        Ok(Self {
            base_timestamp,
            stage_count,
        })
    }
}

impl PermutationSelector for GenerativeSelector {
    fn stage_count(&self) -> usize {
        self.stage_count
    }

    fn base_timestamp(&self) -> u32 {
        self.base_timestamp
    }

    fn select(&self, timestamp: u32) -> Permutation {
        Permutation::nth(self.stage_count, self.index(timestamp))
    }
}

/// Every ordering of `N` stages in lexicographic order, packed as nibbles
#[derive(Clone, PartialEq, Eq)]
pub struct PermutationTable {
    stage_count: usize,
    entries: Vec<u64>,
}

impl PermutationTable {
    /// Enumerate all `N!` orderings.
    pub fn generate(stage_count: usize) -> Result<Self, ConfigError> {
        check_stage_count(stage_count, MAX_STAGES)?;
        if stage_count > MAX_TABLE_STAGES {
            return Err(ConfigError::TableTooLarge {
                stages: stage_count,
                max: MAX_TABLE_STAGES,
            });
        }
        Ok(Self::enumerate(stage_count))
    }

    /// Load a precomputed table, validating its size and every entry.
    pub fn from_packed(stage_count: usize, entries: Vec<u64>) -> Result<Self, ConfigError> {
        check_stage_count(stage_count, MAX_STAGES)?;
        let expected = factorial(stage_count);
        if entries.len() as u64 != expected {
            return Err(ConfigError::TableLength {
                stages: stage_count,
                expected,
                actual: entries.len(),
            });
        }
        if let Some(index) = entries
            .iter()
            .position(|&packed| Permutation::unpack(packed, stage_count).is_none())
        {
            return Err(ConfigError::MalformedTableEntry {
                index,
                stages: stage_count,
            });
        }
        Ok(Self {
            stage_count,
            entries,
        })
    }

    fn enumerate(stage_count: usize) -> Self {
        let count = factorial(stage_count);
        let mut entries = Vec::with_capacity(count as usize);
        let mut permutation = Permutation::identity(stage_count);
        for _ in 0..count {
            entries.push(permutation.pack());
            permutation.advance();
        }
        debug!(stage_count, entries = entries.len(), "generated permutation table");
        Self {
            stage_count,
            entries,
        }
    }

    pub fn stage_count(&self) -> usize {
        self.stage_count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[u64] {
        &self.entries
    }

    pub fn get(&self, index: u64) -> Option<Permutation> {
        let packed = *self.entries.get(usize::try_from(index).ok()?)?;
        Permutation::unpack(packed, self.stage_count)
    }
}

impl fmt::Debug for PermutationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PermutationTable")
            .field("stage_count", &self.stage_count)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// The 8-stage table shared by every TimeTravel chain in the process
static TIMETRAVEL_TABLE: LazyLock<Arc<PermutationTable>> =
    LazyLock::new(|| Arc::new(PermutationTable::enumerate(8)));

/// Shared 8! table, built on first use
pub fn timetravel_table() -> Arc<PermutationTable> {
    Arc::clone(&TIMETRAVEL_TABLE)
}

/// Looks orderings up in a precomputed table
#[derive(Clone, Debug)]
pub struct TableSelector {
    base_timestamp: u32,
    table: Arc<PermutationTable>,
}

impl TableSelector {
    pub fn new(base_timestamp: u32, table: Arc<PermutationTable>) -> Self {
        Self {
            base_timestamp,
            table,
        }
    }

    /// Selector over the shared 8-stage table anchored at the TimeTravel genesis
    pub fn timetravel() -> Self {
        Self::new(TIMETRAVEL_BASE_TIMESTAMP, timetravel_table())
    }

    pub fn table(&self) -> &PermutationTable {
        &self.table
    }
}

impl PermutationSelector for TableSelector {
    fn stage_count(&self) -> usize {
        self.table.stage_count()
    }

    fn base_timestamp(&self) -> u32 {
        self.base_timestamp
    }

    fn select(&self, timestamp: u32) -> Permutation {
        let packed = self.table.entries[self.index(timestamp) as usize];
        // Entries were validated on construction
        Permutation::unpack(packed, self.stage_count())
            .unwrap_or_else(|| Permutation::identity(self.stage_count()))
    }
}

/// How a permuted section obtains its ordering
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Direct lookup in a packed table of all `N!` orderings
    Table,
    /// Repeated lexicographic successor from the identity
    Generative,
}

impl Strategy {
    /// Build the selector for `stage_count` stages.
    ///
    /// Eight-stage tables reuse the process-wide TimeTravel table.
    pub fn selector(
        self,
        base_timestamp: u32,
        stage_count: usize,
    ) -> Result<Arc<dyn PermutationSelector>, ConfigError> {
        let selector: Arc<dyn PermutationSelector> = match self {
            Strategy::Generative => Arc::new(GenerativeSelector::new(base_timestamp, stage_count)?),
            Strategy::Table if stage_count == 8 => {
                Arc::new(TableSelector::new(base_timestamp, timetravel_table()))
            }
            Strategy::Table => Arc::new(TableSelector::new(
                base_timestamp,
                Arc::new(PermutationTable::generate(stage_count)?),
            )),
        };
        Ok(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    #[test]
    fn test_successor_order_for_three() {
        let mut seq = [0u8, 1, 2];
        let expected = [[0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for want in expected {
            assert!(!next_permutation(&mut seq));
            assert_eq!(seq, want);
        }
        assert!(next_permutation(&mut seq), "last permutation must wrap");
        assert_eq!(seq, [0, 1, 2]);
    }

    #[test]
    fn test_successor_with_repeated_suffix_shape() {
        // Pivot 1 at index 1, rightmost larger element is the 2 at index 3
        let mut seq = [0u8, 1, 3, 2];
        next_permutation(&mut seq);
        assert_eq!(seq, [0, 2, 1, 3]);
    }

    #[test]
    fn test_degenerate_lengths_wrap() {
        let mut empty: [u8; 0] = [];
        assert!(next_permutation(&mut empty));
        let mut single = [0u8];
        assert!(next_permutation(&mut single));
        assert_eq!(single, [0]);
    }

    #[test]
    fn test_cycle_closes_after_factorial_steps() {
        for n in 1..=8 {
            let identity = Permutation::identity(n);
            let mut p = identity;
            let steps = factorial(n);
            for step in 1..=steps {
                let wrapped = p.advance();
                assert_eq!(wrapped, step == steps, "n = {n}, step = {step}");
            }
            assert_eq!(p, identity, "n = {n}");
        }
    }

    #[test]
    fn test_ten_stage_cycle_closes() {
        let identity = Permutation::identity(10);
        assert_eq!(Permutation::nth(10, factorial(10)), identity);
        assert_ne!(Permutation::nth(10, factorial(10) - 1), identity);
    }

    #[test]
    fn test_nth_matches_stepping() {
        for n in 0..=7 {
            let mut p = Permutation::identity(n);
            for steps in 0..factorial(n) {
                assert_eq!(Permutation::nth(n, steps), p, "n = {n}, steps = {steps}");
                p.advance();
            }
        }
    }

    #[test]
    fn test_nth_on_widest_sections() {
        let last = Permutation::nth(MAX_STAGES, factorial(MAX_STAGES) - 1);
        let reversed: Vec<u8> = (0..MAX_STAGES as u8).rev().collect();
        assert_eq!(last.as_slice(), reversed.as_slice());

        let selector = GenerativeSelector::new(0, MAX_STAGES).unwrap();
        let index = selector.index(u32::MAX);
        assert_eq!(index, u64::from(u32::MAX));
        let mut previous = Permutation::nth(MAX_STAGES, index - 1);
        assert!(!previous.advance());
        assert_eq!(selector.select(u32::MAX), previous);
    }

    #[test]
    fn test_every_ordering_is_a_distinct_bijection() {
        let n = 6;
        let mut seen = HashSet::new();
        let mut p = Permutation::identity(n);
        for _ in 0..factorial(n) {
            assert!(is_bijection(p.as_slice()));
            assert!(seen.insert(p));
            p.advance();
        }
        assert_eq!(seen.len() as u64, factorial(n));
    }

    #[test]
    fn test_pack_layout() {
        let p = Permutation::from_slice(&[3, 0, 2, 1]).unwrap();
        assert_eq!(p.pack(), 0x1203);
        assert_eq!(Permutation::unpack(0x1203, 4), Some(p));
        // Duplicate nibble
        assert_eq!(Permutation::unpack(0x1103, 4), None);
        // Stray bits above the last stage
        assert_eq!(Permutation::unpack(0x5_1203, 4), None);
    }

    #[test]
    fn test_table_agrees_with_generative_stepping() {
        let table = timetravel_table();
        assert_eq!(table.len() as u64, factorial(8));

        let mut p = Permutation::identity(8);
        for index in 0..factorial(8) {
            assert_eq!(table.get(index), Some(p), "index {index}");
            p.advance();
        }
    }

    #[test]
    fn test_selectors_agree_on_timestamps() {
        let base = TIMETRAVEL_BASE_TIMESTAMP;
        let table = TableSelector::timetravel();
        let generative = GenerativeSelector::new(base, 8).unwrap();

        for timestamp in [
            base,
            base + 1,
            base + 40_319,
            base + 40_320,
            base + 1_000_003,
            1_530_000_000,
            base - 1,
            0,
            u32::MAX,
        ] {
            assert_eq!(
                table.select(timestamp),
                generative.select(timestamp),
                "timestamp {timestamp}"
            );
        }
    }

    #[test]
    fn test_selection_is_periodic_and_deterministic() {
        let selector = GenerativeSelector::new(1000, 5).unwrap();
        let period = factorial(5) as u32;
        for t in 1000..1000 + period {
            let p = selector.select(t);
            assert_eq!(p, selector.select(t));
            assert_eq!(p, selector.select(t + period));
            assert!(is_bijection(p.as_slice()));
        }
        assert_eq!(selector.select(1000), Permutation::identity(5));
        assert_ne!(selector.select(1000), selector.select(1001));
    }

    #[test]
    fn test_timestamp_before_base_wraps_32_bit() {
        // (0 - 1) mod 2^32 = 4294967295, and 4294967295 mod 40320 = 255
        assert_eq!(permutation_index(0, 1, 8), 255);
        assert_eq!(
            permutation_index(TIMETRAVEL_BASE_TIMESTAMP - 1, TIMETRAVEL_BASE_TIMESTAMP, 8),
            255
        );
    }

    #[test]
    fn test_from_packed_validation() {
        let good = PermutationTable::generate(4).unwrap();
        assert_eq!(
            PermutationTable::from_packed(4, good.entries().to_vec()).as_ref(),
            Ok(&good)
        );

        assert_eq!(
            PermutationTable::from_packed(4, good.entries()[..23].to_vec()),
            Err(ConfigError::TableLength {
                stages: 4,
                expected: 24,
                actual: 23
            })
        );

        let mut corrupt = good.entries().to_vec();
        corrupt[7] = 0x0000;
        assert_eq!(
            PermutationTable::from_packed(4, corrupt),
            Err(ConfigError::MalformedTableEntry {
                index: 7,
                stages: 4
            })
        );
    }

    #[test]
    fn test_stage_count_limits() {
        assert!(matches!(
            GenerativeSelector::new(0, 0),
            Err(ConfigError::StageCount { .. })
        ));
        assert!(matches!(
            GenerativeSelector::new(0, MAX_STAGES + 1),
            Err(ConfigError::StageCount { .. })
        ));
        assert_eq!(
            PermutationTable::generate(10),
            Err(ConfigError::TableTooLarge { stages: 10, max: 9 })
        );
    }

    #[test]
    fn test_strategy_builds_matching_selectors() {
        let table = Strategy::Table.selector(7, 5).unwrap();
        let generative = Strategy::Generative.selector(7, 5).unwrap();
        for t in 0..300 {
            assert_eq!(table.select(t), generative.select(t));
        }
        assert_eq!(Strategy::Table.selector(7, 8).unwrap().stage_count(), 8);
    }
}
