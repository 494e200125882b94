//! Multi-threaded nonce scanning
//!
//! Worker `t` of `n` tries nonces `start + t`, `start + t + n`, and so on, so
//! the workers cover one contiguous range between them. Each worker prepares
//! the header once, which fixes the stage order and any midstate for the
//! header's timestamp. The first worker to find an accepted digest raises a
//! shared stop flag.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::algorithm::header::Header;
use crate::algorithm::{Chain, Digest, Target, meets_difficulty_le, meets_target};

/// Hashes a worker computes between updates of the shared counter
const COUNTER_BATCH: u64 = 256;

/// Distinct values of the 32-bit header nonce
const NONCE_SPACE: u64 = 1 << 32;

/// Nonces a scan may try before it would revisit one
fn nonce_budget(max_nonces: u64) -> u64 {
    max_nonces.min(NONCE_SPACE)
}

/// When a digest counts as a solution
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Acceptance {
    /// At least this many zero bits at the top of the little-endian digest,
    /// starting from byte 31
    LeadingZeros(u32),
    /// Little-endian value not above the target
    Target(Target),
}

impl Acceptance {
    pub fn accepts(&self, digest: &Digest) -> bool {
        match self {
            Acceptance::LeadingZeros(bits) => meets_difficulty_le(digest, *bits),
            Acceptance::Target(target) => meets_target(digest, target),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Solution {
    pub nonce: u32,
    pub digest: Digest,
}

#[derive(Clone, Debug)]
pub struct ScanOutcome {
    pub solution: Option<Solution>,
    /// Digests computed across all workers
    pub hashes: u64,
    pub elapsed: Duration,
}

impl ScanOutcome {
    pub fn hashrate(&self) -> f64 {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            self.hashes as f64 / seconds
        } else {
            0.0
        }
    }
}

/// Splits a nonce range across worker threads
#[derive(Clone, Debug)]
pub struct Scanner {
    threads: usize,
    acceptance: Acceptance,
    report_interval: Duration,
}

impl Scanner {
    pub fn new(threads: usize, acceptance: Acceptance) -> Self {
        Self {
            threads: threads.max(1),
            acceptance,
            report_interval: Duration::from_secs(5),
        }
    }

    /// How often progress is logged while scanning
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Try up to `max_nonces` nonces starting at `start_nonce`.
    ///
    /// Nonces wrap at `u32::MAX`, and at most 2^32 are tried so none repeats.
    /// Returns once a solution is found or the range is exhausted.
    pub fn scan(&self, chain: &Chain, header: &Header, start_nonce: u32, max_nonces: u64) -> ScanOutcome {
        let max_nonces = nonce_budget(max_nonces);
        let stop = AtomicBool::new(false);
        let hashes = AtomicU64::new(0);
        let solution = OnceLock::new();
        let start = Instant::now();

        debug!(
            chain = chain.name(),
            threads = self.threads,
            start_nonce,
            max_nonces,
            "scan started"
        );

        thread::scope(|scope| {
            let workers: Vec<_> = (0..self.threads)
                .map(|worker| {
                    let (stop, hashes, solution) = (&stop, &hashes, &solution);
                    scope.spawn(move || {
                        self.work(chain, header, worker, start_nonce, max_nonces, stop, hashes, solution)
                    })
                })
                .collect();

            let mut last_report = Instant::now();
            while !workers.iter().all(|worker| worker.is_finished()) {
                thread::sleep(Duration::from_millis(20));
                if last_report.elapsed() >= self.report_interval {
                    let done = hashes.load(Ordering::Relaxed);
                    let rate = done as f64 / start.elapsed().as_secs_f64();
                    info!(hashes = done, hashrate = %format_args!("{rate:.2} H/s"), "scanning");
                    last_report = Instant::now();
                }
            }
        });

        let outcome = ScanOutcome {
            solution: solution.into_inner(),
            hashes: hashes.into_inner(),
            elapsed: start.elapsed(),
        };
        match &outcome.solution {
            Some(found) => info!(
                nonce = found.nonce,
                digest = %hex::encode(found.digest),
                hashes = outcome.hashes,
                "solution found"
            ),
            None => debug!(hashes = outcome.hashes, "nonce range exhausted"),
        }
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn work(
        &self,
        chain: &Chain,
        header: &Header,
        worker: usize,
        start_nonce: u32,
        max_nonces: u64,
        stop: &AtomicBool,
        hashes: &AtomicU64,
        solution: &OnceLock<Solution>,
    ) {
        let prepared = chain.prepare(header);
        let stride = self.threads as u64;
        let mut offset = worker as u64;
        let mut pending = 0u64;

        while offset < max_nonces && !stop.load(Ordering::Relaxed) {
            let nonce = start_nonce.wrapping_add(offset as u32);
            let digest = prepared.hash_nonce(nonce);
            pending += 1;

            if self.acceptance.accepts(&digest) {
                if !stop.swap(true, Ordering::AcqRel) {
                    let _ = solution.set(Solution { nonce, digest });
                }
                break;
            }

            if pending == COUNTER_BATCH {
                hashes.fetch_add(pending, Ordering::Relaxed);
                pending = 0;
            }
            offset += stride;
        }

        hashes.fetch_add(pending, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::algorithm::{ChainSpec, PrimitiveId, PrimitiveRegistry, header};

    fn builtin_chain() -> Chain {
        let spec = ChainSpec::fixed("jh-keccak", [PrimitiveId::Jh, PrimitiveId::Keccak]);
        Chain::new(spec, &PrimitiveRegistry::with_builtin()).unwrap()
    }

    #[test]
    fn test_single_thread_finds_first_solution() {
        let chain = builtin_chain();
        let header = [3u8; 80];
        let acceptance = Acceptance::LeadingZeros(6);

        let expected = (0u32..)
            .find(|&nonce| acceptance.accepts(&chain.hash(&header::with_nonce(&header, nonce))))
            .unwrap();

        let outcome = Scanner::new(1, acceptance).scan(&chain, &header, 0, 1 << 16);
        let solution = outcome.solution.unwrap();
        assert_eq!(solution.nonce, expected);
        assert_eq!(outcome.hashes, u64::from(expected) + 1);
    }

    #[test]
    fn test_parallel_solution_is_valid() {
        let chain = builtin_chain();
        let header = [9u8; 80];
        let acceptance = Acceptance::LeadingZeros(8);

        let outcome = Scanner::new(4, acceptance).scan(&chain, &header, 1000, 1 << 20);
        let solution = outcome.solution.unwrap();
        assert_eq!(solution.digest, chain.hash(&header::with_nonce(&header, solution.nonce)));
        assert!(acceptance.accepts(&solution.digest));
        assert!(solution.nonce >= 1000);
    }

    #[test]
    fn test_exhausted_range_counts_every_nonce() {
        let chain = builtin_chain();
        let header = [0u8; 80];
        let impossible = Acceptance::Target([0u8; 32]);

        let outcome = Scanner::new(3, impossible).scan(&chain, &header, u32::MAX - 10, 100);
        assert_eq!(outcome.solution, None);
        assert_eq!(outcome.hashes, 100);
    }

    #[test]
    fn test_budget_never_exceeds_nonce_space() {
        assert_eq!(nonce_budget(100), 100);
        assert_eq!(nonce_budget(1 << 32), 1 << 32);
        assert_eq!(nonce_budget((1 << 32) + 1), 1 << 32);
        assert_eq!(nonce_budget(u64::MAX), 1 << 32);

        // every offset below the budget maps to a distinct nonce
        let start = 17u32;
        let last = start.wrapping_add((nonce_budget(u64::MAX) - 1) as u32);
        assert_eq!(last, start - 1);
    }

    #[test]
    fn test_oversized_range_still_scans() {
        let chain = builtin_chain();
        let outcome = Scanner::new(2, Acceptance::LeadingZeros(0)).scan(&chain, &[1u8; 80], 5, u64::MAX);
        let solution = outcome.solution.unwrap();
        assert!(solution.nonce == 5 || solution.nonce == 6);
        assert!(outcome.hashes <= 2);
    }

    #[test]
    fn test_acceptance_modes() {
        let mut digest = [0xffu8; 32];
        digest[0] = 0;
        assert!(!Acceptance::LeadingZeros(1).accepts(&digest));

        digest[31] = 0;
        assert!(Acceptance::LeadingZeros(8).accepts(&digest));
        assert!(!Acceptance::LeadingZeros(9).accepts(&digest));

        let mut target = [0u8; 32];
        target[31] = 0x01;
        digest[31] = 0x01;
        assert!(!Acceptance::Target(target).accepts(&digest));
        digest[31] = 0;
        assert!(Acceptance::Target(target).accepts(&digest));
    }
}
