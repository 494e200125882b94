//! Chain execution
//!
//! A chain is an ordered list of 512-bit stages. Stage 0 absorbs the block
//! header and every later stage absorbs the 64-byte chunk emitted by the stage
//! before it. The digest is the first 32 bytes of the chunk at the output
//! window, which is the last stage unless the chain says otherwise.
//!
//! The order comes from two parts:
//!
//! - a fixed `prefix` that always runs first, in the listed order,
//! - an optional permuted section whose stages are reordered per header
//!   timestamp by a [`PermutationSelector`].
//!
//! When the permuted section opens the chain and has `midstate` enabled, the
//! primitive at permutation position 0 resumes a context that already absorbed
//! the first 64 header bytes and absorbs only the 16-byte tail. The nonce lives
//! in that tail, so a [`PreparedHeader`] computes the midstate once per
//! timestamp and reuses it for every nonce.

use std::fmt;
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::header::{self, Header};
use crate::params::{DIGEST_SIZE, MAX_STAGES, MIDSTATE_LEN};
use crate::permutation::{Permutation, PermutationSelector, Strategy};
use crate::primitives::{HashContext, Primitive, PrimitiveId, PrimitiveRegistry};

/// A chain digest
pub type Digest = [u8; DIGEST_SIZE];

/// Stages reordered by header timestamp
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermutedSection {
    /// Stage `i` of the section runs `pool[permutation[i]]`
    pub pool: Vec<PrimitiveId>,
    pub base_timestamp: u32,
    pub strategy: Strategy,
    /// Resume stage 0 from a midstate over `header[..64]`
    pub midstate: bool,
}

/// Which stage's chunk the digest is cut from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputWindow {
    #[default]
    Final,
    Stage(usize),
}

/// Declarative description of a chain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainSpec {
    pub name: String,
    pub prefix: Vec<PrimitiveId>,
    pub permuted: Option<PermutedSection>,
    pub output: OutputWindow,
}

impl ChainSpec {
    /// A chain that always runs `stages` in order
    pub fn fixed(name: impl Into<String>, stages: impl Into<Vec<PrimitiveId>>) -> Self {
        Self {
            name: name.into(),
            prefix: stages.into(),
            permuted: None,
            output: OutputWindow::Final,
        }
    }

    /// A chain made of a single permuted section
    pub fn permuted(name: impl Into<String>, section: PermutedSection) -> Self {
        Self {
            name: name.into(),
            prefix: Vec::new(),
            permuted: Some(section),
            output: OutputWindow::Final,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<Vec<PrimitiveId>>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_output(mut self, output: OutputWindow) -> Self {
        self.output = output;
        self
    }

    /// Total stages per digest
    pub fn stage_count(&self) -> usize {
        self.prefix.len() + self.permuted.as_ref().map_or(0, |section| section.pool.len())
    }

    /// Every primitive the chain can invoke, in declaration order
    pub fn primitives(&self) -> impl Iterator<Item = PrimitiveId> + '_ {
        self.prefix
            .iter()
            .chain(self.permuted.iter().flat_map(|section| section.pool.iter()))
            .copied()
    }
}

/// A validated chain with every primitive resolved
pub struct Chain {
    spec: ChainSpec,
    prefix: Vec<Arc<dyn Primitive>>,
    pool: Vec<Arc<dyn Primitive>>,
    selector: Option<Arc<dyn PermutationSelector>>,
    midstate: bool,
    /// Index of the stage whose chunk becomes the digest
    window: usize,
}

impl Chain {
    /// Resolve and validate `spec` against `registry`.
    pub fn new(spec: ChainSpec, registry: &PrimitiveRegistry) -> Result<Self, ConfigError> {
        let stages = spec.stage_count();
        if stages == 0 {
            return Err(ConfigError::EmptyChain(spec.name.clone()));
        }

        let window = match spec.output {
            OutputWindow::Final => stages - 1,
            OutputWindow::Stage(stage) if stage < stages => stage,
            OutputWindow::Stage(stage) => {
                return Err(ConfigError::OutputWindow { stage, stages });
            }
        };

        let prefix = spec
            .prefix
            .iter()
            .map(|&id| registry.require(id))
            .collect::<Result<Vec<_>, _>>()?;

        let (pool, selector, midstate) = match &spec.permuted {
            Some(section) => {
                if section.pool.is_empty() || section.pool.len() > MAX_STAGES {
                    return Err(ConfigError::StageCount {
                        count: section.pool.len(),
                        max: MAX_STAGES,
                    });
                }
                if section.midstate && !spec.prefix.is_empty() {
                    return Err(ConfigError::MidstateAfterPrefix);
                }
                let pool = section
                    .pool
                    .iter()
                    .map(|&id| registry.require(id))
                    .collect::<Result<Vec<_>, _>>()?;
                let selector = section
                    .strategy
                    .selector(section.base_timestamp, section.pool.len())?;
                (pool, Some(selector), section.midstate)
            }
            None => (Vec::new(), None, false),
        };

        debug!(
            chain = %spec.name,
            stages,
            permuted = pool.len(),
            midstate,
            window,
            "built chain"
        );

        Ok(Self {
            spec,
            prefix,
            pool,
            selector,
            midstate,
            window,
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ChainSpec {
        &self.spec
    }

    pub fn stage_count(&self) -> usize {
        self.prefix.len() + self.pool.len()
    }

    /// Stages in the permuted section (0 for fixed chains)
    pub fn permuted_stages(&self) -> usize {
        self.pool.len()
    }

    pub fn selector(&self) -> Option<&dyn PermutationSelector> {
        self.selector.as_deref()
    }

    /// Ordering of the permuted section for `timestamp`, if the chain has one
    pub fn permutation(&self, timestamp: u32) -> Option<Permutation> {
        self.selector.as_ref().map(|selector| selector.select(timestamp))
    }

    /// The stage order, by primitive id, used for `timestamp`
    pub fn order(&self, timestamp: u32) -> Vec<PrimitiveId> {
        let mut order = self.spec.prefix.clone();
        if let (Some(section), Some(permutation)) =
            (&self.spec.permuted, self.permutation(timestamp))
        {
            order.extend(
                permutation
                    .as_slice()
                    .iter()
                    .map(|&index| section.pool[usize::from(index)]),
            );
        }
        order
    }

    /// Digest of an 80-byte header, ordered by its own timestamp.
    pub fn hash(&self, header: &Header) -> Digest {
        let permutation = self.permutation(header::timestamp(header));
        self.execute(header, permutation.as_ref(), None)
    }

    /// Digest of `header` with the permuted section in an explicit order.
    ///
    /// The header timestamp is not consulted. Fixed chains accept only the
    /// empty permutation.
    pub fn run(&self, header: &Header, permutation: &Permutation) -> Result<Digest, ConfigError> {
        if permutation.len() != self.pool.len() {
            return Err(ConfigError::PermutationLength {
                expected: self.pool.len(),
                actual: permutation.len(),
            });
        }
        let permutation = (!self.pool.is_empty()).then_some(permutation);
        Ok(self.execute(header, permutation, None))
    }

    /// Cache the ordering and midstate for every nonce of `header`.
    pub fn prepare(&self, header: &Header) -> PreparedHeader<'_> {
        let timestamp = header::timestamp(header);
        let permutation = self.permutation(timestamp);
        if let Some(permutation) = &permutation {
            debug!(chain = %self.spec.name, timestamp, ?permutation, "selected stage order");
        }

        let midstate = match &permutation {
            Some(permutation) if self.midstate => {
                let mut context = self.first_stage(Some(permutation)).init();
                context.update(&header[..MIDSTATE_LEN]);
                Some(context)
            }
            _ => None,
        };

        PreparedHeader {
            chain: self,
            header: *header,
            permutation,
            midstate,
        }
    }

    /// Hash many independent headers.
    #[cfg(feature = "parallel")]
    pub fn hash_batch(&self, headers: &[Header]) -> Vec<Digest> {
        headers.par_iter().map(|header| self.hash(header)).collect()
    }

    /// Hash many independent headers (sequential fallback).
    #[cfg(not(feature = "parallel"))]
    pub fn hash_batch(&self, headers: &[Header]) -> Vec<Digest> {
        headers.iter().map(|header| self.hash(header)).collect()
    }

    fn stage(&self, position: usize, permutation: Option<&Permutation>) -> &dyn Primitive {
        match self.prefix.get(position) {
            Some(primitive) => primitive.as_ref(),
            None => {
                let offset = position - self.prefix.len();
                let index = permutation
                    .and_then(|permutation| permutation.get(offset))
                    .map_or(offset, usize::from);
                self.pool[index].as_ref()
            }
        }
    }

    fn first_stage(&self, permutation: Option<&Permutation>) -> &dyn Primitive {
        self.stage(0, permutation)
    }

    /// Run every stage up to the output window.
    ///
    /// `midstate` is a context for stage 0 that already absorbed
    /// `header[..64]`; without one, stage 0 starts fresh. Both paths feed the
    /// same 80 bytes to stage 0.
    fn execute(
        &self,
        header: &Header,
        permutation: Option<&Permutation>,
        midstate: Option<Box<dyn HashContext>>,
    ) -> Digest {
        let mut context = midstate.unwrap_or_else(|| {
            let mut context = self.first_stage(permutation).init();
            context.update(&header[..MIDSTATE_LEN]);
            context
        });
        context.update(&header[MIDSTATE_LEN..]);
        let mut chunk = context.finalize();
        trace!(stage = 0, "stage complete");

        for position in 1..=self.window {
            chunk = self.stage(position, permutation).digest(&chunk);
            trace!(stage = position, "stage complete");
        }

        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&chunk[..DIGEST_SIZE]);
        digest
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("spec", &self.spec)
            .field("window", &self.window)
            .finish()
    }
}

/// A header bound to a chain with its per-timestamp work done
///
/// Hashing a different nonce reuses the stage order and, for midstate chains,
/// the stage-0 context over the first 64 header bytes.
pub struct PreparedHeader<'a> {
    chain: &'a Chain,
    header: Header,
    permutation: Option<Permutation>,
    midstate: Option<Box<dyn HashContext>>,
}

impl PreparedHeader<'_> {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn permutation(&self) -> Option<&Permutation> {
        self.permutation.as_ref()
    }

    /// Digest of the prepared header with `nonce` in bytes 76..80
    pub fn hash_nonce(&self, nonce: u32) -> Digest {
        let header = header::with_nonce(&self.header, nonce);
        self.chain
            .execute(&header, self.permutation.as_ref(), self.midstate.clone())
    }
}

impl fmt::Debug for PreparedHeader<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedHeader")
            .field("chain", &self.chain.name())
            .field("permutation", &self.permutation)
            .field("midstate", &self.midstate.is_some())
            .finish()
    }
}
