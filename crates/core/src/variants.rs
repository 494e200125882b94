//! Named chains deployed by existing coins

use std::fmt;
use std::str::FromStr;

use crate::chain::{Chain, ChainSpec, OutputWindow, PermutedSection};
use crate::error::{ConfigError, UnknownAlgorithm};
use crate::params::TIMETRAVEL_BASE_TIMESTAMP;
use crate::permutation::Strategy;
use crate::primitives::{PrimitiveId, PrimitiveRegistry};

use PrimitiveId::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// Blake, BMW, then eight table-ordered stages
    Timetravel,
    /// Ten generatively ordered stages with a midstate over the first 64 bytes
    Timetravel10,
    /// JH, Keccak, ECHO
    Tribus,
    /// Thirteen fixed stages with SM3 in seventh place. The digest is read
    /// from the Blake stage.
    X13Sm3,
}

impl Algorithm {
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Timetravel,
        Algorithm::Timetravel10,
        Algorithm::Tribus,
        Algorithm::X13Sm3,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Algorithm::Timetravel => "timetravel",
            Algorithm::Timetravel10 => "timetravel10",
            Algorithm::Tribus => "tribus",
            Algorithm::X13Sm3 => "x13sm3",
        }
    }

    pub fn spec(self) -> ChainSpec {
        match self {
            Algorithm::Timetravel => ChainSpec::permuted(
                self.name(),
                PermutedSection {
                    pool: vec![Groestl, Skein, Jh, Keccak, Luffa, Cubehash, Shavite, Simd],
                    base_timestamp: TIMETRAVEL_BASE_TIMESTAMP,
                    strategy: Strategy::Table,
                    midstate: false,
                },
            )
            .with_prefix([Blake, Bmw]),
            Algorithm::Timetravel10 => ChainSpec::permuted(
                self.name(),
                PermutedSection {
                    pool: vec![
                        Blake, Bmw, Groestl, Skein, Jh, Keccak, Luffa, Cubehash, Shavite, Simd,
                    ],
                    base_timestamp: TIMETRAVEL_BASE_TIMESTAMP,
                    strategy: Strategy::Generative,
                    midstate: true,
                },
            ),
            Algorithm::Tribus => ChainSpec::fixed(self.name(), [Jh, Keccak, Echo]),
            Algorithm::X13Sm3 => ChainSpec::fixed(
                self.name(),
                [
                    Blake, Bmw, Groestl, Skein, Jh, Keccak, Sm3, Cubehash, Shavite, Simd, Echo,
                    Hamsi, Fugue,
                ],
            )
            .with_output(OutputWindow::Stage(0)),
        }
    }

    /// Build the chain from `registry`.
    pub fn chain(self, registry: &PrimitiveRegistry) -> Result<Chain, ConfigError> {
        Chain::new(self.spec(), registry)
    }

    /// Primitives the chain needs that `registry` lacks
    pub fn missing(self, registry: &PrimitiveRegistry) -> Vec<PrimitiveId> {
        let mut missing: Vec<_> = self
            .spec()
            .primitives()
            .filter(|&id| !registry.contains(id))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.name() == wanted)
            .ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_counts() {
        assert_eq!(Algorithm::Timetravel.spec().stage_count(), 10);
        assert_eq!(Algorithm::Timetravel10.spec().stage_count(), 10);
        assert_eq!(Algorithm::Tribus.spec().stage_count(), 3);
        assert_eq!(Algorithm::X13Sm3.spec().stage_count(), 13);
    }

    #[test]
    fn test_output_windows() {
        assert_eq!(Algorithm::X13Sm3.spec().output, OutputWindow::Stage(0));
        for algorithm in [Algorithm::Timetravel, Algorithm::Timetravel10, Algorithm::Tribus] {
            assert_eq!(algorithm.spec().output, OutputWindow::Final);
        }
    }

    #[test]
    fn test_names_parse() {
        for algorithm in Algorithm::ALL {
            assert_eq!(algorithm.name().parse::<Algorithm>(), Ok(algorithm));
        }
        assert!("x11".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_missing_primitives_reported() {
        let registry = PrimitiveRegistry::with_builtin();
        assert_eq!(Algorithm::Tribus.missing(&registry), [Echo]);
        assert!(matches!(
            Algorithm::Tribus.chain(&registry),
            Err(ConfigError::MissingPrimitive(Echo))
        ));
    }
}
