//! Hash primitives and the registry chains resolve them from
//!
//! Every stage of a chain is a 512-bit hash behind the same three calls:
//! `init`, `update`, `finalize`. The JH-512 stage is implemented in this crate;
//! Grøstl-512, Skein-512, Keccak-512 and SM3 come from RustCrypto. The
//! remaining primitives are registered by the embedding application.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use digest::consts::{U32, U64};
use digest::{Digest, OutputSizeUser};

use crate::error::{ConfigError, UnknownPrimitive};
use crate::jh::Jh512;
use crate::params::CHUNK_SIZE;

/// A 512-bit stage output
pub type Chunk = [u8; CHUNK_SIZE];

/// Primitives a chain can name
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrimitiveId {
    Blake,
    Bmw,
    Groestl,
    Skein,
    Jh,
    Keccak,
    Luffa,
    Cubehash,
    Shavite,
    Simd,
    Echo,
    Hamsi,
    Fugue,
    Sm3,
}

impl PrimitiveId {
    pub const ALL: [PrimitiveId; 14] = [
        PrimitiveId::Blake,
        PrimitiveId::Bmw,
        PrimitiveId::Groestl,
        PrimitiveId::Skein,
        PrimitiveId::Jh,
        PrimitiveId::Keccak,
        PrimitiveId::Luffa,
        PrimitiveId::Cubehash,
        PrimitiveId::Shavite,
        PrimitiveId::Simd,
        PrimitiveId::Echo,
        PrimitiveId::Hamsi,
        PrimitiveId::Fugue,
        PrimitiveId::Sm3,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveId::Blake => "blake",
            PrimitiveId::Bmw => "bmw",
            PrimitiveId::Groestl => "groestl",
            PrimitiveId::Skein => "skein",
            PrimitiveId::Jh => "jh",
            PrimitiveId::Keccak => "keccak",
            PrimitiveId::Luffa => "luffa",
            PrimitiveId::Cubehash => "cubehash",
            PrimitiveId::Shavite => "shavite",
            PrimitiveId::Simd => "simd",
            PrimitiveId::Echo => "echo",
            PrimitiveId::Hamsi => "hamsi",
            PrimitiveId::Fugue => "fugue",
            PrimitiveId::Sm3 => "sm3",
        }
    }
}

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PrimitiveId {
    type Err = UnknownPrimitive;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PrimitiveId::ALL
            .into_iter()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| UnknownPrimitive(s.to_string()))
    }
}

/// In-flight state of one primitive invocation
pub trait HashContext: Send {
    fn update(&mut self, data: &[u8]);

    /// Consume the context and emit the 512-bit digest
    fn finalize(self: Box<Self>) -> Chunk;

    /// Snapshot the context, e.g. to reuse a midstate
    fn box_clone(&self) -> Box<dyn HashContext>;
}

impl Clone for Box<dyn HashContext> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// A 512-bit hash usable as a chain stage
pub trait Primitive: Send + Sync {
    fn init(&self) -> Box<dyn HashContext>;

    fn digest(&self, data: &[u8]) -> Chunk {
        let mut context = self.init();
        context.update(data);
        context.finalize()
    }
}

impl HashContext for Jh512 {
    fn update(&mut self, data: &[u8]) {
        Jh512::update(self, data);
    }

    fn finalize(self: Box<Self>) -> Chunk {
        Jh512::finalize(*self)
    }

    fn box_clone(&self) -> Box<dyn HashContext> {
        Box::new(self.clone())
    }
}

/// The bit-sliced JH-512 stage
#[derive(Clone, Copy, Debug, Default)]
pub struct JhPrimitive;

impl Primitive for JhPrimitive {
    fn init(&self) -> Box<dyn HashContext> {
        Box::new(Jh512::new())
    }

    fn digest(&self, data: &[u8]) -> Chunk {
        Jh512::digest(data)
    }
}

/// Any RustCrypto digest with a 512-bit output
pub struct DigestPrimitive<D>(PhantomData<fn() -> D>);

impl<D> DigestPrimitive<D> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<D> Default for DigestPrimitive<D> {
    fn default() -> Self {
        Self::new()
    }
}

struct DigestContext<D>(D);

impl<D> HashContext for DigestContext<D>
where
    D: Digest + OutputSizeUser<OutputSize = U64> + Clone + Send + 'static,
{
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Chunk {
        let mut chunk = [0u8; CHUNK_SIZE];
        chunk.copy_from_slice(&Digest::finalize(self.0));
        chunk
    }

    fn box_clone(&self) -> Box<dyn HashContext> {
        Box::new(DigestContext(self.0.clone()))
    }
}

impl<D> Primitive for DigestPrimitive<D>
where
    D: Digest + OutputSizeUser<OutputSize = U64> + Clone + Send + 'static,
{
    fn init(&self) -> Box<dyn HashContext> {
        Box::new(DigestContext(D::new()))
    }
}

/// A 256-bit digest placed in the low half of a zeroed chunk.
///
/// X13-SM3 defines its SM3 stage this way: the 32-byte SM3 output is followed
/// by 32 zero bytes before the next stage absorbs the full chunk.
pub struct ZeroExtended<D>(PhantomData<fn() -> D>);

impl<D> ZeroExtended<D> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<D> Default for ZeroExtended<D> {
    fn default() -> Self {
        Self::new()
    }
}

struct ZeroExtendedContext<D>(D);

impl<D> HashContext for ZeroExtendedContext<D>
where
    D: Digest + OutputSizeUser<OutputSize = U32> + Clone + Send + 'static,
{
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Chunk {
        let mut chunk = [0u8; CHUNK_SIZE];
        chunk[..CHUNK_SIZE / 2].copy_from_slice(&Digest::finalize(self.0));
        chunk
    }

    fn box_clone(&self) -> Box<dyn HashContext> {
        Box::new(ZeroExtendedContext(self.0.clone()))
    }
}

impl<D> Primitive for ZeroExtended<D>
where
    D: Digest + OutputSizeUser<OutputSize = U32> + Clone + Send + 'static,
{
    fn init(&self) -> Box<dyn HashContext> {
        Box::new(ZeroExtendedContext(D::new()))
    }
}

pub type GroestlPrimitive = DigestPrimitive<groestl::Groestl512>;
pub type SkeinPrimitive = DigestPrimitive<skein::Skein512<U64>>;
pub type KeccakPrimitive = DigestPrimitive<sha3::Keccak512>;
pub type Sm3Primitive = ZeroExtended<sm3::Sm3>;

/// Primitives available to chains, keyed by id
#[derive(Clone, Default)]
pub struct PrimitiveRegistry {
    entries: BTreeMap<PrimitiveId, Arc<dyn Primitive>>,
}

impl PrimitiveRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// JH, Grøstl, Skein, Keccak and SM3
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(PrimitiveId::Jh, JhPrimitive)
            .register(PrimitiveId::Groestl, GroestlPrimitive::new())
            .register(PrimitiveId::Skein, SkeinPrimitive::new())
            .register(PrimitiveId::Keccak, KeccakPrimitive::new())
            .register(PrimitiveId::Sm3, Sm3Primitive::new());
        registry
    }

    /// Add or replace the primitive for `id`
    pub fn register<P: Primitive + 'static>(&mut self, id: PrimitiveId, primitive: P) -> &mut Self {
        self.register_shared(id, Arc::new(primitive))
    }

    pub fn register_shared(&mut self, id: PrimitiveId, primitive: Arc<dyn Primitive>) -> &mut Self {
        self.entries.insert(id, primitive);
        self
    }

    pub fn get(&self, id: PrimitiveId) -> Option<&Arc<dyn Primitive>> {
        self.entries.get(&id)
    }

    pub fn contains(&self, id: PrimitiveId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Like [`PrimitiveRegistry::get`], failing with a configuration error
    pub fn require(&self, id: PrimitiveId) -> Result<Arc<dyn Primitive>, ConfigError> {
        self.get(id)
            .cloned()
            .ok_or(ConfigError::MissingPrimitive(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = PrimitiveId> + '_ {
        self.entries.keys().copied()
    }
}

impl fmt::Debug for PrimitiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in PrimitiveId::ALL {
            assert_eq!(id.name().parse::<PrimitiveId>(), Ok(id));
        }
        assert_eq!(" Keccak ".parse::<PrimitiveId>(), Ok(PrimitiveId::Keccak));
        assert_eq!(
            "sha256".parse::<PrimitiveId>(),
            Err(UnknownPrimitive("sha256".to_string()))
        );
    }

    #[test]
    fn test_builtin_registry_contents() {
        let registry = PrimitiveRegistry::with_builtin();
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(
            ids,
            [
                PrimitiveId::Groestl,
                PrimitiveId::Skein,
                PrimitiveId::Jh,
                PrimitiveId::Keccak,
                PrimitiveId::Sm3
            ]
        );
        assert!(matches!(
            registry.require(PrimitiveId::Blake),
            Err(ConfigError::MissingPrimitive(PrimitiveId::Blake))
        ));
    }

    #[test]
    fn test_jh_stage_matches_core() {
        let data = [0x42u8; 64];
        assert_eq!(JhPrimitive.digest(&data), Jh512::digest(&data));

        let mut context = JhPrimitive.init();
        context.update(&data[..10]);
        context.update(&data[10..]);
        assert_eq!(context.finalize(), Jh512::digest(&data));
    }

    #[test]
    fn test_digest_adapters_match_rustcrypto() {
        let data = b"chain stage input";

        let keccak = sha3::Keccak512::digest(data);
        assert_eq!(KeccakPrimitive::new().digest(data)[..], keccak[..]);

        let groestl = groestl::Groestl512::digest(data);
        assert_eq!(GroestlPrimitive::new().digest(data)[..], groestl[..]);

        let skein = skein::Skein512::<U64>::digest(data);
        assert_eq!(SkeinPrimitive::new().digest(data)[..], skein[..]);
    }

    #[test]
    fn test_sm3_upper_half_is_zero() {
        let data = [7u8; 64];
        let chunk = Sm3Primitive::new().digest(&data);
        assert_eq!(chunk[..32], sm3::Sm3::digest(data)[..]);
        assert_eq!(chunk[32..], [0u8; 32]);
    }

    #[test]
    fn test_context_clone_is_independent() {
        for primitive in [
            Arc::new(JhPrimitive) as Arc<dyn Primitive>,
            Arc::new(KeccakPrimitive::new()),
        ] {
            let mut midstate = primitive.init();
            midstate.update(&[1u8; 64]);

            let mut a = midstate.clone();
            let mut b = midstate.clone();
            a.update(b"tail-a");
            b.update(b"tail-b");
            assert_ne!(a.finalize(), b.finalize());

            let mut whole = primitive.init();
            whole.update(&[1u8; 64]);
            whole.update(b"tail-a");
            let mut again = midstate;
            again.update(b"tail-a");
            assert_eq!(again.finalize(), whole.finalize());
        }
    }
}
