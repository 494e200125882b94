use sha3::{Digest, Sha3_512};

use crate::primitives::{Chunk, HashContext, Primitive, PrimitiveId, PrimitiveRegistry};

const STAND_IN_TAG: &[u8] = b"chainhash stand-in";

/// Domain-separated SHA3-512 standing in for a primitive with no adapter.
pub(crate) struct StandIn {
    id: PrimitiveId,
}

impl StandIn {
    pub(crate) fn new(id: PrimitiveId) -> Self {
        Self { id }
    }
}

#[derive(Clone)]
struct StandInContext(Sha3_512);

impl HashContext for StandInContext {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self: Box<Self>) -> Chunk {
        let mut chunk = [0u8; 64];
        chunk.copy_from_slice(&self.0.finalize());
        chunk
    }

    fn box_clone(&self) -> Box<dyn HashContext> {
        Box::new(self.clone())
    }
}

impl Primitive for StandIn {
    fn init(&self) -> Box<dyn HashContext> {
        let mut hasher = Sha3_512::new();
        Digest::update(&mut hasher, STAND_IN_TAG);
        Digest::update(&mut hasher, [self.id as u8]);
        Box::new(StandInContext(hasher))
    }
}

/// Real JH-512 plus a stand-in for every other primitive.
pub(crate) fn stand_in_registry() -> PrimitiveRegistry {
    let mut registry = PrimitiveRegistry::new();
    for id in PrimitiveId::ALL {
        match id {
            PrimitiveId::Jh => registry.register(id, crate::primitives::JhPrimitive),
            _ => registry.register(id, StandIn::new(id)),
        };
    }
    registry
}

/// Built-in adapters where they exist, stand-ins for the rest.
pub(crate) fn full_registry() -> PrimitiveRegistry {
    let mut registry = PrimitiveRegistry::with_builtin();
    for id in PrimitiveId::ALL {
        if !registry.contains(id) {
            registry.register(id, StandIn::new(id));
        }
    }
    registry
}

/// A header with a recognisable body, `timestamp` and `nonce`.
pub(crate) fn sample_header(timestamp: u32, nonce: u32) -> [u8; 80] {
    let mut header = [0u8; 80];
    for (i, byte) in header.iter_mut().enumerate() {
        *byte = i as u8;
    }
    crate::header::set_timestamp(&mut header, timestamp);
    crate::header::set_nonce(&mut header, nonce);
    header
}
