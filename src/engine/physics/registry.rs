// Stable external identifiers for bodies owned by the physics world

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque, process-unique identifier handed out to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyId(Uuid);

impl BodyId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for BodyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Index of a body inside the physics world's storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(usize);

impl BodyHandle {
    pub(super) fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Maps external body identifiers to internal handles.
///
/// Bodies are never removed, so identifiers are never reused and the
/// iteration order is insertion order.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    handles: HashMap<BodyId, BodyHandle>,
    order: Vec<BodyId>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a random identifier not yet present in the registry
    pub fn fresh_id(&self) -> BodyId {
        loop {
            let id = BodyId::generate();
            if !self.handles.contains_key(&id) {
                return id;
            }
        }
    }

    /// Record the mapping for a newly inserted body
    pub fn register(&mut self, id: BodyId, handle: BodyHandle) {
        let previous = self.handles.insert(id, handle);
        debug_assert!(previous.is_none(), "body id {id} registered twice");
        self.order.push(id);
    }

    /// Look up the handle for an identifier
    pub fn resolve(&self, id: &BodyId) -> Option<BodyHandle> {
        self.handles.get(id).copied()
    }

    /// Identifiers in registration order
    pub fn ids(&self) -> impl Iterator<Item = &BodyId> + '_ {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}
