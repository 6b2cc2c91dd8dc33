//! Zound Library
//!
//! Owns the authored zound graph: lookup by ID and by normalized name,
//! reachability queries over the "contains" relation, and the global solo
//! set. Shared with authoring tools behind a `parking_lot::RwLock`.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use zf_core::{ZfError, ZfResult, ZoundId, normalize_name};

use crate::zound::Zound;

/// Library handle shared between the engine and authoring tools
pub type SharedLibrary = Arc<RwLock<ZoundLibrary>>;

#[derive(Debug, Default)]
pub struct ZoundLibrary {
    /// Zounds by ID
    zounds: HashMap<ZoundId, Zound>,
    /// Normalized name → ID
    names: HashMap<String, ZoundId>,
    /// Globally soloed zounds
    soloed: BTreeSet<ZoundId>,
}

impl ZoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into a shareable handle
    pub fn into_shared(self) -> SharedLibrary {
        Arc::new(RwLock::new(self))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Insert or replace a zound
    ///
    /// Rejects invalid ranges/chance and names that collide (after
    /// normalization) with a different zound.
    pub fn insert(&mut self, zound: Zound) -> ZfResult<()> {
        zound.validate()?;

        let key = normalize_name(&zound.name);
        if key.is_empty() {
            return Err(ZfError::InvalidParam(format!(
                "{}: name has no alphanumeric characters",
                zound.id
            )));
        }
        if let Some(existing) = self.names.get(&key) {
            if *existing != zound.id {
                return Err(ZfError::InvalidParam(format!(
                    "name '{}' already used by {}",
                    zound.name, existing
                )));
            }
        }

        if let Some(previous) = self.zounds.get(&zound.id) {
            self.names.remove(&normalize_name(&previous.name));
        }
        self.names.insert(key, zound.id);
        self.zounds.insert(zound.id, zound);
        Ok(())
    }

    pub fn remove(&mut self, id: ZoundId) -> Option<Zound> {
        let zound = self.zounds.remove(&id)?;
        self.names.remove(&normalize_name(&zound.name));
        self.soloed.remove(&id);
        Some(zound)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn get(&self, id: ZoundId) -> Option<&Zound> {
        self.zounds.get(&id)
    }

    pub fn get_mut(&mut self, id: ZoundId) -> Option<&mut Zound> {
        self.zounds.get_mut(&id)
    }

    /// Resolve a name (case/whitespace/punctuation-insensitive)
    pub fn id_for_name(&self, name: &str) -> Option<ZoundId> {
        self.names.get(&normalize_name(name)).copied()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Zound> {
        self.id_for_name(name).and_then(|id| self.zounds.get(&id))
    }

    pub fn ids(&self) -> impl Iterator<Item = ZoundId> + '_ {
        self.zounds.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.zounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zounds.is_empty()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GRAPH QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Whether `target` is reachable from `root` through zequence entries
    ///
    /// `root` itself only counts when a cycle leads back to it.
    pub fn contains(&self, root: ZoundId, target: ZoundId) -> bool {
        let mut visited = HashSet::new();
        let mut stack = self.child_ids(root);

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if visited.insert(id) {
                stack.extend(self.child_ids(id));
            }
        }
        false
    }

    /// Every zound reachable from `root`, in discovery order
    pub fn dependencies(&self, root: ZoundId) -> Vec<ZoundId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack: Vec<ZoundId> = self.child_ids(root).into_iter().rev().collect();

        while let Some(id) = stack.pop() {
            if id == root || !visited.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.child_ids(id).into_iter().rev());
        }
        order
    }

    fn child_ids(&self, id: ZoundId) -> Vec<ZoundId> {
        self.zounds
            .get(&id)
            .and_then(Zound::as_zequence)
            .map(|z| z.entries.iter().map(|e| e.zound).collect())
            .unwrap_or_default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GLOBAL SOLO
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn set_solo(&mut self, id: ZoundId, solo: bool) {
        if solo {
            self.soloed.insert(id);
        } else {
            self.soloed.remove(&id);
        }
    }

    pub fn is_soloed(&self, id: ZoundId) -> bool {
        self.soloed.contains(&id)
    }

    pub fn has_solo(&self) -> bool {
        !self.soloed.is_empty()
    }

    /// Whether a top-level play of `id` stays audible under the solo set
    pub fn solo_allows(&self, id: ZoundId) -> bool {
        self.soloed.is_empty()
            || self.soloed.contains(&id)
            || self.soloed.iter().any(|solo| self.contains(id, *solo))
    }
}
