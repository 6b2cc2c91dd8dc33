//! Resource availability
//!
//! The asset layer owns waveform loading. The engine only asks whether a
//! clip is ready and how long it is; a clip that is still loading is polled
//! again on the next tick, a clip that cannot be resolved plays as silence
//! of zero duration.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use zf_core::ClipRef;

/// Metadata of a loaded clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipInfo {
    /// Full source length (seconds)
    pub length_secs: f32,
}

/// Load state of a clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResourceStatus {
    Ready(ClipInfo),
    Loading,
    Unavailable,
}

impl ResourceStatus {
    pub fn ready(length_secs: f32) -> Self {
        ResourceStatus::Ready(ClipInfo { length_secs })
    }
}

/// "Resource ready" query implemented by the asset layer
pub trait ResourceProvider {
    fn status(&self, clip: &ClipRef) -> ResourceStatus;
}

/// Clonable in-memory resource table
///
/// Clones share the same table, so the asset layer can keep one handle and
/// flip clips to `Ready` while the engine holds another.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    clips: Arc<RwLock<HashMap<ClipRef, ResourceStatus>>>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, clip: impl Into<String>, length_secs: f32) {
        self.set(clip, ResourceStatus::ready(length_secs));
    }

    pub fn set_loading(&self, clip: impl Into<String>) {
        self.set(clip, ResourceStatus::Loading);
    }

    pub fn set_unavailable(&self, clip: impl Into<String>) {
        self.set(clip, ResourceStatus::Unavailable);
    }

    pub fn set(&self, clip: impl Into<String>, status: ResourceStatus) {
        self.clips.write().insert(ClipRef::new(clip), status);
    }

    pub fn remove(&self, clip: &ClipRef) {
        self.clips.write().remove(clip);
    }

    pub fn len(&self) -> usize {
        self.clips.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.read().is_empty()
    }
}

impl ResourceProvider for ResourceTable {
    fn status(&self, clip: &ClipRef) -> ResourceStatus {
        self.clips
            .read()
            .get(clip)
            .copied()
            .unwrap_or(ResourceStatus::Unavailable)
    }
}
