//! Zound Definitions
//!
//! Static authoring data for the sound-event graph. A zound is either a
//! single clip (`Klip`, `Music`) or a composite of child entries
//! (`Zequence`, `Randomizer`). The graph is read-only at playback time
//! except for the RoundRobin/Playlist cursors on `Zequence`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use zf_core::{ClipRef, Envelope, RouteId, TagId, ValueRange, ZfError, ZfResult, ZoundId};

// ═══════════════════════════════════════════════════════════════════════════════
// ZOUND
// ═══════════════════════════════════════════════════════════════════════════════

/// Authored unit of playable audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zound {
    /// Stable ID, unique across the library
    pub id: ZoundId,
    /// Display name (lookup is normalized)
    pub name: String,
    /// Volume multiplier range, sampled once per instance
    pub volume: ValueRange,
    /// Pitch multiplier range, sampled once per instance
    pub pitch: ValueRange,
    /// Trigger chance (0.0 - 1.0)
    pub chance: f32,
    /// Manual output route override
    pub output_route: Option<RouteId>,
    /// Tags for grouped operations
    #[serde(default)]
    pub tags: BTreeSet<TagId>,
    /// Node kind and kind-specific data
    pub kind: ZoundKind,
}

impl Zound {
    pub fn new(id: ZoundId, name: impl Into<String>, kind: ZoundKind) -> Self {
        Self {
            id,
            name: name.into(),
            volume: ValueRange::UNIT,
            pitch: ValueRange::UNIT,
            chance: 1.0,
            output_route: None,
            tags: BTreeSet::new(),
            kind,
        }
    }

    /// Single-clip zound
    pub fn klip(id: u32, name: impl Into<String>, clip: impl Into<String>) -> Self {
        Self::new(ZoundId(id), name, ZoundKind::Klip(Klip::new(ClipRef::new(clip))))
    }

    /// Music zound (leaf-like, routed as music)
    pub fn music(id: u32, name: impl Into<String>, clip: impl Into<String>) -> Self {
        Self::new(ZoundId(id), name, ZoundKind::Music(Klip::new(ClipRef::new(clip))))
    }

    /// Composite zound
    pub fn zequence(id: u32, name: impl Into<String>, zequence: Zequence) -> Self {
        Self::new(ZoundId(id), name, ZoundKind::Zequence(zequence))
    }

    /// Randomizer zound (composite that always picks one weighted entry)
    pub fn randomizer(id: u32, name: impl Into<String>, mut zequence: Zequence) -> Self {
        zequence.mode = PlayMode::Randomizer;
        Self::new(ZoundId(id), name, ZoundKind::Randomizer(zequence))
    }

    // === Builder methods ===

    pub fn with_volume(mut self, min: f32, max: f32) -> Self {
        self.volume = ValueRange::new(min, max);
        self
    }

    pub fn with_pitch(mut self, min: f32, max: f32) -> Self {
        self.pitch = ValueRange::new(min, max);
        self
    }

    pub fn with_chance(mut self, chance: f32) -> Self {
        self.chance = chance;
        self
    }

    pub fn with_route(mut self, route: RouteId) -> Self {
        self.output_route = Some(route);
        self
    }

    pub fn with_tag(mut self, tag: TagId) -> Self {
        self.tags.insert(tag);
        self
    }

    // === Queries ===

    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tags.contains(&tag)
    }

    /// Composite data, if this zound schedules children
    pub fn as_zequence(&self) -> Option<&Zequence> {
        match &self.kind {
            ZoundKind::Zequence(z) | ZoundKind::Randomizer(z) => Some(z),
            ZoundKind::Klip(_) | ZoundKind::Music(_) => None,
        }
    }

    pub fn as_zequence_mut(&mut self) -> Option<&mut Zequence> {
        match &mut self.kind {
            ZoundKind::Zequence(z) | ZoundKind::Randomizer(z) => Some(z),
            ZoundKind::Klip(_) | ZoundKind::Music(_) => None,
        }
    }

    /// Check ranges and chance
    pub fn validate(&self) -> ZfResult<()> {
        self.volume.validate("volume")?;
        self.pitch.validate("pitch")?;
        if self.pitch.min <= 0.0 {
            return Err(ZfError::InvalidParam(format!(
                "{}: pitch must be positive",
                self.name
            )));
        }
        if !(0.0..=1.0).contains(&self.chance) {
            return Err(ZfError::InvalidParam(format!(
                "{}: chance {} outside [0, 1]",
                self.name, self.chance
            )));
        }
        if let Some(zequence) = self.as_zequence() {
            for entry in &zequence.entries {
                if entry.delay_secs < 0.0 || entry.chance_weight < 0.0 {
                    return Err(ZfError::InvalidParam(format!(
                        "{}: entry {} has negative delay or weight",
                        self.name, entry.zound
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Node kind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ZoundKind {
    /// Single clip
    Klip(Klip),
    /// Single music clip (distinct for routing/metadata)
    Music(Klip),
    /// Composite with an authored play mode
    Zequence(Zequence),
    /// Composite always played in Randomizer mode
    Randomizer(Zequence),
}

impl ZoundKind {
    pub fn name(&self) -> &'static str {
        match self {
            ZoundKind::Klip(_) => "Klip",
            ZoundKind::Music(_) => "Music",
            ZoundKind::Zequence(_) => "Zequence",
            ZoundKind::Randomizer(_) => "Randomizer",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// KLIP
// ═══════════════════════════════════════════════════════════════════════════════

/// Single playable clip with trim points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Klip {
    /// Source waveform
    pub clip: ClipRef,
    /// Trim-in (seconds into the source)
    pub trim_start: f32,
    /// Trim-out (seconds into the source, None = source end)
    pub trim_end: Option<f32>,
    /// Pre-rendered alternate (trim + curves baked in)
    pub rendered: Option<ClipRef>,
    /// Volume curve, only used when rendering the alternate
    pub volume_envelope: Envelope,
    /// Pitch curve, only used when rendering the alternate
    pub pitch_envelope: Envelope,
}

impl Klip {
    pub fn new(clip: ClipRef) -> Self {
        Self {
            clip,
            trim_start: 0.0,
            trim_end: None,
            rendered: None,
            volume_envelope: Envelope::unit(),
            pitch_envelope: Envelope::unit(),
        }
    }

    pub fn with_trim(mut self, start: f32, end: Option<f32>) -> Self {
        self.trim_start = start.max(0.0);
        self.trim_end = end;
        self
    }

    pub fn with_rendered(mut self, clip: ClipRef) -> Self {
        self.rendered = Some(clip);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ZEQUENCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Composite play mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PlayMode {
    /// Every entry plays
    #[default]
    Parallel = 0,
    /// One weighted entry (or nothing)
    Randomizer = 1,
    /// One entry, each played once per cycle in random order
    RoundRobin = 2,
    /// One entry, strictly sequential
    Playlist = 3,
}

/// Composite of child entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zequence {
    /// Ordered child edges
    pub entries: Vec<ZequenceEntry>,
    /// Play mode
    pub mode: PlayMode,
    /// Randomizer weight of the "play nothing" bucket
    pub no_play_weight: f32,
    /// Volume curve over the whole subtree (normalized time)
    pub master_envelope: Envelope,
    pub master_envelope_enabled: bool,
    /// Pre-rendered buffer; when present the zequence plays like a Klip
    pub rendered: Option<ClipRef>,
    /// RoundRobin entries already played this cycle
    #[serde(default)]
    pub played_entries: BTreeSet<usize>,
    /// Most recently selected entry (RoundRobin)
    #[serde(default)]
    pub last_played: Option<usize>,
    /// Playlist cursor
    #[serde(default)]
    pub playlist_cursor: usize,
}

impl Zequence {
    pub fn new(mode: PlayMode) -> Self {
        Self {
            entries: Vec::new(),
            mode,
            no_play_weight: 0.0,
            master_envelope: Envelope::unit(),
            master_envelope_enabled: false,
            rendered: None,
            played_entries: BTreeSet::new(),
            last_played: None,
            playlist_cursor: 0,
        }
    }

    pub fn with_entry(mut self, entry: ZequenceEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn with_no_play_weight(mut self, weight: f32) -> Self {
        self.no_play_weight = weight.max(0.0);
        self
    }

    pub fn with_master_envelope(mut self, envelope: Envelope) -> Self {
        self.master_envelope = envelope;
        self.master_envelope_enabled = true;
        self
    }

    pub fn with_rendered(mut self, clip: ClipRef) -> Self {
        self.rendered = Some(clip);
        self
    }

    pub fn add_entry(&mut self, entry: ZequenceEntry) {
        self.entries.push(entry);
        self.reset_cursors();
    }

    pub fn remove_entry(&mut self, index: usize) -> Option<ZequenceEntry> {
        if index < self.entries.len() {
            let entry = self.entries.remove(index);
            self.reset_cursors();
            Some(entry)
        } else {
            None
        }
    }

    /// Reset RoundRobin/Playlist state
    pub fn reset_cursors(&mut self) {
        self.played_entries.clear();
        self.last_played = None;
        self.playlist_cursor = 0;
    }

    pub fn has_solo(&self) -> bool {
        self.entries.iter().any(|e| e.solo)
    }

    /// Total Randomizer weight including the no-play bucket
    pub fn total_weight(&self) -> f32 {
        self.no_play_weight + self.entries.iter().map(|e| e.chance_weight).sum::<f32>()
    }
}

impl Default for Zequence {
    fn default() -> Self {
        Self::new(PlayMode::Parallel)
    }
}

/// Edge from a zequence to a child zound
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZequenceEntry {
    /// Child zound
    pub zound: ZoundId,
    /// Delay in the parent's undilated time base (seconds)
    pub delay_secs: f32,
    pub volume: f32,
    /// Use `volume` instead of multiplying by the child's own range
    pub override_volume: bool,
    pub pitch: f32,
    pub override_pitch: bool,
    pub chance: f32,
    /// Ignore the child's own chance
    pub override_chance: bool,
    /// Randomizer weight
    pub chance_weight: f32,
    pub mute: bool,
    pub solo: bool,
    /// Amplitude automation of this child over the parent's timeline
    pub envelope: Option<Envelope>,
}

impl ZequenceEntry {
    pub fn new(zound: ZoundId) -> Self {
        Self {
            zound,
            delay_secs: 0.0,
            volume: 1.0,
            override_volume: false,
            pitch: 1.0,
            override_pitch: false,
            chance: 1.0,
            override_chance: false,
            chance_weight: 1.0,
            mute: false,
            solo: false,
            envelope: None,
        }
    }

    pub fn with_delay(mut self, delay_secs: f32) -> Self {
        self.delay_secs = delay_secs.max(0.0);
        self
    }

    pub fn with_volume(mut self, volume: f32, override_volume: bool) -> Self {
        self.volume = volume;
        self.override_volume = override_volume;
        self
    }

    pub fn with_pitch(mut self, pitch: f32, override_pitch: bool) -> Self {
        self.pitch = pitch;
        self.override_pitch = override_pitch;
        self
    }

    pub fn with_chance(mut self, chance: f32, override_chance: bool) -> Self {
        self.chance = chance;
        self.override_chance = override_chance;
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.chance_weight = weight.max(0.0);
        self
    }

    pub fn with_envelope(mut self, envelope: Envelope) -> Self {
        self.envelope = Some(envelope);
        self
    }

    pub fn muted(mut self) -> Self {
        self.mute = true;
        self
    }

    pub fn soloed(mut self) -> Self {
        self.solo = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zound_builders() {
        let zound = Zound::klip(1, "Coin", "sfx/coin.wav")
            .with_volume(0.8, 1.0)
            .with_pitch(0.9, 1.1)
            .with_chance(0.5)
            .with_tag(TagId(3));

        assert_eq!(zound.id, ZoundId(1));
        assert_eq!(zound.kind.name(), "Klip");
        assert!(zound.has_tag(TagId(3)));
        assert!(zound.as_zequence().is_none());
        assert!(zound.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_data() {
        assert!(Zound::klip(1, "A", "a").with_volume(1.0, 0.5).validate().is_err());
        assert!(Zound::klip(1, "A", "a").with_chance(1.5).validate().is_err());
        assert!(Zound::klip(1, "A", "a").with_pitch(0.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_randomizer_forces_mode() {
        let zound = Zound::randomizer(5, "Pick", Zequence::new(PlayMode::Playlist));
        assert_eq!(zound.as_zequence().map(|z| z.mode), Some(PlayMode::Randomizer));
    }

    #[test]
    fn test_zequence_entries() {
        let mut zequence = Zequence::new(PlayMode::RoundRobin)
            .with_entry(ZequenceEntry::new(ZoundId(1)).with_weight(3.0))
            .with_entry(ZequenceEntry::new(ZoundId(2)).soloed())
            .with_no_play_weight(1.0);

        assert!(zequence.has_solo());
        assert_eq!(zequence.total_weight(), 5.0);

        zequence.played_entries.insert(0);
        zequence.playlist_cursor = 1;
        let removed = zequence.remove_entry(1);
        assert!(removed.is_some());
        assert!(zequence.played_entries.is_empty());
        assert_eq!(zequence.playlist_cursor, 0);
        assert!(zequence.remove_entry(4).is_none());
    }
}
