//! Zequence Handler: composite scheduling
//!
//! Construction (done by the engine through these helpers):
//!
//! ```text
//! select_entries ──▶ resolve_child_params ──▶ play child (not started)
//!       │                                            │
//!  mode cursor on the                      ChildSlot { token, entry }
//!  authoring data                                    │
//!                                   duration = max(child delay + child total)
//! ```
//!
//! Per frame the engine asks `zequence_mix` for every child's inherited
//! volume and mute state.

use zf_core::{ValueRange, ZoundId};

use super::MIN_PITCH;
use crate::library::ZoundLibrary;
use crate::token::TokenId;
use crate::zound::{PlayMode, Zequence, ZequenceEntry, Zound};

/// Spawned child and the entry it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildSlot {
    pub token: TokenId,
    pub entry: usize,
}

#[derive(Debug, Clone)]
pub struct ZequenceHandler {
    zound: ZoundId,
    children: Vec<ChildSlot>,
}

impl ZequenceHandler {
    pub fn new(zound: ZoundId) -> Self {
        Self {
            zound,
            children: Vec::new(),
        }
    }

    pub fn zound(&self) -> ZoundId {
        self.zound
    }

    pub fn children(&self) -> &[ChildSlot] {
        &self.children
    }

    pub(crate) fn push_child(&mut self, slot: ChildSlot) {
        self.children.push(slot);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Pick the entries to play
///
/// `audition` (an already validated entry index) wins in every mode.
/// RoundRobin and Playlist advance their cursors on `zequence`.
pub fn select_entries(
    zequence: &mut Zequence,
    audition: Option<usize>,
    rng: &mut impl FnMut() -> f32,
) -> Vec<usize> {
    if let Some(index) = audition.filter(|i| *i < zequence.entries.len()) {
        return vec![index];
    }
    if zequence.entries.is_empty() {
        return Vec::new();
    }

    let picked = match zequence.mode {
        PlayMode::Parallel => return (0..zequence.entries.len()).collect(),
        PlayMode::Randomizer => select_weighted(zequence, rng),
        PlayMode::RoundRobin => select_round_robin(zequence, rng),
        PlayMode::Playlist => select_playlist(zequence),
    };
    picked.into_iter().collect()
}

/// Weighted draw; the no-play bucket comes first
fn select_weighted(zequence: &Zequence, rng: &mut impl FnMut() -> f32) -> Option<usize> {
    let total = zequence.total_weight();
    if total <= 0.0 {
        return None;
    }

    let mut roll = rng() * total;
    if roll < zequence.no_play_weight {
        return None;
    }
    roll -= zequence.no_play_weight;

    for (index, entry) in zequence.entries.iter().enumerate() {
        if roll < entry.chance_weight {
            return Some(index);
        }
        roll -= entry.chance_weight;
    }
    // Rounding at the top of the range
    zequence.entries.iter().rposition(|e| e.chance_weight > 0.0)
}

/// Uniform draw among entries not yet played this cycle
fn select_round_robin(zequence: &mut Zequence, rng: &mut impl FnMut() -> f32) -> Option<usize> {
    let count = zequence.entries.len();
    zequence.played_entries.retain(|index| *index < count);
    if zequence.played_entries.len() >= count {
        zequence.played_entries.clear();
    }

    // No immediate repeat across a cycle boundary
    let exclude_last = zequence.played_entries.is_empty() && count > 1;
    let candidates: Vec<usize> = (0..count)
        .filter(|index| !zequence.played_entries.contains(index))
        .filter(|index| !(exclude_last && zequence.last_played == Some(*index)))
        .collect();

    let slot = ((rng() * candidates.len() as f32) as usize).min(candidates.len().saturating_sub(1));
    let picked = *candidates.get(slot)?;
    zequence.played_entries.insert(picked);
    zequence.last_played = Some(picked);
    Some(picked)
}

fn select_playlist(zequence: &mut Zequence) -> Option<usize> {
    let count = zequence.entries.len();
    let index = zequence.playlist_cursor % count;
    zequence.playlist_cursor = (index + 1) % count;
    Some(index)
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETER RESOLUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolved values of the parent instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParentParams {
    pub volume: f32,
    pub pitch: f32,
    pub chance: f32,
}

/// Overrides passed to a child play request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildParams {
    pub volume: f32,
    pub pitch: f32,
    pub chance: f32,
    /// Entry delay in the parent's dilated time
    pub delay: f32,
}

/// Combine parent values, entry settings and the child's own ranges
///
/// `sample` draws from a range (or returns its midpoint for previews).
pub fn resolve_child_params(
    entry: &ZequenceEntry,
    child: &Zound,
    parent: ParentParams,
    mut sample: impl FnMut(ValueRange) -> f32,
) -> ChildParams {
    let volume = if entry.override_volume {
        parent.volume * entry.volume
    } else {
        parent.volume * entry.volume * sample(child.volume)
    };
    let pitch = if entry.override_pitch {
        parent.pitch * entry.pitch
    } else {
        parent.pitch * entry.pitch * sample(child.pitch)
    };
    let chance = if entry.override_chance {
        parent.chance * entry.chance
    } else {
        parent.chance * entry.chance * child.chance
    };

    ChildParams {
        volume,
        pitch: pitch.max(MIN_PITCH),
        chance,
        delay: entry.delay_secs / parent.pitch.max(MIN_PITCH),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PER-FRAME MODULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Inherited gain and mute for one child this frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChildMix {
    pub token: TokenId,
    pub gain: f32,
    pub muted: bool,
}

/// Envelopes plus solo/mute policy at normalized time `t`
///
/// `base_gain` / `base_muted` are the composite's own inherited values.
pub fn zequence_mix(
    children: &[ChildSlot],
    zequence: &Zequence,
    library: &ZoundLibrary,
    t: f32,
    base_gain: f32,
    base_muted: bool,
) -> Vec<ChildMix> {
    let master = if zequence.master_envelope_enabled {
        zequence.master_envelope.evaluate(t)
    } else {
        1.0
    };

    children
        .iter()
        .map(|slot| {
            let Some(entry) = zequence.entries.get(slot.entry) else {
                return ChildMix {
                    token: slot.token,
                    gain: base_gain * master,
                    muted: base_muted,
                };
            };
            let envelope = entry.envelope.as_ref().map_or(1.0, |env| env.evaluate(t));
            ChildMix {
                token: slot.token,
                gain: base_gain * master * envelope,
                muted: base_muted || entry_silenced(zequence, slot.entry, library),
            }
        })
        .collect()
}

/// Solo wins over mute; a non-solo entry stays audible when its subtree
/// holds a soloed entry's zound
fn entry_silenced(zequence: &Zequence, index: usize, library: &ZoundLibrary) -> bool {
    let Some(entry) = zequence.entries.get(index) else {
        return false;
    };
    if !zequence.has_solo() {
        return entry.mute;
    }
    if entry.solo {
        return false;
    }
    !zequence
        .entries
        .iter()
        .filter(|other| other.solo)
        .any(|soloed| entry.zound == soloed.zound || library.contains(entry.zound, soloed.zound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zf_core::Envelope;

    fn entries(count: u32) -> Zequence {
        (1..=count).fold(Zequence::new(PlayMode::Parallel), |z, id| {
            z.with_entry(ZequenceEntry::new(ZoundId(id)))
        })
    }

    /// Deterministic sequence of unit values
    fn sequence(values: &[f32]) -> impl FnMut() -> f32 + '_ {
        let mut i = 0;
        move || {
            let v = values[i % values.len()];
            i += 1;
            v
        }
    }

    #[test]
    fn test_parallel_selects_all() {
        let mut zequence = entries(3);
        assert_eq!(select_entries(&mut zequence, None, &mut || 0.5), vec![0, 1, 2]);
        assert!(select_entries(&mut Zequence::default(), None, &mut || 0.5).is_empty());
    }

    #[test]
    fn test_audition_overrides_mode() {
        let mut zequence = entries(3);
        assert_eq!(select_entries(&mut zequence, Some(2), &mut || 0.5), vec![2]);
        // Out of range falls back to the mode
        assert_eq!(select_entries(&mut zequence, Some(9), &mut || 0.5).len(), 3);
    }

    #[test]
    fn test_weighted_buckets() {
        let mut zequence = Zequence::new(PlayMode::Randomizer)
            .with_entry(ZequenceEntry::new(ZoundId(1)).with_weight(3.0))
            .with_entry(ZequenceEntry::new(ZoundId(2)).with_weight(1.0))
            .with_no_play_weight(1.0);

        // total 5: [0,1) nothing, [1,4) entry 0, [4,5) entry 1
        assert!(select_entries(&mut zequence, None, &mut || 0.1).is_empty());
        assert_eq!(select_entries(&mut zequence, None, &mut || 0.3), vec![0]);
        assert_eq!(select_entries(&mut zequence, None, &mut || 0.9), vec![1]);
        assert_eq!(select_entries(&mut zequence, None, &mut || 1.0), vec![1]);
    }

    #[test]
    fn test_weighted_zero_total_selects_nothing() {
        let mut zequence = Zequence::new(PlayMode::Randomizer)
            .with_entry(ZequenceEntry::new(ZoundId(1)).with_weight(0.0));
        assert!(select_entries(&mut zequence, None, &mut || 0.5).is_empty());
    }

    #[test]
    fn test_round_robin_cycles_without_repeats() {
        let mut zequence = entries(4);
        zequence.mode = PlayMode::RoundRobin;
        let mut rng = sequence(&[0.9, 0.1, 0.6, 0.3, 0.99, 0.0, 0.5]);

        for _cycle in 0..3 {
            let mut seen = Vec::new();
            for _ in 0..4 {
                let picked = select_entries(&mut zequence, None, &mut rng);
                assert_eq!(picked.len(), 1);
                seen.push(picked[0]);
            }
            seen.sort_unstable();
            assert_eq!(seen, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn test_round_robin_no_repeat_across_cycles() {
        let mut zequence = entries(2);
        zequence.mode = PlayMode::RoundRobin;
        let mut previous = None;
        for _ in 0..10 {
            let picked = select_entries(&mut zequence, None, &mut || 0.0)[0];
            assert_ne!(Some(picked), previous);
            previous = Some(picked);
        }
    }

    #[test]
    fn test_playlist_wraps() {
        let mut zequence = entries(3);
        zequence.mode = PlayMode::Playlist;
        let order: Vec<usize> = (0..5)
            .map(|_| select_entries(&mut zequence, None, &mut || 0.5)[0])
            .collect();
        assert_eq!(order, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_resolve_child_params() {
        let child = Zound::klip(2, "Child", "c")
            .with_volume(0.5, 1.0)
            .with_pitch(1.0, 2.0)
            .with_chance(0.5);
        let parent = ParentParams {
            volume: 0.8,
            pitch: 2.0,
            chance: 0.5,
        };
        let entry = ZequenceEntry::new(ZoundId(2)).with_delay(1.0).with_volume(0.5, false);

        let params = resolve_child_params(&entry, &child, parent, |range| range.max);
        assert!((params.volume - 0.4).abs() < 1e-6);
        assert!((params.pitch - 4.0).abs() < 1e-6);
        assert!((params.chance - 0.25).abs() < 1e-6);
        assert!((params.delay - 0.5).abs() < 1e-6);

        let overridden = entry
            .with_volume(0.5, true)
            .with_pitch(1.5, true)
            .with_chance(0.5, true);
        let params = resolve_child_params(&overridden, &child, parent, |range| range.min);
        assert!((params.volume - 0.4).abs() < 1e-6);
        assert!((params.pitch - 3.0).abs() < 1e-6);
        assert!((params.chance - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_mix_envelopes() {
        let mut fade = Envelope::unit();
        fade.set_value(1, 0.0);
        let zequence = Zequence::new(PlayMode::Parallel)
            .with_entry(ZequenceEntry::new(ZoundId(1)).with_envelope(fade))
            .with_entry(ZequenceEntry::new(ZoundId(2)))
            .with_master_envelope(Envelope::unit());
        let children = [
            ChildSlot { token: TokenId(1), entry: 0 },
            ChildSlot { token: TokenId(2), entry: 1 },
        ];

        let mix = zequence_mix(&children, &zequence, &ZoundLibrary::new(), 0.5, 0.8, false);
        assert!((mix[0].gain - 0.4).abs() < 1e-6);
        assert!((mix[1].gain - 0.8).abs() < 1e-6);
        assert!(!mix[0].muted);
    }

    #[test]
    fn test_mix_solo_and_mute() {
        let mut library = ZoundLibrary::new();
        library.insert(Zound::klip(1, "A", "a")).unwrap();
        library.insert(Zound::klip(2, "B", "b")).unwrap();
        library
            .insert(Zound::zequence(
                3,
                "Holds A",
                Zequence::default().with_entry(ZequenceEntry::new(ZoundId(1))),
            ))
            .unwrap();

        let children: Vec<ChildSlot> = (0..3)
            .map(|i| ChildSlot { token: TokenId(i as u64), entry: i })
            .collect();

        let muted = Zequence::new(PlayMode::Parallel)
            .with_entry(ZequenceEntry::new(ZoundId(1)).muted())
            .with_entry(ZequenceEntry::new(ZoundId(2)))
            .with_entry(ZequenceEntry::new(ZoundId(3)));
        let mix = zequence_mix(&children, &muted, &library, 0.0, 1.0, false);
        assert_eq!(mix.iter().map(|m| m.muted).collect::<Vec<_>>(), vec![true, false, false]);

        // Solo on A: B muted, the zequence holding A stays audible
        let soloed = Zequence::new(PlayMode::Parallel)
            .with_entry(ZequenceEntry::new(ZoundId(1)).soloed())
            .with_entry(ZequenceEntry::new(ZoundId(2)))
            .with_entry(ZequenceEntry::new(ZoundId(3)));
        let mix = zequence_mix(&children, &soloed, &library, 0.0, 1.0, false);
        assert_eq!(mix.iter().map(|m| m.muted).collect::<Vec<_>>(), vec![false, true, false]);

        // Parent mute reaches every child
        let mix = zequence_mix(&children, &soloed, &library, 0.0, 1.0, true);
        assert!(mix.iter().all(|m| m.muted));
    }
}
