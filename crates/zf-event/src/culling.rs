//! Culling & cooldown
//!
//! Per-zound LRU groups of live tokens (oldest first) and per-zound
//! last-played timestamps. Only tokens that are neither fading nor killed
//! are group members; the engine removes a token as soon as it starts
//! ending.

use std::collections::{HashMap, VecDeque};
use zf_core::ZoundId;

use crate::token::TokenId;

#[derive(Debug, Default)]
pub struct CullingController {
    groups: HashMap<ZoundId, VecDeque<TokenId>>,
    last_played: HashMap<ZoundId, f64>,
}

impl CullingController {
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GROUPS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append `token`; returns members evicted to stay under `max`
    /// (oldest first, `max == 0` is unlimited)
    pub fn admit(&mut self, zound: ZoundId, token: TokenId, max: usize) -> Vec<TokenId> {
        let group = self.groups.entry(zound).or_default();
        let mut evicted = Vec::new();
        if max > 0 {
            while group.len() >= max {
                match group.pop_front() {
                    Some(oldest) => evicted.push(oldest),
                    None => break,
                }
            }
        }
        group.push_back(token);
        evicted
    }

    pub fn remove(&mut self, zound: ZoundId, token: TokenId) {
        if let Some(group) = self.groups.get_mut(&zound) {
            group.retain(|id| *id != token);
            if group.is_empty() {
                self.groups.remove(&zound);
            }
        }
    }

    /// Members oldest first
    pub fn group(&self, zound: ZoundId) -> impl Iterator<Item = TokenId> + '_ {
        self.groups.get(&zound).into_iter().flatten().copied()
    }

    pub fn count(&self, zound: ZoundId) -> usize {
        self.groups.get(&zound).map_or(0, VecDeque::len)
    }

    pub fn clear_groups(&mut self) {
        self.groups.clear();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COOLDOWN
    // ═══════════════════════════════════════════════════════════════════════════

    /// Whether a trigger at `trigger_time` falls inside the cooldown window
    pub fn is_cooling_down(&self, zound: ZoundId, trigger_time: f64, cooldown_secs: f32) -> bool {
        if cooldown_secs <= 0.0 {
            return false;
        }
        self.last_played
            .get(&zound)
            .is_some_and(|last| (trigger_time - last).abs() < f64::from(cooldown_secs))
    }

    pub fn record_play(&mut self, zound: ZoundId, now: f64) {
        self.last_played.insert(zound, now);
    }

    pub fn last_played(&self, zound: ZoundId) -> Option<f64> {
        self.last_played.get(&zound).copied()
    }

    /// Seconds until `zound` may trigger again
    pub fn remaining_cooldown(&self, zound: ZoundId, now: f64, cooldown_secs: f32) -> f32 {
        self.last_played.get(&zound).map_or(0.0, |last| {
            (last + f64::from(cooldown_secs) - now).max(0.0) as f32
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admit_evicts_oldest() {
        let mut culling = CullingController::new();
        let zound = ZoundId(1);

        assert!(culling.admit(zound, TokenId(1), 2).is_empty());
        assert!(culling.admit(zound, TokenId(2), 2).is_empty());
        assert_eq!(culling.admit(zound, TokenId(3), 2), vec![TokenId(1)]);
        assert_eq!(culling.group(zound).collect::<Vec<_>>(), vec![TokenId(2), TokenId(3)]);

        // Other zounds have their own group
        assert!(culling.admit(ZoundId(2), TokenId(4), 2).is_empty());
        assert_eq!(culling.count(zound), 2);
    }

    #[test]
    fn test_unlimited_group() {
        let mut culling = CullingController::new();
        for i in 0..20 {
            assert!(culling.admit(ZoundId(1), TokenId(i), 0).is_empty());
        }
        assert_eq!(culling.count(ZoundId(1)), 20);
    }

    #[test]
    fn test_remove_drops_empty_group() {
        let mut culling = CullingController::new();
        culling.admit(ZoundId(1), TokenId(1), 4);
        culling.remove(ZoundId(1), TokenId(1));
        assert_eq!(culling.count(ZoundId(1)), 0);
        assert_eq!(culling.group(ZoundId(1)).count(), 0);
    }

    #[test]
    fn test_cooldown_window() {
        let mut culling = CullingController::new();
        let zound = ZoundId(7);
        assert!(!culling.is_cooling_down(zound, 0.0, 0.5));

        culling.record_play(zound, 1.0);
        assert!(culling.is_cooling_down(zound, 1.2, 0.5));
        assert!(!culling.is_cooling_down(zound, 1.6, 0.5));
        assert!(!culling.is_cooling_down(zound, 1.2, 0.0));

        assert!((culling.remaining_cooldown(zound, 1.2, 0.5) - 0.3).abs() < 1e-6);
        assert_eq!(culling.remaining_cooldown(zound, 2.0, 0.5), 0.0);
        assert_eq!(culling.remaining_cooldown(ZoundId(8), 2.0, 0.5), 0.0);
    }
}
