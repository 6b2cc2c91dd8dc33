//! Per-kind playback logic owned by a token
//!
//! One closed variant per playback behavior:
//! - `Klip`: one clip on the token's voice (Klip, Music, baked zequences)
//! - `Zequence`: schedules child tokens (Zequence, Randomizer)
//!
//! Handlers hold the pure kind logic (durations, selection, modulation).
//! The engine owns the token arena and applies their results.

mod klip;
mod zequence;

pub use klip::*;
pub use zequence::*;

use crate::token::TokenId;

/// Smallest pitch used as a divisor
pub(crate) const MIN_PITCH: f32 = 1.0e-4;

#[derive(Debug)]
pub enum Handler {
    Klip(KlipHandler),
    Zequence(ZequenceHandler),
}

impl Handler {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Handler::Klip(_) => "Klip",
            Handler::Zequence(_) => "Zequence",
        }
    }

    pub fn as_klip(&self) -> Option<&KlipHandler> {
        match self {
            Handler::Klip(klip) => Some(klip),
            Handler::Zequence(_) => None,
        }
    }

    pub fn as_zequence(&self) -> Option<&ZequenceHandler> {
        match self {
            Handler::Zequence(zequence) => Some(zequence),
            Handler::Klip(_) => None,
        }
    }

    /// Scheduled children (empty for clips)
    pub fn children(&self) -> &[ChildSlot] {
        match self {
            Handler::Zequence(zequence) => zequence.children(),
            Handler::Klip(_) => &[],
        }
    }

    pub(crate) fn child_tokens(&self) -> Vec<TokenId> {
        self.children().iter().map(|slot| slot.token).collect()
    }

    /// Waiting for the clip resource to finish loading
    pub fn is_awaiting_resource(&self) -> bool {
        matches!(self, Handler::Klip(klip) if klip.is_awaiting())
    }
}
