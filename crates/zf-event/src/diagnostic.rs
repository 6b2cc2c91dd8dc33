//! Non-fatal playback diagnostics
//!
//! Everything here was already logged; the queue lets tools and tests
//! observe it. Drained with `ZoundEngine::take_diagnostics()`.

use std::collections::VecDeque;
use std::fmt;
use zf_core::{ClipRef, ZoundId};

use crate::token::{TokenId, TokenState};

/// Oldest diagnostics are dropped past this size
const MAX_PENDING: usize = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackDiagnostic {
    /// Name lookup failed
    MissingZound { name: String },
    /// ID not in the library
    UnknownZound(ZoundId),
    /// Entry would recurse into an ancestor; branch skipped
    CycleDetected { parent: ZoundId, child: ZoundId },
    /// Clip could not be resolved; played as zero-length silence
    ResourceUnavailable { zound: ZoundId, clip: ClipRef },
    /// Start/Pause/Resume on an ending token; ignored
    InvalidTokenOperation {
        token: TokenId,
        operation: &'static str,
        state: TokenState,
    },
}

impl fmt::Display for PlaybackDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingZound { name } => write!(f, "missing zound '{name}'"),
            Self::UnknownZound(id) => write!(f, "unknown {id}"),
            Self::CycleDetected { parent, child } => {
                write!(f, "cycle: {child} contains {parent}")
            }
            Self::ResourceUnavailable { zound, clip } => {
                write!(f, "{zound}: clip '{clip}' unavailable")
            }
            Self::InvalidTokenOperation {
                token,
                operation,
                state,
            } => write!(f, "{operation} on {token} in state {state}"),
        }
    }
}

/// Bounded FIFO of pending diagnostics
#[derive(Debug, Default)]
pub(crate) struct DiagnosticQueue {
    pending: VecDeque<PlaybackDiagnostic>,
}

impl DiagnosticQueue {
    pub fn push(&mut self, diagnostic: PlaybackDiagnostic) {
        if self.pending.len() >= MAX_PENDING {
            self.pending.pop_front();
        }
        self.pending.push_back(diagnostic);
    }

    pub fn take(&mut self) -> Vec<PlaybackDiagnostic> {
        self.pending.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}
