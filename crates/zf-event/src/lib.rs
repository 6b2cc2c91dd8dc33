//! ZoundForge Playback Runtime
//!
//! Runtime half of the Zound audio middleware:
//! - Zound graph (Klip, Music, Zequence, Randomizer) with name lookup
//! - Tokens: one state machine per playing instance
//! - Composite scheduling (Parallel, Randomizer, RoundRobin, Playlist)
//! - Per-zound concurrency culling and cooldown
//! - Pooled voices handed to the renderer
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     PLAYBACK RUNTIME                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                   │
//! │  Game / Editor                 ZoundEngine                        │
//! │  ┌────────────────┐            ┌──────────────────────────────┐   │
//! │  │ play()         │───────────▶│ cooldown ─▶ chance ─▶ token  │   │
//! │  │ play_by_name() │            │ culling groups (LRU)         │   │
//! │  │ tick(dt)       │───────────▶│ advance tokens, retire dead  │   │
//! │  └────────────────┘            └──────────────┬───────────────┘   │
//! │                                               │                   │
//! │  ┌──────────────┐   read / cursor write       ▼                   │
//! │  │ ZoundLibrary │◀─────────────────── Token ── Handler            │
//! │  │ (RwLock)     │                       │       ├── Klip ─▶ Voice │
//! │  └──────────────┘                       │       └── Zequence      │
//! │                                         │            └─▶ children │
//! │  ResourceProvider ◀── "clip ready?" ────┘                         │
//! │                                                                   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zf_event::{EngineConfig, PlayArgs, ResourceTable, Zound, ZoundEngine, ZoundLibrary};
//!
//! let mut library = ZoundLibrary::new();
//! library.insert(Zound::klip(1, "Coin Pickup", "sfx/coin.wav"))?;
//!
//! let resources = ResourceTable::new();
//! resources.set_ready("sfx/coin.wav", 0.8);
//!
//! let mut engine = ZoundEngine::new(EngineConfig::default(), library.into_shared(), resources);
//! let token = engine.play_by_name("coin_pickup", PlayArgs::new());
//!
//! // Once per frame
//! engine.tick(1.0 / 60.0);
//! ```

#![allow(clippy::new_without_default)]

pub mod args;
pub mod config;
pub mod culling;
pub mod diagnostic;
pub mod engine;
pub mod handler;
pub mod library;
pub mod missing;
pub mod resource;
pub mod token;
pub mod voice;
pub mod zound;

// Re-exports
pub use args::{EntryRef, PlayArgs};
pub use config::{EngineConfig, PlaybackContext};
pub use culling::CullingController;
pub use diagnostic::PlaybackDiagnostic;
pub use engine::ZoundEngine;
pub use handler::{ChildSlot, Handler, KlipHandler, ZequenceHandler};
pub use library::{SharedLibrary, ZoundLibrary};
pub use missing::MissingZoundRegistry;
pub use resource::{ClipInfo, ResourceProvider, ResourceStatus, ResourceTable};
pub use token::{Token, TokenCreated, TokenId, TokenState, UpdateDisposition};
pub use voice::{Voice, VoiceId, VoicePool, VoicePoolStats};
pub use zound::{Klip, PlayMode, Zequence, ZequenceEntry, Zound, ZoundKind};

pub use zf_core::{ClipRef, Envelope, EnvelopePoint, RouteId, TagId, ValueRange, ZoundId};

use thiserror::Error;
use zf_core::ZfError;

/// Playback errors
#[derive(Error, Debug)]
pub enum ZoundError {
    #[error("Zound not found: {0}")]
    ZoundNotFound(String),

    #[error("Unknown zound: {0}")]
    UnknownZound(ZoundId),

    #[error("Token not found: {0}")]
    TokenNotFound(TokenId),

    #[error("Cannot {operation} {token} while {state}")]
    InvalidTokenOperation {
        token: TokenId,
        operation: &'static str,
        state: TokenState,
    },

    #[error(transparent)]
    Core(#[from] ZfError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ZoundResult<T> = Result<T, ZoundError>;
