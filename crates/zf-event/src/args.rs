//! Play request arguments

use zf_core::ZoundId;

use crate::token::TokenId;

/// One entry of one zequence, for auditioning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    pub zequence: ZoundId,
    pub entry: usize,
}

/// Per-request overrides and flags
#[derive(Debug, Clone)]
pub struct PlayArgs {
    /// Replaces the sampled volume
    pub volume: Option<f32>,
    /// Replaces the sampled pitch
    pub pitch: Option<f32>,
    /// Replaces the zound's chance
    pub chance: Option<f32>,
    /// Delay before audible start (seconds)
    pub delay_secs: f32,
    /// Replaces the computed duration
    pub duration_override: Option<f32>,
    /// Ramp in from silence once audible (seconds, 0 = none)
    pub fade_in_secs: f32,
    pub start_immediately: bool,
    pub ignore_cooldown: bool,
    /// Use range midpoints instead of random samples (previews)
    pub use_average_values: bool,
    /// Skip the global solo mute
    pub bypass_global_solo: bool,
    /// Force one entry of a zequence in the subtree
    pub audition: Option<EntryRef>,
    /// Name tried once when a name lookup fails
    pub fallback: Option<String>,
    /// Owning composite token
    pub(crate) parent: Option<TokenId>,
}

impl Default for PlayArgs {
    fn default() -> Self {
        Self {
            volume: None,
            pitch: None,
            chance: None,
            delay_secs: 0.0,
            duration_override: None,
            fade_in_secs: 0.0,
            start_immediately: true,
            ignore_cooldown: false,
            use_average_values: false,
            bypass_global_solo: false,
            audition: None,
            fallback: None,
            parent: None,
        }
    }
}

impl PlayArgs {
    pub fn new() -> Self {
        Self::default()
    }

    // === Builder methods ===

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = Some(pitch);
        self
    }

    pub fn with_chance(mut self, chance: f32) -> Self {
        self.chance = Some(chance);
        self
    }

    pub fn with_delay(mut self, delay_secs: f32) -> Self {
        self.delay_secs = delay_secs.max(0.0);
        self
    }

    pub fn with_duration(mut self, duration_secs: f32) -> Self {
        self.duration_override = Some(duration_secs.max(0.0));
        self
    }

    pub fn with_fade_in(mut self, fade_in_secs: f32) -> Self {
        self.fade_in_secs = fade_in_secs.max(0.0);
        self
    }

    /// Create paused; call `ZoundEngine::start` later
    pub fn paused(mut self) -> Self {
        self.start_immediately = false;
        self
    }

    pub fn ignoring_cooldown(mut self) -> Self {
        self.ignore_cooldown = true;
        self
    }

    pub fn with_average_values(mut self) -> Self {
        self.use_average_values = true;
        self
    }

    pub fn bypassing_solo(mut self) -> Self {
        self.bypass_global_solo = true;
        self
    }

    pub fn with_audition(mut self, zequence: ZoundId, entry: usize) -> Self {
        self.audition = Some(EntryRef { zequence, entry });
        self
    }

    pub fn with_fallback(mut self, name: impl Into<String>) -> Self {
        self.fallback = Some(name.into());
        self
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }
}
