//! Token: one playing occurrence of a zound
//!
//! Owns its handler and voice plus the lifecycle state machine:
//!
//! ```text
//!            start()            fade_and_kill(d)          fade done
//!   Paused ───────────▶ Playing ─────────────────▶ FadingOut ─────────▶ Killed
//!     ▲  resume()/pause()  │                                              ▲
//!     └────────────────────┘           kill() from any state ─────────────┘
//! ```
//!
//! Transitions that involve children (composite tokens) are driven by the
//! engine, which applies the local transition here and propagates it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use zf_core::{TagId, ZoundId};

use crate::handler::Handler;
use crate::voice::Voice;
use crate::{ZoundError, ZoundResult};

/// Frames of slack when testing for the end of playback
pub const END_EPSILON_FRAMES: f32 = 2.0;

// ═══════════════════════════════════════════════════════════════════════════════
// IDS AND STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Public handle of a playing instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(pub u64);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TokenState {
    /// Created or paused (initial)
    #[default]
    Paused = 0,
    Playing = 1,
    /// Ramping to silence before Killed
    FadingOut = 2,
    /// Terminal
    Killed = 3,
}

impl TokenState {
    pub fn name(&self) -> &'static str {
        match self {
            TokenState::Paused => "Paused",
            TokenState::Playing => "Playing",
            TokenState::FadingOut => "FadingOut",
            TokenState::Killed => "Killed",
        }
    }

    /// Killed or on its way there
    #[inline]
    pub fn is_ending(&self) -> bool {
        matches!(self, TokenState::FadingOut | TokenState::Killed)
    }

    /// Receives per-frame updates
    #[inline]
    pub fn is_advancing(&self) -> bool {
        matches!(self, TokenState::Playing | TokenState::FadingOut)
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the handler asks the token to do after an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDisposition {
    Continue,
    NeedsKill,
    NeedsPause,
}

// ═══════════════════════════════════════════════════════════════════════════════
// FADE RAMP
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeTarget {
    In,
    OutThenKill,
    OutThenPause,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    target: FadeTarget,
    from: f32,
    duration: f32,
    elapsed: f32,
}

impl Fade {
    fn to(&self) -> f32 {
        match self.target {
            FadeTarget::In => 1.0,
            FadeTarget::OutThenKill | FadeTarget::OutThenPause => 0.0,
        }
    }

    fn fraction(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    fn gain(&self) -> f32 {
        let from = self.from;
        from + (self.to() - from) * self.fraction()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolved per-instance parameters
#[derive(Debug, Clone)]
pub(crate) struct TokenSetup {
    pub id: TokenId,
    pub zound_id: ZoundId,
    pub zound_name: String,
    pub tags: BTreeSet<TagId>,
    pub volume: f32,
    pub pitch: f32,
    pub chance: f32,
    pub delay: f32,
    pub duration_override: Option<f32>,
    pub parent: Option<TokenId>,
    pub ignore_cooldown: bool,
    pub solo_muted: bool,
    pub created_at: f64,
}

#[derive(Debug)]
pub struct Token {
    id: TokenId,
    zound_id: ZoundId,
    zound_name: String,
    tags: BTreeSet<TagId>,
    state: TokenState,
    pub(crate) handler: Handler,
    pub(crate) voice: Voice,
    /// Effective volume (sampled or overridden once)
    volume: f32,
    /// Effective pitch (sampled or overridden once)
    pitch: f32,
    /// Effective trigger chance
    chance: f32,
    delay: f32,
    delay_elapsed: f32,
    started: bool,
    /// Delay elapsed and handler started
    play_ready: bool,
    elapsed: f32,
    total_duration: f32,
    duration_override: Option<f32>,
    fade: Option<Fade>,
    fade_gain: f32,
    /// Inherited volume scaling from the parent zequence
    pub(crate) parent_volume: f32,
    /// Muted by the parent's solo/mute policy
    pub(crate) parent_muted: bool,
    /// Muted by the global solo set
    solo_muted: bool,
    parent: Option<TokenId>,
    ignore_cooldown: bool,
    created_at: f64,
    /// Cooldown checked once the delay elapsed
    gate_passed: bool,
}

impl Token {
    pub(crate) fn new(setup: TokenSetup, handler: Handler, voice: Voice) -> Self {
        Self {
            id: setup.id,
            zound_id: setup.zound_id,
            zound_name: setup.zound_name,
            tags: setup.tags,
            state: TokenState::Paused,
            handler,
            voice,
            volume: setup.volume,
            pitch: setup.pitch,
            chance: setup.chance,
            delay: setup.delay.max(0.0),
            delay_elapsed: 0.0,
            started: false,
            play_ready: false,
            elapsed: 0.0,
            total_duration: 0.0,
            duration_override: setup.duration_override,
            fade: None,
            fade_gain: 1.0,
            parent_volume: 1.0,
            parent_muted: false,
            solo_muted: setup.solo_muted,
            parent: setup.parent,
            ignore_cooldown: setup.ignore_cooldown,
            created_at: setup.created_at,
            gate_passed: false,
        }
    }

    // === Queries ===

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn zound_id(&self) -> ZoundId {
        self.zound_id
    }

    pub fn zound_name(&self) -> &str {
        &self.zound_name
    }

    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tags.contains(&tag)
    }

    pub fn state(&self) -> TokenState {
        self.state
    }

    pub fn is_killed(&self) -> bool {
        self.state == TokenState::Killed
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn chance(&self) -> f32 {
        self.chance
    }

    /// Delay before audible start (seconds)
    pub fn delay(&self) -> f32 {
        self.delay
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_play_ready(&self) -> bool {
        self.play_ready
    }

    /// Seconds since the delay elapsed
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn total_duration(&self) -> f32 {
        self.total_duration
    }

    /// Delay plus duration, as seen by a parent
    pub fn span(&self) -> f32 {
        self.delay + self.total_duration
    }

    pub fn fade_gain(&self) -> f32 {
        self.fade_gain
    }

    pub fn parent(&self) -> Option<TokenId> {
        self.parent
    }

    pub fn is_child(&self) -> bool {
        self.parent.is_some()
    }

    pub fn ignores_cooldown(&self) -> bool {
        self.ignore_cooldown
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn is_muted(&self) -> bool {
        self.parent_muted || self.solo_muted
    }

    /// Volume handed to children as their `parent_volume`
    pub fn inherited_volume(&self) -> f32 {
        self.parent_volume
    }

    /// Final voice gain before the global volume
    pub fn output_gain(&self) -> f32 {
        self.volume * self.parent_volume * self.fade_gain
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATE TRANSITIONS (local)
    // ═══════════════════════════════════════════════════════════════════════════

    fn invalid(&self, operation: &'static str) -> ZoundError {
        ZoundError::InvalidTokenOperation {
            token: self.id,
            operation,
            state: self.state,
        }
    }

    /// Paused → Playing and begin the delay countdown
    pub(crate) fn start(&mut self) -> ZoundResult<()> {
        if self.state.is_ending() {
            return Err(self.invalid("start"));
        }
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.state = TokenState::Playing;
        self.delay_elapsed = 0.0;
        Ok(())
    }

    pub(crate) fn pause(&mut self) -> ZoundResult<()> {
        if self.state.is_ending() {
            return Err(self.invalid("pause"));
        }
        if self.state == TokenState::Playing {
            self.state = TokenState::Paused;
            self.voice.pause();
        }
        Ok(())
    }

    pub(crate) fn resume(&mut self) -> ZoundResult<()> {
        if self.state.is_ending() || !self.started {
            return Err(self.invalid("resume"));
        }
        if self.state == TokenState::Paused {
            self.state = TokenState::Playing;
            self.voice.unpause();
            if self.fade.is_none() {
                self.fade_gain = 1.0;
            }
        }
        Ok(())
    }

    /// Immediate, idempotent
    pub(crate) fn kill(&mut self) {
        if self.state != TokenState::Killed {
            self.state = TokenState::Killed;
            self.fade = None;
            self.voice.stop();
        }
    }

    /// Linear fade to silence over `duration` of own time, then Killed
    pub(crate) fn fade_and_kill(&mut self, duration: f32) {
        if self.state.is_ending() {
            return;
        }
        if duration <= 0.0 {
            self.kill();
            return;
        }
        self.state = TokenState::FadingOut;
        self.fade = Some(Fade {
            target: FadeTarget::OutThenKill,
            from: self.fade_gain,
            duration,
            elapsed: 0.0,
        });
    }

    /// Ramp to silence, then pause
    pub(crate) fn pause_with_fade(&mut self, duration: f32) -> ZoundResult<()> {
        if self.state.is_ending() {
            return Err(self.invalid("pause"));
        }
        if self.state == TokenState::Paused {
            return Ok(());
        }
        if duration <= 0.0 {
            return self.pause();
        }
        self.fade = Some(Fade {
            target: FadeTarget::OutThenPause,
            from: self.fade_gain,
            duration,
            elapsed: 0.0,
        });
        Ok(())
    }

    /// Resume and ramp back to full gain
    pub(crate) fn resume_with_fade(&mut self, duration: f32) -> ZoundResult<()> {
        if self.state.is_ending() || !self.started {
            return Err(self.invalid("resume"));
        }
        let from = if self.state == TokenState::Paused {
            0.0
        } else {
            self.fade_gain
        };
        self.state = TokenState::Playing;
        self.voice.unpause();
        self.fade_in_from(from, duration);
        Ok(())
    }

    /// Ramp from silence at start
    pub(crate) fn fade_in(&mut self, duration: f32) {
        if duration > 0.0 && !self.state.is_ending() {
            self.fade_in_from(0.0, duration);
        }
    }

    fn fade_in_from(&mut self, from: f32, duration: f32) {
        if duration <= 0.0 {
            self.fade = None;
            self.fade_gain = 1.0;
            return;
        }
        self.fade_gain = from;
        self.fade = Some(Fade {
            target: FadeTarget::In,
            from,
            duration,
            elapsed: 0.0,
        });
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TIMELINE (driven by the handler pass)
    // ═══════════════════════════════════════════════════════════════════════════

    /// Advance the fade ramp; reports completion of out-ramps
    pub(crate) fn advance_fade(&mut self, dt: f32) -> UpdateDisposition {
        let Some(mut fade) = self.fade else {
            return UpdateDisposition::Continue;
        };
        // Fade-in starts with the audible part
        if fade.target == FadeTarget::In && !self.play_ready {
            return UpdateDisposition::Continue;
        }
        fade.elapsed += dt;
        self.fade_gain = fade.gain();

        if fade.fraction() < 1.0 {
            self.fade = Some(fade);
            return UpdateDisposition::Continue;
        }

        self.fade = None;
        match fade.target {
            FadeTarget::In => UpdateDisposition::Continue,
            FadeTarget::OutThenKill => UpdateDisposition::NeedsKill,
            FadeTarget::OutThenPause => UpdateDisposition::NeedsPause,
        }
    }

    /// Count down the delay; true once it has elapsed
    pub(crate) fn advance_delay(&mut self, dt: f32) -> bool {
        self.delay_elapsed += dt;
        self.delay_elapsed >= self.delay
    }

    pub(crate) fn delay_elapsed(&self) -> bool {
        self.delay_elapsed >= self.delay
    }

    pub(crate) fn gate_passed(&self) -> bool {
        self.gate_passed
    }

    pub(crate) fn pass_gate(&mut self) {
        self.gate_passed = true;
    }

    pub(crate) fn mark_play_ready(&mut self) {
        self.play_ready = true;
        self.elapsed = 0.0;
    }

    pub(crate) fn advance_elapsed(&mut self, dt: f32) {
        self.elapsed += dt;
    }

    /// Elapsed time reached the total, with two frames of slack
    pub(crate) fn reached_end(&self, dt: f32) -> bool {
        self.elapsed + END_EPSILON_FRAMES * dt >= self.total_duration
    }

    /// Set the handler-computed duration; an explicit override wins
    pub(crate) fn set_prepared_duration(&mut self, duration: f32) {
        self.total_duration = self.duration_override.unwrap_or(duration.max(0.0));
    }

    /// Grow the duration to cover a late child
    pub(crate) fn extend_duration(&mut self, duration: f32) {
        if self.duration_override.is_none() && duration > self.total_duration {
            self.total_duration = duration;
        }
    }

    /// Push gain/mute/pitch to the voice
    pub(crate) fn sync_voice(&mut self, global_volume: f32) {
        let gain = self.output_gain() * global_volume;
        let muted = self.is_muted();
        let pitch = self.pitch;
        self.voice.set_gain(gain);
        self.voice.set_muted(muted);
        self.voice.set_pitch(pitch);
    }

    /// Take the voice back out for the pool
    pub(crate) fn into_voice(self) -> Voice {
        self.voice
    }
}

/// "New token created" notification
#[derive(Debug, Clone, PartialEq)]
pub struct TokenCreated {
    pub token: TokenId,
    pub zound: ZoundId,
    pub parent: Option<TokenId>,
    pub created_at: f64,
}
