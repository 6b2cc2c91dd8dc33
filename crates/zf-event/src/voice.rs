//! Voice Pool
//!
//! A voice is one output channel as seen by the renderer: which clip it
//! plays, at what gain/pitch, whether it is muted or paused and where it is
//! routed. Tokens own their voice while alive and hand it back on cleanup.
//! The pool never refuses a request; it grows instead.

use zf_core::{ClipRef, RouteId};

/// Voice identifier (stable for the voice's lifetime)
pub type VoiceId = u32;

/// Output channel state
#[derive(Debug, Clone, PartialEq)]
pub struct Voice {
    id: VoiceId,
    /// Clip currently bound (None = idle)
    clip: Option<ClipRef>,
    /// Playback start offset into the clip (seconds)
    start_offset: f32,
    playing: bool,
    paused: bool,
    muted: bool,
    route: Option<RouteId>,
    /// Final linear gain written every tick
    gain: f32,
    /// Playback rate multiplier
    pitch: f32,
}

impl Voice {
    fn new(id: VoiceId) -> Self {
        Self {
            id,
            clip: None,
            start_offset: 0.0,
            playing: false,
            paused: false,
            muted: false,
            route: None,
            gain: 1.0,
            pitch: 1.0,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    pub fn clip(&self) -> Option<&ClipRef> {
        self.clip.as_ref()
    }

    pub fn start_offset(&self) -> f32 {
        self.start_offset
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn route(&self) -> Option<RouteId> {
        self.route
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Bind a clip and start playback from `offset`
    pub fn play(&mut self, clip: ClipRef, offset: f32) {
        self.clip = Some(clip);
        self.start_offset = offset.max(0.0);
        self.playing = true;
        self.paused = false;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.paused = false;
        self.gain = 0.0;
    }

    pub fn pause(&mut self) {
        if self.playing {
            self.paused = true;
        }
    }

    pub fn unpause(&mut self) {
        self.paused = false;
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.max(0.0);
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_route(&mut self, route: Option<RouteId>) {
        self.route = route;
    }

    /// Clear mute/route/playback state before reuse
    fn reset(&mut self) {
        let id = self.id;
        *self = Self::new(id);
    }
}

/// Pool statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoicePoolStats {
    /// Voices waiting for reuse
    pub idle_count: usize,
    /// Voices ever constructed
    pub created_count: usize,
    /// Voices currently handed out
    pub in_use_count: usize,
}

/// Free-list of reusable voices
#[derive(Debug, Default)]
pub struct VoicePool {
    idle: Vec<Voice>,
    next_id: VoiceId,
    created: usize,
    in_use: usize,
}

impl VoicePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-construct voices to avoid growth during play
    pub fn with_capacity(count: usize) -> Self {
        let mut pool = Self::new();
        for _ in 0..count {
            let voice = pool.construct();
            pool.idle.push(voice);
        }
        pool
    }

    /// Pop an idle voice (reset) or construct a new one
    pub fn request(&mut self) -> Voice {
        let voice = match self.idle.pop() {
            Some(mut voice) => {
                voice.reset();
                voice
            }
            None => self.construct(),
        };
        self.in_use += 1;
        voice
    }

    /// Hand a voice back for reuse
    pub fn release(&mut self, mut voice: Voice) {
        voice.stop();
        self.in_use = self.in_use.saturating_sub(1);
        self.idle.push(voice);
    }

    /// Stop every pooled voice; with `cleanup` destroy them instead
    pub fn stop_all(&mut self, cleanup: bool) {
        if cleanup {
            log::debug!("Destroying {} pooled voices", self.idle.len());
            self.idle.clear();
        } else {
            for voice in &mut self.idle {
                voice.stop();
            }
        }
    }

    pub fn stats(&self) -> VoicePoolStats {
        VoicePoolStats {
            idle_count: self.idle.len(),
            created_count: self.created,
            in_use_count: self.in_use,
        }
    }

    fn construct(&mut self) -> Voice {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        self.created += 1;
        Voice::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_constructs_when_empty() {
        let mut pool = VoicePool::new();
        let a = pool.request();
        let b = pool.request();
        assert_ne!(a.id(), b.id());

        let stats = pool.stats();
        assert_eq!(stats.created_count, 2);
        assert_eq!(stats.in_use_count, 2);
        assert_eq!(stats.idle_count, 0);
    }

    #[test]
    fn test_release_and_reuse_resets_state() {
        let mut pool = VoicePool::new();
        let mut voice = pool.request();
        let id = voice.id();
        voice.play(ClipRef::new("a"), 0.5);
        voice.set_muted(true);
        voice.set_route(Some(RouteId(4)));
        pool.release(voice);

        let reused = pool.request();
        assert_eq!(reused.id(), id);
        assert!(!reused.is_muted());
        assert!(!reused.is_playing());
        assert_eq!(reused.route(), None);
        assert_eq!(reused.clip(), None);
        assert_eq!(pool.stats().created_count, 1);
    }

    #[test]
    fn test_stop_all_cleanup_destroys_idle() {
        let mut pool = VoicePool::with_capacity(4);
        assert_eq!(pool.stats().idle_count, 4);

        pool.stop_all(false);
        assert_eq!(pool.stats().idle_count, 4);

        pool.stop_all(true);
        assert_eq!(pool.stats().idle_count, 0);

        let voice = pool.request();
        assert_eq!(voice.id(), 4);
    }

    #[test]
    fn test_pause_only_when_playing() {
        let mut pool = VoicePool::new();
        let mut voice = pool.request();
        voice.pause();
        assert!(!voice.is_paused());

        voice.play(ClipRef::new("a"), 0.0);
        voice.pause();
        assert!(voice.is_paused());
        voice.unpause();
        assert!(!voice.is_paused());
    }
}
