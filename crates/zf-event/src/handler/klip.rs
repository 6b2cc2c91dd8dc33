//! Clip handler
//!
//! Plays a single trimmed clip. Duration is the trimmed length divided by
//! the instance pitch; it stays provisional while the resource is loading.

use zf_core::ClipRef;

use super::MIN_PITCH;
use crate::resource::{ResourceProvider, ResourceStatus};
use crate::voice::Voice;
use crate::zound::Klip;

/// Result of trying to start the voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KlipStart {
    /// Voice playing; trimmed length in source seconds
    Started { length_secs: f32 },
    /// Resource still loading, poll again next tick
    Waiting,
    /// Resource cannot be resolved, plays as zero-length silence
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct KlipHandler {
    clip: ClipRef,
    trim_start: f32,
    trim_end: Option<f32>,
    /// Trimmed length once the resource was resolved
    length: Option<f32>,
    awaiting: bool,
}

impl KlipHandler {
    pub fn new(clip: ClipRef, trim_start: f32, trim_end: Option<f32>) -> Self {
        Self {
            clip,
            trim_start: trim_start.max(0.0),
            trim_end,
            length: None,
            awaiting: false,
        }
    }

    /// Handler for an authored clip; a baked alternate plays untrimmed
    pub fn from_klip(klip: &Klip) -> Self {
        match &klip.rendered {
            Some(rendered) => Self::new(rendered.clone(), 0.0, None),
            None => Self::new(klip.clip.clone(), klip.trim_start, klip.trim_end),
        }
    }

    pub fn clip(&self) -> &ClipRef {
        &self.clip
    }

    pub fn trim_start(&self) -> f32 {
        self.trim_start
    }

    /// Trimmed source length, once known
    pub fn playable_length(&self) -> Option<f32> {
        self.length
    }

    pub fn is_awaiting(&self) -> bool {
        self.awaiting
    }

    fn trimmed(&self, source_length: f32) -> f32 {
        let end = self
            .trim_end
            .map_or(source_length, |end| end.min(source_length));
        (end - self.trim_start).max(0.0)
    }

    /// Duration in instance time (provisional while loading)
    pub fn prepare_duration(&mut self, resources: &dyn ResourceProvider, pitch: f32) -> f32 {
        let length = match resources.status(&self.clip) {
            ResourceStatus::Ready(info) => {
                let length = self.trimmed(info.length_secs);
                self.length = Some(length);
                length
            }
            ResourceStatus::Loading => self
                .trim_end
                .map_or(0.0, |end| (end - self.trim_start).max(0.0)),
            ResourceStatus::Unavailable => 0.0,
        };
        length / pitch.max(MIN_PITCH)
    }

    /// Bind the clip to the voice if the resource is ready
    pub fn try_start(&mut self, voice: &mut Voice, resources: &dyn ResourceProvider) -> KlipStart {
        match resources.status(&self.clip) {
            ResourceStatus::Ready(info) => {
                let length_secs = self.trimmed(info.length_secs);
                self.length = Some(length_secs);
                self.awaiting = false;
                voice.play(self.clip.clone(), self.trim_start);
                KlipStart::Started { length_secs }
            }
            ResourceStatus::Loading => {
                self.awaiting = true;
                KlipStart::Waiting
            }
            ResourceStatus::Unavailable => {
                self.awaiting = false;
                self.length = Some(0.0);
                KlipStart::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceTable;
    use crate::voice::VoicePool;

    #[test]
    fn test_duration_uses_trim_and_pitch() {
        let resources = ResourceTable::new();
        resources.set_ready("a", 4.0);

        let mut handler = KlipHandler::new(ClipRef::new("a"), 1.0, Some(3.0));
        assert!((handler.prepare_duration(&resources, 2.0) - 1.0).abs() < 1e-6);
        assert_eq!(handler.playable_length(), Some(2.0));

        let mut untrimmed = KlipHandler::new(ClipRef::new("a"), 0.5, None);
        assert!((untrimmed.prepare_duration(&resources, 1.0) - 3.5).abs() < 1e-6);

        // Trim end past the source clamps to the source
        let mut long = KlipHandler::new(ClipRef::new("a"), 0.0, Some(10.0));
        assert!((long.prepare_duration(&resources, 1.0) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_loading_is_provisional() {
        let resources = ResourceTable::new();
        resources.set_loading("a");

        let mut handler = KlipHandler::new(ClipRef::new("a"), 0.0, None);
        assert_eq!(handler.prepare_duration(&resources, 1.0), 0.0);

        let mut trimmed = KlipHandler::new(ClipRef::new("a"), 0.5, Some(2.5));
        assert_eq!(trimmed.prepare_duration(&resources, 1.0), 2.0);
    }

    #[test]
    fn test_try_start_follows_resource() {
        let resources = ResourceTable::new();
        resources.set_loading("a");
        let mut pool = VoicePool::new();
        let mut voice = pool.request();

        let mut handler = KlipHandler::new(ClipRef::new("a"), 0.25, None);
        assert_eq!(handler.try_start(&mut voice, &resources), KlipStart::Waiting);
        assert!(handler.is_awaiting());
        assert!(!voice.is_playing());

        resources.set_ready("a", 1.25);
        assert_eq!(
            handler.try_start(&mut voice, &resources),
            KlipStart::Started { length_secs: 1.0 }
        );
        assert!(voice.is_playing());
        assert_eq!(voice.start_offset(), 0.25);

        resources.set_unavailable("a");
        let mut missing = KlipHandler::new(ClipRef::new("a"), 0.0, None);
        assert_eq!(missing.try_start(&mut voice, &resources), KlipStart::Unavailable);
        assert_eq!(missing.playable_length(), Some(0.0));
    }

    #[test]
    fn test_rendered_alternate_plays_untrimmed() {
        let klip = Klip::new(ClipRef::new("raw"))
            .with_trim(1.0, Some(2.0))
            .with_rendered(ClipRef::new("baked"));
        let handler = KlipHandler::from_klip(&klip);
        assert_eq!(handler.clip().as_str(), "baked");
        assert_eq!(handler.trim_start(), 0.0);
    }
}
