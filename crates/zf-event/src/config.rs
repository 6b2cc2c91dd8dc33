//! Engine configuration
//!
//! Project-level playback settings. Every field has a serde default so a
//! partial JSON document is a valid configuration.

use serde::{Deserialize, Serialize};
use zf_core::ZfError;

use crate::ZoundResult;

/// Which global volume applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackContext {
    /// In-game playback
    #[default]
    Runtime,
    /// Editor auditioning
    Preview,
}

/// Playback settings for one engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Concurrent instances per zound (0 = unlimited)
    #[serde(default = "default_max_instances")]
    pub max_played_zound_instances: usize,
    /// Minimum time between triggers of the same zound (seconds)
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: f32,
    /// Fade applied to the oldest instance when the cap is hit (seconds)
    #[serde(default = "default_culling_fade")]
    pub culling_fade_secs: f32,
    /// Global volume in the Runtime context
    #[serde(default = "default_volume")]
    pub runtime_volume: f32,
    /// Global volume in the Preview context
    #[serde(default = "default_volume")]
    pub preview_volume: f32,
    /// Lifetime of a missing-zound registry entry (seconds)
    #[serde(default = "default_missing_expiry")]
    pub missing_zound_expiry_secs: f32,
    /// Fixed RNG seed (OS entropy when absent)
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

fn default_max_instances() -> usize {
    8
}
fn default_cooldown() -> f32 {
    0.05
}
fn default_culling_fade() -> f32 {
    0.1
}
fn default_volume() -> f32 {
    1.0
}
fn default_missing_expiry() -> f32 {
    10.0
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_played_zound_instances: default_max_instances(),
            cooldown_secs: default_cooldown(),
            culling_fade_secs: default_culling_fade(),
            runtime_volume: default_volume(),
            preview_volume: default_volume(),
            missing_zound_expiry_secs: default_missing_expiry(),
            rng_seed: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> ZoundResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> ZoundResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    pub fn with_cooldown(mut self, cooldown_secs: f32) -> Self {
        self.cooldown_secs = cooldown_secs;
        self
    }

    pub fn with_max_instances(mut self, max: usize) -> Self {
        self.max_played_zound_instances = max;
        self
    }

    pub fn validate(&self) -> Result<(), ZfError> {
        let non_negative = [
            ("cooldown_secs", self.cooldown_secs),
            ("culling_fade_secs", self.culling_fade_secs),
            ("runtime_volume", self.runtime_volume),
            ("preview_volume", self.preview_volume),
            ("missing_zound_expiry_secs", self.missing_zound_expiry_secs),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ZfError::InvalidParam(format!("{name} must be >= 0, got {value}")));
            }
        }
        Ok(())
    }

    /// Global volume for a context
    #[inline]
    pub fn volume_for(&self, context: PlaybackContext) -> f32 {
        match context {
            PlaybackContext::Runtime => self.runtime_volume,
            PlaybackContext::Preview => self.preview_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json(r#"{ "cooldown_secs": 0.25, "rng_seed": 7 }"#).unwrap();
        assert_eq!(config.cooldown_secs, 0.25);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.max_played_zound_instances, 8);
        assert_eq!(config.culling_fade_secs, 0.1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(EngineConfig::from_json(r#"{ "runtime_volume": -1.0 }"#).is_err());
        assert!(EngineConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default().with_seed(42).with_max_instances(3);
        let json = config.to_json().unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(parsed.max_played_zound_instances, 3);
        assert_eq!(parsed.rng_seed, Some(42));
    }

    #[test]
    fn test_volume_for_context() {
        let config = EngineConfig {
            runtime_volume: 0.8,
            preview_volume: 0.5,
            ..Default::default()
        };
        assert_eq!(config.volume_for(PlaybackContext::Runtime), 0.8);
        assert_eq!(config.volume_for(PlaybackContext::Preview), 0.5);
    }
}
