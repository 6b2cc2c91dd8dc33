//! zf-core: Shared types for the Zound playback runtime
//!
//! Foundation types used by every ZoundForge crate:
//! - Stable identifiers (`ZoundId`, `TagId`, `RouteId`, `ClipRef`)
//! - `ValueRange` for randomized volume/pitch
//! - Name normalization for case/punctuation-insensitive lookup
//! - `Envelope` keyframe curves

mod envelope;
mod error;

pub use envelope::*;
pub use error::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTIFIERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Stable zound identifier, unique across a library
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoundId(pub u32);

impl fmt::Display for ZoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "zound#{}", self.0)
    }
}

/// Tag identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TagId(pub u32);

/// Output route (mixer group) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteId(pub u32);

/// Reference to a playable waveform resource owned by the asset layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClipRef(pub String);

impl ClipRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUE RANGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Inclusive `[min, max]` range sampled once per playback instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f32,
    pub max: f32,
}

impl ValueRange {
    pub const UNIT: Self = Self { min: 1.0, max: 1.0 };

    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Fixed value (min == max)
    pub fn constant(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Midpoint, used for fixed-average previews
    #[inline]
    pub fn midpoint(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    /// Map a unit random value (0.0 - 1.0) into the range
    #[inline]
    pub fn lerp(&self, unit: f32) -> f32 {
        self.min + (self.max - self.min) * unit.clamp(0.0, 1.0)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    pub fn validate(&self, what: &'static str) -> ZfResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ZfError::InvalidRange {
                what,
                min: self.min,
                max: self.max,
            })
        }
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::UNIT
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAME NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Normalize a zound name for lookup
///
/// Lookup ignores case, whitespace and punctuation: `"Coin Pickup!"`,
/// `"coin_pickup"` and `"COIN-PICKUP"` all resolve to `"coinpickup"`.
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Coin Pickup!"), "coinpickup");
        assert_eq!(normalize_name("coin_pickup"), "coinpickup");
        assert_eq!(normalize_name("  COIN-PICKUP "), "coinpickup");
        assert_eq!(normalize_name("Reel_Stop 3"), "reelstop3");
        assert_eq!(normalize_name("..."), "");
    }

    #[test]
    fn test_value_range() {
        let range = ValueRange::new(0.5, 1.5);
        assert_eq!(range.midpoint(), 1.0);
        assert_eq!(range.lerp(0.0), 0.5);
        assert_eq!(range.lerp(1.0), 1.5);
        assert_eq!(range.lerp(7.0), 1.5);
        assert!(range.validate("volume").is_ok());

        let inverted = ValueRange::new(1.0, 0.0);
        assert!(!inverted.is_valid());
        assert!(inverted.validate("pitch").is_err());

        assert_eq!(ValueRange::constant(0.8).midpoint(), 0.8);
    }
}
