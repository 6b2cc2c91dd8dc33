//! Envelope: keyframe curve over normalized time
//!
//! Shared by volume and pitch automation. Evaluation finds the segment
//! containing `t` and shapes the interpolation with the segment's exponent:
//!
//! ```text
//! value = lerp(v0, v1, pow((t - t0) / (t1 - t0), exponent))
//! ```
//!
//! The exponent stored on a segment's END point shapes that segment.
//! Evaluation outside the domain clamps to the nearest edge value.

use serde::{Deserialize, Serialize};

/// Smallest exponent accepted; keeps `pow(0, e) == 0` so evaluation at a
/// point's own time returns that point's value exactly.
const MIN_EXPONENT: f32 = 1.0e-4;

/// Single keyframe
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopePoint {
    pub time: f32,
    pub value: f32,
    /// Shape of the segment ending at this point (1.0 = linear)
    pub exponent: f32,
}

impl EnvelopePoint {
    pub fn new(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            exponent: 1.0,
        }
    }

    pub fn with_exponent(mut self, exponent: f32) -> Self {
        self.exponent = exponent.max(MIN_EXPONENT);
        self
    }
}

/// Keyframe curve, always holding at least the point at `x_min`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    points: Vec<EnvelopePoint>,
    pub x_min: f32,
    pub x_max: f32,
    pub y_min: f32,
    pub y_max: f32,
    /// Keep a terminal point pinned to `x_max`
    pub pin_terminal: bool,
}

impl Envelope {
    /// Create a flat envelope at `y_max` over `[x_min, x_max]`
    pub fn new(x_min: f32, x_max: f32, y_min: f32, y_max: f32, pin_terminal: bool) -> Self {
        let mut points = vec![EnvelopePoint::new(x_min, y_max)];
        if pin_terminal && x_max > x_min {
            points.push(EnvelopePoint::new(x_max, y_max));
        }
        Self {
            points,
            x_min,
            x_max,
            y_min,
            y_max,
            pin_terminal,
        }
    }

    /// Normalized-time gain envelope: domain and range `[0, 1]`, flat at 1.0
    pub fn unit() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0, true)
    }

    /// Build from explicit points (sorted by time, clamped into the domain)
    pub fn from_points(
        x_min: f32,
        x_max: f32,
        y_min: f32,
        y_max: f32,
        pin_terminal: bool,
        points: impl IntoIterator<Item = EnvelopePoint>,
    ) -> Self {
        let mut envelope = Self::new(x_min, x_max, y_min, y_max, pin_terminal);
        let mut points: Vec<_> = points.into_iter().collect();
        points.sort_by(|a, b| a.time.total_cmp(&b.time));

        for point in points {
            if point.time <= x_min {
                envelope.points[0].value = point.value.clamp(y_min, y_max);
            } else if pin_terminal && point.time >= x_max {
                if let Some(last) = envelope.points.last_mut() {
                    last.value = point.value.clamp(y_min, y_max);
                    last.exponent = point.exponent.max(MIN_EXPONENT);
                }
            } else {
                let index = envelope.add_point(point.time, point.value);
                envelope.points[index].exponent = point.exponent.max(MIN_EXPONENT);
            }
        }
        envelope
    }

    pub fn points(&self) -> &[EnvelopePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Evaluate the curve at `t`
    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return self.y_max,
        };
        if self.points.len() == 1 || t <= first.time {
            return first.value;
        }

        // First point strictly after t; p[i-1].time <= t < p[i].time
        let Some(i) = self.points.iter().position(|p| p.time > t) else {
            return last.value;
        };

        let p0 = self.points[i - 1];
        let p1 = self.points[i];
        let span = p1.time - p0.time;
        if span <= 0.0 {
            return p1.value;
        }

        let normalized = ((t - p0.time) / span).clamp(0.0, 1.0);
        let shaped = normalized.powf(p1.exponent.max(MIN_EXPONENT));
        p0.value + (p1.value - p0.value) * shaped
    }

    /// Insert a point preserving time order, returns its index
    ///
    /// The first point stays first and a pinned terminal point stays last.
    pub fn add_point(&mut self, time: f32, value: f32) -> usize {
        let time = time.clamp(self.x_min, self.x_max);
        let value = value.clamp(self.y_min, self.y_max);

        let mut index = self
            .points
            .iter()
            .position(|p| p.time > time)
            .unwrap_or(self.points.len())
            .max(1);
        if self.pin_terminal && self.points.len() > 1 {
            index = index.min(self.points.len() - 1);
        }

        self.points.insert(index, EnvelopePoint::new(time, value));
        index
    }

    /// Remove a point; silently refuses the first point and a pinned terminal
    pub fn remove_point(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.points.len() {
            return false;
        }
        if self.pin_terminal && index == self.points.len() - 1 {
            return false;
        }
        self.points.remove(index);
        true
    }

    /// Change a point's value (clamped to the range)
    pub fn set_value(&mut self, index: usize, value: f32) {
        let (y_min, y_max) = (self.y_min, self.y_max);
        if let Some(point) = self.points.get_mut(index) {
            point.value = value.clamp(y_min, y_max);
        }
    }

    /// Change the shape of the segment ending at `index`
    pub fn set_exponent(&mut self, index: usize, exponent: f32) {
        if let Some(point) = self.points.get_mut(index) {
            point.exponent = exponent.max(MIN_EXPONENT);
        }
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::unit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Envelope {
        let mut env = Envelope::new(0.0, 1.0, 0.0, 1.0, true);
        env.set_value(0, 0.0);
        env
    }

    #[test]
    fn test_new_envelope_has_edge_points() {
        let env = Envelope::unit();
        assert_eq!(env.len(), 2);
        assert_eq!(env.points()[0].time, 0.0);
        assert_eq!(env.points()[1].time, 1.0);

        let open = Envelope::new(0.0, 4.0, 0.0, 2.0, false);
        assert_eq!(open.len(), 1);
        assert_eq!(open.evaluate(3.0), 2.0);
    }

    #[test]
    fn test_evaluate_at_x_min_returns_first_value() {
        let mut env = ramp();
        env.add_point(0.3, 0.9);
        assert_eq!(env.evaluate(0.0), env.points()[0].value);
        assert_eq!(env.evaluate(-5.0), 0.0);
        assert_eq!(env.evaluate(5.0), 1.0);
    }

    #[test]
    fn test_evaluate_exact_point_times() {
        let mut env = ramp();
        env.add_point(0.25, 0.8);
        env.add_point(0.6, 0.1);
        env.set_exponent(2, 3.0);

        for point in env.points().to_vec() {
            assert_eq!(env.evaluate(point.time), point.value);
        }
    }

    #[test]
    fn test_linear_segment_is_monotonic() {
        let env = ramp();
        let mut prev = env.evaluate(0.0);
        for i in 1..=100 {
            let value = env.evaluate(i as f32 / 100.0);
            assert!(value >= prev);
            prev = value;
        }
        assert!((env.evaluate(0.5) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_exponent_shapes_segment() {
        let mut env = ramp();
        env.set_exponent(1, 2.0);
        // lerp(0, 1, 0.5^2)
        assert!((env.evaluate(0.5) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_add_point_keeps_order_and_terminal() {
        let mut env = Envelope::unit();
        env.add_point(0.7, 0.2);
        env.add_point(0.2, 0.5);
        let index = env.add_point(1.0, 0.3);

        let times: Vec<f32> = env.points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 0.2, 0.7, 1.0, 1.0]);
        assert_eq!(index, 3);
        assert_eq!(env.points().last().map(|p| p.value), Some(1.0));

        // Clamped into domain and range
        let index = env.add_point(-3.0, 9.0);
        assert_eq!(index, 1);
        assert_eq!(env.points()[1].time, 0.0);
        assert_eq!(env.points()[1].value, 1.0);
    }

    #[test]
    fn test_remove_point_refusals() {
        let mut env = Envelope::unit();
        env.add_point(0.5, 0.5);

        assert!(!env.remove_point(0));
        assert!(!env.remove_point(2));
        assert!(!env.remove_point(10));
        assert!(env.remove_point(1));
        assert_eq!(env.len(), 2);

        let mut open = Envelope::new(0.0, 1.0, 0.0, 1.0, false);
        open.add_point(1.0, 0.0);
        assert!(open.remove_point(1));
        assert_eq!(open.len(), 1);
    }

    #[test]
    fn test_from_points() {
        let env = Envelope::from_points(
            0.0,
            1.0,
            0.0,
            1.0,
            true,
            [
                EnvelopePoint::new(1.0, 0.0),
                EnvelopePoint::new(0.0, 1.0),
                EnvelopePoint::new(0.5, 0.4).with_exponent(2.0),
            ],
        );
        assert_eq!(env.len(), 3);
        assert_eq!(env.evaluate(0.0), 1.0);
        assert_eq!(env.evaluate(0.5), 0.4);
        assert_eq!(env.evaluate(1.0), 0.0);
        assert_eq!(env.points()[1].exponent, 2.0);
    }

    #[test]
    fn test_empty_envelope_is_constant() {
        let env: Envelope = serde_json::from_str(
            r#"{"points":[],"x_min":0.0,"x_max":1.0,"y_min":0.0,"y_max":1.0,"pin_terminal":false}"#,
        )
        .unwrap();
        assert!(env.is_empty());
        assert_eq!(env.evaluate(0.4), 1.0);
    }
}
