//! Servo gauge state and the geometry used to draw it.

use crate::decode::MAX_ANGLE;

/// Width of one highlighted arc segment, in degrees.
pub const SEGMENT_DEGREES: u8 = 5;

/// Number of arc segments covering 0-180 degrees.
pub const SEGMENT_COUNT: usize = (MAX_ANGLE / SEGMENT_DEGREES) as usize;

/// Current servo angle. Only the latest value is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GaugeState {
    current_angle: u8,
}

impl GaugeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `angle`, clamped to 0-180.
    pub fn set(&mut self, angle: u8) {
        self.current_angle = angle.min(MAX_ANGLE);
    }

    pub fn angle(&self) -> u8 {
        self.current_angle
    }

    /// Index of the 5 degree segment containing the current angle.
    ///
    /// 180 falls on the outer edge of the last segment.
    pub fn segment(&self) -> usize {
        ((self.current_angle / SEGMENT_DEGREES) as usize).min(SEGMENT_COUNT - 1)
    }
}

/// RGB colour with channels in 0.0-1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaugeColor {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl GaugeColor {
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let channel = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (channel(self.r), channel(self.g), channel(self.b))
    }
}

/// Blue at 0, green at 45, yellow at 90, orange at 135, red at 180.
pub fn angle_color(angle: f64) -> GaugeColor {
    let t = (angle / MAX_ANGLE as f64).clamp(0.0, 1.0);
    let (r, g, b) = if t <= 0.25 {
        let k = t * 4.0;
        (0.0, k, 1.0 - k)
    } else if t <= 0.5 {
        let k = (t - 0.25) * 4.0;
        (k, 1.0, 0.0)
    } else if t <= 0.75 {
        let k = (t - 0.5) * 4.0;
        (1.0, 1.0 - k * 0.5, 0.0)
    } else {
        let k = (t - 0.75) * 4.0;
        (1.0, 0.5 - k * 0.5, 0.0)
    };
    GaugeColor { r, g, b }
}

/// Point at `radius` from the gauge centre along `angle` degrees
/// (0 points right, 90 straight up).
pub fn polar_point(angle: f64, radius: f64) -> (f64, f64) {
    let rad = angle.to_radians();
    (radius * rad.cos(), radius * rad.sin())
}
