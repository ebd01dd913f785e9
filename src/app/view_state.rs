//! Pan and zoom.
//!
//! `screen = world * scale + pan`. Every mutation clamps the scale to
//! [`MIN_SCALE`, `MAX_SCALE`].

use crate::layout::{Point, Rect};

use super::animation::{ease_in_out_cubic, progress};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;
/// Additive scale change per wheel notch or zoom key.
pub const ZOOM_STEP: f32 = 0.1;
/// Screen-space margin around fitted content.
pub const FIT_PADDING: f32 = 50.0;
/// Fitting never zooms in beyond this.
pub const MAX_FIT_SCALE: f32 = 2.0;
/// Share of the viewport used by the initial fit.
pub const INITIAL_FIT_FRACTION: f32 = 0.995;
/// Share of the viewport used when fitting the current tree.
pub const FIT_FRACTION: f32 = 0.7;
/// Duration of an animated fit.
pub const FIT_DURATION_MS: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub pan_x: f32,
    pub pan_y: f32,
    pub scale: f32,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            pan_x: 0.0,
            pan_y: 0.0,
            scale: 1.0,
        }
    }
}

impl ViewState {
    pub fn world_to_screen(&self, point: Point) -> Point {
        Point::new(
            point.x.mul_add(self.scale, self.pan_x),
            point.y.mul_add(self.scale, self.pan_y),
        )
    }

    pub fn screen_to_world(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.pan_x) / self.scale,
            (point.y - self.pan_y) / self.scale,
        )
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Set the scale, keeping the world point under `anchor` (screen) fixed.
    pub fn zoom_to(&mut self, scale: f32, anchor: Point) {
        if !scale.is_finite() {
            return;
        }
        let new_scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        let ratio = new_scale / self.scale;
        self.pan_x = anchor.x - (anchor.x - self.pan_x) * ratio;
        self.pan_y = anchor.y - (anchor.y - self.pan_y) * ratio;
        self.scale = new_scale;
    }

    /// One wheel notch: scrolling up (negative delta) zooms in.
    pub fn wheel(&mut self, delta_y: f32, anchor: Point) {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return;
        }
        let step = if delta_y < 0.0 { ZOOM_STEP } else { -ZOOM_STEP };
        self.zoom_to(self.scale + step, anchor);
    }

    /// Multiply the scale by a pinch ratio around the gesture centroid.
    pub fn pinch(&mut self, factor: f32, anchor: Point) {
        if factor <= 0.0 || !factor.is_finite() {
            return;
        }
        self.zoom_to(self.scale * factor, anchor);
    }

    /// View that centres `bounds` in a viewport, using `fraction` of it.
    pub fn fitted(bounds: Rect, viewport: (f32, f32), fraction: f32) -> Option<Self> {
        let (width, height) = viewport;
        if bounds.width <= 0.0 || bounds.height <= 0.0 || width <= 0.0 || height <= 0.0 {
            return None;
        }
        let content_width = 2.0f32.mul_add(FIT_PADDING, bounds.width);
        let content_height = 2.0f32.mul_add(FIT_PADDING, bounds.height);
        let scale = (width * fraction / content_width)
            .min(height * fraction / content_height)
            .min(MAX_FIT_SCALE)
            .clamp(MIN_SCALE, MAX_SCALE);
        let center = bounds.center();
        Some(Self {
            pan_x: width / 2.0 - center.x * scale,
            pan_y: height / 2.0 - center.y * scale,
            scale,
        })
    }

    fn lerp(&self, to: &Self, t: f32) -> Self {
        let mix = |a: f32, b: f32| (b - a).mul_add(t, a);
        Self {
            pan_x: mix(self.pan_x, to.pan_x),
            pan_y: mix(self.pan_y, to.pan_y),
            scale: mix(self.scale, to.scale).clamp(MIN_SCALE, MAX_SCALE),
        }
    }
}

/// An animated move of the whole view (used by fit).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransition {
    pub from: ViewState,
    pub to: ViewState,
    pub start_ms: u64,
    pub duration_ms: u64,
}

impl ViewTransition {
    pub fn sample(&self, now_ms: u64) -> ViewState {
        let t = ease_in_out_cubic(progress(self.start_ms, self.duration_ms, now_ms));
        if t >= 1.0 {
            return self.to;
        }
        self.from.lerp(&self.to, t)
    }

    pub const fn is_finished(&self, now_ms: u64) -> bool {
        now_ms >= self.start_ms.saturating_add(self.duration_ms)
    }
}
