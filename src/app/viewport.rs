use eframe::egui::{Pos2, Rect, Vec2};

/// Allowed zoom window. The scale is clamped here no matter how much
/// cumulative gesture input arrives; pan is unconstrained.
#[derive(Clone, Copy, Debug)]
pub struct ScaleRange {
    pub min: f32,
    pub max: f32,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self { min: 0.1, max: 4.0 }
    }
}

/// Pan/zoom transform between world space and the screen rectangle the
/// canvas occupies. World origin maps to the rectangle center at zero pan.
#[derive(Clone, Copy, Debug)]
pub struct Viewport {
    pan: Vec2,
    zoom: f32,
    range: ScaleRange,
}

impl Viewport {
    pub fn new(range: ScaleRange) -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0_f32.clamp(range.min, range.max),
            range,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    pub fn reset(&mut self) {
        self.pan = Vec2::ZERO;
        self.zoom = 1.0_f32.clamp(self.range.min, self.range.max);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Applies a zoom factor about a screen-space pivot; the world point
    /// under the pivot stays put even when the clamp engages.
    pub fn zoom_about(&mut self, rect: Rect, pivot: Pos2, factor: f32) {
        let world_before = self.screen_to_world(rect, pivot);
        self.zoom = (self.zoom * factor).clamp(self.range.min, self.range.max);
        self.pan = pivot - rect.center() - (world_before * self.zoom);
    }

    pub fn world_to_screen(&self, rect: Rect, world: Vec2) -> Pos2 {
        rect.center() + self.pan + world * self.zoom
    }

    pub fn screen_to_world(&self, rect: Rect, screen: Pos2) -> Vec2 {
        (screen - rect.center() - self.pan) / self.zoom
    }

    /// The world-space rectangle currently covered by `rect`.
    pub fn visible_world_rect(&self, rect: Rect) -> Rect {
        let min = self.screen_to_world(rect, rect.min);
        let max = self.screen_to_world(rect, rect.max);
        Rect::from_two_pos(min.to_pos2(), max.to_pos2())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::{pos2, vec2};

    fn canvas() -> Rect {
        Rect::from_min_size(pos2(0.0, 0.0), vec2(800.0, 600.0))
    }

    #[test]
    fn scale_stays_clamped_under_cumulative_gestures() {
        let mut viewport = Viewport::new(ScaleRange::default());
        let rect = canvas();

        for _ in 0..200 {
            viewport.zoom_about(rect, pos2(100.0, 100.0), 1.3);
        }
        assert_eq!(viewport.zoom(), 4.0);

        for _ in 0..200 {
            viewport.zoom_about(rect, pos2(700.0, 500.0), 0.7);
        }
        assert_eq!(viewport.zoom(), 0.1);
    }

    #[test]
    fn zoom_keeps_the_world_point_under_the_pivot() {
        let mut viewport = Viewport::new(ScaleRange::default());
        let rect = canvas();
        viewport.pan_by(vec2(40.0, -25.0));

        let pivot = pos2(250.0, 410.0);
        let before = viewport.screen_to_world(rect, pivot);
        viewport.zoom_about(rect, pivot, 1.6);
        let after = viewport.screen_to_world(rect, pivot);

        assert!((before - after).length() < 1e-3);
    }

    #[test]
    fn screen_world_mapping_round_trips() {
        let mut viewport = Viewport::new(ScaleRange::default());
        let rect = canvas();
        viewport.pan_by(vec2(-120.0, 60.0));
        viewport.zoom_about(rect, pos2(300.0, 200.0), 2.0);

        let world = vec2(135.0, -48.0);
        let screen = viewport.world_to_screen(rect, world);
        let round_tripped = viewport.screen_to_world(rect, screen);
        assert!((world - round_tripped).length() < 1e-3);
    }

    #[test]
    fn visible_world_rect_tracks_pan_and_zoom() {
        let mut viewport = Viewport::new(ScaleRange::default());
        let rect = canvas();

        let initial = viewport.visible_world_rect(rect);
        assert!((initial.width() - 800.0).abs() < 1e-3);
        assert!(initial.contains(pos2(0.0, 0.0)));

        viewport.zoom_about(rect, rect.center(), 2.0);
        let zoomed = viewport.visible_world_rect(rect);
        assert!((zoomed.width() - 400.0).abs() < 1e-3, "doubling zoom halves coverage");

        viewport.pan_by(vec2(-400.0, 0.0));
        let panned = viewport.visible_world_rect(rect);
        assert!(panned.center().x > zoomed.center().x, "panning left reveals the right side");
    }
}
