/// Frame-rate sampler driving the one-shot backend promotion.
///
/// Frames are accumulated into one-second windows; when a window closes
/// with `fps < fps_floor` while the graph holds more than `node_floor`
/// nodes, promotion is requested exactly once. There is no demotion path.
pub struct FrameGovernor {
    fps_floor: f32,
    node_floor: usize,
    frames: u32,
    elapsed: f32,
    promoted: bool,
    disabled: bool,
    last_sample: Option<f32>,
}

const SAMPLE_WINDOW_SECS: f32 = 1.0;

impl FrameGovernor {
    pub fn new(fps_floor: f32, node_floor: usize) -> Self {
        Self {
            fps_floor,
            node_floor,
            frames: 0,
            elapsed: 0.0,
            promoted: false,
            disabled: false,
            last_sample: None,
        }
    }

    /// Feeds one frame duration; returns true when promotion should happen
    /// now. After the first true (or after `disable`), always false.
    pub fn record_frame(&mut self, dt: f32, node_count: usize) -> bool {
        if dt <= f32::EPSILON {
            return false;
        }

        self.elapsed += dt;
        self.frames += 1;
        if self.elapsed < SAMPLE_WINDOW_SECS {
            return false;
        }

        let fps = self.frames as f32 / self.elapsed;
        self.last_sample = Some(fps);
        self.frames = 0;
        self.elapsed = 0.0;

        if self.promoted || self.disabled {
            return false;
        }

        if fps < self.fps_floor && node_count > self.node_floor {
            self.promoted = true;
            return true;
        }
        false
    }

    /// Permanently rules out promotion for this session (backend init failed).
    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn is_promoted(&self) -> bool {
        self.promoted
    }

    pub fn last_sample(&self) -> Option<f32> {
        self.last_sample
    }

    /// Re-arms the governor after a data load returned the engine to the
    /// vector backend.
    pub fn reset(&mut self) {
        self.frames = 0;
        self.elapsed = 0.0;
        self.promoted = false;
        self.last_sample = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(governor: &mut FrameGovernor, frames: usize, dt: f32, nodes: usize) -> usize {
        (0..frames)
            .filter(|_| governor.record_frame(dt, nodes))
            .count()
    }

    #[test]
    fn promotes_once_below_threshold_with_a_large_graph() {
        let mut governor = FrameGovernor::new(30.0, 1000);

        // 20 fps for two seconds at 1500 nodes: exactly one promotion.
        let promotions = feed(&mut governor, 40, 1.0 / 20.0, 1500);
        assert_eq!(promotions, 1);
        assert!(governor.is_promoted());

        // Staying slow afterwards is a no-op.
        assert_eq!(feed(&mut governor, 40, 1.0 / 20.0, 1500), 0);
    }

    #[test]
    fn small_graphs_never_promote() {
        let mut governor = FrameGovernor::new(30.0, 1000);
        assert_eq!(feed(&mut governor, 200, 1.0 / 20.0, 500), 0);
        assert!(!governor.is_promoted());
    }

    #[test]
    fn fast_frames_never_promote() {
        let mut governor = FrameGovernor::new(30.0, 1000);
        assert_eq!(feed(&mut governor, 300, 1.0 / 60.0, 5000), 0);
        let sample = governor.last_sample().expect("a window closed");
        assert!((sample - 60.0).abs() < 1.0);
    }

    #[test]
    fn a_disabled_governor_stays_quiet() {
        let mut governor = FrameGovernor::new(30.0, 1000);
        governor.disable();
        assert_eq!(feed(&mut governor, 120, 1.0 / 10.0, 9000), 0);

        governor.reset();
        assert_eq!(
            feed(&mut governor, 120, 1.0 / 10.0, 9000),
            0,
            "disable survives reset"
        );
    }

    #[test]
    fn reset_rearms_promotion_after_a_vector_reload() {
        let mut governor = FrameGovernor::new(30.0, 1000);
        assert_eq!(feed(&mut governor, 40, 1.0 / 20.0, 1500), 1);

        governor.reset();
        assert!(!governor.is_promoted());
        assert_eq!(feed(&mut governor, 40, 1.0 / 20.0, 1500), 1);
    }
}
