//! Per-frame clock with explicit start/stop

/// Turns display-frame timestamps into elapsed deltas.
///
/// The first step after [`FrameLoop::start`] yields a zero delta; a stopped
/// loop yields nothing, so nothing downstream advances.
#[derive(Debug, Clone, Default)]
pub struct FrameLoop {
    running: bool,
    last: Option<f64>,
    frames: u64,
}

impl FrameLoop {
    /// A loop that is already running
    pub fn running() -> Self {
        Self {
            running: true,
            ..Self::default()
        }
    }

    pub fn start(&mut self) {
        if !self.running {
            tracing::info!("Frame loop started");
        }
        self.running = true;
        self.last = None;
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::info!("Frame loop stopped after {} frames", self.frames);
        }
        self.running = false;
        self.last = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Frames stepped since creation
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Step to timestamp `now` (seconds) and return the elapsed delta
    pub fn step(&mut self, now: f64) -> Option<f64> {
        if !self.running {
            return None;
        }
        let delta = match self.last {
            Some(last) if now.is_finite() && now > last => now - last,
            _ => 0.0,
        };
        if now.is_finite() {
            self.last = Some(now);
        }
        self.frames += 1;
        Some(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_is_zero() {
        let mut frame_loop = FrameLoop::running();
        assert_eq!(frame_loop.step(10.0), Some(0.0));
        assert_eq!(frame_loop.step(10.25), Some(0.25));
        assert_eq!(frame_loop.step(10.75), Some(0.5));
        assert_eq!(frame_loop.frames(), 3);
    }

    #[test]
    fn test_stopped_loop_yields_nothing() {
        let mut frame_loop = FrameLoop::default();
        assert!(!frame_loop.is_running());
        assert_eq!(frame_loop.step(1.0), None);

        frame_loop.start();
        assert_eq!(frame_loop.step(2.0), Some(0.0));
        frame_loop.stop();
        assert_eq!(frame_loop.step(3.0), None);

        // Restarting does not count the stopped interval
        frame_loop.start();
        assert_eq!(frame_loop.step(9.0), Some(0.0));
        assert_eq!(frame_loop.step(9.5), Some(0.5));
    }

    #[test]
    fn test_clock_going_backwards() {
        let mut frame_loop = FrameLoop::running();
        frame_loop.step(5.0);
        assert_eq!(frame_loop.step(4.0), Some(0.0));
        assert_eq!(frame_loop.step(4.5), Some(0.5));
        assert_eq!(frame_loop.step(f64::NAN), Some(0.0));
    }
}
