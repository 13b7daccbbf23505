//! Frame-rate accumulator.
//!
//! One [`FpsCounter`] is owned by the event loop. It starts counting when
//! constructed, is ticked once per presented frame and reports a new
//! average about once per second.

use std::time::{Duration, Instant};

/// Averaged frame statistics over the last reporting window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameStats {
    pub fps: f64,
    pub frame_time_ms: f64,
}

impl FrameStats {
    fn from_window(frames: u32, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let fps = if secs > 0.0 { frames as f64 / secs } else { 0.0 };
        let frame_time_ms = if fps > 0.0 { 1000.0 / fps } else { 0.0 };
        Self { fps, frame_time_ms }
    }

    /// Window title in the form `"<app>: 16.67 ms/frame (60.0 FPS)"`.
    pub fn title(&self, app: &str) -> String {
        format!(
            "{app}: {:.2} ms/frame ({:.1} FPS)",
            self.frame_time_ms, self.fps
        )
    }
}

#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    interval: Duration,
    last: Option<FrameStats>,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            window_start: start,
            frames: 0,
            interval: Duration::from_secs(1),
            last: None,
        }
    }

    /// Count one frame at `now`. Returns fresh stats when the reporting
    /// interval has elapsed, `None` otherwise.
    pub fn tick(&mut self, now: Instant) -> Option<FrameStats> {
        let elapsed = now.saturating_duration_since(self.window_start);
        let report = if elapsed >= self.interval {
            let stats = FrameStats::from_window(self.frames, elapsed);
            self.window_start = now;
            self.frames = 0;
            self.last = Some(stats);
            Some(stats)
        } else {
            None
        };
        self.frames += 1;
        report
    }

    /// Most recent report, if any.
    pub fn last(&self) -> Option<FrameStats> {
        self.last
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
