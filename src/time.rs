use std::collections::VecDeque;
use std::time::Duration;

pub use std::time::Instant;

const DEFAULT_HISTORY_SECONDS: f32 = 2.0;
/// Longest step fed to the simulation, so a stall does not teleport the camera.
const MAX_FRAME_STEP: f32 = 0.25;

/// Frame clock plus a short rolling history for the timing readout.
#[derive(Clone, Debug)]
pub struct FrameTimer {
    last: Instant,
    samples: VecDeque<f32>,
    history_total: f32,
    max_history: f32,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            last: start,
            samples: VecDeque::new(),
            history_total: 0.0,
            max_history: DEFAULT_HISTORY_SECONDS,
        }
    }

    /// Seconds since the previous tick, clamped to a quarter second.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        self.record(dt)
    }

    pub fn record(&mut self, dt: Duration) -> f32 {
        let seconds = dt.as_secs_f32().min(MAX_FRAME_STEP);
        self.samples.push_back(seconds);
        self.history_total += seconds;
        while self.history_total > self.max_history && self.samples.len() > 1 {
            if let Some(oldest) = self.samples.pop_front() {
                self.history_total -= oldest;
            }
        }
        seconds
    }

    pub fn average_frame_ms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        1000.0 * self.history_total / self.samples.len() as f32
    }

    pub fn average_fps(&self) -> f32 {
        if self.history_total > 0.0 {
            self.samples.len() as f32 / self.history_total
        } else {
            0.0
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_recent_frames() {
        let mut timer = FrameTimer::new();
        for _ in 0..10 {
            timer.record(Duration::from_millis(20));
        }
        assert!((timer.average_frame_ms() - 20.0).abs() < 1e-3);
        assert!((timer.average_fps() - 50.0).abs() < 1e-2);
    }

    #[test]
    fn long_stalls_are_clamped() {
        let start = Instant::now();
        let mut timer = FrameTimer::starting_at(start);
        let dt = timer.tick(start + Duration::from_secs(3));
        assert_eq!(dt, MAX_FRAME_STEP);
    }

    #[test]
    fn history_is_bounded() {
        let mut timer = FrameTimer::new();
        for _ in 0..1000 {
            timer.record(Duration::from_millis(16));
        }
        assert!(timer.history_total <= DEFAULT_HISTORY_SECONDS + 1e-3);
        assert!(timer.samples.len() < 1000);
    }
}
