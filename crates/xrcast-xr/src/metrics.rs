//! Rolling frame statistics for an XR session.

use std::collections::VecDeque;

use serde::Serialize;

/// Frame budget (ms) for the 72 Hz baseline refresh rate.
pub const DEFAULT_BUDGET_MS: f64 = 1000.0 / 72.0;

const REPORT_INTERVAL_MS: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub frames: u64,
    pub frame_time_ms: f64,
    pub frame_rate: f64,
    pub dropped_frames: u64,
}

#[derive(Debug)]
pub struct FrameMetrics {
    window: VecDeque<f64>,
    window_size: usize,
    budget_ms: f64,
    frames: u64,
    dropped_frames: u64,
    last_frame_ms: Option<f64>,
    last_report_ms: Option<f64>,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self::new(90, DEFAULT_BUDGET_MS)
    }
}

impl FrameMetrics {
    pub fn new(window_size: usize, budget_ms: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(window_size),
            window_size: window_size.max(1),
            budget_ms,
            frames: 0,
            dropped_frames: 0,
            last_frame_ms: None,
            last_report_ms: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.window_size, self.budget_ms);
    }

    /// Record a frame at `time_ms`. Returns `true` when a periodic report is due.
    pub fn record(&mut self, time_ms: f64) -> bool {
        self.frames += 1;
        if let Some(last) = self.last_frame_ms {
            let delta = (time_ms - last).max(0.0);
            if self.window.len() == self.window_size {
                self.window.pop_front();
            }
            self.window.push_back(delta);
            // A frame that took more than 1.5 budgets means the runtime skipped one.
            if delta > self.budget_ms * 1.5 {
                self.dropped_frames += 1;
            }
        }
        self.last_frame_ms = Some(time_ms);

        match self.last_report_ms {
            None => {
                self.last_report_ms = Some(time_ms);
                false
            }
            Some(last) if time_ms - last >= REPORT_INTERVAL_MS => {
                self.last_report_ms = Some(time_ms);
                true
            }
            Some(_) => false,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let frame_time_ms = self.window.back().copied().unwrap_or(0.0);
        let average = if self.window.is_empty() {
            0.0
        } else {
            self.window.iter().sum::<f64>() / self.window.len() as f64
        };
        let frame_rate = if average > 0.0 { 1000.0 / average } else { 0.0 };
        MetricsSnapshot {
            frames: self.frames,
            frame_time_ms,
            frame_rate,
            dropped_frames: self.dropped_frames,
        }
    }
}
