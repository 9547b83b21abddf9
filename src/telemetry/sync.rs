//! # Refresh-Rate Estimator
//!
//! Converts the module's periodic input-sync samples (measured refresh
//! rate, measured input lag) into a smoothed, clamped "adjusted refresh
//! rate" used to pace outbound channel timing.
//!
//! The sign-flip heuristic for wrapped lag differences and the ±500 ps
//! per-sample bias are calibration, not a derived control law; the
//! arithmetic here deliberately preserves the module firmware's tuning.

use std::time::{Duration, Instant};

use tracing::trace;

/// Freshness window for a sync sample
pub const SYNC_VALID_WINDOW: Duration = Duration::from_millis(500);

/// Minimum refresh period the estimator will aggregate to, in rate units
const MIN_REFRESH_RATE: i32 = 7000;

/// Rate returned by the query while no valid sample has been seen
const FALLBACK_REFRESH_RATE: u16 = 18000;

/// Hard safety bounds on the running estimate, in picoseconds (6-30 ms)
const ADJUSTED_REFRESH_MIN_PS: i32 = 6_000_000;
const ADJUSTED_REFRESH_MAX_PS: i32 = 30_000_000;

/// Largest per-frame correction applied by one sample, in picoseconds
const MAX_PER_FRAME_CORRECTION_PS: i32 = 20_000;

/// Sync/timing state of one module slot.
///
/// Mutated only by [`SyncStatus::calc_adjusted_refresh_rate`]; read through
/// [`SyncStatus::adjusted_refresh_rate`] by the outbound timing logic.
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    /// Raw refresh rate last reported by the module
    pub refresh_rate: u16,
    /// Input lag last reported by the module
    pub input_lag: u16,
    /// Reporting interval of the sync samples
    pub interval: u8,
    /// Lag the module is aiming for, in tenths
    pub target: u8,
    /// Smoothed refresh estimate in picoseconds
    pub adjusted_refresh_rate: i32,
    /// Dither counter for the query path
    counter: u8,
    last_update: Option<Instant>,
}

impl SyncStatus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the sync status as freshly updated.
    pub fn touch(&mut self) {
        self.last_update = Some(Instant::now());
    }

    /// True while the last sample is within the freshness window.
    pub fn is_valid(&self) -> bool {
        matches!(self.last_update, Some(t) if t.elapsed() < SYNC_VALID_WINDOW)
    }

    /// Ingest one (rate, lag) sample and fold it into the running estimate.
    pub fn calc_adjusted_refresh_rate(&mut self, new_refresh_rate: u16, new_input_lag: u16) {
        // How far off we are from the target; positive means too slow,
        // negative too fast
        let mut lag_difference = new_input_lag as i32 - self.input_lag as i32;

        // A corrupt frame can report a rate that would zero the target
        // period; drop the sample rather than divide by it
        if new_refresh_rate < 2 {
            trace!(rate = new_refresh_rate, "sync sample with unusable refresh rate");
            return;
        }

        // The refresh period we aggregate to: smallest multiple of the
        // measured rate at or above MIN_REFRESH_RATE, so that sample
        // windows align across the two periods
        let target_refresh_rate =
            new_refresh_rate as i32 * (MIN_REFRESH_RATE / (new_refresh_rate as i32 - 1) + 1);

        // The lag counter wrapped; reverse the sample
        if lag_difference < -target_refresh_rate / 2 {
            lag_difference = -lag_difference;
        }

        // A rate change invalidates the running estimate: restart from the
        // target period instead of smoothing across the discontinuity. The
        // previous lag is deliberately kept as the next sample's baseline.
        if new_refresh_rate != self.refresh_rate {
            self.refresh_rate = new_refresh_rate;
            let mut adjusted = target_refresh_rate;
            if adjusted >= 30000 {
                adjusted /= 2;
            }
            self.adjusted_refresh_rate = adjusted * 1000;
            return;
        }

        // How many refresh cycles the reported lag was averaged over (*10)
        let num_samples = self.interval as i32 * 10000 / target_refresh_rate;
        if num_samples == 0 {
            trace!(
                interval = self.interval,
                target_refresh_rate,
                "sync sample interval too short, ignoring"
            );
            self.input_lag = new_input_lag;
            return;
        }

        // Lag difference in picoseconds
        lag_difference *= 1000;

        // Compensate for the time we were intentionally late or early
        if self.input_lag as i32 > self.target as i32 * 10 + 30 {
            lag_difference += num_samples * 500;
        } else if (self.input_lag as i32) < self.target as i32 * 10 - 30 {
            lag_difference -= num_samples * 500;
        }

        // Per-frame drift in picoseconds: positive is too slow, negative
        // too fast
        let per_frame_ps = (lag_difference * 10 / num_samples)
            .clamp(-MAX_PER_FRAME_CORRECTION_PS, MAX_PER_FRAME_CORRECTION_PS);

        self.adjusted_refresh_rate = (self.adjusted_refresh_rate + per_frame_ps)
            .clamp(ADJUSTED_REFRESH_MIN_PS, ADJUSTED_REFRESH_MAX_PS);

        self.input_lag = new_input_lag;
    }

    /// Current adjusted refresh rate in half-microsecond units, suitable
    /// for pacing outbound timing.
    ///
    /// Falls back to a fixed rate while no valid sample exists. A rotating
    /// dither offset avoids quantization bias in the picosecond-to-rate
    /// conversion, and the result is nudged by ±1 when the lag is running
    /// beyond the target band, mirroring the bias applied at ingestion.
    pub fn adjusted_refresh_rate(&mut self) -> u16 {
        if !self.is_valid() || self.refresh_rate == 0 {
            return FALLBACK_REFRESH_RATE;
        }

        self.counter = (self.counter + 1) % 10;
        let rate = ((self.adjusted_refresh_rate + self.counter as i32 * 50) / 500) as u16;

        if self.input_lag as i32 > self.target as i32 * 10 + 30 {
            rate.wrapping_sub(1)
        } else if (self.input_lag as i32) < self.target as i32 * 10 - 30 {
            rate.wrapping_add(1)
        } else {
            rate
        }
    }

    /// Human-readable lag/refresh summary for the presentation layer.
    pub fn refresh_line(&self) -> String {
        if !self.is_valid() {
            return "no sync data".to_string();
        }
        format!(
            "L {:>5}ns R {:>5}ns",
            self.input_lag,
            self.adjusted_refresh_rate / 1000
        )
    }
}
