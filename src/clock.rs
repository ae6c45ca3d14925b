//! Virtual clock
//!
//! A process-local logical clock with a configurable microsecond offset and a
//! percentage drift rate, used everywhere the node reads or compares time.
//! Randomizing both at startup lets a test network of processes simulate
//! heterogeneous hardware clocks; `adjust` models a step correction.
use chrono::Utc;
use rand::Rng;

/// Microseconds since the Unix epoch, as read through the virtual clock.
pub type TimeVal = i64;

/// Wire size of an encoded time value.
pub const TIME_WIRE_SIZE: usize = 8;

/// Upper bound for `poll_timeout` so the event loop never blocks indefinitely.
pub const MAX_POLL_MS: u64 = 60_000;

/// Drift rate meaning "runs at real-time speed".
pub const NOMINAL_DRIFT_PCT: i64 = 100;

#[derive(Clone, Debug)]
pub struct VirtualClock {
    /// Constant shift applied to every reading [us]
    offset: TimeVal,
    /// Percentage scaling of elapsed real time (100 = no drift)
    drift_pct: i64,
}

impl VirtualClock {
    /// Clock with randomized-but-plausible offset and drift, for simulating
    /// disagreeing clocks across a test network.
    pub fn init() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            // up to +/- 1s off and +/- 10% fast or slow
            offset: rng.gen_range(-1_000_000..=1_000_000),
            drift_pct: rng.gen_range(90..=110),
        }
    }

    /// Deterministic variant for tests and reproducible runs.
    ///
    /// Example for +1s offset running 10% fast:
    /// `VirtualClock::configure(1_000_000, 110)`.
    pub fn configure(offset: TimeVal, drift_pct: i64) -> Self {
        Self { offset, drift_pct }
    }

    /// Current virtual time: drift compounds with elapsed real time, offset
    /// is a constant shift.
    pub fn now(&self) -> TimeVal {
        self.scaled(real_now())
    }

    /// Shifts the clock by `diff` microseconds (may be negative), causing an
    /// instantaneous jump in subsequent readings.
    pub fn adjust(&mut self, diff: TimeVal) {
        self.offset += diff;
    }

    /// Wait time in milliseconds until `deadline`, for handing to a bounded
    /// receive. Returns 0 when the deadline has already passed and clamps to
    /// [`MAX_POLL_MS`].
    pub fn poll_timeout(&self, deadline: TimeVal) -> u64 {
        let remaining_us = deadline.saturating_sub(self.now());
        if remaining_us <= 0 {
            return 0;
        }
        // round up so we never wake before the deadline
        let remaining_ms = (remaining_us as u64).div_ceil(1000);
        remaining_ms.min(MAX_POLL_MS)
    }

    fn scaled(&self, real_us: TimeVal) -> TimeVal {
        // i128 keeps the multiply safe for any plausible drift rate
        let scaled = (real_us as i128) * (self.drift_pct as i128) / 100;
        scaled as TimeVal + self.offset
    }
}

fn real_now() -> TimeVal {
    Utc::now().timestamp_micros()
}

/// Fixed big-endian 64-bit representation for wire transport, independent of
/// host byte order.
pub fn time_to_net(tv: TimeVal) -> [u8; TIME_WIRE_SIZE] {
    tv.to_be_bytes()
}

pub fn net_to_time(bytes: [u8; TIME_WIRE_SIZE]) -> TimeVal {
    TimeVal::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_monotonic_under_positive_drift() {
        let clock = VirtualClock::configure(-500_000, 110);
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_adjust_steps_the_clock() {
        let mut clock = VirtualClock::configure(0, 100);
        let before = clock.now();
        clock.adjust(2_000_000);
        let after = clock.now();
        // within rounding plus the real time elapsed between the two reads
        let jumped = after - before;
        assert!(jumped >= 2_000_000);
        assert!(jumped < 2_100_000);
    }

    #[test]
    fn test_adjust_can_move_backwards() {
        let mut clock = VirtualClock::configure(0, 100);
        let before = clock.now();
        clock.adjust(-5_000_000);
        assert!(clock.now() < before);
    }

    #[test]
    fn test_drift_scales_elapsed_time() {
        let fast = VirtualClock::configure(0, 200);
        let real = VirtualClock::configure(0, 100);
        // a 200% clock reads roughly twice the epoch microseconds
        let ratio = fast.now() as f64 / real.now() as f64;
        assert!((ratio - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_poll_timeout_past_deadline_is_immediate() {
        let clock = VirtualClock::configure(0, 100);
        assert_eq!(clock.poll_timeout(clock.now() - 1_000), 0);
        assert_eq!(clock.poll_timeout(0), 0);
    }

    #[test]
    fn test_poll_timeout_rounds_up_and_clamps() {
        let clock = VirtualClock::configure(0, 100);
        let wait = clock.poll_timeout(clock.now() + 10_500);
        // 10.5ms away rounds up to 11ms (give a little slack for elapsed time)
        assert!((10..=11).contains(&wait));

        let far = clock.poll_timeout(clock.now() + 3_600_000_000);
        assert_eq!(far, MAX_POLL_MS);
    }

    #[test]
    fn test_time_wire_round_trip() {
        for tv in [0, 1, -1, 1_680_000_000_000_000, TimeVal::MAX, TimeVal::MIN] {
            assert_eq!(net_to_time(time_to_net(tv)), tv);
        }
    }

    #[test]
    fn test_time_wire_is_big_endian() {
        let bytes = time_to_net(0x0102_0304_0506_0708);
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
