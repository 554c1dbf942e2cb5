use std::time::{Duration, Instant};

/// An optional time limit; zero seconds disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Threshold(Option<Duration>);

impl Threshold {
    pub const DISABLED: Threshold = Threshold(None);

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn new(limit: Duration) -> Self {
        if limit.is_zero() {
            Self(None)
        } else {
            Self(Some(limit))
        }
    }

    pub fn limit(&self) -> Option<Duration> {
        self.0
    }

    /// True once both the total run time and the time since the last data
    /// packet are past the limit. Never true when disabled.
    pub fn idle_exceeded(&self, elapsed: Duration, since_last_packet: Duration) -> bool {
        match self.0 {
            Some(limit) => elapsed > limit && since_last_packet > limit,
            None => false,
        }
    }
}

/// Conditions derived for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStatus {
    pub elapsed: Duration,
    pub since_last_packet: Duration,
    /// Pixels should be blanked this tick.
    pub blank: bool,
    /// The main loop should stop after this tick.
    pub exit: bool,
    /// A stats report is due; the report timer has already been reset.
    pub report_due: bool,
}

impl TickStatus {
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

/// Tracks the timestamps behind idle blanking, idle exit and periodic
/// reporting. All conditions are recomputed from timestamps every tick.
#[derive(Debug, Clone)]
pub struct TimingController {
    start: Instant,
    last_packet: Instant,
    last_report: Instant,
    hold: Threshold,
    idle_exit: Threshold,
    report_interval: Threshold,
}

impl TimingController {
    /// Starts the clock at `start`. The last-packet and last-report times
    /// begin there too, so nothing fires before a full interval has passed.
    pub fn new(
        start: Instant,
        hold: Threshold,
        idle_exit: Threshold,
        report_interval: Threshold,
    ) -> Self {
        Self {
            start,
            last_packet: start,
            last_report: start,
            hold,
            idle_exit,
            report_interval,
        }
    }

    pub fn last_packet(&self) -> Instant {
        self.last_packet
    }

    /// Records a datagram that carried pixel data. Older timestamps are ignored.
    pub fn packet_received(&mut self, now: Instant) {
        if now > self.last_packet {
            self.last_packet = now;
        }
    }

    /// Evaluates every condition for the tick at `now`.
    pub fn tick(&mut self, now: Instant) -> TickStatus {
        let elapsed = now.saturating_duration_since(self.start);
        let since_last_packet = now.saturating_duration_since(self.last_packet);

        let report_due = match self.report_interval.limit() {
            Some(interval) => now.saturating_duration_since(self.last_report) > interval,
            None => false,
        };
        if report_due {
            self.last_report = now;
        }

        TickStatus {
            elapsed,
            since_last_packet,
            blank: self.hold.idle_exceeded(elapsed, since_last_packet),
            exit: self.idle_exit.idle_exceeded(elapsed, since_last_packet),
            report_due,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn test_hold_blank_condition() {
        let hold = Threshold::from_secs(5);
        assert!(hold.idle_exceeded(secs(6), secs(6)), "Idle past hold should blank");
        assert!(
            !hold.idle_exceeded(secs(6), secs(4)),
            "A recent packet keeps the pixels lit"
        );
        assert!(!hold.idle_exceeded(secs(4), secs(6)), "Too early after startup");
        assert!(!hold.idle_exceeded(secs(5), secs(5)), "Limit must be exceeded, not reached");
    }

    #[test]
    fn test_zero_threshold_is_disabled() {
        let hold = Threshold::from_secs(0);
        assert_eq!(hold, Threshold::DISABLED);
        assert!(!hold.idle_exceeded(secs(1_000_000), secs(1_000_000)));
    }

    #[test]
    fn test_tick_blanks_and_exits_when_idle() {
        let start = Instant::now();
        let mut timing = TimingController::new(
            start,
            Threshold::from_secs(5),
            Threshold::from_secs(10),
            Threshold::DISABLED,
        );

        let status = timing.tick(start + secs(3));
        assert!(!status.blank);
        assert!(!status.exit);

        let status = timing.tick(start + secs(6));
        assert!(status.blank);
        assert!(!status.exit);

        let status = timing.tick(start + secs(11));
        assert!(status.blank, "Blanking holds for as long as no packet arrives");
        assert!(status.exit);
    }

    #[test]
    fn test_packet_resets_idle_time() {
        let start = Instant::now();
        let mut timing = TimingController::new(
            start,
            Threshold::from_secs(5),
            Threshold::DISABLED,
            Threshold::DISABLED,
        );

        timing.packet_received(start + secs(4));
        let status = timing.tick(start + secs(6));
        assert_eq!(status.elapsed, secs(6));
        assert_eq!(status.since_last_packet, secs(2));
        assert!(!status.blank);

        let status = timing.tick(start + secs(10));
        assert!(status.blank);
    }

    #[test]
    fn test_last_packet_never_regresses() {
        let start = Instant::now();
        let mut timing = TimingController::new(
            start,
            Threshold::DISABLED,
            Threshold::DISABLED,
            Threshold::DISABLED,
        );
        timing.packet_received(start + secs(8));
        timing.packet_received(start + secs(2));
        assert_eq!(timing.last_packet(), start + secs(8));
    }

    #[test]
    fn test_report_due_after_interval() {
        let start = Instant::now();
        let mut timing = TimingController::new(
            start,
            Threshold::DISABLED,
            Threshold::DISABLED,
            Threshold::from_secs(2),
        );

        assert!(!timing.tick(start + secs(1)).report_due);
        assert!(!timing.tick(start + secs(2)).report_due);
        assert!(timing.tick(start + Duration::from_millis(2_100)).report_due);
        assert!(
            !timing.tick(start + secs(3)).report_due,
            "Report timer restarts after each report"
        );
        assert!(timing.tick(start + secs(5)).report_due);
    }

    #[test]
    fn test_no_report_when_disabled() {
        let start = Instant::now();
        let mut timing = TimingController::new(
            start,
            Threshold::DISABLED,
            Threshold::DISABLED,
            Threshold::DISABLED,
        );
        assert!(!timing.tick(start + secs(3600)).report_due);
    }
}
