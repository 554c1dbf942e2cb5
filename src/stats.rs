/// Lifetime counters for the simulator. They only ever grow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub frames_drawn: u64,
    pub packets_received: u64,
    pub packet_errors: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_frame_drawn(&mut self) {
        self.frames_drawn += 1;
    }

    pub fn on_packet_received(&mut self) {
        self.packets_received += 1;
    }

    pub fn on_packet_error(&mut self) {
        self.packet_errors += 1;
    }

    pub fn packet_rate(&self, elapsed_secs: f64) -> f64 {
        rate(self.packets_received, elapsed_secs)
    }

    pub fn frame_rate(&self, elapsed_secs: f64) -> f64 {
        rate(self.frames_drawn, elapsed_secs)
    }

    /// One-line summary printed every report interval.
    ///
    /// Rates are shown as `0.0` until some time has elapsed.
    pub fn report(&self, elapsed_secs: f64) -> String {
        format!(
            "DDP stats: runtime {:.1} s, {:.1} pkt/s {} pkt, {:.1} fps {} frames",
            elapsed_secs,
            self.packet_rate(elapsed_secs),
            self.packets_received,
            self.frame_rate(elapsed_secs),
            self.frames_drawn
        )
    }

    /// Short status text for the on-screen overlay.
    pub fn overlay(&self, elapsed_secs: f64) -> String {
        format!(
            "{:.1} s  {:.1} pkt/s  {} pkt  {:.1} fps",
            elapsed_secs,
            self.packet_rate(elapsed_secs),
            self.packets_received,
            self.frame_rate(elapsed_secs)
        )
    }
}

fn rate(count: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs > 0.0 {
        count as f64 / elapsed_secs
    } else {
        0.0
    }
}
