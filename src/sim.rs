use crate::config::SimConfig;
use crate::ddp::{PacketDumper, PacketSource, PollResult};
use crate::error::Result;
use crate::layout::LayoutConfig;
use crate::pixels::PixelBuffer;
use crate::render::{DrawOptions, Frame, Renderer};
use crate::stats::Stats;
use crate::timing::{TickStatus, TimingController};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub poll: PollResult,
    pub status: TickStatus,
}

impl TickOutcome {
    /// The tick delivered pixel data.
    pub fn received_data(&self) -> bool {
        matches!(self.poll, PollResult::Received(n) if n > 0)
    }

    pub fn keep_running(&self) -> bool {
        !self.status.exit
    }
}

/// Sleeps out the remainder of each frame so the loop runs at a target rate.
///
/// Deadlines that were missed are skipped rather than caught up on.
pub struct FramePacer {
    period: Duration,
    next: Instant,
}

impl FramePacer {
    pub fn new(fps: u32, now: Instant) -> Self {
        let period = Duration::from_secs(1) / fps.max(1);
        Self {
            period,
            next: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Time left until the next frame deadline, advancing the deadline.
    pub fn remaining(&mut self, now: Instant) -> Duration {
        let wait = self.next.saturating_duration_since(now);
        self.next = if self.next > now {
            self.next + self.period
        } else {
            now + self.period
        };
        wait
    }

    pub fn wait(&mut self) {
        let wait = self.remaining(Instant::now());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }
}

/// Owns every piece of per-run state and advances it one tick at a time.
pub struct Simulator {
    source: PacketSource,
    pixels: PixelBuffer,
    layout: LayoutConfig,
    timing: TimingController,
    stats: Stats,
    options: DrawOptions,
    dumper: PacketDumper,
    fps: u32,
    blanking: bool,
}

impl Simulator {
    /// Opens the DDP listener from `config` and starts the clock at `start`.
    pub fn new(config: &SimConfig, start: Instant) -> Result<Self> {
        let source = PacketSource::open(config.port)?;
        Ok(Self::with_source(config, source, start))
    }

    /// Builds a simulator around an already bound listener.
    pub fn with_source(config: &SimConfig, source: PacketSource, start: Instant) -> Self {
        let thresholds = config.thresholds;
        Self {
            source,
            pixels: PixelBuffer::new(config.layout.pixel_count()),
            layout: config.layout,
            timing: TimingController::new(
                start,
                thresholds.hold,
                thresholds.idle_exit,
                thresholds.report_interval,
            ),
            stats: Stats::new(),
            options: config.draw,
            dumper: PacketDumper::new(config.dump_nth),
            fps: config.fps,
            blanking: false,
        }
    }

    pub fn pixels(&self) -> &PixelBuffer {
        &self.pixels
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Runs the ingestion and timing half of a tick at `now`.
    ///
    /// Stats reports and packet dumps are printed to stdout, which the
    /// terminal renderer also paints; they are meant for headless runs.
    pub fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        let poll = self.source.poll(&mut self.pixels)?;
        match poll {
            PollResult::NoData => {}
            PollResult::Interrupted => {
                tracing::warn!("DDP receive interrupted");
                self.stats.on_packet_error();
            }
            PollResult::Received(copied) => {
                self.stats.on_packet_received();
                if copied > 0 {
                    self.timing.packet_received(now);
                }
                if let Some(line) = self.dumper.on_datagram(self.source.last_datagram(), copied) {
                    println!("{line}");
                }
            }
        }

        let status = self.timing.tick(now);
        if status.report_due {
            println!("{}", self.stats.report(status.elapsed_secs()));
        }

        if status.blank {
            self.pixels.clear();
        }
        if status.blank != self.blanking {
            tracing::debug!(blank = status.blank, "idle blanking changed");
            self.blanking = status.blank;
        }
        if status.exit {
            tracing::info!(
                idle_secs = status.since_last_packet.as_secs_f64(),
                "no DDP data, exiting"
            );
        }

        Ok(TickOutcome { poll, status })
    }

    /// Hands the current pixels to `renderer` and counts the frame.
    pub fn draw<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        outcome: &TickOutcome,
    ) -> Result<()> {
        let status = self.stats.overlay(outcome.status.elapsed_secs());
        let frame = Frame {
            pixels: &self.pixels,
            layout: &self.layout,
            options: self.options,
            receiving: outcome.received_data(),
            status: &status,
        };
        renderer.draw(&frame)?;
        self.stats.on_frame_drawn();
        Ok(())
    }

    /// Ticks, draws and paces until `running` is cleared, the idle exit
    /// fires, or a fatal error occurs.
    pub fn run<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        running: &AtomicBool,
    ) -> Result<Stats> {
        let mut pacer = FramePacer::new(self.fps, Instant::now());
        while running.load(Ordering::SeqCst) {
            let outcome = self.tick(Instant::now())?;
            if !outcome.keep_running() {
                break;
            }
            self.draw(renderer, &outcome)?;
            pacer.wait();
        }
        Ok(self.stats)
    }
}
