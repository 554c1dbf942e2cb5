use clap::{ArgAction, Parser};
use ddp_led_sim::config::{parse_size, SimConfig, Thresholds};
use ddp_led_sim::layout::{LayoutConfig, LayoutFlags};
use ddp_led_sim::render::{DrawOptions, HeadlessRenderer, Renderer, TerminalRenderer};
use ddp_led_sim::sim::Simulator;
use ddp_led_sim::timing::Threshold;
use ddp_led_sim::{Result, SimError};
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCREEN_HEIGHT: usize = 24;

#[derive(Parser)]
#[command(
    name = "ddp-led-sim",
    version,
    about = "LED-Strip DDP Simulator: shows DDP pixel pushes as a simulated LED matrix"
)]
struct Args {
    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, action = ArgAction::Count)]
    verbose: u8,

    /// Screen size in character cells, NxM
    #[arg(short = 's', long = "size", default_value = "80x24")]
    size: String,

    /// Horizontal pixel count, optionally NxM with the vertical count
    #[arg(short = 'p', long = "pixels", default_value = "20")]
    pixels: String,

    /// Total pixel count; rows are derived when not given with -p NxM
    #[arg(short = 'n', long = "count")]
    count: Option<usize>,

    /// Gap between pixels, N or NxM
    #[arg(short = 'g', long = "gutter", default_value = "1")]
    gutter: String,

    /// Toggle snake layout, alternates direction of rows
    #[arg(short = 'S', long, action = ArgAction::Count)]
    snake: u8,

    /// Toggle mirror layout, mirrors horizontally
    #[arg(short = 'M', long, action = ArgAction::Count)]
    mirror: u8,

    /// Toggle flip layout, flips vertically
    #[arg(short = 'F', long, action = ArgAction::Count)]
    flip: u8,

    /// Toggle tilt layout, transforms diagonally
    #[arg(short = 'T', long, action = ArgAction::Count)]
    tilt: u8,

    /// Rotate layout right
    #[arg(short = 'R', long = "rotate-right", action = ArgAction::Count)]
    rotate_right: u8,

    /// Rotate layout left
    #[arg(short = 'L', long = "rotate-left", action = ArgAction::Count)]
    rotate_left: u8,

    /// Draw pixels as circles
    #[arg(short = 'C', long)]
    circle: bool,

    /// Show pixel indices and live statistics
    #[arg(short = 'O', long)]
    overlay: bool,

    /// Target frames per second
    #[arg(short = 'f', long, default_value_t = 60)]
    fps: u32,

    /// Hold N seconds before blanking (0 is forever)
    #[arg(short = 'H', long, default_value_t = 0)]
    hold: u64,

    /// Exit after being idle N seconds (0 is never)
    #[arg(short = 'E', long = "idle-exit", default_value_t = 0)]
    idle_exit: u64,

    /// Print a stats report every N seconds (0 is never). Best with --headless,
    /// the terminal view repaints over stdout
    #[arg(short = 'r', long = "report", default_value_t = 0)]
    report: u64,

    /// Dump every Nth data packet (0 is never). Best with --headless
    #[arg(short = 'd', long = "dump", default_value_t = 0)]
    dump: u64,

    /// UDP port to listen on
    #[arg(long, default_value_t = ddp_led_sim::ddp::DDP_PORT)]
    port: u16,

    /// Do not draw; only receive, time out and report
    #[arg(long)]
    headless: bool,
}

impl Args {
    fn layout(&self) -> Result<LayoutConfig> {
        let pixels = parse_size("-p", &self.pixels)?;
        let mut flags = LayoutFlags {
            snake: self.snake % 2 == 1,
            mirror: self.mirror % 2 == 1,
            flip: self.flip % 2 == 1,
            tilt: self.tilt % 2 == 1,
        };
        flags.rotate(i64::from(self.rotate_right) - i64::from(self.rotate_left));
        LayoutConfig::resolve(pixels.x, pixels.y, self.count, flags)
    }

    fn config(&self) -> Result<SimConfig> {
        let mut config = SimConfig::new(self.layout()?);
        config.port = self.port;
        config.fps = self.fps;
        config.dump_nth = self.dump;
        config.draw = DrawOptions {
            circle: self.circle,
            overlay: self.overlay,
        };
        config.thresholds = Thresholds {
            hold: Threshold::from_secs(self.hold),
            idle_exit: Threshold::from_secs(self.idle_exit),
            report_interval: Threshold::from_secs(self.report),
        };
        Ok(config)
    }

    /// Text output that would land on top of the terminal view.
    fn prints_over_display(&self) -> bool {
        !self.headless && (self.report > 0 || self.dump > 0)
    }

    fn renderer(&self) -> Result<Box<dyn Renderer>> {
        if self.headless {
            return Ok(Box::new(HeadlessRenderer));
        }
        let screen = parse_size("-s", &self.size)?;
        let gutter = parse_size("-g", &self.gutter)?;
        Ok(Box::new(TerminalRenderer::new(
            std::io::stdout(),
            (screen.x, screen.y.unwrap_or(DEFAULT_SCREEN_HEIGHT)),
            (gutter.x, gutter.y_or_x()),
        )))
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_with(err: &SimError) -> ! {
    let mut message = format!("Error: {err}");
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    tracing::error!(fatal = err.is_fatal(), "{message}");
    eprintln!("{message}");
    std::process::exit(1);
}

fn log_reachable_addresses(port: u16) {
    match if_addrs::get_if_addrs() {
        Ok(interfaces) => {
            for iface in interfaces
                .iter()
                .filter(|iface| !iface.is_loopback() && iface.ip().is_ipv4())
            {
                tracing::info!(interface = %iface.name, "send DDP to {}:{}", iface.ip(), port);
            }
        }
        Err(e) => tracing::warn!("could not list network interfaces: {e}"),
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    println!("LED-Strip DDP Simulator version {}", env!("CARGO_PKG_VERSION"));

    let config = args.config().unwrap_or_else(|e| exit_with(&e));
    let mut renderer = args.renderer().unwrap_or_else(|e| exit_with(&e));
    tracing::info!(
        columns = config.layout.columns(),
        rows = config.layout.rows(),
        pixels = config.layout.pixel_count(),
        flags = ?config.layout.flags,
        "layout resolved"
    );
    if args.prints_over_display() {
        tracing::warn!("reports and dumps share stdout with the display, use --headless");
    }

    // Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("Failed to set Ctrl+C handler");

    let start = Instant::now();
    let mut sim = Simulator::new(&config, start).unwrap_or_else(|e| exit_with(&e));
    log_reachable_addresses(config.port);
    println!("Listening for DDP on UDP port {}", config.port);
    println!("Press Ctrl+C to stop.");

    match sim.run(renderer.as_mut(), &running) {
        Ok(stats) => {
            println!("\n{}", stats.report(start.elapsed().as_secs_f64()));
            println!("Shutting down.");
        }
        Err(e) => exit_with(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_output_with_terminal_view_is_flagged() {
        let args = Args::parse_from(["ddp-led-sim", "-r", "5"]);
        assert!(args.prints_over_display(), "Reports would scroll the canvas");

        let args = Args::parse_from(["ddp-led-sim", "-d", "10", "--headless"]);
        assert!(!args.prints_over_display());

        let args = Args::parse_from(["ddp-led-sim"]);
        assert!(!args.prints_over_display());
    }
}
