use clap::{Parser, ValueEnum};
use ddp_led_sim::ddp::{DdpHeader, DDP_PORT, HEADER_LEN, MAX_DATAGRAM};
use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, ValueEnum)]
enum Pattern {
    /// Hue wheel moving along the strip
    Rainbow,
    /// One lit pixel running along the strip
    Chase,
    /// Every pixel the same colour
    Solid,
}

#[derive(Parser)]
#[command(name = "test-sender", about = "Send DDP test patterns to a simulator")]
struct Args {
    /// Simulator IP address
    #[arg(short = 't', long = "target", default_value = "127.0.0.1")]
    target: String,

    /// UDP port
    #[arg(short, long, default_value_t = DDP_PORT)]
    port: u16,

    /// Number of pixels per frame
    #[arg(short = 'n', long, default_value_t = 200)]
    pixels: usize,

    /// Frames to send
    #[arg(short, long, default_value_t = 300)]
    count: u32,

    /// Frames per second
    #[arg(short, long, default_value_t = 30)]
    fps: u32,

    #[arg(long, value_enum, default_value_t = Pattern::Rainbow)]
    pattern: Pattern,
}

fn hue_to_rgb(hue: u8) -> [u8; 3] {
    let h = hue as u16 * 6;
    let sector = h / 256;
    let rise = (h % 256) as u8;
    let fall = 255 - rise;
    match sector {
        0 => [255, rise, 0],
        1 => [fall, 255, 0],
        2 => [0, 255, rise],
        3 => [0, fall, 255],
        4 => [rise, 0, 255],
        _ => [255, 0, fall],
    }
}

fn render(pattern: Pattern, pixels: usize, frame: u32, buf: &mut Vec<u8>) {
    buf.clear();
    for i in 0..pixels {
        let hue = (i as u32 * 256 / pixels.max(1) as u32).wrapping_add(frame.wrapping_mul(4));
        let rgb = match pattern {
            Pattern::Rainbow => hue_to_rgb(hue as u8),
            Pattern::Chase if i == frame as usize % pixels.max(1) => [255, 255, 255],
            Pattern::Chase => [0, 0, 0],
            Pattern::Solid => hue_to_rgb(frame.wrapping_mul(2) as u8),
        };
        buf.extend_from_slice(&rgb);
    }
}

fn main() {
    let args = Args::parse();

    let max_pixels = (MAX_DATAGRAM - HEADER_LEN) / 3;
    if args.pixels > max_pixels {
        eprintln!(
            "Note: {} pixels do not fit one datagram, sending the first {}",
            args.pixels, max_pixels
        );
    }
    let pixels = args.pixels.min(max_pixels);

    let socket = UdpSocket::bind("0.0.0.0:0").expect("Failed to bind socket");
    let target = format!("{}:{}", args.target, args.port);
    println!("Sending {} frames of {} pixels to {}...", args.count, pixels, target);

    let period = Duration::from_secs(1) / args.fps.max(1);
    let mut payload = Vec::with_capacity(pixels * 3);
    for frame in 0..args.count {
        render(args.pattern, pixels, frame, &mut payload);
        let packet = DdpHeader::datagram((frame % 15 + 1) as u8, &payload);
        if let Err(e) = socket.send_to(&packet, &target) {
            eprintln!("Error sending: {}", e);
            break;
        }
        thread::sleep(period);
    }

    println!("\nDone.");
}
