//! LED-strip simulator fed by DDP (Distributed Display Protocol) over UDP.
//!
//! [`ddp::PacketSource`] pulls at most one datagram per tick into a
//! [`pixels::PixelBuffer`], [`layout::LayoutConfig`] maps strip indices onto
//! a grid, [`timing::TimingController`] decides when to blank, exit or
//! report, and [`sim::Simulator`] ties them together for a
//! [`render::Renderer`].

pub mod config;
pub mod ddp;
pub mod error;
pub mod layout;
pub mod pixels;
pub mod render;
pub mod sim;
pub mod stats;
pub mod timing;

pub use error::{Result, SimError};
