//! Run configuration handed to the simulator before the first tick.

use crate::ddp::DDP_PORT;
use crate::error::{Result, SimError};
use crate::layout::LayoutConfig;
use crate::render::DrawOptions;
use crate::timing::Threshold;

/// A `N` or `NxM` command line value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub x: usize,
    pub y: Option<usize>,
}

impl Size {
    /// Second component, or the first one when only `N` was given.
    pub fn y_or_x(&self) -> usize {
        self.y.unwrap_or(self.x)
    }
}

/// Parses `N` or `NxM`. `arg` names the option for the error message.
pub fn parse_size(arg: &'static str, value: &str) -> Result<Size> {
    let bad = || SimError::InvalidArgument {
        arg,
        value: value.to_string(),
    };
    let number = |s: &str| s.trim().parse::<usize>().map_err(|_| bad());

    match value.split_once(['x', 'X']) {
        Some((x, y)) => Ok(Size {
            x: number(x)?,
            y: Some(number(y)?),
        }),
        None => Ok(Size {
            x: number(value)?,
            y: None,
        }),
    }
}

/// Idle and reporting limits. Zero disables each one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Thresholds {
    /// Blank the pixels after this long without data.
    pub hold: Threshold,
    /// Stop the simulator after this long without data.
    pub idle_exit: Threshold,
    /// Print a stats report this often.
    pub report_interval: Threshold,
}

/// Everything the simulator needs to run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub port: u16,
    pub layout: LayoutConfig,
    pub thresholds: Thresholds,
    pub draw: DrawOptions,
    /// Print every Nth data packet; 0 disables dumping.
    pub dump_nth: u64,
    /// Target frame rate for the main loop.
    pub fps: u32,
}

impl SimConfig {
    pub fn new(layout: LayoutConfig) -> Self {
        Self {
            port: DDP_PORT,
            layout,
            thresholds: Thresholds::default(),
            draw: DrawOptions::default(),
            dump_nth: 0,
            fps: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_value() {
        let size = parse_size("-p", "20").unwrap();
        assert_eq!(size, Size { x: 20, y: None });
        assert_eq!(size.y_or_x(), 20);
    }

    #[test]
    fn test_parse_tuple() {
        assert_eq!(parse_size("-s", "80x24").unwrap(), Size { x: 80, y: Some(24) });
        assert_eq!(parse_size("-s", "80X24").unwrap(), Size { x: 80, y: Some(24) });
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for value in ["", "x", "20x", "x10", "20y10", "-3", "abc"] {
            let err = parse_size("-p", value).unwrap_err();
            assert!(
                matches!(err, SimError::InvalidArgument { arg: "-p", .. }),
                "'{}' should be rejected, got {:?}",
                value,
                err
            );
        }
    }

    #[test]
    fn test_default_config() {
        let layout = LayoutConfig::resolve(20, None, None, Default::default()).unwrap();
        let config = SimConfig::new(layout);
        assert_eq!(config.port, 4048);
        assert_eq!(config.fps, 60);
        assert_eq!(config.thresholds.hold, Threshold::DISABLED);
        assert_eq!(config.dump_nth, 0);
    }
}
