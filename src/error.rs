//! Error types for the simulator.
//!
//! Everything that can go wrong after startup is an environment failure
//! (socket, receive, terminal output) and ends the main loop. Data-shape
//! anomalies in datagrams are never errors; they are clamped in
//! [`crate::ddp`].

use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T, E = SimError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SimError {
    #[error("DDP socket error while trying to {operation}")]
    Socket {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("DDP receive failed")]
    Receive(#[source] std::io::Error),

    #[error("Invalid geometry: {reason}")]
    InvalidGeometry { reason: String },

    #[error("Bad parameter ({value}) for {arg}")]
    InvalidArgument {
        arg: &'static str,
        value: String,
    },

    #[error("Renderer output failed")]
    Render(#[source] std::io::Error),
}

impl SimError {
    pub fn socket(operation: &'static str, source: std::io::Error) -> Self {
        Self::Socket { operation, source }
    }

    pub fn invalid_geometry(reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            reason: reason.into(),
        }
    }

    /// Whether the DDP channel or the display is unusable and the process
    /// has to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Socket { .. } | Self::Receive(_) | Self::Render(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io;

    #[test]
    fn test_socket_error_keeps_source() {
        let err = SimError::socket("bind", io::Error::new(io::ErrorKind::AddrInUse, "in use"));
        assert_eq!(err.to_string(), "DDP socket error while trying to bind");
        assert!(err.source().is_some(), "io error should be the source");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_configuration_errors_are_not_fatal_runtime_errors() {
        let err = SimError::invalid_geometry("columns must be at least 1");
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Invalid geometry: columns must be at least 1");

        let err = SimError::InvalidArgument {
            arg: "-s",
            value: "80y24".into(),
        };
        assert_eq!(err.to_string(), "Bad parameter (80y24) for -s");
    }
}
