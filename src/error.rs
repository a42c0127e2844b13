use std::io;

use thiserror::Error;

/// Failures that reach the bridge loop. Each one belongs to exactly one link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("device i/o: {0}")]
    DeviceIo(#[source] io::Error),
    #[error("client disconnected: {0}")]
    ClientDisconnected(#[source] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Client,
    Device,
}

impl LinkError {
    pub fn domain(&self) -> Domain {
        match self {
            LinkError::DeviceUnavailable(_) | LinkError::DeviceIo(_) => Domain::Device,
            LinkError::ClientDisconnected(_) => Domain::Client,
        }
    }
}
