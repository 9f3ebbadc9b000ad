//! Client error taxonomy. Each variant names the phase that failed.

use std::fmt;

use gntp_core::{ResourceError, ResponseError};

/// Phase of an outbound exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connect,
    Write,
    Read,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Connect => "connect",
            Phase::Write => "write",
            Phase::Read => "read",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// NOTIFY before a successful REGISTER. No I/O was attempted.
    #[error("must register before notify")]
    NotRegistered,
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to send packet to {addr}: {source}")]
    Write {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read response from {addr}: {source}")]
    Read {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{phase} timed out for {addr}")]
    Timeout { addr: String, phase: Phase },
    /// Response validated as an error.
    #[error(transparent)]
    Daemon(#[from] ResponseError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("callback listener: {0}")]
    Listener(#[source] std::io::Error),
}

impl ClientError {
    /// Raw response text, if the daemon answered.
    pub fn response(&self) -> Option<&str> {
        match self {
            ClientError::Daemon(ResponseError::Daemon { response, .. }) => Some(response.as_str()),
            _ => None,
        }
    }
}
