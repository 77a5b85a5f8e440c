//! Error types for the Sixaxis session and report decoder

use packed_struct::PackingError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors that prevent a session from being established. No interfaces are
/// left claimed when one of these is returned.
#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("Device not found: {vendor_id:04X}:{product_id:04X}")]
    DeviceNotFound { vendor_id: u16, product_id: u16 },

    #[error("Unable to initialize USB transport: {0}")]
    TransportInit(TransportError),

    #[error("Unable to open device: {0}")]
    OpenFailed(TransportError),
}

/// Errors returned by a single input report fetch
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollError {
    #[error("Transfer timed out")]
    Timeout,

    #[error("Transfer failed with error code {0}")]
    TransferError(i32),
}

/// Errors decoding a raw input report
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Malformed report: expected at least {expected} bytes, got {actual}")]
    MalformedReport { expected: usize, actual: usize },

    #[error("Unable to unpack report: {0}")]
    Unpack(#[from] PackingError),
}

/// Errors that terminate a running session
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Poll error: {0}")]
    Poll(#[from] PollError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}
