//! Custom error types for the acquisition engine.
//!
//! `EngineError` consolidates every fault class a caller can see, from
//! configuration loading to device communication. Connect and capture faults
//! are surfaced as typed results rather than panics so that calling code can
//! present actionable messages; only programming-error-class conditions
//! escape this taxonomy.
//!
//! Decoder integrity findings are deliberately *not* part of `EngineError`:
//! they are non-fatal, collected into a list and returned alongside the
//! best-effort trace data (see [`IntegrityIssue`]).

use std::time::Duration;
use thiserror::Error;

/// Convenience alias for results using the engine error type.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Primary error type for the acquisition engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration file or environment parsing failed.
    ///
    /// **Source**: Wraps `config::ConfigError` from the `config` crate.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Standard I/O operation failed (socket, serial port, file).
    ///
    /// Can be transient (connection reset) or permanent (port vanished);
    /// the device session attempts a single reconnect before surfacing it.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A wire frame was malformed: missing start/end marker, an unescaped
    /// reserved byte, or a truncated trailing escape sequence.
    #[error("Framing error: {0}")]
    Framing(String),

    /// The identification handshake produced an invalid or out-of-range
    /// response, or the firmware version is below the supported minimum.
    /// The session stays disconnected.
    #[error("Handshake error: {0}")]
    Handshake(String),

    /// Capture settings failed validation against the connected device's
    /// capabilities. Nothing was transmitted.
    #[error("Invalid capture parameters: {0}")]
    BadParams(String),

    /// A capture exchange is already outstanding on this session.
    ///
    /// Requests are never queued; the caller retries once the in-flight
    /// capture completes or is stopped.
    #[error("Device is busy with an outstanding capture")]
    Busy,

    /// The operation requires a connected device and none is available.
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// The device did not complete the exchange within the allowed time.
    ///
    /// The wait is abandoned without corrupting the session state; the
    /// device may still complete the stale exchange, so the session drains
    /// late data before the next request.
    #[error("Timed out after {0:?} waiting for the device")]
    Timeout(Duration),

    /// The in-flight capture was aborted through [`crate::StopHandle`].
    #[error("Capture cancelled")]
    Cancelled,

    /// Catch-all communication fault: the device answered with something the
    /// protocol does not allow, or the connection died mid-exchange.
    #[error("Unexpected device fault: {0}")]
    Unexpected(String),
}

/// Structural finding reported by the capture decoder.
///
/// These never abort decoding; partial trace data is always attached to the
/// session and the findings travel back to the caller as a list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// The response advertised more samples than it carried; the decoder
    /// used every complete sample it could read.
    #[error("sample block truncated: expected {expected} samples, decoded {decoded}")]
    TruncatedSamples { expected: usize, decoded: usize },

    /// The reserved trailing block (1-byte length plus payload) was absent
    /// or shorter than its own length byte claims.
    #[error("reserved trailer missing or short")]
    MissingTrailer,

    /// A requested channel ended up with no samples at all.
    #[error("channel {channel} produced an empty trace")]
    EmptyTrace { channel: u8 },

    /// A trace holds something other than 0 or 1.
    #[error("channel {channel} trace holds a non-binary value at sample {index}")]
    NonBinaryValue { channel: u8, index: usize },

    /// Traces from the same capture disagree about their length.
    #[error("channel {channel} trace length {len} differs from {expected}")]
    LengthMismatch {
        channel: u8,
        len: usize,
        expected: usize,
    },
}
