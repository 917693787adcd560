//! Binary capture response decoder.
//!
//! Response layout:
//!
//! ```text
//! ┌──────────────┬────────────────────────────┬────────────┬─────────┐
//! │ sample count │ count × bytes-per-sample   │ trailer    │ trailer │
//! │ 4 bytes LE   │ raw samples, LE multi-byte │ length 1 B │ bytes   │
//! └──────────────┴────────────────────────────┴────────────┴─────────┘
//! ```
//!
//! Bytes per sample follow the capture mode: 1 for 8-channel, 2 for
//! 16-channel, 4 for 24-channel. The trailer is reserved: its length byte is
//! consumed and the payload discarded.
//!
//! Decoding is best-effort. The hard preconditions (too-short input, empty
//! channel list, channel index outside the mode) fail outright; everything
//! else, such as a truncated sample block or a missing trailer, degrades to an
//! [`IntegrityIssue`] while the decoder still attaches every trace it could
//! reconstruct.

use crate::error::{EngineError, EngineResult, IntegrityIssue};
use crate::session::{CaptureMode, CaptureSession};

/// Outcome of decoding one capture response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Samples actually decoded per channel.
    pub samples: usize,
    /// Non-fatal structural findings, empty on a clean capture.
    pub integrity: Vec<IntegrityIssue>,
}

/// Hard lower bound on a response: the count word plus one widest sample.
const MIN_RESPONSE_LEN: usize = 8;

/// Decode a capture response into the session's channel traces.
///
/// Each requested channel gets a fresh trace with one byte per sample,
/// `1` where the channel's bit is set in the raw sample. Returns the
/// decoded sample count alongside the integrity findings.
pub fn decode(
    raw: &[u8],
    session: &mut CaptureSession,
    mode: CaptureMode,
) -> EngineResult<CaptureReport> {
    if session.channels.is_empty() {
        return Err(EngineError::BadParams(
            "capture session requests no channels".to_string(),
        ));
    }
    if let Some(max_index) = session.max_channel_index() {
        if max_index >= mode.channel_limit() {
            return Err(EngineError::BadParams(format!(
                "channel index {} does not fit a {}-channel capture",
                max_index,
                mode.channel_limit()
            )));
        }
    }

    let (samples, mut integrity) = read_samples(raw, mode)?;

    for channel in &mut session.channels {
        let bit = channel.index as u32;
        let trace: Vec<u8> = samples.iter().map(|&s| ((s >> bit) & 1) as u8).collect();
        channel.trace = Some(trace);
    }

    integrity.extend(validate_traces(session));
    if !integrity.is_empty() {
        tracing::warn!(
            target: "logicdaq::capture",
            issues = integrity.len(),
            "capture decoded with integrity findings"
        );
    }

    Ok(CaptureReport {
        samples: samples.len(),
        integrity,
    })
}

/// Parse the raw response into wide samples without touching a session.
///
/// This is the entry point for the standalone extraction path in
/// [`crate::capture::extract`].
pub fn read_samples(
    raw: &[u8],
    mode: CaptureMode,
) -> EngineResult<(Vec<u32>, Vec<IntegrityIssue>)> {
    if raw.len() < MIN_RESPONSE_LEN {
        return Err(EngineError::Unexpected(format!(
            "capture response of {} bytes is shorter than the minimum of {MIN_RESPONSE_LEN}",
            raw.len()
        )));
    }

    let mut integrity = Vec::new();
    let expected = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize;
    let width = mode.bytes_per_sample();
    let available = (raw.len() - 4) / width;
    let count = expected.min(available);
    if count < expected {
        integrity.push(IntegrityIssue::TruncatedSamples {
            expected,
            decoded: count,
        });
    }

    let mut samples = Vec::with_capacity(count);
    let body = &raw[4..];
    for chunk in body.chunks_exact(width).take(count) {
        let sample = match mode {
            CaptureMode::Channels8 => chunk[0] as u32,
            CaptureMode::Channels16 => u16::from_le_bytes([chunk[0], chunk[1]]) as u32,
            CaptureMode::Channels24 => {
                u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
            }
        };
        samples.push(sample);
    }

    if count == expected {
        consume_trailer(&raw[4 + count * width..], &mut integrity);
    }

    Ok((samples, integrity))
}

/// Consume the reserved trailing block: a length byte plus that many bytes.
/// The payload is never interpreted.
fn consume_trailer(rest: &[u8], integrity: &mut Vec<IntegrityIssue>) {
    match rest.first() {
        None => integrity.push(IntegrityIssue::MissingTrailer),
        Some(&len) => {
            if rest.len() < 1 + len as usize {
                integrity.push(IntegrityIssue::MissingTrailer);
            }
        }
    }
}

/// Post-decode validation: non-empty traces, binary values, equal lengths.
fn validate_traces(session: &CaptureSession) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();
    let expected_len = session
        .channels
        .iter()
        .find_map(|c| c.trace.as_ref().map(Vec::len));

    for channel in &session.channels {
        match channel.trace.as_ref() {
            None => issues.push(IntegrityIssue::EmptyTrace {
                channel: channel.index,
            }),
            Some(trace) if trace.is_empty() => issues.push(IntegrityIssue::EmptyTrace {
                channel: channel.index,
            }),
            Some(trace) => {
                if let Some(pos) = trace.iter().position(|&v| v > 1) {
                    issues.push(IntegrityIssue::NonBinaryValue {
                        channel: channel.index,
                        index: pos,
                    });
                }
                if let Some(expected) = expected_len {
                    if trace.len() != expected {
                        issues.push(IntegrityIssue::LengthMismatch {
                            channel: channel.index,
                            len: trace.len(),
                            expected,
                        });
                    }
                }
            }
        }
    }
    issues
}
