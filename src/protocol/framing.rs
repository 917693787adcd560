//! Byte-stuffing transport codec.
//!
//! Every request and response travels inside one frame:
//!
//! ```text
//! ┌───────────┬─────────────────┬───────────┐
//! │ 0x55 0xAA │ escaped payload │ 0xAA 0x55 │
//! └───────────┴─────────────────┴───────────┘
//! ```
//!
//! Payload bytes equal to `0xAA`, `0x55` or `0xF0` are replaced by `0xF0`
//! followed by `byte ^ 0xF0`, so the marker bytes never occur raw inside a
//! frame. The codec is stateless and payload-agnostic.

use crate::error::{EngineError, EngineResult};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Frame start marker.
pub const FRAME_START: [u8; 2] = [0x55, 0xAA];
/// Frame end marker.
pub const FRAME_END: [u8; 2] = [0xAA, 0x55];
/// Escape introducer; escaped bytes are XORed with it.
pub const ESCAPE: u8 = 0xF0;

fn is_reserved(byte: u8) -> bool {
    byte == 0xAA || byte == 0x55 || byte == ESCAPE
}

/// Wrap a payload in start/end markers, escaping reserved bytes.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 4);
    out.extend_from_slice(&FRAME_START);
    for &byte in payload {
        if is_reserved(byte) {
            out.push(ESCAPE);
            out.push(byte ^ ESCAPE);
        } else {
            out.push(byte);
        }
    }
    out.extend_from_slice(&FRAME_END);
    out
}

/// Strip the markers from a frame and reverse the escaping.
pub fn unframe(bytes: &[u8]) -> EngineResult<Vec<u8>> {
    if bytes.len() < 4 {
        return Err(EngineError::Framing(format!(
            "frame of {} bytes is shorter than its markers",
            bytes.len()
        )));
    }
    if bytes[..2] != FRAME_START {
        return Err(EngineError::Framing(format!(
            "missing start marker, found {:02X} {:02X}",
            bytes[0], bytes[1]
        )));
    }
    if bytes[bytes.len() - 2..] != FRAME_END {
        return Err(EngineError::Framing("missing end marker".to_string()));
    }

    let body = &bytes[2..bytes.len() - 2];
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        let byte = body[i];
        if byte == ESCAPE {
            let escaped = *body.get(i + 1).ok_or_else(|| {
                EngineError::Framing("truncated escape sequence at end of frame".to_string())
            })?;
            out.push(escaped ^ ESCAPE);
            i += 2;
        } else if is_reserved(byte) {
            return Err(EngineError::Framing(format!(
                "unescaped reserved byte {byte:02X} inside frame"
            )));
        } else {
            out.push(byte);
            i += 1;
        }
    }
    Ok(out)
}

/// Read one complete frame off an async transport and return its payload.
///
/// Leading noise before the start marker is discarded. Because payload bytes
/// are always escaped, the first raw `0xAA` after the start marker begins
/// the end marker, so scanning for `AA 55` cannot fire early. `max_len`
/// bounds the accumulated frame, escapes included.
pub async fn read_framed<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_len: usize,
) -> EngineResult<Vec<u8>> {
    let mut collected: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        if let Some(start) = find_marker(&collected, &FRAME_START) {
            if let Some(end) = find_marker(&collected[start + 2..], &FRAME_END) {
                let frame_end = start + 2 + end + 2;
                return unframe(&collected[start..frame_end]);
            }
        }
        if collected.len() > max_len {
            return Err(EngineError::Framing(format!(
                "frame exceeds maximum size of {max_len} bytes"
            )));
        }

        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(EngineError::Unexpected(
                "connection closed mid-frame".to_string(),
            ));
        }
        collected.extend_from_slice(&chunk[..n]);
    }
}

fn find_marker(haystack: &[u8], marker: &[u8; 2]) -> Option<usize> {
    haystack
        .windows(2)
        .position(|window| window == marker.as_slice())
}
