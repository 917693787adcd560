//! Fixed-layout request payloads.
//!
//! Two payloads exist: the capture configuration (45 bytes) and the network
//! configuration (115 bytes). Both use little-endian multi-byte integers and
//! are framed by the transport codec before transmission. A one-byte opcode
//! in front of the payload tells the device which request it is looking at.
//!
//! Capture request layout:
//!
//! ```text
//! offset  size  field
//!      0     1  trigger type
//!      1     1  trigger channel index
//!      2     1  trigger inverted flag
//!      3     2  trigger pattern (LE)
//!      5    24  channel enable array (byte i = 1 iff channel i requested)
//!     29     1  requested channel count
//!     30     4  sample frequency in Hz (LE)
//!     34     4  pre-trigger samples (LE, delay-compensated)
//!     38     4  post-trigger samples (LE)
//!     42     1  loop count
//!     43     1  measure-bursts flag
//!     44     1  capture mode
//! ```

use crate::error::{EngineError, EngineResult};
use crate::session::{CaptureMode, CaptureSession};

/// Size of the encoded capture request payload.
pub const CAPTURE_REQUEST_LEN: usize = 45;
/// Size of the encoded network configuration payload.
pub const NET_CONFIG_LEN: usize = 115;
/// Channel slots in the enable array.
const CHANNEL_SLOTS: usize = 24;

/// Request discriminator transmitted as the first payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RequestOpcode {
    Capture = 1,
    Stop = 2,
    NetworkConfig = 3,
    VoltageStatus = 4,
}

/// Wireless settings pushed to network-capable devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Access point name, at most 32 characters on the wire.
    pub access_point: String,
    /// Access point password, at most 63 characters on the wire.
    pub password: String,
    /// Dotted IPv4 address, at most 15 characters on the wire.
    pub ip_address: String,
    /// TCP listen port.
    pub port: u16,
}

/// Extra pre-trigger samples that compensate for the trigger's
/// propagation delay: `round(delay_ns * frequency / 1e9)`.
fn trigger_delay_samples(session: &CaptureSession) -> u32 {
    let delay_ns = session.trigger_type.delay_ns() as u64;
    if delay_ns == 0 {
        return 0;
    }
    ((delay_ns * session.frequency as u64 + 500_000_000) / 1_000_000_000) as u32
}

/// Serialize a capture session into the fixed 45-byte request payload.
///
/// The capture mode is derived from the highest requested channel index.
/// Fails with `BadParams` when no channel is requested or a channel index
/// does not fit the enable array.
pub fn encode_capture_request(session: &CaptureSession) -> EngineResult<[u8; CAPTURE_REQUEST_LEN]> {
    let max_index = session
        .max_channel_index()
        .ok_or_else(|| EngineError::BadParams("no channels requested".to_string()))?;
    if max_index as usize >= CHANNEL_SLOTS {
        return Err(EngineError::BadParams(format!(
            "channel index {max_index} does not fit the {CHANNEL_SLOTS}-channel request layout"
        )));
    }

    let mut buf = [0u8; CAPTURE_REQUEST_LEN];
    buf[0] = session.trigger_type.wire_value();
    buf[1] = session.trigger_channel;
    buf[2] = session.trigger_inverted as u8;
    buf[3..5].copy_from_slice(&session.trigger_pattern.to_le_bytes());
    for channel in &session.channels {
        buf[5 + channel.index as usize] = 1;
    }
    buf[29] = session.channels.len() as u8;
    buf[30..34].copy_from_slice(&session.frequency.to_le_bytes());
    let pre = session
        .pre_trigger_samples
        .saturating_add(trigger_delay_samples(session));
    buf[34..38].copy_from_slice(&pre.to_le_bytes());
    buf[38..42].copy_from_slice(&session.post_trigger_samples.to_le_bytes());
    buf[42] = session.loop_count;
    buf[43] = session.measure_bursts as u8;
    buf[44] = CaptureMode::for_max_channel(max_index).wire_value();
    Ok(buf)
}

/// Serialize wireless settings into the fixed 115-byte payload.
///
/// Field sizes are 33 + 64 + 16 + 2; each string field keeps a trailing NUL,
/// so oversized strings are silently truncated to one byte less than their
/// field.
pub fn encode_net_config(cfg: &NetworkConfig) -> [u8; NET_CONFIG_LEN] {
    let mut buf = [0u8; NET_CONFIG_LEN];
    write_cstr(&mut buf[0..33], &cfg.access_point);
    write_cstr(&mut buf[33..97], &cfg.password);
    write_cstr(&mut buf[97..113], &cfg.ip_address);
    buf[113..115].copy_from_slice(&cfg.port.to_le_bytes());
    buf
}

/// Copy a string into a null-terminated fixed-size field, truncating as
/// needed. The destination is assumed zeroed.
fn write_cstr(dst: &mut [u8], value: &str) {
    let max = dst.len() - 1;
    let bytes = value.as_bytes();
    let len = bytes.len().min(max);
    dst[..len].copy_from_slice(&bytes[..len]);
}
