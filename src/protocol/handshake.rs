//! Identification handshake.
//!
//! After the transport opens, the device announces its capabilities as five
//! newline-terminated ASCII lines, in a fixed order:
//!
//! ```text
//! VER:<major.minor.patch>
//! FREQ:<max sample frequency, Hz>
//! BLASTFREQ:<max blast-mode frequency, Hz>
//! BUFFER:<sample buffer size>
//! CHANNELS:<channel count, 1..=128>
//! ```
//!
//! Every field is parsed and range-validated here; a single bad line fails
//! the whole handshake with a message naming the offending response, and the
//! session stays disconnected.

use crate::error::{EngineError, EngineResult};
use crate::protocol::version::VersionValidator;
use anyhow::{anyhow, Context, Result};

/// Device capabilities, only available after a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Firmware version as reported.
    pub version: String,
    /// Parsed firmware version components.
    pub version_parts: (u32, u32, u32),
    /// Maximum sample frequency in Hz.
    pub max_frequency: u32,
    /// Maximum sample frequency in blast mode, Hz.
    pub blast_frequency: u32,
    /// Device sample buffer size, in samples.
    pub buffer_size: u32,
    /// Number of physical channels, 1..=128.
    pub channel_count: u8,
}

/// Highest channel count any supported device reports.
pub const MAX_DEVICE_CHANNELS: u32 = 128;

/// Parse and validate the five handshake lines.
pub fn parse_handshake(
    lines: &[String; 5],
    validator: &dyn VersionValidator,
) -> EngineResult<DeviceInfo> {
    parse_inner(lines, validator).map_err(|e| EngineError::Handshake(e.to_string()))
}

fn parse_inner(lines: &[String; 5], validator: &dyn VersionValidator) -> Result<DeviceInfo> {
    let version = tagged_field(&lines[0], "VER:")?.to_string();
    let check = validator.validate(&version);
    if !check.is_valid {
        return Err(anyhow!("unparseable firmware version '{version}'"));
    }
    let minimum = validator.validate(&validator.minimum_version_string());
    if !check.at_least(&minimum) {
        return Err(anyhow!(
            "firmware {version} is older than the minimum supported {}",
            validator.minimum_version_string()
        ));
    }

    let max_frequency = numeric_field(&lines[1], "FREQ:")?;
    let blast_frequency = numeric_field(&lines[2], "BLASTFREQ:")?;
    let buffer_size = numeric_field(&lines[3], "BUFFER:")?;
    let channel_count = numeric_field(&lines[4], "CHANNELS:")?;
    if channel_count > MAX_DEVICE_CHANNELS {
        return Err(anyhow!(
            "CHANNELS count {channel_count} exceeds {MAX_DEVICE_CHANNELS}"
        ));
    }

    Ok(DeviceInfo {
        version_parts: (check.major, check.minor, check.patch),
        version,
        max_frequency,
        blast_frequency,
        buffer_size,
        channel_count: channel_count as u8,
    })
}

fn tagged_field<'a>(line: &'a str, tag: &str) -> Result<&'a str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix(tag)
        .map(str::trim)
        .ok_or_else(|| anyhow!("expected a '{tag}' response, got '{trimmed}'"))
}

fn numeric_field(line: &str, tag: &str) -> Result<u32> {
    let field = tagged_field(line, tag)?;
    let value: u32 = field
        .parse()
        .with_context(|| format!("non-numeric '{tag}' response '{field}'"))?;
    if value == 0 {
        return Err(anyhow!("'{tag}' response must be positive, got 0"));
    }
    Ok(value)
}
