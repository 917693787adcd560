//! Capture data model.
//!
//! A [`CaptureSession`] is both the configuration handed to the device and
//! the container the decoder writes per-channel traces into. Cloning comes
//! in two flavors: [`Clone::clone`] deep-copies everything including traces,
//! while [`CaptureSession::clone_settings`] copies the configuration only,
//! clearing every trace and the burst list so a session can be re-armed
//! without stale data.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware trigger flavor.
///
/// Complex and Fast triggers fire through extra logic in the device and
/// arrive late by a fixed number of nanoseconds; the request encoder
/// compensates for that delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerType {
    Edge,
    Complex,
    Fast,
    Blast,
}

impl TriggerType {
    /// Trigger propagation delay in nanoseconds.
    pub fn delay_ns(self) -> u32 {
        match self {
            TriggerType::Complex => 5,
            TriggerType::Fast => 3,
            TriggerType::Edge | TriggerType::Blast => 0,
        }
    }

    pub(crate) fn wire_value(self) -> u8 {
        match self {
            TriggerType::Edge => 0,
            TriggerType::Complex => 1,
            TriggerType::Fast => 2,
            TriggerType::Blast => 3,
        }
    }
}

/// Device sampling width class. Fixes how many bytes each raw sample
/// occupies on the wire and how many channels fit in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    Channels8,
    Channels16,
    Channels24,
}

impl CaptureMode {
    /// Raw sample width on the wire.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            CaptureMode::Channels8 => 1,
            CaptureMode::Channels16 => 2,
            CaptureMode::Channels24 => 4,
        }
    }

    /// Number of channels this mode can carry; valid indices are below it.
    pub fn channel_limit(self) -> u8 {
        match self {
            CaptureMode::Channels8 => 8,
            CaptureMode::Channels16 => 16,
            CaptureMode::Channels24 => 24,
        }
    }

    pub(crate) fn wire_value(self) -> u8 {
        match self {
            CaptureMode::Channels8 => 0,
            CaptureMode::Channels16 => 1,
            CaptureMode::Channels24 => 2,
        }
    }

    /// Narrowest mode whose channel range contains `max_index`.
    pub fn for_max_channel(max_index: u8) -> Self {
        if max_index < 8 {
            CaptureMode::Channels8
        } else if max_index < 16 {
            CaptureMode::Channels16
        } else {
            CaptureMode::Channels24
        }
    }
}

/// One logic channel of a capture session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// 0-based hardware channel index.
    pub index: u8,
    /// Display name; defaults to `"Channel <index+1>"`.
    pub name: String,
    /// Optional display color (0xRRGGBB).
    pub color: Option<u32>,
    /// Hidden in consumer views; still captured.
    pub hidden: bool,
    /// One byte per sample, values restricted to 0/1. Assigned once per
    /// capture by the decoder.
    pub trace: Option<Vec<u8>>,
}

impl Channel {
    pub fn new(index: u8) -> Self {
        Self {
            index,
            name: format!("Channel {}", index + 1),
            color: None,
            hidden: false,
            trace: None,
        }
    }

    pub fn with_name(index: u8, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new(index)
        }
    }
}

/// One detected gap between post-trigger sampling windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Burst {
    /// Sample index where the gap starts.
    pub start_sample: usize,
    /// Sample index where the gap ends.
    pub end_sample: usize,
    /// Gap width in samples.
    pub sample_gap: u64,
    /// Gap width in nanoseconds.
    pub nanos_gap: u64,
}

impl Burst {
    /// Build a burst record from two sample positions and the capture rate.
    pub fn from_gap(start_sample: usize, end_sample: usize, frequency: u32) -> Self {
        let sample_gap = end_sample.saturating_sub(start_sample) as u64;
        let nanos_gap = if frequency == 0 {
            0
        } else {
            sample_gap * 1_000_000_000 / frequency as u64
        };
        Self {
            start_sample,
            end_sample,
            sample_gap,
            nanos_gap,
        }
    }
}

impl fmt::Display for Burst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = self.nanos_gap;
        if ns < 1_000 {
            write!(f, "gap of {} samples ({} ns)", self.sample_gap, ns)
        } else if ns < 1_000_000 {
            write!(
                f,
                "gap of {} samples ({:.2} µs)",
                self.sample_gap,
                ns as f64 / 1e3
            )
        } else if ns < 1_000_000_000 {
            write!(
                f,
                "gap of {} samples ({:.2} ms)",
                self.sample_gap,
                ns as f64 / 1e6
            )
        } else {
            write!(
                f,
                "gap of {} samples ({:.2} s)",
                self.sample_gap,
                ns as f64 / 1e9
            )
        }
    }
}

/// Capture configuration plus result container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSession {
    /// Sample frequency in Hz.
    pub frequency: u32,
    /// Samples captured before the trigger fires.
    pub pre_trigger_samples: u32,
    /// Samples captured per post-trigger window.
    pub post_trigger_samples: u32,
    /// Extra post-trigger windows; the window runs `loop_count + 1` times.
    pub loop_count: u8,
    pub trigger_type: TriggerType,
    /// 0-based index of the trigger channel.
    pub trigger_channel: u8,
    pub trigger_inverted: bool,
    /// Pattern matched by Complex/Fast triggers.
    pub trigger_pattern: u16,
    /// Width of the trigger pattern in bits.
    pub trigger_bit_count: u8,
    /// Ask the device to measure gaps between post-trigger windows.
    pub measure_bursts: bool,
    /// Sampling width class; recomputed from the channel list before every
    /// capture.
    pub capture_mode: CaptureMode,
    /// Requested channels, in display order.
    pub channels: Vec<Channel>,
    /// Gaps measured during a burst capture, when available.
    pub bursts: Option<Vec<Burst>>,
}

impl CaptureSession {
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            pre_trigger_samples: 512,
            post_trigger_samples: 1024,
            loop_count: 0,
            trigger_type: TriggerType::Edge,
            trigger_channel: 0,
            trigger_inverted: false,
            trigger_pattern: 0,
            trigger_bit_count: 0,
            measure_bursts: false,
            capture_mode: CaptureMode::Channels8,
            channels: Vec::new(),
            bursts: None,
        }
    }

    /// Total sample count for this configuration:
    /// `pre + post * (loop_count + 1)`. Always recomputed, never cached.
    pub fn total_samples(&self) -> u64 {
        self.pre_trigger_samples as u64
            + self.post_trigger_samples as u64 * (self.loop_count as u64 + 1)
    }

    /// Highest requested channel index, if any channel is requested.
    pub fn max_channel_index(&self) -> Option<u8> {
        self.channels.iter().map(|c| c.index).max()
    }

    /// Re-derive the capture mode from the current channel list and store
    /// it. Returns the derived mode; an empty channel list keeps the
    /// narrowest mode.
    pub fn refresh_capture_mode(&mut self) -> CaptureMode {
        self.capture_mode = CaptureMode::for_max_channel(self.max_channel_index().unwrap_or(0));
        self.capture_mode
    }

    /// Configuration-only deep copy: identical settings and channel
    /// identities, with every trace and the burst list cleared. Used to
    /// re-arm a capture without dragging stale data along.
    pub fn clone_settings(&self) -> Self {
        let mut copy = self.clone();
        for channel in &mut copy.channels {
            channel.trace = None;
        }
        copy.bursts = None;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_samples_recomputed() {
        let mut session = CaptureSession::new(1_000_000);
        session.pre_trigger_samples = 1_000;
        session.post_trigger_samples = 5_000;
        session.loop_count = 3;
        assert_eq!(session.total_samples(), 21_000);

        session.loop_count = 0;
        assert_eq!(session.total_samples(), 6_000);
    }

    #[test]
    fn test_default_channel_name() {
        let channel = Channel::new(0);
        assert_eq!(channel.name, "Channel 1");
        let channel = Channel::new(23);
        assert_eq!(channel.name, "Channel 24");
    }

    #[test]
    fn test_capture_mode_from_max_channel() {
        assert_eq!(CaptureMode::for_max_channel(0), CaptureMode::Channels8);
        assert_eq!(CaptureMode::for_max_channel(7), CaptureMode::Channels8);
        assert_eq!(CaptureMode::for_max_channel(8), CaptureMode::Channels16);
        assert_eq!(CaptureMode::for_max_channel(15), CaptureMode::Channels16);
        assert_eq!(CaptureMode::for_max_channel(16), CaptureMode::Channels24);
        assert_eq!(CaptureMode::for_max_channel(23), CaptureMode::Channels24);
    }

    #[test]
    fn test_clone_settings_clears_traces() {
        let mut session = CaptureSession::new(1_000_000);
        session.channels = vec![Channel::new(0), Channel::with_name(1, "SCL")];
        session.channels[0].trace = Some(vec![0, 1, 1, 0]);
        session.channels[1].trace = Some(vec![1, 1, 0, 0]);
        session.bursts = Some(vec![Burst::from_gap(10, 20, 1_000_000)]);

        let rearmed = session.clone_settings();
        assert_eq!(rearmed.channels.len(), 2);
        assert_eq!(rearmed.channels[0].name, "Channel 1");
        assert_eq!(rearmed.channels[0].index, 0);
        assert_eq!(rearmed.channels[1].name, "SCL");
        assert!(rearmed.channels.iter().all(|c| c.trace.is_none()));
        assert!(rearmed.bursts.is_none());

        // The original keeps its data.
        assert!(session.channels[0].trace.is_some());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut session = CaptureSession::new(1_000_000);
        session.channels = vec![Channel::new(0)];
        session.channels[0].trace = Some(vec![0, 1]);

        let mut copy = session.clone();
        if let Some(trace) = copy.channels[0].trace.as_mut() {
            trace[0] = 1;
        }
        assert_eq!(session.channels[0].trace.as_deref(), Some(&[0u8, 1][..]));
        assert_eq!(copy.channels[0].trace.as_deref(), Some(&[1u8, 1][..]));
    }

    #[test]
    fn test_burst_display_thresholds() {
        let burst = Burst {
            start_sample: 0,
            end_sample: 10,
            sample_gap: 10,
            nanos_gap: 500,
        };
        assert!(burst.to_string().contains("500 ns"));

        let burst = Burst {
            nanos_gap: 2_500,
            ..burst
        };
        assert!(burst.to_string().contains("2.50 µs"));

        let burst = Burst {
            nanos_gap: 7_000_000,
            ..burst
        };
        assert!(burst.to_string().contains("7.00 ms"));

        let burst = Burst {
            nanos_gap: 3_000_000_000,
            ..burst
        };
        assert!(burst.to_string().contains("3.00 s"));
    }

    #[test]
    fn test_burst_from_gap() {
        let burst = Burst::from_gap(1_000, 1_100, 100_000_000);
        assert_eq!(burst.sample_gap, 100);
        // 100 samples at 100 MHz = 1000 ns
        assert_eq!(burst.nanos_gap, 1_000);
    }
}
