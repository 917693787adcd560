//! # logicdaq
//!
//! Acquisition engine for multi-vendor logic analyzers. This crate owns the
//! byte-level path between a capture device and the rest of a control
//! application: it speaks the device's private binary protocol over a serial
//! line or TCP socket, drives the capture life cycle, demultiplexes the raw
//! sample stream into per-channel logic traces, and compresses those traces
//! for storage and transfer. Rendering, session files and bus-level protocol
//! decoding are consumers of this engine and live elsewhere.
//!
//! ## Crate Structure
//!
//! - **`session`**: the capture data model: `CaptureSession`, `Channel`,
//!   `Burst`, trigger and capture-mode enums.
//! - **`protocol`**: the wire layer: byte-stuffed framing, fixed-layout
//!   request payloads, the identification handshake and firmware version
//!   validation.
//! - **`device`**: the driver: transport selection (serial or TCP) and the
//!   `DeviceSession` state machine that serializes all exchanges with the
//!   hardware.
//! - **`capture`**: the sample decoder: raw response block to per-channel
//!   traces, with non-fatal integrity reporting, plus the standalone
//!   bit-extraction and median-filter helpers.
//! - **`codec`**: the trace codecs: run-length, delta, dictionary and
//!   entropy compression with adaptive selection.
//! - **`config`**: engine settings loaded from defaults, an optional TOML
//!   file and the environment.
//! - **`error`**: the `EngineError` taxonomy shared by all of the above.
//!
//! ## Example
//!
//! ```no_run
//! use logicdaq::{CaptureSession, Channel, DeviceSession, EngineSettings};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut device = DeviceSession::new("/dev/ttyACM0", EngineSettings::default());
//!     device.connect().await?;
//!
//!     let mut session = CaptureSession::new(1_000_000);
//!     session.channels = (0..4).map(Channel::new).collect();
//!
//!     let report = device
//!         .start_capture(&mut session, Duration::from_secs(10))
//!         .await?;
//!     println!("captured {} samples", report.samples);
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod protocol;
pub mod session;

pub use capture::CaptureReport;
pub use config::EngineSettings;
pub use device::session::{DeviceSession, SessionState, StopHandle};
pub use error::{EngineError, EngineResult, IntegrityIssue};
pub use session::{Burst, CaptureMode, CaptureSession, Channel, TriggerType};
