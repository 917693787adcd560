//! Device session driver.
//!
//! Owns the transport connection and serializes every exchange with the
//! capture hardware: identification handshake, capture requests, stop
//! signalling, network configuration and status queries. At most one
//! request/response exchange is outstanding per session; a second capture
//! attempt while one is pending fails fast with `Busy` instead of queuing.
//!
//! State machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected <-> Capturing -> Disconnected
//!                                   \------ Error (unrecoverable I/O) ----/
//! ```
//!
//! A session in `Error` can be reconnected explicitly with [`DeviceSession::connect`].
//! Timeouts and stop requests never leave `Connected`/`Capturing` in a
//! corrupt state: the wait is abandoned, and stale bytes from the abandoned
//! exchange are drained before the next request goes out.

use crate::capture::{self, CaptureReport};
use crate::config::EngineSettings;
use crate::error::{EngineError, EngineResult};
use crate::protocol::framing;
use crate::protocol::handshake::{self, DeviceInfo};
use crate::protocol::request::{self, NetworkConfig, RequestOpcode};
use crate::protocol::version::{FirmwareVersionValidator, VersionValidator};
use crate::session::{CaptureSession, TriggerType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Notify;

use super::transport::{self, DynTransport};

/// Acknowledgement line the device prints after persisting wireless
/// settings.
const NET_CONFIG_ACK: &str = "SETTINGS_SAVED";

/// Connection life cycle of a [`DeviceSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Capturing,
    Error,
}

#[derive(Debug, Default)]
struct CaptureControl {
    capturing: AtomicBool,
    cancel_requested: AtomicBool,
    cancel: Notify,
}

/// Cloneable handle that can abort an in-flight capture from another task.
#[derive(Debug, Clone)]
pub struct StopHandle {
    control: Arc<CaptureControl>,
}

impl StopHandle {
    /// Signal the pending capture to stop.
    ///
    /// Returns `false` when no capture is in flight; otherwise wakes the
    /// waiting call, which transmits the stop request to the device and
    /// returns [`EngineError::Cancelled`].
    pub fn stop(&self) -> bool {
        if !self.control.capturing.load(Ordering::SeqCst) {
            return false;
        }
        self.control.cancel_requested.store(true, Ordering::SeqCst);
        self.control.cancel.notify_waiters();
        true
    }
}

/// Driver for one capture device.
pub struct DeviceSession {
    connection: String,
    settings: EngineSettings,
    validator: Box<dyn VersionValidator>,
    transport: Option<BufReader<DynTransport>>,
    info: Option<DeviceInfo>,
    state: SessionState,
    control: Arc<CaptureControl>,
    /// Automatic reconnects consumed since the last successful connect.
    reconnect_attempts: u8,
}

enum WaitOutcome {
    Frame(EngineResult<Vec<u8>>),
    Cancelled,
    TimedOut,
}

impl DeviceSession {
    /// Create a session for a connection string: `host:port` selects TCP,
    /// anything else a serial port.
    pub fn new(connection: impl Into<String>, settings: EngineSettings) -> Self {
        Self::with_validator(connection, settings, Box::new(FirmwareVersionValidator))
    }

    /// Create a session with a custom firmware version validator.
    pub fn with_validator(
        connection: impl Into<String>,
        settings: EngineSettings,
        validator: Box<dyn VersionValidator>,
    ) -> Self {
        Self {
            connection: connection.into(),
            settings,
            validator,
            transport: None,
            info: None,
            state: SessionState::Disconnected,
            control: Arc::new(CaptureControl::default()),
            reconnect_attempts: 0,
        }
    }

    /// Create a session over an already-open transport.
    ///
    /// [`connect`](Self::connect) still performs the handshake. Mainly used
    /// with in-memory streams in tests; automatic reconnection is not
    /// available because there is no connection string to reopen.
    pub fn with_transport(transport: DynTransport, settings: EngineSettings) -> Self {
        let mut session = Self::new(String::new(), settings);
        session.transport = Some(BufReader::new(transport));
        session
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Device capabilities; populated only after a successful handshake.
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    /// Handle for aborting an in-flight capture from another task.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            control: self.control.clone(),
        }
    }

    /// Open the transport and run the identification handshake.
    ///
    /// On any failure the transport is dropped and the session stays
    /// `Disconnected`. Calling this while already connected is a no-op.
    pub async fn connect(&mut self) -> EngineResult<()> {
        match self.state {
            SessionState::Connected => return Ok(()),
            SessionState::Capturing => return Err(EngineError::Busy),
            SessionState::Error => {
                // The old transport is tainted; always reopen.
                self.transport = None;
                self.info = None;
            }
            SessionState::Disconnected | SessionState::Connecting => {}
        }

        self.state = SessionState::Connecting;
        match self.handshake().await {
            Ok(info) => {
                tracing::info!(
                    target: "logicdaq::device",
                    version = %info.version,
                    max_frequency = info.max_frequency,
                    buffer = info.buffer_size,
                    channels = info.channel_count,
                    "device connected"
                );
                self.info = Some(info);
                self.state = SessionState::Connected;
                self.reconnect_attempts = 0;
                Ok(())
            }
            Err(e) => {
                self.transport = None;
                self.info = None;
                self.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    async fn handshake(&mut self) -> EngineResult<DeviceInfo> {
        if self.transport.is_none() {
            let opened =
                transport::open_transport(&self.connection, self.settings.serial_baud).await?;
            self.transport = Some(BufReader::new(opened));
        }
        let line_timeout = Duration::from_millis(self.settings.handshake_timeout_ms);
        let reader = self
            .transport
            .as_mut()
            .ok_or_else(|| EngineError::Hardware("transport closed during connect".to_string()))?;

        let mut lines: [String; 5] = Default::default();
        for slot in &mut lines {
            let mut line = String::new();
            let n = tokio::time::timeout(line_timeout, reader.read_line(&mut line))
                .await
                .map_err(|_| EngineError::Timeout(line_timeout))??;
            if n == 0 {
                return Err(EngineError::Handshake(
                    "device closed the connection during identification".to_string(),
                ));
            }
            *slot = line;
        }

        handshake::parse_handshake(&lines, self.validator.as_ref())
    }

    /// Run a complete capture: arm the device and wait for the response.
    ///
    /// `Busy` if a capture is already outstanding, `Hardware` if not
    /// connected, `BadParams` if the settings do not fit the device. On
    /// success the decoded traces are attached to `session` and the report
    /// carries the decoder's non-fatal integrity findings.
    pub async fn start_capture(
        &mut self,
        session: &mut CaptureSession,
        timeout: Duration,
    ) -> EngineResult<CaptureReport> {
        self.begin_capture(session).await?;
        self.wait_capture(session, timeout).await
    }

    /// Validate, encode and transmit a capture request without waiting for
    /// the response. The session moves to `Capturing`; follow up with
    /// [`wait_capture`](Self::wait_capture).
    pub async fn begin_capture(&mut self, session: &mut CaptureSession) -> EngineResult<()> {
        if self.control.capturing.load(Ordering::SeqCst) || self.state == SessionState::Capturing {
            return Err(EngineError::Busy);
        }
        if self.state != SessionState::Connected {
            return Err(EngineError::Hardware("device not connected".to_string()));
        }
        let info = self
            .info
            .clone()
            .ok_or_else(|| EngineError::Hardware("device capabilities unknown".to_string()))?;
        validate_capture_settings(session, &info)?;

        session.refresh_capture_mode();
        let payload = request::encode_capture_request(session)?;
        let mut message = Vec::with_capacity(1 + payload.len());
        message.push(RequestOpcode::Capture as u8);
        message.extend_from_slice(&payload);
        let framed = framing::frame(&message);

        let drain_ms = self.settings.drain_timeout_ms;
        if let Some(reader) = self.transport.as_mut() {
            transport::drain_transport(reader, drain_ms).await;
        }
        self.transmit(&framed).await?;

        self.control.cancel_requested.store(false, Ordering::SeqCst);
        self.control.capturing.store(true, Ordering::SeqCst);
        self.state = SessionState::Capturing;
        tracing::debug!(
            target: "logicdaq::device",
            total_samples = session.total_samples(),
            mode = ?session.capture_mode,
            "capture armed"
        );
        Ok(())
    }

    /// Await the response of an armed capture.
    ///
    /// One suspend point, bounded by `timeout`. A timeout or stop abandons
    /// the wait and returns the session to `Connected` so the next request
    /// can proceed; the device may still complete the stale exchange, which
    /// is why every request drains the transport first.
    pub async fn wait_capture(
        &mut self,
        session: &mut CaptureSession,
        timeout: Duration,
    ) -> EngineResult<CaptureReport> {
        if self.state != SessionState::Capturing {
            return Err(EngineError::Hardware("no capture in progress".to_string()));
        }

        let control = self.control.clone();
        let max_len = self.settings.max_response_bytes;

        // Register for the stop signal before checking the flag, so a stop
        // landing between the check and the select cannot be missed.
        let cancelled = control.cancel.notified();
        tokio::pin!(cancelled);
        cancelled.as_mut().enable();

        let outcome = if control.cancel_requested.load(Ordering::SeqCst) {
            WaitOutcome::Cancelled
        } else {
            let reader = self.transport.as_mut().ok_or_else(|| {
                EngineError::Hardware("transport closed during capture".to_string())
            })?;
            tokio::select! {
                raw = framing::read_framed(reader, max_len) => WaitOutcome::Frame(raw),
                _ = &mut cancelled => WaitOutcome::Cancelled,
                _ = tokio::time::sleep(timeout) => WaitOutcome::TimedOut,
            }
        };

        self.control.capturing.store(false, Ordering::SeqCst);
        self.control.cancel_requested.store(false, Ordering::SeqCst);

        match outcome {
            WaitOutcome::Frame(Ok(raw)) => {
                self.state = SessionState::Connected;
                let mode = session.capture_mode;
                let report = capture::decode(&raw, session, mode)?;
                tracing::debug!(
                    target: "logicdaq::device",
                    samples = report.samples,
                    issues = report.integrity.len(),
                    "capture complete"
                );
                Ok(report)
            }
            WaitOutcome::Frame(Err(e)) => {
                self.state = match e {
                    EngineError::Io(_) | EngineError::Unexpected(_) => SessionState::Error,
                    _ => SessionState::Connected,
                };
                Err(e)
            }
            WaitOutcome::Cancelled => {
                // Best effort; the device stops streaming on its own once
                // the request lands.
                let stop = framing::frame(&[RequestOpcode::Stop as u8]);
                if let Some(reader) = self.transport.as_mut() {
                    let _ = reader.get_mut().write_all(&stop).await;
                    let _ = reader.get_mut().flush().await;
                }
                self.state = SessionState::Connected;
                tracing::debug!(target: "logicdaq::device", "capture stopped by request");
                Err(EngineError::Cancelled)
            }
            WaitOutcome::TimedOut => {
                self.state = SessionState::Connected;
                tracing::warn!(
                    target: "logicdaq::device",
                    timeout_ms = timeout.as_millis() as u64,
                    "capture response timed out; wait abandoned"
                );
                Err(EngineError::Timeout(timeout))
            }
        }
    }

    /// Abort an in-flight capture. `false` when nothing is capturing.
    pub fn stop_capture(&self) -> bool {
        self.stop_handle().stop()
    }

    /// Drop the transport and reset to `Disconnected`. Idempotent; any
    /// in-flight wait is cancelled before the handle closes.
    pub fn disconnect(&mut self) {
        self.control.cancel_requested.store(false, Ordering::SeqCst);
        self.control.capturing.store(false, Ordering::SeqCst);
        self.control.cancel.notify_waiters();
        self.transport = None;
        self.info = None;
        self.state = SessionState::Disconnected;
    }

    /// Push wireless settings to a network-capable device and wait for its
    /// acknowledgement.
    pub async fn send_network_config(
        &mut self,
        cfg: &NetworkConfig,
        timeout: Duration,
    ) -> EngineResult<()> {
        let payload = request::encode_net_config(cfg);
        let mut message = Vec::with_capacity(1 + payload.len());
        message.push(RequestOpcode::NetworkConfig as u8);
        message.extend_from_slice(&payload);

        let line = self.framed_request_line(&message, timeout).await?;
        if line == NET_CONFIG_ACK {
            Ok(())
        } else {
            Err(EngineError::Unexpected(format!(
                "device rejected network configuration: '{line}'"
            )))
        }
    }

    /// Query the device's supply/battery voltage reading.
    pub async fn voltage_status(&mut self, timeout: Duration) -> EngineResult<String> {
        self.framed_request_line(&[RequestOpcode::VoltageStatus as u8], timeout)
            .await
    }

    /// Send a framed request and read a single line back.
    async fn framed_request_line(
        &mut self,
        message: &[u8],
        timeout: Duration,
    ) -> EngineResult<String> {
        if self.control.capturing.load(Ordering::SeqCst) {
            return Err(EngineError::Busy);
        }
        if self.state != SessionState::Connected {
            return Err(EngineError::Hardware("device not connected".to_string()));
        }

        let framed = framing::frame(message);
        let drain_ms = self.settings.drain_timeout_ms;
        if let Some(reader) = self.transport.as_mut() {
            transport::drain_transport(reader, drain_ms).await;
        }
        self.transmit(&framed).await?;

        let reader = self
            .transport
            .as_mut()
            .ok_or_else(|| EngineError::Hardware("device not connected".to_string()))?;
        let mut line = String::new();
        let n = match tokio::time::timeout(timeout, reader.read_line(&mut line)).await {
            Err(_) => return Err(EngineError::Timeout(timeout)),
            Ok(Err(e)) => {
                self.state = SessionState::Error;
                return Err(EngineError::Io(e));
            }
            Ok(Ok(n)) => n,
        };
        if n == 0 {
            self.state = SessionState::Error;
            return Err(EngineError::Unexpected(
                "connection closed while waiting for a response".to_string(),
            ));
        }
        Ok(line.trim().to_string())
    }

    /// Write a framed request, allowing one automatic reconnect on a
    /// transport fault before the error surfaces.
    async fn transmit(&mut self, bytes: &[u8]) -> EngineResult<()> {
        match self.write_all_flush(bytes).await {
            Ok(()) => Ok(()),
            Err(first) => {
                if self.reconnect_attempts > 0 || self.connection.is_empty() {
                    self.state = SessionState::Error;
                    return Err(first);
                }
                self.reconnect_attempts += 1;
                tracing::warn!(
                    target: "logicdaq::device",
                    error = %first,
                    "transport fault, attempting one reconnect"
                );
                if let Err(reconnect_err) = self.reconnect().await {
                    self.state = SessionState::Error;
                    return Err(reconnect_err);
                }
                match self.write_all_flush(bytes).await {
                    Ok(()) => Ok(()),
                    Err(e) => {
                        self.state = SessionState::Error;
                        Err(e)
                    }
                }
            }
        }
    }

    async fn reconnect(&mut self) -> EngineResult<()> {
        self.transport = None;
        self.info = None;
        self.state = SessionState::Disconnected;
        self.connect().await
    }

    async fn write_all_flush(&mut self, bytes: &[u8]) -> EngineResult<()> {
        let reader = self
            .transport
            .as_mut()
            .ok_or_else(|| EngineError::Hardware("device not connected".to_string()))?;
        reader.get_mut().write_all(bytes).await?;
        reader.get_mut().flush().await?;
        Ok(())
    }
}

/// Check capture settings against the connected device's capabilities.
fn validate_capture_settings(session: &CaptureSession, info: &DeviceInfo) -> EngineResult<()> {
    if session.channels.is_empty() {
        return Err(EngineError::BadParams("no channels requested".to_string()));
    }
    if session.frequency == 0 {
        return Err(EngineError::BadParams(
            "sample frequency must be positive".to_string(),
        ));
    }
    let frequency_limit = if session.trigger_type == TriggerType::Blast {
        info.blast_frequency
    } else {
        info.max_frequency
    };
    if session.frequency > frequency_limit {
        return Err(EngineError::BadParams(format!(
            "frequency {} Hz exceeds the device limit of {} Hz",
            session.frequency, frequency_limit
        )));
    }
    if session.total_samples() > info.buffer_size as u64 {
        return Err(EngineError::BadParams(format!(
            "{} samples exceed the device buffer of {}",
            session.total_samples(),
            info.buffer_size
        )));
    }
    for channel in &session.channels {
        if channel.index >= info.channel_count {
            return Err(EngineError::BadParams(format!(
                "channel index {} is outside the device's {} channels",
                channel.index, info.channel_count
            )));
        }
    }
    if session.trigger_channel >= info.channel_count {
        return Err(EngineError::BadParams(format!(
            "trigger channel {} is outside the device's {} channels",
            session.trigger_channel, info.channel_count
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Channel;

    fn info() -> DeviceInfo {
        DeviceInfo {
            version: "1.2.0".to_string(),
            version_parts: (1, 2, 0),
            max_frequency: 100_000_000,
            blast_frequency: 200_000_000,
            buffer_size: 96_000,
            channel_count: 24,
        }
    }

    fn session() -> CaptureSession {
        let mut session = CaptureSession::new(1_000_000);
        session.pre_trigger_samples = 1_000;
        session.post_trigger_samples = 5_000;
        session.channels = vec![Channel::new(0), Channel::new(1)];
        session
    }

    #[test]
    fn test_validation_accepts_in_range_settings() {
        assert!(validate_capture_settings(&session(), &info()).is_ok());
    }

    #[test]
    fn test_validation_rejects_excess_frequency() {
        let mut s = session();
        s.frequency = 100_000_001;
        assert!(matches!(
            validate_capture_settings(&s, &info()),
            Err(EngineError::BadParams(_))
        ));

        // Blast captures are allowed up to the blast limit.
        s.trigger_type = TriggerType::Blast;
        assert!(validate_capture_settings(&s, &info()).is_ok());
    }

    #[test]
    fn test_validation_rejects_buffer_overflow() {
        let mut s = session();
        s.post_trigger_samples = 95_000;
        s.loop_count = 1;
        assert!(matches!(
            validate_capture_settings(&s, &info()),
            Err(EngineError::BadParams(_))
        ));
    }

    #[test]
    fn test_validation_rejects_out_of_range_channel() {
        let mut s = session();
        s.channels.push(Channel::new(24));
        assert!(matches!(
            validate_capture_settings(&s, &info()),
            Err(EngineError::BadParams(_))
        ));

        let mut s = session();
        s.trigger_channel = 24;
        assert!(matches!(
            validate_capture_settings(&s, &info()),
            Err(EngineError::BadParams(_))
        ));
    }

    #[tokio::test]
    async fn test_capture_requires_connection() {
        let mut device = DeviceSession::new("/dev/null-port", EngineSettings::default());
        let mut s = session();
        let err = device
            .start_capture(&mut s, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Hardware(_)));
        assert_eq!(device.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_stop_capture_is_noop_when_idle() {
        let device = DeviceSession::new("/dev/null-port", EngineSettings::default());
        assert!(!device.stop_capture());
        assert!(!device.stop_handle().stop());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut device = DeviceSession::new("/dev/null-port", EngineSettings::default());
        device.disconnect();
        device.disconnect();
        assert_eq!(device.state(), SessionState::Disconnected);
        assert!(device.device_info().is_none());
    }
}
