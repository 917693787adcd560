//! Transport selection and shared byte-stream plumbing.
//!
//! A connection string of the form `host:port` (numeric port) selects a TCP
//! socket; anything else is treated as a serial port path and opened 8N1 at
//! the configured baud rate. Both end up type-erased behind [`DynTransport`],
//! so the driver and its tests (which substitute `tokio::io::DuplexStream`)
//! never care which one they got.

use crate::error::{EngineError, EngineResult};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::task::spawn_blocking;
use tokio_serial::SerialPortBuilderExt;

/// Trait alias for async transport I/O.
///
/// Satisfied by `tokio_serial::SerialStream`, `tokio::net::TcpStream` and
/// `tokio::io::DuplexStream` alike.
pub trait TransportIO: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> TransportIO for T {}

/// Type-erased boxed transport.
pub type DynTransport = Box<dyn TransportIO>;

/// Whether a connection string names a network endpoint (`host:port` with a
/// numeric port) rather than a serial port path.
pub fn is_network_address(connection: &str) -> bool {
    match connection.rsplit_once(':') {
        Some((host, port)) => {
            !host.is_empty() && !port.is_empty() && port.parse::<u16>().is_ok()
        }
        None => false,
    }
}

/// Open the transport a connection string selects.
pub async fn open_transport(connection: &str, baud_rate: u32) -> EngineResult<DynTransport> {
    if is_network_address(connection) {
        tracing::debug!(target: "logicdaq::transport", address = connection, "opening TCP transport");
        let stream = tokio::net::TcpStream::connect(connection).await?;
        // Requests are tiny; coalescing them only adds latency.
        let _ = stream.set_nodelay(true);
        Ok(Box::new(stream))
    } else {
        tracing::debug!(target: "logicdaq::transport", port = connection, baud_rate, "opening serial transport");
        let port = open_serial_async(connection, baud_rate).await?;
        Ok(Box::new(port))
    }
}

/// Open a serial port with standard 8N1 settings, off the async runtime.
async fn open_serial_async(
    port_path: &str,
    baud_rate: u32,
) -> EngineResult<tokio_serial::SerialStream> {
    let path = port_path.to_string();
    spawn_blocking(move || {
        tokio_serial::new(&path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| EngineError::Hardware(format!("failed to open serial port {path}: {e}")))
    })
    .await
    .map_err(|e| EngineError::Unexpected(format!("serial open task failed: {e}")))?
}

/// Discard stale bytes sitting in the transport.
///
/// Reads and drops data until nothing arrives within the window. Used before
/// each new request: an abandoned exchange may still complete late, and its
/// bytes must not be mistaken for the next response.
pub async fn drain_transport<R: AsyncRead + Unpin>(reader: &mut R, timeout_ms: u64) -> usize {
    let mut discard = [0u8; 256];
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    let mut total_discarded = 0usize;

    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        match tokio::time::timeout(remaining, reader.read(&mut discard)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => total_discarded += n,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => break,
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }

    if total_discarded > 0 {
        tracing::debug!(target: "logicdaq::transport", bytes = total_discarded, "discarded stale transport data");
    }
    total_discarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_network_address_detection() {
        assert!(is_network_address("192.168.1.20:4045"));
        assert!(is_network_address("analyzer.local:9000"));
        assert!(!is_network_address("/dev/ttyACM0"));
        assert!(!is_network_address("COM3"));
        assert!(!is_network_address("host:"));
        assert!(!is_network_address(":4045"));
        assert!(!is_network_address("host:notaport"));
        // Out of u16 range is not a port.
        assert!(!is_network_address("host:70000"));
    }

    #[tokio::test]
    async fn test_drain_discards_stale_bytes() {
        let (mut host, mut device) = tokio::io::duplex(64);
        host.write_all(b"stale data 12345").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let discarded = drain_transport(&mut device, 50).await;
        assert_eq!(discarded, 16);
    }

    #[tokio::test]
    async fn test_drain_on_quiet_transport() {
        let (_host, mut device) = tokio::io::duplex(64);
        let discarded = drain_transport(&mut device, 20).await;
        assert_eq!(discarded, 0);
    }
}
