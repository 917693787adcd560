//! Engine configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `LOGICDAQ_*` environment variables. All fields have working defaults so a
//! caller can also just use `EngineSettings::default()`.

use crate::error::{EngineError, EngineResult};
use config::Config;
use serde::Deserialize;

/// Tunable engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    /// Baud rate used when the connection string names a serial port.
    pub serial_baud: u32,
    /// Per-line timeout for the identification handshake, in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Window spent discarding stale transport data before a new request,
    /// in milliseconds.
    pub drain_timeout_ms: u64,
    /// Upper bound on a single framed device response, in bytes.
    pub max_response_bytes: usize,
    /// Traces shorter than this are stored uncompressed.
    pub min_compress_len: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            serial_baud: 115_200,
            handshake_timeout_ms: 2_000,
            drain_timeout_ms: 50,
            max_response_bytes: 64 * 1024 * 1024,
            min_compress_len: 64,
        }
    }
}

impl EngineSettings {
    /// Load settings from defaults, an optional TOML file and the
    /// `LOGICDAQ_*` environment, in increasing precedence.
    pub fn load(config_path: Option<&str>) -> EngineResult<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("serial_baud", defaults.serial_baud as i64)?
            .set_default("handshake_timeout_ms", defaults.handshake_timeout_ms as i64)?
            .set_default("drain_timeout_ms", defaults.drain_timeout_ms as i64)?
            .set_default("max_response_bytes", defaults.max_response_bytes as i64)?
            .set_default("min_compress_len", defaults.min_compress_len as i64)?;

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("LOGICDAQ"))
            .build()?;

        settings.try_deserialize().map_err(EngineError::Config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_load_without_file() {
        let settings = EngineSettings::load(None).unwrap();
        assert_eq!(settings.serial_baud, 115_200);
        assert_eq!(settings.min_compress_len, 64);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "serial_baud = 921600").unwrap();
        writeln!(file, "drain_timeout_ms = 25").unwrap();

        let settings = EngineSettings::load(path.to_str()).unwrap();
        assert_eq!(settings.serial_baud, 921_600);
        assert_eq!(settings.drain_timeout_ms, 25);
        // Untouched keys keep their defaults.
        assert_eq!(settings.handshake_timeout_ms, 2_000);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = EngineSettings::load(Some("/nonexistent/engine.toml"));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_environment_overrides_defaults() {
        std::env::set_var("LOGICDAQ_MAX_RESPONSE_BYTES", "1048576");
        let settings = EngineSettings::load(None).unwrap();
        std::env::remove_var("LOGICDAQ_MAX_RESPONSE_BYTES");
        assert_eq!(settings.max_response_bytes, 1_048_576);
    }
}
