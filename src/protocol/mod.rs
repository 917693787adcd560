//! Wire protocol: framing, request payloads, handshake and version checks.

pub mod framing;
pub mod handshake;
pub mod request;
pub mod version;

pub use handshake::DeviceInfo;
pub use request::{NetworkConfig, RequestOpcode};
pub use version::{FirmwareVersionValidator, VersionCheck, VersionValidator};
