//! Device driver: transport plumbing and the capture session state machine.

pub mod session;
pub mod transport;

pub use session::{DeviceSession, SessionState, StopHandle};
pub use transport::{open_transport, DynTransport, TransportIO};
