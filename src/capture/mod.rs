//! Raw sample stream decoding.

pub mod decoder;
pub mod extract;

pub use decoder::{decode, read_samples, CaptureReport};
pub use extract::{extract_bits, median_filter};
