//! Delta coding.
//!
//! The first byte is stored verbatim; every following byte is the wrapping
//! difference to its predecessor. Decoding rebuilds the stream by cumulative
//! wrapping addition. The encoded stream is always the same length as the
//! input; the value of this codec is the run-friendly shape it gives slowly
//! changing traces before a second-stage coder.

use super::CodecError;

pub(super) fn compress(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut previous = 0u8;
    for (i, &byte) in input.iter().enumerate() {
        if i == 0 {
            out.push(byte);
        } else {
            out.push(byte.wrapping_sub(previous));
        }
        previous = byte;
    }
    out
}

pub(super) fn decompress(data: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
    if data.len() != original_len {
        return Err(CodecError::Corrupt(format!(
            "delta stream is {} bytes, expected {original_len}",
            data.len()
        )));
    }
    let mut out = Vec::with_capacity(original_len);
    let mut accumulator = 0u8;
    for (i, &byte) in data.iter().enumerate() {
        accumulator = if i == 0 {
            byte
        } else {
            accumulator.wrapping_add(byte)
        };
        out.push(accumulator);
    }
    Ok(out)
}
