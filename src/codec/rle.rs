//! Run-length coding.
//!
//! The stream is a sequence of (value, run) byte pairs. Runs are capped at
//! 255; longer runs split into multiple pairs. A run length of 0 never
//! occurs in a valid stream.

use super::CodecError;

const MAX_RUN: usize = 255;

pub(super) fn compress(input: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::new();
    let mut runs = 0usize;
    let mut iter = input.iter().copied();

    let Some(mut current) = iter.next() else {
        return (out, runs);
    };
    let mut run = 1usize;
    for byte in iter {
        if byte == current && run < MAX_RUN {
            run += 1;
        } else {
            out.push(current);
            out.push(run as u8);
            runs += 1;
            current = byte;
            run = 1;
        }
    }
    out.push(current);
    out.push(run as u8);
    runs += 1;

    (out, runs)
}

pub(super) fn decompress(data: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
    if data.len() % 2 != 0 {
        return Err(CodecError::Corrupt(
            "run-length stream has a dangling value byte".to_string(),
        ));
    }
    let mut out = Vec::with_capacity(original_len);
    for pair in data.chunks_exact(2) {
        let (value, run) = (pair[0], pair[1]);
        if run == 0 {
            return Err(CodecError::Corrupt("zero-length run".to_string()));
        }
        out.extend(std::iter::repeat(value).take(run as usize));
    }
    if out.len() != original_len {
        return Err(CodecError::Corrupt(format!(
            "run-length stream expands to {} bytes, expected {original_len}",
            out.len()
        )));
    }
    Ok(out)
}
