//! Dictionary coding over fixed 4-byte windows.
//!
//! The input is scanned in non-overlapping 4-byte windows. Distinct windows
//! are collected in first-seen order into a table of at most 255 entries
//! (the table size has to fit its own length byte). Each window found in the
//! table is emitted as escape byte `255` followed by the table index; other
//! windows, and the sub-window remainder, pass through as literals.
//!
//! Stream layout:
//!
//! ```text
//! ┌────────────┬──────────────┬───────────────────┬───────┬─────────┐
//! │ table size │ pattern len  │ raw patterns      │ 0xFE  │ encoded │
//! │ 1 byte     │ 1 byte (=4)  │ size × 4 bytes    │       │ body    │
//! └────────────┴──────────────┴───────────────────┴───────┴─────────┘
//! ```
//!
//! Literal bytes equal to the escape (`255`) or separator (`254`) would be
//! ambiguous, so inputs containing them are refused with `NotApplicable`.
//! Logic traces only ever hold 0 and 1.

use super::CodecError;
use std::collections::HashMap;

const ESCAPE: u8 = 0xFF;
const TABLE_END: u8 = 0xFE;
const WINDOW: usize = 4;
const MAX_TABLE: usize = 255;

pub(super) fn compress(input: &[u8]) -> Result<(Vec<u8>, usize), CodecError> {
    if input.iter().any(|&b| b >= TABLE_END) {
        return Err(CodecError::NotApplicable("dictionary"));
    }

    let mut table: Vec<[u8; WINDOW]> = Vec::new();
    let mut index: HashMap<[u8; WINDOW], u8> = HashMap::new();
    for chunk in input.chunks_exact(WINDOW) {
        let window = [chunk[0], chunk[1], chunk[2], chunk[3]];
        if !index.contains_key(&window) && table.len() < MAX_TABLE {
            index.insert(window, table.len() as u8);
            table.push(window);
        }
    }

    let mut out = Vec::with_capacity(2 + table.len() * WINDOW + 1 + input.len() / 2);
    out.push(table.len() as u8);
    out.push(WINDOW as u8);
    for pattern in &table {
        out.extend_from_slice(pattern);
    }
    out.push(TABLE_END);

    let chunks = input.chunks_exact(WINDOW);
    let remainder = chunks.remainder();
    for chunk in chunks {
        let window = [chunk[0], chunk[1], chunk[2], chunk[3]];
        match index.get(&window) {
            Some(&i) => {
                out.push(ESCAPE);
                out.push(i);
            }
            None => out.extend_from_slice(chunk),
        }
    }
    out.extend_from_slice(remainder);

    Ok((out, table.len()))
}

pub(super) fn decompress(data: &[u8], original_len: usize) -> Result<Vec<u8>, CodecError> {
    if data.len() < 3 {
        return Err(CodecError::Corrupt(
            "dictionary stream shorter than its header".to_string(),
        ));
    }
    let table_len = data[0] as usize;
    let window = data[1] as usize;
    if window == 0 {
        return Err(CodecError::Corrupt("zero pattern length".to_string()));
    }
    let separator_at = 2 + table_len * window;
    if data.len() <= separator_at || data[separator_at] != TABLE_END {
        return Err(CodecError::Corrupt(
            "pattern table separator missing".to_string(),
        ));
    }
    let table: Vec<&[u8]> = (0..table_len)
        .map(|i| &data[2 + i * window..2 + (i + 1) * window])
        .collect();

    let mut out = Vec::with_capacity(original_len);
    let body = &data[separator_at + 1..];
    let mut i = 0;
    while i < body.len() {
        let byte = body[i];
        if byte == ESCAPE {
            let index = *body.get(i + 1).ok_or_else(|| {
                CodecError::Corrupt("escape byte at end of stream".to_string())
            })? as usize;
            let pattern = table.get(index).ok_or_else(|| {
                CodecError::Corrupt(format!("pattern index {index} outside table"))
            })?;
            out.extend_from_slice(pattern);
            i += 2;
        } else {
            out.push(byte);
            i += 1;
        }
    }

    if out.len() != original_len {
        return Err(CodecError::Corrupt(format!(
            "dictionary stream expands to {} bytes, expected {original_len}",
            out.len()
        )));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &[u8]) -> usize {
        let (data, table_len) = compress(input).unwrap();
        assert_eq!(decompress(&data, input.len()).unwrap(), input);
        table_len
    }

    #[test]
    fn test_repetitive_trace_compresses() {
        let mut input = Vec::new();
        for _ in 0..100 {
            input.extend_from_slice(&[0, 0, 1, 1]);
        }
        let (data, table_len) = compress(&input).unwrap();
        assert_eq!(table_len, 1);
        // Header 2 + 4 pattern bytes + separator + 100 escape pairs.
        assert_eq!(data.len(), 2 + 4 + 1 + 200);
        assert!(data.len() < input.len());
        assert_eq!(decompress(&data, input.len()).unwrap(), input);
    }

    #[test]
    fn test_remainder_bytes_pass_through() {
        let input = [0, 1, 0, 1, 1, 1];
        roundtrip(&input);
    }

    #[test]
    fn test_empty_and_subwindow_input() {
        assert_eq!(roundtrip(&[]), 0);
        assert_eq!(roundtrip(&[1, 0, 1]), 0);
    }

    #[test]
    fn test_first_seen_table_order() {
        let mut input = vec![9, 9, 9, 9];
        input.extend_from_slice(&[3, 3, 3, 3]);
        input.extend_from_slice(&[9, 9, 9, 9]);
        let (data, table_len) = compress(&input).unwrap();
        assert_eq!(table_len, 2);
        assert_eq!(&data[2..6], &[9, 9, 9, 9]);
        assert_eq!(&data[6..10], &[3, 3, 3, 3]);
        assert_eq!(decompress(&data, input.len()).unwrap(), input);
    }

    #[test]
    fn test_refuses_reserved_bytes() {
        assert_eq!(
            compress(&[0, 255, 0, 0]),
            Err(CodecError::NotApplicable("dictionary"))
        );
        assert_eq!(
            compress(&[254]),
            Err(CodecError::NotApplicable("dictionary"))
        );
    }

    #[test]
    fn test_decompress_rejects_bad_separator() {
        // Table claims one 4-byte pattern but the separator is wrong.
        let data = [1, 4, 0, 0, 1, 1, 0x00, 0xFF, 0];
        assert!(matches!(
            decompress(&data, 4),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn test_decompress_rejects_dangling_escape() {
        let data = [0, 4, TABLE_END, ESCAPE];
        assert!(matches!(
            decompress(&data, 4),
            Err(CodecError::Corrupt(_))
        ));
    }
}
