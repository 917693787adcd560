//! Entropy coding with frequency-ranked fixed-width codes.
//!
//! Byte values are ranked by descending frequency (ascending value as the
//! tie-break, so encoding is deterministic). A value's code is its rank,
//! written MSB-first in `ceil(log2(distinct))` bits; the bit stream is
//! padded to a byte boundary. The rank table and the exact payload bit
//! length travel as metadata; with them, decoding is a plain fixed-width
//! table lookup.
//!
//! A single-valued input needs zero bits per symbol; the encoded stream is
//! empty and the original length alone reconstructs it.

use super::CodecError;

/// Bits needed to address `distinct` ranks.
fn code_width(distinct: usize) -> usize {
    if distinct <= 1 {
        0
    } else {
        (usize::BITS - (distinct - 1).leading_zeros()) as usize
    }
}

pub(super) fn compress(input: &[u8]) -> (Vec<u8>, Vec<u8>, usize) {
    let mut freq = [0usize; 256];
    for &byte in input {
        freq[byte as usize] += 1;
    }
    let mut table: Vec<u8> = (0..=255u8).filter(|&b| freq[b as usize] > 0).collect();
    table.sort_by(|&a, &b| freq[b as usize].cmp(&freq[a as usize]).then(a.cmp(&b)));

    let width = code_width(table.len());
    if width == 0 {
        return (Vec::new(), table, 0);
    }

    let mut code = [0u8; 256];
    for (rank, &value) in table.iter().enumerate() {
        code[value as usize] = rank as u8;
    }

    let bit_len = input.len() * width;
    let mut writer = BitWriter::with_capacity(bit_len);
    for &byte in input {
        writer.push(code[byte as usize] as u32, width);
    }
    (writer.into_bytes(), table, bit_len)
}

pub(super) fn decompress(
    data: &[u8],
    original_len: usize,
    table: &[u8],
    bit_len: usize,
) -> Result<Vec<u8>, CodecError> {
    let width = code_width(table.len());
    if width == 0 {
        if original_len == 0 {
            return Ok(Vec::new());
        }
        let value = *table
            .first()
            .ok_or_else(|| CodecError::Corrupt("empty code table".to_string()))?;
        return Ok(vec![value; original_len]);
    }

    if bit_len != original_len * width {
        return Err(CodecError::Corrupt(format!(
            "bit length {bit_len} does not match {original_len} symbols of {width} bits"
        )));
    }
    if data.len() * 8 < bit_len {
        return Err(CodecError::Corrupt(
            "entropy stream shorter than its bit length".to_string(),
        ));
    }

    let mut reader = BitReader::new(data);
    let mut out = Vec::with_capacity(original_len);
    for _ in 0..original_len {
        let rank = reader.read(width)? as usize;
        let value = *table.get(rank).ok_or_else(|| {
            CodecError::Corrupt(format!("code {rank} outside the {}-entry table", table.len()))
        })?;
        out.push(value);
    }
    Ok(out)
}

/// MSB-first bit accumulator.
struct BitWriter {
    bytes: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            bit_pos: 0,
        }
    }

    fn push(&mut self, value: u32, width: usize) {
        for shift in (0..width).rev() {
            let bit = (value >> shift) & 1;
            if self.bit_pos % 8 == 0 {
                self.bytes.push(0);
            }
            if bit != 0 {
                let last = self.bytes.len() - 1;
                self.bytes[last] |= 0x80 >> (self.bit_pos % 8);
            }
            self.bit_pos += 1;
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// MSB-first bit cursor over a byte slice.
struct BitReader<'a> {
    bytes: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, bit_pos: 0 }
    }

    fn read(&mut self, width: usize) -> Result<u32, CodecError> {
        let mut value = 0u32;
        for _ in 0..width {
            let byte = self
                .bytes
                .get(self.bit_pos / 8)
                .ok_or_else(|| CodecError::Corrupt("entropy stream exhausted".to_string()))?;
            let bit = (byte >> (7 - self.bit_pos % 8)) & 1;
            value = (value << 1) | bit as u32;
            self.bit_pos += 1;
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(input: &[u8]) -> (Vec<u8>, Vec<u8>, usize) {
        let (data, table, bit_len) = compress(input);
        assert_eq!(
            decompress(&data, input.len(), &table, bit_len).unwrap(),
            input
        );
        (data, table, bit_len)
    }

    #[test]
    fn test_code_width() {
        assert_eq!(code_width(0), 0);
        assert_eq!(code_width(1), 0);
        assert_eq!(code_width(2), 1);
        assert_eq!(code_width(3), 2);
        assert_eq!(code_width(4), 2);
        assert_eq!(code_width(5), 3);
        assert_eq!(code_width(256), 8);
    }

    #[test]
    fn test_binary_trace_uses_one_bit_per_sample() {
        let input = [0u8, 1, 1, 1, 0, 1, 0, 1, 1, 1, 1, 1, 0, 0, 1, 1];
        let (data, table, bit_len) = roundtrip(&input);
        // 1 is more frequent, so it ranks first.
        assert_eq!(table, vec![1, 0]);
        assert_eq!(bit_len, 16);
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_frequency_ranking_with_tie_break() {
        // 5 and 7 both occur twice; the smaller value ranks first.
        let input = [5, 7, 5, 7, 9];
        let (_, table, _) = roundtrip(&input);
        assert_eq!(table[2], 9);
        assert_eq!(&table[..2], &[5, 7]);
    }

    #[test]
    fn test_single_run_input() {
        let input = [4u8; 1000];
        let (data, table, bit_len) = roundtrip(&input);
        assert!(data.is_empty());
        assert_eq!(table, vec![4]);
        assert_eq!(bit_len, 0);
    }

    #[test]
    fn test_empty_input() {
        let (data, table, bit_len) = roundtrip(&[]);
        assert!(data.is_empty());
        assert!(table.is_empty());
        assert_eq!(bit_len, 0);
    }

    #[test]
    fn test_padding_is_excluded_by_bit_len() {
        // Three 1-bit symbols occupy one padded byte; bit_len pins the
        // payload to exactly three bits.
        let input = [0u8, 1, 0];
        let (data, _, bit_len) = compress(&input);
        assert_eq!(data.len(), 1);
        assert_eq!(bit_len, 3);
    }

    #[test]
    fn test_decompress_rejects_inconsistent_bit_len() {
        let (data, table, _) = compress(&[0u8, 1, 0, 1]);
        assert!(matches!(
            decompress(&data, 4, &table, 3),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn test_decompress_rejects_short_stream() {
        let (_, table, bit_len) = compress(&[0u8, 1, 0, 1, 1, 0, 1, 0, 1]);
        assert!(matches!(
            decompress(&[], 9, &table, bit_len),
            Err(CodecError::Corrupt(_))
        ));
    }

    #[test]
    fn test_many_distinct_values() {
        let input: Vec<u8> = (0..200u8).chain(0..50u8).collect();
        roundtrip(&input);
    }
}
