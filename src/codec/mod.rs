//! Trace compression codecs.
//!
//! A symmetric compress/decompress family for per-channel logic traces:
//! run-length, delta, dictionary and entropy coding, each exact on
//! round-trip. [`compress_adaptive`] tries the lossless trio and keeps the
//! smallest result that actually beats the input, storing verbatim
//! otherwise; inputs below the configured threshold are never compressed.
//!
//! The codecs are pure and re-entrant: safe to run concurrently across
//! channels and sessions, no shared state.

mod delta;
mod dictionary;
mod entropy;
mod rle;

use thiserror::Error;

/// Codec failure. `NotApplicable` means the input cannot be represented by
/// that codec (the adaptive path just skips it); `Corrupt` means a block
/// failed to decode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("input not representable by the {0} codec")]
    NotApplicable(&'static str),
    #[error("compressed block corrupt: {0}")]
    Corrupt(String),
}

/// Compression algorithm tag carried by every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Stored verbatim.
    None,
    /// Run-length (value, run) pairs.
    Rle,
    /// Byte-wise differences mod 256.
    Delta,
    /// 4-byte window dictionary with escape-coded references.
    Dictionary,
    /// Frequency-ranked fixed-width codes.
    Entropy,
}

/// Algorithm-specific decode metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    None,
    Rle {
        /// Number of (value, run) pairs emitted.
        runs: usize,
    },
    Dictionary {
        /// Entries in the embedded pattern table.
        table_len: usize,
    },
    Entropy {
        /// Byte values ranked by descending frequency; a code is its rank.
        table: Vec<u8>,
        /// Exact payload length in bits, excluding padding.
        bit_len: usize,
    },
}

/// One compressed trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedBlock {
    pub algorithm: Algorithm,
    /// Length of the original input in bytes.
    pub original_len: usize,
    pub data: Vec<u8>,
    pub metadata: Metadata,
}

impl CompressedBlock {
    /// Store an input verbatim.
    pub fn stored(input: &[u8]) -> Self {
        Self {
            algorithm: Algorithm::None,
            original_len: input.len(),
            data: input.to_vec(),
            metadata: Metadata::None,
        }
    }

    /// Encoded size of this block's payload.
    pub fn encoded_len(&self) -> usize {
        self.data.len()
    }
}

/// Compress with a specific algorithm.
pub fn compress(algorithm: Algorithm, input: &[u8]) -> Result<CompressedBlock, CodecError> {
    match algorithm {
        Algorithm::None => Ok(CompressedBlock::stored(input)),
        Algorithm::Rle => {
            let (data, runs) = rle::compress(input);
            Ok(CompressedBlock {
                algorithm,
                original_len: input.len(),
                data,
                metadata: Metadata::Rle { runs },
            })
        }
        Algorithm::Delta => Ok(CompressedBlock {
            algorithm,
            original_len: input.len(),
            data: delta::compress(input),
            metadata: Metadata::None,
        }),
        Algorithm::Dictionary => {
            let (data, table_len) = dictionary::compress(input)?;
            Ok(CompressedBlock {
                algorithm,
                original_len: input.len(),
                data,
                metadata: Metadata::Dictionary { table_len },
            })
        }
        Algorithm::Entropy => {
            let (data, table, bit_len) = entropy::compress(input);
            Ok(CompressedBlock {
                algorithm,
                original_len: input.len(),
                data,
                metadata: Metadata::Entropy { table, bit_len },
            })
        }
    }
}

/// Reconstruct the original bytes from a block.
pub fn decompress(block: &CompressedBlock) -> Result<Vec<u8>, CodecError> {
    match (&block.algorithm, &block.metadata) {
        (Algorithm::None, _) => Ok(block.data.clone()),
        (Algorithm::Rle, _) => rle::decompress(&block.data, block.original_len),
        (Algorithm::Delta, _) => delta::decompress(&block.data, block.original_len),
        (Algorithm::Dictionary, _) => dictionary::decompress(&block.data, block.original_len),
        (Algorithm::Entropy, Metadata::Entropy { table, bit_len }) => {
            entropy::decompress(&block.data, block.original_len, table, *bit_len)
        }
        (Algorithm::Entropy, _) => Err(CodecError::Corrupt(
            "entropy block without its code table".to_string(),
        )),
    }
}

/// Try RLE, delta and dictionary coding and keep the smallest result that
/// beats storing the input verbatim. Inputs below `min_len` are stored
/// unconditionally.
pub fn compress_adaptive(input: &[u8], min_len: usize) -> CompressedBlock {
    let mut best = CompressedBlock::stored(input);
    if input.len() < min_len {
        return best;
    }
    for algorithm in [Algorithm::Rle, Algorithm::Delta, Algorithm::Dictionary] {
        if let Ok(block) = compress(algorithm, input) {
            if block.encoded_len() < best.encoded_len() {
                best = block;
            }
        }
    }
    best
}
