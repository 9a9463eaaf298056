#![forbid(unsafe_code)]
//! Shared types for the pars workspace.
//!
//! Defines the parity-file constants, little-endian read helpers,
//! `ParseError`, and the block geometry math that partitions a data file
//! into full blocks plus an optional undersized tail block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Magic bytes at offset 0 of every parity file.
pub const MAGIC_START: [u8; 4] = *b"PARS";
/// Magic bytes in the last four positions of every parity file.
pub const MAGIC_END: [u8; 4] = *b"SRAP";

/// Width of the whole-file digest stored in the header (BLAKE3 native).
pub const WHOLE_HASH_LEN: usize = 32;

/// Header bytes before the variable-length file name.
pub const HEADER_PREFIX_LEN: usize = 30 + WHOLE_HASH_LEN;
/// Trailer length (end magic).
pub const TRAILER_LEN: usize = 4;
/// Fixed header plus trailer bytes; total parity-file size is this plus the
/// stored name plus the parity records.
pub const FIXED_OVERHEAD_LEN: usize = HEADER_PREFIX_LEN + TRAILER_LEN;

/// Smallest permitted block edge length.
pub const MIN_BLOCK_DIM: u32 = 2;

// ── Header field offsets ────────────────────────────────────────────────────

pub const OFFSET_MAGIC_START: usize = 0;
pub const OFFSET_FILE_SIZE: usize = 4;
pub const OFFSET_WHOLE_HASH: usize = 12;
pub const OFFSET_BLOCK_DIM: usize = 12 + WHOLE_HASH_LEN;
pub const OFFSET_FULL_BLOCK_COUNT: usize = 16 + WHOLE_HASH_LEN;
pub const OFFSET_LAST_BLOCK_DIM: usize = 24 + WHOLE_HASH_LEN;
pub const OFFSET_FILE_NAME_LEN: usize = 28 + WHOLE_HASH_LEN;
pub const OFFSET_FILE_NAME: usize = HEADER_PREFIX_LEN;

// ── Parse errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("insufficient data: need {needed} bytes at offset {offset}, got {actual}")]
    InsufficientData {
        needed: usize,
        offset: usize,
        actual: usize,
    },
    #[error("invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },
    #[error("invalid field: {field} ({reason})")]
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
    #[error("integer conversion failed: {field}")]
    IntegerConversion { field: &'static str },
}

// ── Little-endian read helpers ──────────────────────────────────────────────

#[inline]
pub fn ensure_slice(data: &[u8], offset: usize, len: usize) -> Result<&[u8], ParseError> {
    let Some(end) = offset.checked_add(len) else {
        return Err(ParseError::InvalidField {
            field: "offset",
            reason: "overflow",
        });
    };

    if end > data.len() {
        return Err(ParseError::InsufficientData {
            needed: len,
            offset,
            actual: data.len().saturating_sub(offset),
        });
    }

    Ok(&data[offset..end])
}

#[inline]
pub fn read_le_u16(data: &[u8], offset: usize) -> Result<u16, ParseError> {
    let bytes = ensure_slice(data, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

#[inline]
pub fn read_le_u32(data: &[u8], offset: usize) -> Result<u32, ParseError> {
    let bytes = ensure_slice(data, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

#[inline]
pub fn read_le_u64(data: &[u8], offset: usize) -> Result<u64, ParseError> {
    let bytes = ensure_slice(data, offset, 8)?;
    Ok(u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ]))
}

#[inline]
pub fn read_fixed<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], ParseError> {
    let bytes = ensure_slice(data, offset, N)?;
    let mut out = [0_u8; N];
    out.copy_from_slice(bytes);
    Ok(out)
}

/// Narrow a `u64` to `usize` with an explicit error path.
pub fn u64_to_usize(value: u64, field: &'static str) -> Result<usize, ParseError> {
    usize::try_from(value).map_err(|_| ParseError::IntegerConversion { field })
}

/// Narrow a `u64` to `u32` with an explicit error path.
pub fn u64_to_u32(value: u64, field: &'static str) -> Result<u32, ParseError> {
    u32::try_from(value).map_err(|_| ParseError::IntegerConversion { field })
}

// ── Block geometry ──────────────────────────────────────────────────────────

/// Ceiling integer square root: the smallest `d` with `d * d >= x`.
#[must_use]
pub fn smallest_dim(x: u64) -> u64 {
    let root = x.isqrt();
    if root * root == x { root } else { root + 1 }
}

/// How a data file of a given size partitions into parity blocks.
///
/// A file of `file_size` bytes splits into `full_blocks` blocks of
/// `dim * dim` bytes each, followed by an optional tail of `tail_len`
/// bytes covered by a `tail_dim * tail_dim` grid (`tail_dim <= dim`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockGeometry {
    pub file_size: u64,
    pub dim: u32,
    pub full_blocks: u64,
    pub tail_len: u64,
    pub tail_dim: u32,
}

/// One block's position within the data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub index: u64,
    /// Absolute offset of the block's first byte in the data file.
    pub offset: u64,
    /// Edge length of this block's grid (`dim` for full blocks).
    pub dim: u32,
    /// Actual data bytes this block holds (excludes grid padding).
    pub data_len: u64,
}

impl BlockGeometry {
    /// Partition `file_size` bytes using edge length `dim`.
    ///
    /// `dim` must already be normalized (see the sizing policy); this is
    /// pure arithmetic and never fails.
    #[must_use]
    pub fn for_file(file_size: u64, dim: u32) -> Self {
        let area = u64::from(dim) * u64::from(dim);
        let full_blocks = if area == 0 { 0 } else { file_size / area };
        let tail_len = file_size - full_blocks * area;
        // tail_len < dim^2, so its ceiling root always fits in u32.
        #[allow(clippy::cast_possible_truncation)]
        let tail_dim = smallest_dim(tail_len) as u32;
        Self {
            file_size,
            dim,
            full_blocks,
            tail_len,
            tail_dim,
        }
    }

    #[must_use]
    pub fn has_tail(&self) -> bool {
        self.tail_len > 0
    }

    /// Total blocks, tail included.
    #[must_use]
    pub fn block_count(&self) -> u64 {
        self.full_blocks + u64::from(self.has_tail())
    }

    /// On-disk length of one parity record for a block of edge `dim`.
    #[must_use]
    pub fn record_len(dim: u32) -> u64 {
        2 * u64::from(dim) + 4
    }

    /// Combined on-disk length of all parity records.
    #[must_use]
    pub fn records_len(&self) -> u64 {
        let full = Self::record_len(self.dim) * self.full_blocks;
        if self.has_tail() {
            full + Self::record_len(self.tail_dim)
        } else {
            full
        }
    }

    /// The span of block `index` (`0..block_count()`).
    ///
    /// # Panics
    ///
    /// Panics if `index >= block_count()`.
    #[must_use]
    pub fn span(&self, index: u64) -> BlockSpan {
        assert!(index < self.block_count(), "block index {index} out of range");
        let area = u64::from(self.dim) * u64::from(self.dim);
        if index < self.full_blocks {
            BlockSpan {
                index,
                offset: index * area,
                dim: self.dim,
                data_len: area,
            }
        } else {
            BlockSpan {
                index,
                offset: self.full_blocks * area,
                dim: self.tail_dim,
                data_len: self.tail_len,
            }
        }
    }
}
