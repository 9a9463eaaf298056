#![forbid(unsafe_code)]
//! On-disk parity-file format.
//!
//! Pure serialization crate — no I/O, no side effects. The layout is
//! little-endian throughout:
//!
//! ```text
//! "PARS" ‖ file_size:u64 ‖ whole_hash:[u8;32] ‖ block_dim:u32 ‖
//! full_block_count:u64 ‖ last_block_dim:u32 ‖ name_len:u16 ‖ name ‖
//! records… ‖ "SRAP"
//! ```
//!
//! Each parity record is `crc:u32 ‖ col[dim] ‖ row[dim]`. Total file size
//! must equal the header-implied size exactly; readers treat any deviation
//! as a framing failure.

use pars_error::{ParsError, Result};
use pars_grid::ParityRecord;
use pars_types::{
    BlockGeometry, FIXED_OVERHEAD_LEN, HEADER_PREFIX_LEN, MAGIC_END, MAGIC_START, MIN_BLOCK_DIM,
    OFFSET_BLOCK_DIM, OFFSET_FILE_NAME, OFFSET_FILE_NAME_LEN, OFFSET_FILE_SIZE,
    OFFSET_FULL_BLOCK_COUNT, OFFSET_LAST_BLOCK_DIM, OFFSET_WHOLE_HASH, WHOLE_HASH_LEN,
    ensure_slice, read_fixed, read_le_u16, read_le_u32, read_le_u64,
};
use serde::{Deserialize, Serialize};

// ── Header ──────────────────────────────────────────────────────────────────

/// Parsed parity-file header.
///
/// `file_name` is the protected data file's path relative to the directory
/// containing the parity file, with `/` separators on all platforms; a name
/// beginning with the platform separator is absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub file_size: u64,
    pub whole_hash: [u8; WHOLE_HASH_LEN],
    pub block_dim: u32,
    pub full_block_count: u64,
    pub last_block_dim: u32,
    pub file_name: String,
}

impl FileHeader {
    /// Serialize the header (magic through file name, records excluded).
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the file name does not fit in `u16`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let name = self.file_name.as_bytes();
        let name_len = u16::try_from(name.len()).map_err(|_| ParsError::InvalidArgument {
            field: "file_name",
            reason: "longer than 65535 bytes",
        })?;

        let mut out = Vec::with_capacity(HEADER_PREFIX_LEN + name.len());
        out.extend_from_slice(&MAGIC_START);
        out.extend_from_slice(&self.file_size.to_le_bytes());
        out.extend_from_slice(&self.whole_hash);
        out.extend_from_slice(&self.block_dim.to_le_bytes());
        out.extend_from_slice(&self.full_block_count.to_le_bytes());
        out.extend_from_slice(&self.last_block_dim.to_le_bytes());
        out.extend_from_slice(&name_len.to_le_bytes());
        out.extend_from_slice(name);
        Ok(out)
    }

    /// Parse a header from the front of a parity file.
    ///
    /// `bytes` must cover at least the fixed prefix and the stored name.
    /// Only the start magic is validated here; the end magic and the total
    /// size live at the file level and are the reader's responsibility.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let magic = read_fixed::<4>(bytes, 0)?;
        if magic != MAGIC_START {
            return Err(ParsError::MagicMissing { which: "start" });
        }

        let file_size = read_le_u64(bytes, OFFSET_FILE_SIZE)?;
        let whole_hash = read_fixed::<WHOLE_HASH_LEN>(bytes, OFFSET_WHOLE_HASH)?;
        let block_dim = read_le_u32(bytes, OFFSET_BLOCK_DIM)?;
        let full_block_count = read_le_u64(bytes, OFFSET_FULL_BLOCK_COUNT)?;
        let last_block_dim = read_le_u32(bytes, OFFSET_LAST_BLOCK_DIM)?;
        let name_len = read_le_u16(bytes, OFFSET_FILE_NAME_LEN)?;
        let name = ensure_slice(bytes, OFFSET_FILE_NAME, usize::from(name_len))?;

        Ok(Self {
            file_size,
            whole_hash,
            block_dim,
            full_block_count,
            last_block_dim,
            file_name: String::from_utf8_lossy(name).into_owned(),
        })
    }

    /// Length of the serialized header including the stored name.
    #[must_use]
    pub fn encoded_len(&self) -> u64 {
        HEADER_PREFIX_LEN as u64 + self.file_name.len() as u64
    }

    /// Total parity-file size this header implies, trailer included.
    #[must_use]
    pub fn implied_file_len(&self) -> u64 {
        let full = BlockGeometry::record_len(self.block_dim) * self.full_block_count;
        let tail = if self.last_block_dim > 0 {
            BlockGeometry::record_len(self.last_block_dim)
        } else {
            0
        };
        FIXED_OVERHEAD_LEN as u64 + self.file_name.len() as u64 + full + tail
    }

    /// Check that the declared block counts agree with the declared file
    /// size and return the resulting geometry.
    ///
    /// # Errors
    ///
    /// Returns `Format` when the header fields are internally inconsistent.
    pub fn geometry(&self) -> Result<BlockGeometry> {
        if self.block_dim < MIN_BLOCK_DIM {
            return Err(ParsError::Format(format!(
                "block_dim {} below minimum {MIN_BLOCK_DIM}",
                self.block_dim
            )));
        }

        let geom = BlockGeometry::for_file(self.file_size, self.block_dim);
        let tail_dim = if geom.has_tail() { geom.tail_dim } else { 0 };
        if geom.full_blocks != self.full_block_count || tail_dim != self.last_block_dim {
            return Err(ParsError::Format(format!(
                "block layout disagrees with file size: declared {}+{}, derived {}+{}",
                self.full_block_count, self.last_block_dim, geom.full_blocks, tail_dim
            )));
        }
        Ok(geom)
    }
}

// ── Trailer ─────────────────────────────────────────────────────────────────

/// Validate the four trailer bytes.
pub fn check_trailer(bytes: &[u8]) -> Result<()> {
    if bytes == MAGIC_END {
        Ok(())
    } else {
        Err(ParsError::MagicMissing { which: "end" })
    }
}

// ── Parity records ──────────────────────────────────────────────────────────

/// Append one record's wire form (`crc ‖ col ‖ row`) to `out`.
pub fn encode_record(record: &ParityRecord, out: &mut Vec<u8>) {
    out.extend_from_slice(&record.crc.to_le_bytes());
    out.extend_from_slice(&record.col);
    out.extend_from_slice(&record.row);
}

/// Parse one record for a block of edge `dim`.
///
/// # Errors
///
/// Returns `Format` when `bytes` is not exactly `2 * dim + 4` long.
pub fn parse_record(bytes: &[u8], dim: u32) -> Result<ParityRecord> {
    let dim_us = dim as usize;
    let expected = 2 * dim_us + 4;
    if bytes.len() != expected {
        return Err(ParsError::Format(format!(
            "parity record for dim {dim} must be {expected} bytes, got {}",
            bytes.len()
        )));
    }

    let crc = read_le_u32(bytes, 0)?;
    Ok(ParityRecord {
        crc,
        col: bytes[4..4 + dim_us].to_vec(),
        row: bytes[4 + dim_us..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> FileHeader {
        FileHeader {
            file_size: 300,
            whole_hash: [0xA5; WHOLE_HASH_LEN],
            block_dim: 8,
            full_block_count: 4,
            last_block_dim: 7,
            file_name: "data.bin".to_owned(),
        }
    }

    #[test]
    fn header_round_trip() {
        let header = sample_header();
        let bytes = header.encode().expect("encode");
        assert_eq!(bytes.len() as u64, header.encoded_len());
        let parsed = FileHeader::parse(&bytes).expect("parse");
        assert_eq!(parsed, header);
    }

    #[test]
    fn header_field_layout_is_fixed() {
        let bytes = sample_header().encode().expect("encode");
        assert_eq!(&bytes[0..4], b"PARS");
        assert_eq!(&bytes[4..12], &300_u64.to_le_bytes());
        assert_eq!(&bytes[12..44], &[0xA5; 32]);
        assert_eq!(&bytes[44..48], &8_u32.to_le_bytes());
        assert_eq!(&bytes[48..56], &4_u64.to_le_bytes());
        assert_eq!(&bytes[56..60], &7_u32.to_le_bytes());
        assert_eq!(&bytes[60..62], &8_u16.to_le_bytes());
        assert_eq!(&bytes[62..], b"data.bin");
    }

    #[test]
    fn bad_start_magic_is_rejected() {
        let mut bytes = sample_header().encode().expect("encode");
        bytes[0] = b'X';
        assert!(matches!(
            FileHeader::parse(&bytes),
            Err(ParsError::MagicMissing { which: "start" })
        ));
    }

    #[test]
    fn truncated_prefix_is_rejected() {
        let bytes = sample_header().encode().expect("encode");
        assert!(matches!(
            FileHeader::parse(&bytes[..40]),
            Err(ParsError::HeaderTruncated { .. })
        ));
    }

    #[test]
    fn truncated_name_is_rejected() {
        let bytes = sample_header().encode().expect("encode");
        assert!(matches!(
            FileHeader::parse(&bytes[..bytes.len() - 2]),
            Err(ParsError::HeaderTruncated { .. })
        ));
    }

    #[test]
    fn implied_len_matches_size_formula() {
        // 66 fixed bytes + 8-byte name + 4 full records of 20 bytes + one
        // 18-byte tail record.
        let header = sample_header();
        assert_eq!(header.implied_file_len(), 66 + 8 + 4 * 20 + 18);

        let no_tail = FileHeader {
            file_size: 256,
            block_dim: 4,
            full_block_count: 16,
            last_block_dim: 0,
            file_name: "a".to_owned(),
            ..sample_header()
        };
        assert_eq!(no_tail.implied_file_len(), 66 + 1 + 16 * 12);
    }

    #[test]
    fn geometry_checks_declared_counts() {
        assert!(sample_header().geometry().is_ok());

        let wrong_count = FileHeader {
            full_block_count: 5,
            ..sample_header()
        };
        assert!(matches!(
            wrong_count.geometry(),
            Err(ParsError::Format(_))
        ));

        let wrong_tail = FileHeader {
            last_block_dim: 6,
            ..sample_header()
        };
        assert!(wrong_tail.geometry().is_err());

        let tiny_dim = FileHeader {
            block_dim: 1,
            ..sample_header()
        };
        assert!(tiny_dim.geometry().is_err());
    }

    #[test]
    fn trailer_check() {
        assert!(check_trailer(b"SRAP").is_ok());
        assert!(matches!(
            check_trailer(b"PARS"),
            Err(ParsError::MagicMissing { which: "end" })
        ));
        assert!(check_trailer(&[]).is_err());
    }

    #[test]
    fn record_round_trip() {
        let buf: Vec<u8> = (0..16).collect();
        let record = ParityRecord::compute(&buf, 4, 16);

        let mut wire = Vec::new();
        encode_record(&record, &mut wire);
        assert_eq!(wire.len(), 12);
        assert_eq!(&wire[0..4], &record.crc.to_le_bytes());
        assert_eq!(&wire[4..8], record.col.as_slice());
        assert_eq!(&wire[8..12], record.row.as_slice());

        let parsed = parse_record(&wire, 4).expect("parse");
        assert_eq!(parsed, record);
    }

    #[test]
    fn record_length_mismatch_is_rejected() {
        let wire = vec![0_u8; 12];
        assert!(parse_record(&wire, 5).is_err());
        assert!(parse_record(&wire[..11], 4).is_err());
    }

    #[test]
    fn empty_name_is_allowed() {
        let header = FileHeader {
            file_name: String::new(),
            file_size: 0,
            block_dim: 2,
            full_block_count: 0,
            last_block_dim: 0,
            ..sample_header()
        };
        let bytes = header.encode().expect("encode");
        assert_eq!(bytes.len(), HEADER_PREFIX_LEN);
        assert_eq!(FileHeader::parse(&bytes).expect("parse"), header);
    }
}
