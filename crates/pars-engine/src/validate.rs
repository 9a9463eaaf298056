#![forbid(unsafe_code)]

use crate::hash::whole_file_hash;
use crate::paths::resolve_stored_name;
use pars_error::{ParsError, Result};
use pars_grid::{BlockVerdict, ByteFix, ParityRecord, block_verdict};
use pars_ondisk::{FileHeader, check_trailer, parse_record};
use pars_types::{BlockGeometry, HEADER_PREFIX_LEN, OFFSET_FILE_NAME_LEN, read_le_u16, u64_to_usize};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::os::unix::fs::FileExt;
use std::path::Path;
use tracing::{debug, info, warn};

/// Outcome of one validation pass.
///
/// Framing failures of the parity file itself surface as errors, never as
/// a result; every field here describes the *data* file against a
/// well-formed parity file. `analyzed_blocks` is false when the pipeline
/// short-circuited before the block scan (size mismatch or clean hash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub parity_file_ok: bool,
    pub size_ok: bool,
    pub hash_ok: bool,
    pub analyzed_blocks: bool,
    pub ok_blocks: u64,
    pub fixable_blocks: u64,
    pub fixed_blocks: u64,
    pub unfixable_blocks: u64,
}

impl ValidationResult {
    /// Report for a parity file that failed framing checks, for callers
    /// that fold errors into a uniform report shape.
    #[must_use]
    pub fn framing_failure() -> Self {
        Self {
            ok: false,
            parity_file_ok: false,
            size_ok: false,
            hash_ok: false,
            analyzed_blocks: false,
            ok_blocks: 0,
            fixable_blocks: 0,
            fixed_blocks: 0,
            unfixable_blocks: 0,
        }
    }
}

/// Read and fully check a parity file's framing: both magics, header
/// fields, declared-vs-actual total size, and internal block layout
/// consistency.
fn read_checked_header(parity: &mut File) -> Result<(FileHeader, BlockGeometry)> {
    let parity_len = parity.metadata()?.len();

    // Fixed prefix. A short read surfaces as HeaderTruncated (or
    // MagicMissing when even the first four bytes are wrong).
    let prefix_len = parity_len.min(HEADER_PREFIX_LEN as u64);
    let mut prefix = vec![0_u8; u64_to_usize(prefix_len, "header_prefix")?];
    parity.read_exact(&mut prefix)?;

    if prefix_len < HEADER_PREFIX_LEN as u64 {
        // Parse what we have so the most specific failure is reported
        // (bad magic beats truncation).
        FileHeader::parse(&prefix)?;
        return Err(ParsError::HeaderTruncated {
            needed: HEADER_PREFIX_LEN as u64,
            actual: parity_len,
        });
    }

    let name_len = read_le_u16(&prefix, OFFSET_FILE_NAME_LEN)?;
    let mut header_bytes = prefix;
    let name_start = header_bytes.len();
    header_bytes.resize(name_start + usize::from(name_len), 0);
    if let Err(err) = parity.read_exact(&mut header_bytes[name_start..]) {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            return Err(ParsError::HeaderTruncated {
                needed: HEADER_PREFIX_LEN as u64 + u64::from(name_len),
                actual: parity_len,
            });
        }
        return Err(err.into());
    }
    let header = FileHeader::parse(&header_bytes)?;

    // End magic sits in the last four bytes, wherever the file ends.
    let mut trailer = [0_u8; 4];
    parity.seek(SeekFrom::End(-4))?;
    parity.read_exact(&mut trailer)?;
    check_trailer(&trailer)?;

    let expected = header.implied_file_len();
    if parity_len != expected {
        return Err(ParsError::SizeInconsistent {
            expected,
            actual: parity_len,
        });
    }

    let geometry = header.geometry()?;
    Ok((header, geometry))
}

/// Read a parity file's header without touching the data file.
pub fn get_parity_header(parity_path: &Path) -> Result<FileHeader> {
    let mut parity = File::open(parity_path)?;
    let (header, _) = read_checked_header(&mut parity)?;
    debug!(
        parity = %parity_path.display(),
        data_name = %header.file_name,
        file_size = header.file_size,
        dim = header.block_dim,
        "parity header read"
    );
    Ok(header)
}

/// Validate the data file named by a parity file, optionally repairing
/// single-byte errors in place.
///
/// The pipeline short-circuits on a data-file size mismatch (blocks are
/// uncorrelated) and on a clean whole-file hash. Otherwise every block is
/// judged in index order; repairs are buffered during the scan and applied
/// afterwards as positioned single-byte writes in discovery order, so no
/// block's CRC recomputation ever observes a partial repair.
pub fn validate_parity(parity_path: &Path, try_fix: bool) -> Result<ValidationResult> {
    let mut parity = File::open(parity_path)?;
    let (header, geometry) = read_checked_header(&mut parity)?;

    let parity_dir = parity_path.parent().unwrap_or_else(|| Path::new(""));
    let data_path = resolve_stored_name(&header.file_name, parity_dir);

    let mut data = if try_fix {
        OpenOptions::new().read(true).write(true).open(&data_path)?
    } else {
        File::open(&data_path)?
    };

    let data_len = data.metadata()?.len();
    if data_len != header.file_size {
        warn!(
            data = %data_path.display(),
            recorded = header.file_size,
            actual = data_len,
            "data file size changed; blocks are uncorrelated"
        );
        return Ok(ValidationResult {
            ok: false,
            parity_file_ok: true,
            size_ok: false,
            hash_ok: false,
            analyzed_blocks: false,
            ok_blocks: 0,
            fixable_blocks: 0,
            fixed_blocks: 0,
            unfixable_blocks: 0,
        });
    }

    if whole_file_hash(&mut data)? == header.whole_hash {
        debug!(data = %data_path.display(), "whole-file hash matches");
        return Ok(ValidationResult {
            ok: true,
            parity_file_ok: true,
            size_ok: true,
            hash_ok: true,
            analyzed_blocks: false,
            ok_blocks: 0,
            fixable_blocks: 0,
            fixed_blocks: 0,
            unfixable_blocks: 0,
        });
    }

    // Block scan: stored records stream from the parity file while the
    // data file is re-read block by block.
    data.seek(SeekFrom::Start(0))?;
    parity.seek(SeekFrom::Start(header.encoded_len()))?;

    let mut ok_blocks = 0_u64;
    let mut fixable_blocks = 0_u64;
    let mut fixed_blocks = 0_u64;
    let mut unfixable_blocks = 0_u64;
    let mut fixes: Vec<ByteFix> = Vec::new();

    {
        let mut parity_reader = BufReader::new(&mut parity);
        let mut data_reader = BufReader::with_capacity(1 << 20, &mut data);

        let area = u64_to_usize(
            u64::from(geometry.dim) * u64::from(geometry.dim),
            "block_area",
        )?;
        let mut block = vec![0_u8; area];
        let mut record_wire =
            vec![0_u8; u64_to_usize(BlockGeometry::record_len(geometry.dim), "record_len")?];
        let mut fresh = ParityRecord::empty(geometry.dim);

        for index in 0..geometry.block_count() {
            let span = geometry.span(index);
            let record_len = u64_to_usize(BlockGeometry::record_len(span.dim), "record_len")?;
            parity_reader.read_exact(&mut record_wire[..record_len])?;
            let stored = parse_record(&record_wire[..record_len], span.dim)?;

            let span_area = u64_to_usize(u64::from(span.dim) * u64::from(span.dim), "block_area")?;
            let data_len = u64_to_usize(span.data_len, "block_data_len")?;
            if data_len < span_area {
                block[data_len..span_area].fill(0);
            }
            data_reader.read_exact(&mut block[..data_len])?;

            fresh.recompute(&block[..span_area], span.dim, data_len);
            match block_verdict(&stored, &fresh, &block[..span_area], span, try_fix) {
                BlockVerdict::Ok => ok_blocks += 1,
                BlockVerdict::Fixable => {
                    fixable_blocks += 1;
                    debug!(block = index, "single-byte error located (repair disabled)");
                }
                BlockVerdict::Fixed(fix) => {
                    fixed_blocks += 1;
                    fixes.push(fix);
                }
                BlockVerdict::Unfixable => {
                    unfixable_blocks += 1;
                    warn!(block = index, "block damage exceeds single-byte recovery");
                }
            }
        }
    }

    for fix in &fixes {
        data.write_all_at(&[fix.value], fix.offset)?;
    }
    if !fixes.is_empty() {
        info!(
            data = %data_path.display(),
            repairs = fixes.len(),
            "buffered repairs applied"
        );
    }

    let ok = unfixable_blocks == 0 && fixable_blocks == 0;
    info!(
        data = %data_path.display(),
        ok,
        ok_blocks,
        fixable_blocks,
        fixed_blocks,
        unfixable_blocks,
        "block scan complete"
    );

    Ok(ValidationResult {
        ok,
        parity_file_ok: true,
        size_ok: true,
        hash_ok: false,
        analyzed_blocks: true,
        ok_blocks,
        fixable_blocks,
        fixed_blocks,
        unfixable_blocks,
    })
}
