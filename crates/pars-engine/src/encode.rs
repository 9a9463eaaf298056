#![forbid(unsafe_code)]

use crate::hash::whole_file_hash;
use crate::paths::{default_parity_path, stored_file_name};
use pars_error::Result;
use pars_grid::{ParityRecord, SizingTarget, derive_dim};
use pars_ondisk::{FileHeader, encode_record};
use pars_types::{BlockGeometry, MAGIC_END, u64_to_usize};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Summary of a freshly written parity file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParityFileInfo {
    pub parity_path: PathBuf,
    pub data_file_len: u64,
    pub block_dim: u32,
    pub full_block_count: u64,
    pub last_block_dim: u32,
    pub parity_file_len: u64,
}

/// Create (or overwrite) a parity file for `data_path`.
///
/// The destination is `out_path` when given, otherwise the data path with
/// `.pars` appended. The data file is read twice: a whole-file hash pass,
/// then a block pass that emits one parity record per block in order, tail
/// last. Output is byte-deterministic for identical inputs.
pub fn create_parity(
    target: SizingTarget,
    data_path: &Path,
    out_path: Option<&Path>,
) -> Result<ParityFileInfo> {
    let mut data = File::open(data_path)?;
    let file_size = data.metadata()?.len();

    let dim = derive_dim(target, file_size)?;
    let geometry = BlockGeometry::for_file(file_size, dim);

    let parity_path = out_path.map_or_else(|| default_parity_path(data_path), Path::to_path_buf);
    let file_name = stored_file_name(data_path, &parity_path);

    debug!(
        data = %data_path.display(),
        parity = %parity_path.display(),
        file_size,
        dim,
        full_blocks = geometry.full_blocks,
        tail_len = geometry.tail_len,
        "parity encode starting"
    );

    let whole_hash = whole_file_hash(&mut data)?;
    data.seek(SeekFrom::Start(0))?;

    let header = FileHeader {
        file_size,
        whole_hash,
        block_dim: geometry.dim,
        full_block_count: geometry.full_blocks,
        last_block_dim: if geometry.has_tail() {
            geometry.tail_dim
        } else {
            0
        },
        file_name,
    };

    let mut writer = BufWriter::new(File::create(&parity_path)?);
    writer.write_all(&header.encode()?)?;

    // One block buffer and one record, reused across all blocks.
    let area = u64_to_usize(u64::from(dim) * u64::from(dim), "block_area")?;
    let mut block = vec![0_u8; area];
    let mut record = ParityRecord::empty(dim);
    let mut wire = Vec::with_capacity(u64_to_usize(BlockGeometry::record_len(dim), "record_len")?);
    let mut reader = BufReader::with_capacity(1 << 20, &mut data);

    for index in 0..geometry.block_count() {
        let span = geometry.span(index);
        let span_area = u64_to_usize(u64::from(span.dim) * u64::from(span.dim), "block_area")?;
        let data_len = u64_to_usize(span.data_len, "block_data_len")?;

        if data_len < span_area {
            // Tail block: the grid extends past the file's last byte.
            block[data_len..span_area].fill(0);
        }
        reader.read_exact(&mut block[..data_len])?;

        record.recompute(&block[..span_area], span.dim, data_len);
        wire.clear();
        encode_record(&record, &mut wire);
        writer.write_all(&wire)?;
    }

    writer.write_all(&MAGIC_END)?;
    writer.flush()?;

    let parity_file_len = header.implied_file_len();
    info!(
        data = %data_path.display(),
        parity = %parity_path.display(),
        parity_file_len,
        blocks = geometry.block_count(),
        "parity file written"
    );

    Ok(ParityFileInfo {
        parity_path,
        data_file_len: file_size,
        block_dim: header.block_dim,
        full_block_count: header.full_block_count,
        last_block_dim: header.last_block_dim,
        parity_file_len,
    })
}
