#![forbid(unsafe_code)]
//! Parity sidecar engine.
//!
//! Produces, inspects, and consumes `.pars` companion files that detect
//! and repair single-byte corruption in arbitrary data files. Each parity
//! file carries a whole-file BLAKE3 digest plus one XOR-grid record per
//! block; validation locates a single corrupted byte per block at the
//! intersection of the mismatching row and column and rewrites it in
//! place.
//!
//! All I/O is synchronous and single-threaded; each invocation owns its
//! file handles and buffers exclusively.

mod encode;
mod hash;
mod paths;
mod validate;

pub use encode::{ParityFileInfo, create_parity};
pub use hash::whole_file_hash;
pub use paths::{default_parity_path, resolve_stored_name, stored_file_name};
pub use validate::{ValidationResult, get_parity_header, validate_parity};

pub use pars_error::{ParsError, Result};
pub use pars_grid::{BlockVerdict, ByteFix, SizingTarget};
pub use pars_ondisk::FileHeader;
pub use pars_types::BlockGeometry;

use std::path::Path;

/// Create a parity file sized for roughly `count` blocks.
pub fn create_parity_with_block_count(
    count: u64,
    data_path: &Path,
    out_path: Option<&Path>,
) -> Result<ParityFileInfo> {
    create_parity(SizingTarget::BlockCount(count), data_path, out_path)
}

/// Create a parity file whose stored parity bytes amount to about `ratio`
/// of the data size (`ratio` in `(0, 1]`).
pub fn create_parity_with_data_usage(
    ratio: f64,
    data_path: &Path,
    out_path: Option<&Path>,
) -> Result<ParityFileInfo> {
    create_parity(SizingTarget::DataUsage(ratio), data_path, out_path)
}

/// Create a parity file guaranteeing single-byte recovery within every
/// `(2 / coverage)^2`-byte window (`coverage` in `(0, 1]`).
pub fn create_parity_with_coverage(
    coverage: f64,
    data_path: &Path,
    out_path: Option<&Path>,
) -> Result<ParityFileInfo> {
    create_parity(SizingTarget::Coverage(coverage), data_path, out_path)
}

/// Create a parity file with an explicit block edge length.
pub fn create_parity_with_dimension(
    dim: u32,
    data_path: &Path,
    out_path: Option<&Path>,
) -> Result<ParityFileInfo> {
    create_parity(SizingTarget::Dimension(dim), data_path, out_path)
}
