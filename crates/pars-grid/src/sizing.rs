#![forbid(unsafe_code)]

use pars_error::{ParsError, Result};
use pars_types::{MIN_BLOCK_DIM, smallest_dim};

/// User-facing knob that selects the block edge length.
///
/// All four modes trade storage overhead (`(2*dim + 4) / dim^2` per block)
/// against recovery granularity; smaller edges cost more and recover more.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingTarget {
    /// Use this edge length directly.
    Dimension(u32),
    /// Aim for roughly this many blocks across the file.
    BlockCount(u64),
    /// Fraction of the data each stored parity byte should account for,
    /// in `(0, 1]`: each parity byte covers about `1 / ratio` data bytes.
    DataUsage(f64),
    /// Coverage guarantee in `(0, 1]`: single-byte recovery within every
    /// window of `(2 / coverage)^2` data bytes.
    Coverage(f64),
}

fn ratio_in_unit_interval(value: f64, field: &'static str) -> Result<f64> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ParsError::InvalidArgument {
            field,
            reason: "must be in (0, 1]",
        })
    }
}

/// Derive the normalized block edge length for a file of `file_size` bytes.
///
/// # Errors
///
/// Returns `ParsError::InvalidArgument` for a zero block count or a ratio
/// outside `(0, 1]`.
pub fn derive_dim(target: SizingTarget, file_size: u64) -> Result<u32> {
    let raw = match target {
        SizingTarget::Dimension(dim) => u64::from(dim),
        SizingTarget::BlockCount(count) => {
            if count == 0 {
                return Err(ParsError::InvalidArgument {
                    field: "block_count",
                    reason: "must be greater than zero",
                });
            }
            smallest_dim(file_size / count)
        }
        SizingTarget::DataUsage(ratio) => {
            let ratio = ratio_in_unit_interval(ratio, "data_usage")?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let bytes_per_parity_byte = (1.0 / ratio).floor() as u64;
            smallest_dim(bytes_per_parity_byte)
        }
        SizingTarget::Coverage(coverage) => {
            let coverage = ratio_in_unit_interval(coverage, "coverage")?;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                (2.0 / coverage).ceil() as u64
            }
        }
    };

    normalize_dim(raw, file_size)
}

/// Clamp to the minimum edge and shrink oversized requests so the file
/// holds at least one block.
fn normalize_dim(raw: u64, file_size: u64) -> Result<u32> {
    let mut dim = raw.max(u64::from(MIN_BLOCK_DIM));
    let area = u128::from(dim) * u128::from(dim);
    if u128::from(file_size) / area == 0 {
        // Too large for even one full block: shrink so the whole file fits
        // a single grid (which may then be stored as a lone tail block).
        dim = smallest_dim(file_size).max(u64::from(MIN_BLOCK_DIM));
    }
    u32::try_from(dim).map_err(|_| ParsError::InvalidArgument {
        field: "block_dim",
        reason: "derived edge length exceeds u32",
    })
}
