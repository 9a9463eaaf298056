#![forbid(unsafe_code)]
//! Block-level parity grid for pars.
//!
//! A block of `dim * dim` bytes is summarized by a parity record: one XOR
//! byte per row, one per column, and a CRC-32 over the block's actual data
//! bytes. A single corrupted byte flips exactly one row XOR and one column
//! XOR; the intersection locates it and the row equation recovers its
//! value. This crate is pure computation with no I/O.

mod record;
mod sizing;
mod verify;

pub use record::ParityRecord;
pub use sizing::{SizingTarget, derive_dim};
pub use verify::{BlockVerdict, ByteFix, block_verdict};
