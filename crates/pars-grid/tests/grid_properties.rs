#![forbid(unsafe_code)]
//! Property tests for the parity grid: the 2-D XOR identity, single-byte
//! recovery across arbitrary positions, and multi-byte detection.

use pars_grid::{BlockVerdict, ParityRecord, block_verdict};
use pars_types::BlockSpan;
use proptest::prelude::*;

fn xor_all(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

fn span(dim: u32, data_len: u64) -> BlockSpan {
    BlockSpan {
        index: 0,
        offset: 0,
        dim,
        data_len,
    }
}

/// A dim in 2..=16 with a full block buffer of arbitrary bytes.
fn block_strategy() -> impl Strategy<Value = (u32, Vec<u8>)> {
    (2_u32..=16).prop_flat_map(|dim| {
        let area = (dim * dim) as usize;
        (Just(dim), proptest::collection::vec(any::<u8>(), area))
    })
}

proptest! {
    #[test]
    fn xor_identity_holds((dim, buf) in block_strategy()) {
        let record = ParityRecord::compute(&buf, dim, buf.len());
        let total = xor_all(&buf);
        prop_assert_eq!(xor_all(&record.row), total);
        prop_assert_eq!(xor_all(&record.col), total);
        prop_assert_eq!(record.row.len(), dim as usize);
        prop_assert_eq!(record.col.len(), dim as usize);
    }

    #[test]
    fn single_flip_recovers_original(
        (dim, buf) in block_strategy(),
        pos_seed in any::<u64>(),
        flip in 1_u8..,
    ) {
        let stored = ParityRecord::compute(&buf, dim, buf.len());

        let pos = (pos_seed % buf.len() as u64) as usize;
        let mut corrupt = buf.clone();
        corrupt[pos] ^= flip;

        let fresh = ParityRecord::compute(&corrupt, dim, corrupt.len());
        let verdict = block_verdict(&stored, &fresh, &corrupt, span(dim, buf.len() as u64), true);

        match verdict {
            BlockVerdict::Fixed(fix) => {
                prop_assert_eq!(fix.offset, pos as u64);
                prop_assert_eq!(fix.value, buf[pos]);
            }
            other => prop_assert!(false, "expected Fixed, got {:?}", other),
        }
    }

    #[test]
    fn two_flips_sharing_an_axis_are_unfixable(
        (dim, buf) in block_strategy(),
        row_seed in any::<u64>(),
        a_seed in any::<u64>(),
        b_seed in any::<u64>(),
        flip in 1_u8..,
    ) {
        let stored = ParityRecord::compute(&buf, dim, buf.len());

        let dim_us = dim as usize;
        let row = (row_seed % dim as u64) as usize;
        let col_a = (a_seed % dim as u64) as usize;
        let col_b = (b_seed % (dim as u64 - 1)) as usize;
        let col_b = if col_b >= col_a { col_b + 1 } else { col_b };

        let mut corrupt = buf.clone();
        corrupt[row * dim_us + col_a] ^= flip;
        corrupt[row * dim_us + col_b] ^= flip;

        let fresh = ParityRecord::compute(&corrupt, dim, corrupt.len());
        let verdict = block_verdict(&stored, &fresh, &corrupt, span(dim, buf.len() as u64), true);
        prop_assert_eq!(verdict, BlockVerdict::Unfixable);
    }

    #[test]
    fn applying_the_fix_restores_the_block(
        (dim, buf) in block_strategy(),
        pos_seed in any::<u64>(),
        flip in 1_u8..,
    ) {
        let stored = ParityRecord::compute(&buf, dim, buf.len());

        let pos = (pos_seed % buf.len() as u64) as usize;
        let mut corrupt = buf.clone();
        corrupt[pos] ^= flip;

        let fresh = ParityRecord::compute(&corrupt, dim, corrupt.len());
        if let BlockVerdict::Fixed(fix) = block_verdict(
            &stored,
            &fresh,
            &corrupt,
            span(dim, buf.len() as u64),
            true,
        ) {
            corrupt[fix.offset as usize] = fix.value;
        }

        let healed = ParityRecord::compute(&corrupt, dim, corrupt.len());
        prop_assert_eq!(healed, stored);
        prop_assert_eq!(corrupt, buf);
    }
}
