#![forbid(unsafe_code)]

/// Parity summary of one block: CRC plus per-row and per-column XOR bytes.
///
/// For a tail block the buffer is zero-padded out to `dim * dim` and the
/// CRC covers only the first `data_len` bytes; the padding contributes
/// nothing to the XOR vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParityRecord {
    pub crc: u32,
    pub col: Vec<u8>,
    pub row: Vec<u8>,
}

impl ParityRecord {
    /// A zeroed record sized for edge length `dim`, ready for `recompute`.
    #[must_use]
    pub fn empty(dim: u32) -> Self {
        let dim = dim as usize;
        Self {
            crc: 0,
            col: vec![0; dim],
            row: vec![0; dim],
        }
    }

    /// Compute the record for a block buffer.
    ///
    /// `buf` must hold exactly `dim * dim` bytes (padding included);
    /// `data_len` is the count of actual data bytes at the front.
    #[must_use]
    pub fn compute(buf: &[u8], dim: u32, data_len: usize) -> Self {
        let mut record = Self::empty(dim);
        record.recompute(buf, dim, data_len);
        record
    }

    /// Recompute this record in place, reusing the row/col allocations.
    ///
    /// # Panics
    ///
    /// Panics if `buf.len() != dim * dim` or `data_len > buf.len()`.
    pub fn recompute(&mut self, buf: &[u8], dim: u32, data_len: usize) {
        let dim = dim as usize;
        assert_eq!(buf.len(), dim * dim, "block buffer must be dim^2 bytes");
        assert!(data_len <= buf.len(), "data_len exceeds block buffer");

        self.row.clear();
        self.row.resize(dim, 0);
        self.col.clear();
        self.col.resize(dim, 0);

        for (i, grid_row) in buf.chunks_exact(dim).enumerate() {
            let mut acc = 0_u8;
            for (j, &byte) in grid_row.iter().enumerate() {
                acc ^= byte;
                self.col[j] ^= byte;
            }
            self.row[i] = acc;
        }

        self.crc = crc32fast::hash(&buf[..data_len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_all(bytes: &[u8]) -> u8 {
        bytes.iter().fold(0, |acc, b| acc ^ b)
    }

    #[test]
    fn zero_block_is_all_zero_parity() {
        let buf = [0_u8; 16];
        let record = ParityRecord::compute(&buf, 4, 16);
        assert_eq!(record.row, vec![0; 4]);
        assert_eq!(record.col, vec![0; 4]);
        assert_eq!(record.crc, crc32fast::hash(&[0_u8; 16]));
    }

    #[test]
    fn row_and_col_match_manual_xor() {
        let buf: Vec<u8> = (0..16).collect();
        let record = ParityRecord::compute(&buf, 4, 16);
        for i in 0..4 {
            assert_eq!(record.row[i], xor_all(&buf[i * 4..(i + 1) * 4]), "row {i}");
        }
        for j in 0..4 {
            let column: Vec<u8> = (0..4).map(|i| buf[i * 4 + j]).collect();
            assert_eq!(record.col[j], xor_all(&column), "col {j}");
        }
    }

    #[test]
    fn row_xor_equals_col_xor_equals_block_xor() {
        let buf: Vec<u8> = (0..49).map(|i| (i * 37 + 11) as u8).collect();
        let record = ParityRecord::compute(&buf, 7, 49);
        let total = xor_all(&buf);
        assert_eq!(xor_all(&record.row), total);
        assert_eq!(xor_all(&record.col), total);
    }

    #[test]
    fn padding_is_excluded_from_crc() {
        // 44 data bytes in a 7x7 grid; the 5 padding bytes stay zero.
        let mut buf = vec![0_u8; 49];
        for (i, byte) in buf.iter_mut().take(44).enumerate() {
            *byte = (i + 1) as u8;
        }
        let record = ParityRecord::compute(&buf, 7, 44);
        assert_eq!(record.crc, crc32fast::hash(&buf[..44]));
        assert_ne!(record.crc, crc32fast::hash(&buf));
    }

    #[test]
    fn recompute_reuses_and_resizes() {
        let mut record = ParityRecord::empty(8);
        let buf = vec![0xAB_u8; 16];
        record.recompute(&buf, 4, 16);
        assert_eq!(record.row.len(), 4);
        assert_eq!(record.col.len(), 4);
        // Even dim: each row of 4 identical bytes XORs to zero.
        assert_eq!(record.row, vec![0; 4]);
    }

    #[test]
    #[should_panic(expected = "dim^2")]
    fn wrong_buffer_length_panics() {
        let buf = vec![0_u8; 15];
        let _ = ParityRecord::compute(&buf, 4, 15);
    }
}
