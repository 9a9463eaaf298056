#![forbid(unsafe_code)]

use pars_types::WHOLE_HASH_LEN;
use std::io::{ErrorKind, Read};

/// Streaming chunk size for whole-file hashing.
const HASH_CHUNK_LEN: usize = 1 << 20;

/// Hash an entire reader with BLAKE3 in 1 MiB chunks.
///
/// The digest identifies "bit-identical data file"; collisions are not a
/// security concern here.
pub fn whole_file_hash<R: Read>(reader: &mut R) -> std::io::Result<[u8; WHOLE_HASH_LEN]> {
    let mut hasher = blake3::Hasher::new();
    let mut chunk = vec![0_u8; HASH_CHUNK_LEN];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                hasher.update(&chunk[..n]);
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(*hasher.finalize().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_one_shot_hash() {
        let payload: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
        let streamed = whole_file_hash(&mut payload.as_slice()).expect("hash");
        assert_eq!(streamed, *blake3::hash(&payload).as_bytes());
    }

    #[test]
    fn empty_input() {
        let streamed = whole_file_hash(&mut [].as_slice()).expect("hash");
        assert_eq!(streamed, *blake3::hash(&[]).as_bytes());
    }

    #[test]
    fn chunk_boundary_input() {
        let payload = vec![0x7F_u8; HASH_CHUNK_LEN + 1];
        let streamed = whole_file_hash(&mut payload.as_slice()).expect("hash");
        assert_eq!(streamed, *blake3::hash(&payload).as_bytes());
    }
}
