//! Sizes and the offset note encoding used by the merkle tree

use byteorder::{BigEndian, ByteOrder};

use super::error::MerkleError;

/// Node id size in bytes (sha256)
pub const HASH_SIZE: usize = 32;

/// Size of an encoded offset note
pub const NOTE_SIZE: usize = 32;

/// Bytes one branch contributes to a data path: `left || right || note`
pub const BRANCH_PROOF_SIZE: usize = 2 * HASH_SIZE + NOTE_SIZE;

/// Bytes the leaf contributes to a data path: `data_hash || note`
pub const LEAF_PROOF_SIZE: usize = HASH_SIZE + NOTE_SIZE;

// Offsets are u64; only the low 8 bytes of a note may be non-zero.
const NOTE_PAD: usize = NOTE_SIZE - 8;

/// Encode an offset as a 32-byte big-endian note.
#[inline]
pub(crate) fn encode_note(offset: u64) -> [u8; NOTE_SIZE] {
    let mut note = [0u8; NOTE_SIZE];
    BigEndian::write_u64(&mut note[NOTE_PAD..], offset);
    note
}

/// Decode a note, rejecting values that do not fit in a u64.
#[inline]
pub(crate) fn decode_note(note: &[u8]) -> Result<u64, MerkleError> {
    if note.len() != NOTE_SIZE {
        return Err(MerkleError::invalid_proof("truncated offset note"));
    }
    if note[..NOTE_PAD].iter().any(|&b| b != 0) {
        return Err(MerkleError::invalid_proof("offset note exceeds 64 bits"));
    }
    Ok(BigEndian::read_u64(&note[NOTE_PAD..]))
}
