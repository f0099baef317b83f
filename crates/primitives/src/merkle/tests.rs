//! Tests for the merkle tree.

use super::*;
use crate::chunk::{Chunk, ChunkPolicy, MAX_CHUNK_SIZE, MIN_CHUNK_SIZE, split};
use crate::hash::sha256;
use super::node::{branch_id, leaf_id};
use alloy_primitives::B256;
use proptest::prelude::*;
use rand::RngCore;

fn random_data(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::rng().fill_bytes(&mut data);
    data
}

fn small_policy() -> ChunkPolicy {
    ChunkPolicy::new(64, 16).unwrap()
}

#[test]
fn test_root_is_deterministic() {
    let data = random_data(3 * MAX_CHUNK_SIZE + 1234);
    let a = MerkleTree::build(&split(data.clone(), &ChunkPolicy::default())).unwrap();
    let b = MerkleTree::build(&split(data, &ChunkPolicy::default())).unwrap();
    assert_eq!(a.root(), b.root());
}

#[test]
fn test_single_byte_change_changes_root() {
    let data = random_data(2 * MAX_CHUNK_SIZE + MIN_CHUNK_SIZE);
    let original = MerkleTree::build(&split(data.clone(), &ChunkPolicy::default())).unwrap();

    for position in [0, MAX_CHUNK_SIZE, data.len() - 1] {
        let mut changed = data.clone();
        changed[position] ^= 0x01;
        let tree = MerkleTree::build(&split(changed, &ChunkPolicy::default())).unwrap();
        assert_ne!(tree.root(), original.root(), "byte {position}");
    }
}

#[test]
fn test_just_under_max_is_single_leaf() {
    let data = random_data(MAX_CHUNK_SIZE - 1);
    let chunks = split(data.clone(), &ChunkPolicy::default());
    assert_eq!(chunks.len(), 1);

    let tree = MerkleTree::build(&chunks).unwrap();
    assert!(tree.root_node().is_leaf());
    assert_eq!(tree.root(), leaf_id(&sha256(&data), data.len() as u64));

    let proof = tree.proof(0).unwrap();
    assert_eq!(proof.data_path.len(), LEAF_PROOF_SIZE);
    assert_eq!(proof.depth(), 0);
    let proven = proof.verify(&tree.root(), tree.data_size()).unwrap();
    assert_eq!(proven.start, 0);
    assert_eq!(proven.end, data.len() as u64);
}

#[test]
fn test_odd_node_is_promoted() {
    let data = random_data(3 * 64);
    let chunks = split(data, &small_policy());
    assert_eq!(chunks.len(), 3);

    let tree = MerkleTree::build(&chunks).unwrap();
    let leaves: Vec<_> = chunks
        .iter()
        .map(|c| leaf_id(&c.digest(), c.end()))
        .collect();
    let pair = branch_id(&leaves[0], &leaves[1], chunks[0].end());
    let root = branch_id(&pair, &leaves[2], chunks[1].end());
    assert_eq!(tree.root(), root);

    // The promoted leaf sits one level higher than its siblings.
    assert_eq!(tree.proof(0).unwrap().depth(), 2);
    assert_eq!(tree.proof(2).unwrap().depth(), 1);
}

#[test]
fn test_every_proof_verifies() {
    for len in [1usize, 64, 65, 200, 64 * 7 + 3, 64 * 16] {
        let data = random_data(len);
        let chunks = split(data, &small_policy());
        let tree = MerkleTree::build(&chunks).unwrap();
        let proofs = tree.proofs();
        assert_eq!(proofs.len(), chunks.len());

        for (chunk, proof) in chunks.iter().zip(&proofs) {
            assert_eq!(proof.offset, chunk.end() - 1);
            assert_eq!(proof.data_hash(), Some(chunk.digest()));
            let proven = proof
                .verify_chunk(&tree.root(), tree.data_size(), chunk.data())
                .unwrap();
            assert_eq!(proven.start, chunk.start());
            assert_eq!(proven.end, chunk.end());
        }
    }
}

#[test]
fn test_tampered_path_is_rejected() {
    let chunks = split(random_data(64 * 5), &small_policy());
    let tree = MerkleTree::build(&chunks).unwrap();
    let proof = tree.proof(3).unwrap();

    for position in [0, BRANCH_PROOF_SIZE + 5, proof.data_path.len() - 1] {
        let mut path = proof.data_path.to_vec();
        path[position] ^= 0x80;
        let tampered = Proof::new(proof.offset, path.into());
        assert!(tampered.verify(&tree.root(), tree.data_size()).is_err());
    }
}

#[test]
fn test_proof_binds_chunk_and_size() {
    let chunks = split(random_data(64 * 4), &small_policy());
    let tree = MerkleTree::build(&chunks).unwrap();
    let proof = tree.proof(1).unwrap();

    assert!(matches!(
        proof.verify_chunk(&tree.root(), tree.data_size(), chunks[2].data()),
        Err(MerkleError::ChunkMismatch(_))
    ));
    let last = tree.proof(3).unwrap();
    assert!(last.verify(&tree.root(), tree.data_size() + 64).is_err());
    assert!(proof.verify(&B256::repeat_byte(1), tree.data_size()).is_err());
}

#[test]
fn test_bad_lengths_and_offsets() {
    let chunks = split(random_data(100), &small_policy());
    let tree = MerkleTree::build(&chunks).unwrap();
    let proof = tree.proof(0).unwrap();

    let truncated = Proof::new(proof.offset, proof.data_path.slice(1..));
    assert!(matches!(
        truncated.verify(&tree.root(), tree.data_size()),
        Err(MerkleError::InvalidProofLength(_))
    ));

    let outside = Proof::new(tree.data_size(), proof.data_path.clone());
    assert!(matches!(
        outside.verify(&tree.root(), tree.data_size()),
        Err(MerkleError::OffsetOutOfRange { .. })
    ));
}

#[test]
fn test_offset_selects_leaf() {
    // A proof for chunk 0 presented with chunk 1's offset leads down the wrong branch.
    let chunks = split(random_data(64 * 2), &small_policy());
    let tree = MerkleTree::build(&chunks).unwrap();
    let proof = tree.proof(0).unwrap();
    let moved = Proof::new(chunks[1].start(), proof.data_path);
    assert!(moved.verify(&tree.root(), tree.data_size()).is_err());
}

#[test]
fn test_from_reader_matches_build() {
    let data = random_data(4 * MAX_CHUNK_SIZE + 10);
    let policy = ChunkPolicy::default();
    let built = MerkleTree::build(&split(data.clone(), &policy)).unwrap();
    let streamed = MerkleTree::from_reader(data.as_slice(), data.len() as u64, policy).unwrap();
    assert_eq!(built, streamed);
    assert_eq!(streamed.data_size(), data.len() as u64);
    assert_eq!(streamed.chunk_count(), 5);
}

#[test]
fn test_from_digests_matches_build() {
    let data = random_data(10 * 64 + 20);
    let chunks = split(data, &small_policy());
    let built = MerkleTree::build(&chunks).unwrap();
    let from_digests =
        MerkleTree::from_digests(chunks.iter().map(|c| (c.digest(), c.range()))).unwrap();
    assert_eq!(built, from_digests);

    assert_eq!(MerkleTree::from_digests([]), Err(MerkleError::Empty));
    assert!(MerkleTree::from_digests([(B256::ZERO, 0..4), (B256::ZERO, 5..9)]).is_err());
}

#[test]
fn test_build_rejects_bad_input() {
    assert_eq!(MerkleTree::build(&[]), Err(MerkleError::Empty));

    let gap = [Chunk::new(0, 0, vec![1u8; 5]), Chunk::new(1, 10, vec![2u8; 5])];
    assert_eq!(
        MerkleTree::build(&gap),
        Err(MerkleError::NonContiguous {
            index: 1,
            expected: 5,
            actual: 10
        })
    );
}

#[test]
fn test_note_encoding() {
    let note = encode_note(0x0102);
    assert_eq!(note.len(), NOTE_SIZE);
    assert!(note[..30].iter().all(|&b| b == 0));
    assert_eq!(&note[30..], &[0x01, 0x02]);
    assert_eq!(decode_note(&note).unwrap(), 0x0102);

    let mut wide = [0u8; NOTE_SIZE];
    wide[0] = 1;
    assert!(decode_note(&wide).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_all_proofs_verify(len in 1usize..2048) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let chunks = split(data, &small_policy());
        let tree = MerkleTree::build(&chunks).unwrap();
        for (chunk, proof) in chunks.iter().zip(tree.proofs()) {
            let proven = proof.verify_chunk(&tree.root(), tree.data_size(), chunk.data());
            prop_assert!(proven.is_ok());
        }
    }
}

#[test]
fn test_manifest_checks_chunks() {
    let chunks = split(random_data(64 * 6 + 20), &small_policy());
    let tree = MerkleTree::build(&chunks).unwrap();
    let manifest = tree.manifest();

    assert_eq!(manifest.data_root(), tree.root());
    assert_eq!(manifest.data_size(), tree.data_size());
    assert_eq!(manifest.len(), chunks.len());

    for chunk in &chunks {
        let entry = manifest.entry(chunk.index()).unwrap();
        assert_eq!(entry.range(), chunk.range());
        assert_eq!(entry.proof(), tree.proof(chunk.index()).unwrap());
        manifest.verify_chunk(chunk.index(), chunk.data()).unwrap();
    }

    assert!(manifest.verify_chunk(0, chunks[1].data()).is_err());
    assert!(manifest.verify_chunk(chunks.len(), chunks[0].data()).is_err());
}

#[cfg(feature = "serde")]
#[test]
fn test_manifest_serde() {
    let tree = MerkleTree::build(&split(random_data(300), &small_policy())).unwrap();
    let manifest = tree.manifest();

    let json = serde_json::to_string(&manifest).unwrap();
    let decoded: ChunkManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, manifest);
}
