#![allow(missing_docs)]
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rand::{RngCore, rng};

use weft_primitives::{ChunkPolicy, MAX_CHUNK_SIZE, MerkleTree, split};

fn random_data(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rng().fill_bytes(&mut data);
    data
}

fn bench_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("split");

    for chunks in [1usize, 8, 40].iter() {
        let data = random_data(chunks * MAX_CHUNK_SIZE);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chunks), &data, |b, data| {
            b.iter(|| split(data.clone(), &ChunkPolicy::default()));
        });
    }

    group.finish();
}

fn bench_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle_build");

    for chunks in [1usize, 8, 40].iter() {
        let data = random_data(chunks * MAX_CHUNK_SIZE);
        let chunks_vec = split(data, &ChunkPolicy::default());
        group.bench_with_input(BenchmarkId::from_parameter(chunks), &chunks_vec, |b, chunks| {
            b.iter(|| MerkleTree::build(chunks).unwrap());
        });
    }

    group.finish();
}

fn bench_proofs(c: &mut Criterion) {
    let mut group = c.benchmark_group("merkle_proof");

    let data = random_data(40 * MAX_CHUNK_SIZE);
    let tree = MerkleTree::build(&split(data, &ChunkPolicy::default())).unwrap();
    let root = tree.root();
    let proof = tree.proof(17).unwrap();

    group.bench_function("generate", |b| b.iter(|| tree.proof(17).unwrap()));
    group.bench_function("verify", |b| {
        b.iter(|| proof.verify(&root, tree.data_size()).unwrap())
    });
    group.bench_function("generate_all", |b| b.iter(|| tree.proofs()));

    group.finish();
}

criterion_group!(benches, bench_split, bench_tree_build, bench_proofs);
criterion_main!(benches);
