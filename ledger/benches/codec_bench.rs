use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dirchain_ledger::{ChainBlock, DBEntry, DirectoryBlock, EntryBlock};
use dirchain_types::Hash32;

fn sample_dblock() -> DirectoryBlock {
    let entries = (0..32u8)
        .map(|i| DBEntry::new(Hash32::new([i; 32]), Hash32::new([i.wrapping_add(1); 32])))
        .collect();
    DirectoryBlock::new(0, 0xFA92_E5A2, Hash32::ZERO, Hash32::ZERO, 0, 100, entries)
}

fn dblock_marshal_bench(c: &mut Criterion) {
    let block = sample_dblock();
    c.bench_function("dblock_marshal_32_entries", |b| {
        b.iter(|| black_box(&block).marshal())
    });
}

fn dblock_unmarshal_bench(c: &mut Criterion) {
    let bytes = sample_dblock().marshal();
    c.bench_function("dblock_unmarshal_32_entries", |b| {
        b.iter(|| DirectoryBlock::unmarshal(black_box(&bytes)))
    });
}

fn eblock_key_mr_bench(c: &mut Criterion) {
    let mut eb = EntryBlock::new(Hash32::new([7; 32]), Hash32::ZERO, 1, 0);
    for i in 0..256u32 {
        let mut h = [0xAAu8; 32];
        h[..4].copy_from_slice(&i.to_be_bytes());
        eb.add_entry(Hash32::new(h));
    }
    c.bench_function("eblock_key_mr_256_entries", |b| {
        b.iter(|| black_box(&eb).key_mr())
    });
}

criterion_group!(
    benches,
    dblock_marshal_bench,
    dblock_unmarshal_bench,
    eblock_key_mr_bench
);
criterion_main!(benches);
