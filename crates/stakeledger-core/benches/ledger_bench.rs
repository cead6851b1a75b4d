//! # Ledger Benchmarks
//!
//! Throughput of stake/unstake cycles on both storage backends.
//!
//! Run with: `cargo bench -p stakeledger-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use stakeledger_core::{Amount, Deployment, Holder, StorageBackend, TokenId};
use std::hint::black_box;

const OWNER: Holder = Holder::new([0x01; 20]);

fn holder(index: u32) -> Holder {
    let mut bytes = [0x20u8; 20];
    bytes[16..].copy_from_slice(&index.to_be_bytes());
    Holder::new(bytes)
}

/// Deployment with `count` funded, approved holders and the gate open.
fn open_deployment(backend: StorageBackend, count: u32) -> Deployment {
    let mut ledger = Deployment::deploy(backend, OWNER).expect("deploy");
    for index in 0..count {
        let h = holder(index);
        ledger.mint_fungible(&OWNER, &h, 1_000_000).expect("mint");
        ledger
            .mint_token(&OWNER, &h, TokenId(1), 1_000_000)
            .expect("mint");
        ledger.approve_custody(&h, Amount::MAX).expect("approve");
        ledger.approve_custody_all(&h, true).expect("approve all");
    }
    ledger.unpause(&OWNER).expect("unpause");
    ledger
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_fungible_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("fungible_cycle");

    for count in [10u32, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut ledger = open_deployment(StorageBackend::default(), count);
            b.iter(|| {
                for index in 0..count {
                    let h = holder(index);
                    ledger.stake_fungible(&h, 10).expect("stake");
                    black_box(ledger.unstake_fungible(&h).expect("unstake"));
                }
            });
        });
    }

    group.finish();
}

fn bench_token_cycle(c: &mut Criterion) {
    let mut ledger = open_deployment(StorageBackend::default(), 100);

    c.bench_function("token_cycle_100", |b| {
        b.iter(|| {
            for index in 0..100 {
                let h = holder(index);
                ledger.stake_by_id(&h, TokenId(1), 5).expect("stake");
                black_box(ledger.unstake_by_id(&h, TokenId(1)).expect("unstake"));
            }
        });
    });
}

fn bench_redb_stake(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().expect("tempdir");
    let backend = StorageBackend::open(dir.path().join("bench.redb")).expect("open");
    let mut ledger = open_deployment(backend, 10);

    c.bench_function("redb_stake_cycle_10", |b| {
        b.iter(|| {
            for index in 0..10 {
                let h = holder(index);
                ledger.stake_fungible(&h, 1).expect("stake");
                black_box(ledger.unstake_fungible(&h).expect("unstake"));
            }
        });
    });
}

fn bench_summary(c: &mut Criterion) {
    let mut ledger = open_deployment(StorageBackend::default(), 1000);
    for index in 0..1000 {
        ledger.stake_fungible(&holder(index), 3).expect("stake");
    }

    c.bench_function("summary_1000", |b| {
        b.iter(|| black_box(ledger.summary().expect("summary")));
    });
}

criterion_group!(
    benches,
    bench_fungible_cycle,
    bench_token_cycle,
    bench_redb_stake,
    bench_summary
);
criterion_main!(benches);
