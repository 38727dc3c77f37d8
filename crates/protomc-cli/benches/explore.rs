//! Criterion benchmarks over the demo protocols.
//!
//! Run with: cargo bench -p protomc-cli

use criterion::{criterion_group, criterion_main, Criterion};
use protomc::{Model, RunConfig};
use protomc_cli::{ack, fanin, paxos, replication};

fn bench_ack(c: &mut Criterion) {
    c.bench_function("ack_lossy_r2", |b| {
        b.iter(|| {
            let mut model = Model::new(ack::machines(42, 2, true), ack::invariants(42));
            model.run(&RunConfig::default()).unwrap()
        })
    });
}

fn bench_fanin(c: &mut Criterion) {
    c.bench_function("fanin_n4_sym", |b| {
        b.iter(|| {
            let mut model = Model::new(fanin::machines(4), fanin::invariants(4));
            model.run(&RunConfig::default()).unwrap()
        })
    });

    c.bench_function("fanin_n4_plain", |b| {
        b.iter(|| {
            let mut model = Model::new(fanin::machines(4), fanin::invariants(4));
            let config = RunConfig {
                symmetry_reduction: false,
                ..Default::default()
            };
            model.run(&config).unwrap()
        })
    });
}

fn bench_paxos(c: &mut Criterion) {
    c.bench_function("paxos_n3_one_proposer", |b| {
        b.iter(|| {
            let mut model = Model::new(paxos::machines(3, &[0]), paxos::invariants());
            model.run(&RunConfig::default()).unwrap()
        })
    });
}

fn bench_replication(c: &mut Criterion) {
    c.bench_function("replication_n2_r1", |b| {
        b.iter(|| {
            let mut model = Model::new(
                replication::machines(2, replication::demo_data(1)),
                replication::invariants(),
            );
            model.run(&RunConfig::default()).unwrap()
        })
    });
}

criterion_group!(benches, bench_ack, bench_fanin, bench_paxos, bench_replication);
criterion_main!(benches);
