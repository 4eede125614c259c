use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use votifier_client::core::vote::{StampedVote, Vote};
use votifier_client::protocol::v1::plaintext;
use votifier_client::protocol::V2Protocol;

#[allow(clippy::unwrap_used)]
fn bench_v2_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("v2_encode");
    let username_sizes = [8usize, 64, 512, 4096];
    let protocol = V2Protocol::new("7j302r4n0fcq4ig2bcq8uopb7s");

    for &size in &username_sizes {
        let vote = StampedVote::with_timestamp(
            Vote::new("u".repeat(size), "bench-site", "203.0.113.7"),
            "1700000000",
        );
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("sign_and_frame_{size}b"), |b| {
            b.iter_batched(
                || vote.clone(),
                |vote| protocol.encode(&vote, "challenge123").unwrap(),
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_v1_plaintext(c: &mut Criterion) {
    let vote = StampedVote::with_timestamp(
        Vote::new("alice", "bench-site", "203.0.113.7"),
        "1700000000",
    );
    c.bench_function("v1_plaintext", |b| b.iter(|| plaintext(&vote)));
}

criterion_group!(benches, bench_v2_encode, bench_v1_plaintext);
criterion_main!(benches);
