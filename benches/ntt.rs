use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rlwe_core::ring::{RingType, RnsRing};

fn bench_ntt_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("ntt_roundtrip");
    for log_n in [12usize, 14, 16] {
        let n = 1usize << log_n;
        let ring = RnsRing::new(n, &[0x7fff80001, 0x200000440001], RingType::Standard);
        let mut poly = ring.new_poly_full();
        for (i, row) in poly.rows_mut().iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = ((i + 1) * (j + 1)) as u64 % ring.moduli()[i].q();
            }
        }
        group.bench_function(format!("log_n={log_n}"), |b| {
            b.iter(|| {
                let mut p = poly.clone();
                ring.ntt_forward(black_box(&mut p));
                ring.ntt_backward(black_box(&mut p));
                p
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ntt_roundtrip);
criterion_main!(benches);
