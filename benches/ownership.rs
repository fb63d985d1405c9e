use std::env;
use std::time::Duration;

use criterion::{Criterion, black_box};
use propreg::{Key, KeyOwnership};

/// Benchmarks the per-key atomic region in `KeyOwnership::apply` (§4.3): a
/// higher layer repeatedly taking and relinquishing ownership of the same
/// key is the hot path a registry with several active layers exercises on
/// every source refresh.
fn bench_apply_shadow_and_relinquish(c: &mut Criterion) {
    let ownership = KeyOwnership::new();
    let key = Key::new("bench.key".to_string());
    ownership.apply(&key, Some("base".to_string()), 0, |_| None);

    c.bench_function("ownership_apply_shadow_and_relinquish", |b| {
        b.iter(|| {
            let set = ownership.apply(&key, Some("override".to_string()), 1, |_| None);
            black_box(&set);
            let unset = ownership.apply(&key, None, 1, |i| {
                if i == 0 { Some("base".to_string()) } else { None }
            });
            black_box(unset);
        });
    });
}

/// Benchmarks `get` under a table already populated with many keys, the
/// shape a long-lived registry accumulates over its lifetime.
fn bench_get_from_populated_table(c: &mut Criterion) {
    let ownership = KeyOwnership::new();
    for i in 0..10_000 {
        let key = Key::new(format!("key.{i}"));
        ownership.apply(&key, Some(format!("value-{i}")), 0, |_| None);
    }
    let probe = Key::new("key.5000".to_string());

    c.bench_function("ownership_get_from_populated_table", |b| {
        b.iter(|| black_box(ownership.get(&probe)));
    });
}

fn main() {
    let mut quick_mode = false;
    for arg in env::args().skip(1) {
        if arg == "--quick" {
            quick_mode = true;
        }
    }

    let mut criterion = Criterion::default();
    if quick_mode {
        criterion = criterion
            .sample_size(10)
            .warm_up_time(Duration::from_millis(100))
            .measurement_time(Duration::from_millis(250));
    }

    bench_apply_shadow_and_relinquish(&mut criterion);
    bench_get_from_populated_table(&mut criterion);
    criterion.final_summary();
}
