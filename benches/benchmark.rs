use std::collections::BTreeMap;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use bbtree::{AvlTreeMap, BasicTreeMap, OrderedMap, SplayTreeMap, TreapMap};

const N: usize = 100_000;

fn values() -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(0);
    (0..N).map(|_| rng.gen()).collect()
}

fn build<M: OrderedMap<i32, i32> + Default>(values: &[i32]) -> M {
    let mut map = M::default();
    for value in values {
        let _ = map.insert(*value, *value);
    }
    map
}

fn bench_variant<M: OrderedMap<i32, i32> + Default>(
    c: &mut Criterion,
    name: &str,
    values: &[i32],
) {
    c.bench_function(&format!("{name}_insert"), |b| {
        b.iter_batched(
            || (),
            |_| build::<M>(values),
            BatchSize::LargeInput,
        )
    });

    let mut map = build::<M>(values);
    c.bench_function(&format!("{name}_find"), |b| {
        b.iter(|| {
            for value in values {
                black_box(map.find(value));
            }
        })
    });

    c.bench_function(&format!("{name}_remove"), |b| {
        b.iter_batched(
            || build::<M>(values),
            |mut map| {
                for value in values {
                    let _ = map.remove(value);
                }
                map
            },
            BatchSize::LargeInput,
        )
    });
}

pub fn benchmarks(c: &mut Criterion) {
    let values = values();

    bench_variant::<AvlTreeMap<i32, i32>>(c, "avl", &values);
    bench_variant::<TreapMap<i32, i32>>(c, "treap", &values);
    bench_variant::<SplayTreeMap<i32, i32>>(c, "splay", &values);
    // Random input keeps the unbalanced tree near logarithmic height.
    bench_variant::<BasicTreeMap<i32, i32>>(c, "basic", &values);

    c.bench_function("btree_insert", |b| {
        b.iter_batched(
            || (),
            |_| {
                let mut map = BTreeMap::new();
                for value in &values {
                    map.insert(*value, *value);
                }
                map
            },
            BatchSize::LargeInput,
        )
    });

    let map: BTreeMap<i32, i32> = values.iter().map(|v| (*v, *v)).collect();
    c.bench_function("btree_find", |b| {
        b.iter(|| {
            for value in &values {
                black_box(map.get(value));
            }
        })
    });
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
