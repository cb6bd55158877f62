use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use super::{
    trace, AvlTreeMap, BasicTreeMap, OrderedMap, SplayTreeMap, Status, TreapMap, Viewable,
};

const N: i32 = 1_000;

/// Test-only hook into each variant's invariant checker.
trait Checked {
    fn check(&self);
}

impl<K: Ord, V> Checked for AvlTreeMap<K, V> {
    fn check(&self) {
        self.check_consistency();
    }
}

impl<K: Ord, V> Checked for TreapMap<K, V> {
    fn check(&self) {
        self.check_consistency();
    }
}

impl<K: Ord, V> Checked for SplayTreeMap<K, V> {
    fn check(&self) {
        self.check_consistency();
    }
}

impl<K: Ord, V> Checked for BasicTreeMap<K, V> {
    fn check(&self) {
        self.check_consistency();
    }
}

fn random_keys(n: i32, seed: u64) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys: Vec<i32> = (0..n).map(|_| rng.gen()).collect();
    keys.sort();
    keys.dedup();
    keys.shuffle(&mut rng);
    keys
}

fn insert_find_remove<M: OrderedMap<i32, i32> + Default + Checked>() {
    let keys = random_keys(N, 0);

    let mut map = M::default();
    assert!(map.is_empty());
    for key in keys.iter() {
        assert_eq!(map.insert(*key, key.wrapping_mul(2)), Status::Success);
    }
    map.check();
    assert_eq!(map.len(), keys.len());

    for key in keys.iter() {
        assert_eq!(map.insert(*key, 0), Status::Failed);
    }
    assert_eq!(map.len(), keys.len());

    for key in keys.iter() {
        let found = map.find(key);
        assert_eq!(found, Some((key, &key.wrapping_mul(2))));
    }

    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(map.min().map(|(k, _)| *k), sorted.first().copied());
    assert_eq!(map.max().map(|(k, _)| *k), sorted.last().copied());

    let mut visited = Vec::new();
    map.traverse(|key, _| visited.push(*key));
    assert_eq!(visited, sorted);

    for key in keys.iter() {
        assert_eq!(map.remove(key), Status::Success);
        assert_eq!(map.remove(key), Status::Failed);
    }
    assert!(map.is_empty());
    map.check();
}

#[test]
fn test_insert_find_remove_all_variants() {
    insert_find_remove::<AvlTreeMap<i32, i32>>();
    insert_find_remove::<TreapMap<i32, i32>>();
    insert_find_remove::<SplayTreeMap<i32, i32>>();
    insert_find_remove::<BasicTreeMap<i32, i32>>();
}

fn remove_on_empty<M: OrderedMap<i32, i32> + Default + Checked>() {
    let mut map = M::default();
    assert!(map.remove(&42).is_failed());
    assert_eq!(map.len(), 0);
    map.check();
}

#[test]
fn test_remove_on_empty_all_variants() {
    remove_on_empty::<AvlTreeMap<i32, i32>>();
    remove_on_empty::<TreapMap<i32, i32>>();
    remove_on_empty::<SplayTreeMap<i32, i32>>();
    remove_on_empty::<BasicTreeMap<i32, i32>>();
}

fn find_kth_matches_order<M: OrderedMap<i32, i32> + Default>() {
    let keys = random_keys(200, 5);
    let mut map = M::default();
    for key in keys.iter() {
        let _ = map.insert(*key, key.wrapping_mul(3));
    }
    assert_eq!(map.find_kth(0), None);
    assert_eq!(map.find_kth(keys.len() + 1), None);

    let mut sorted = keys.clone();
    sorted.sort();
    for (i, key) in sorted.iter().enumerate() {
        let found = map.find_kth(i + 1);
        assert_eq!(found, Some((key, &key.wrapping_mul(3))));
    }
}

#[test]
fn test_find_kth_all_variants() {
    find_kth_matches_order::<AvlTreeMap<i32, i32>>();
    find_kth_matches_order::<TreapMap<i32, i32>>();
    find_kth_matches_order::<SplayTreeMap<i32, i32>>();
    find_kth_matches_order::<BasicTreeMap<i32, i32>>();
}

fn split_partitions<M: OrderedMap<i32, i32> + Default + Checked>() {
    let mut map = M::default();
    for key in 0..100 {
        let _ = map.insert(key, key);
    }
    let mut upper = map.split(&60);
    map.check();
    upper.check();
    assert_eq!(map.len(), 60);
    assert_eq!(upper.len(), 40);
    assert_eq!(map.max().map(|(k, _)| *k), Some(59));
    assert_eq!(upper.min().map(|(k, _)| *k), Some(60));

    // Joining the halves back restores the original contents.
    assert!(map.join(upper).is_success());
    map.check();
    assert_eq!(map.len(), 100);
    for key in 0..100 {
        assert!(map.find(&key).is_some());
    }
}

#[test]
fn test_split_partitions_all_variants() {
    split_partitions::<AvlTreeMap<i32, i32>>();
    split_partitions::<TreapMap<i32, i32>>();
    split_partitions::<SplayTreeMap<i32, i32>>();
    split_partitions::<BasicTreeMap<i32, i32>>();
}

fn merge_disjoint<M: OrderedMap<i32, i32> + Default + Checked>() {
    // The receiver holds the larger keys, so merge has to swap before
    // joining.
    let mut high = M::default();
    for key in 100..150 {
        let _ = high.insert(key, key);
    }
    let mut low = M::default();
    for key in 0..50 {
        let _ = low.insert(key, key);
    }
    assert!(!high.conflict(&low));
    assert_eq!(high.merge(low), Status::Success);
    high.check();
    assert_eq!(high.len(), 100);
    assert_eq!(high.min().map(|(k, _)| *k), Some(0));
    assert_eq!(high.max().map(|(k, _)| *k), Some(149));
}

#[test]
fn test_merge_disjoint_all_variants() {
    merge_disjoint::<AvlTreeMap<i32, i32>>();
    merge_disjoint::<TreapMap<i32, i32>>();
    merge_disjoint::<SplayTreeMap<i32, i32>>();
    merge_disjoint::<BasicTreeMap<i32, i32>>();
}

fn merge_overlapping<M: OrderedMap<i32, &'static str> + Default + Checked>() {
    let mut map = M::default();
    let _ = map.insert(1, "one");
    let _ = map.insert(5, "five");

    let mut other = M::default();
    let _ = other.insert(1, "uno");
    let _ = other.insert(3, "three");

    assert!(map.conflict(&other));
    assert_eq!(map.merge(other), Status::Success);
    map.check();
    assert_eq!(map.len(), 3);
    // The receiver keeps its value for the conflicting key.
    assert_eq!(map.find(&1).map(|(_, v)| *v), Some("one"));
    assert_eq!(map.find(&3).map(|(_, v)| *v), Some("three"));
}

#[test]
fn test_merge_overlapping_all_variants() {
    merge_overlapping::<AvlTreeMap<i32, &'static str>>();
    merge_overlapping::<TreapMap<i32, &'static str>>();
    merge_overlapping::<SplayTreeMap<i32, &'static str>>();
    merge_overlapping::<BasicTreeMap<i32, &'static str>>();
}

fn merge_with_empty<M: OrderedMap<i32, i32> + Default + Checked>() {
    let mut map = M::default();
    let _ = map.insert(1, 1);
    assert_eq!(map.merge(M::default()), Status::Success);
    assert_eq!(map.len(), 1);

    let mut empty = M::default();
    let _ = map.insert(2, 2);
    assert_eq!(empty.merge(map), Status::Success);
    assert_eq!(empty.len(), 2);
    empty.check();
}

#[test]
fn test_merge_with_empty_all_variants() {
    merge_with_empty::<AvlTreeMap<i32, i32>>();
    merge_with_empty::<TreapMap<i32, i32>>();
    merge_with_empty::<SplayTreeMap<i32, i32>>();
    merge_with_empty::<BasicTreeMap<i32, i32>>();
}

fn into_each_yields_sorted<M: OrderedMap<i32, i32> + Default>() {
    let keys = random_keys(200, 7);
    let mut map = M::default();
    for key in keys.iter() {
        let _ = map.insert(*key, *key);
    }
    let mut drained = Vec::new();
    map.into_each(|key, value| {
        assert_eq!(key, value);
        drained.push(key);
    });
    let mut sorted = keys;
    sorted.sort();
    assert_eq!(drained, sorted);
}

#[test]
fn test_into_each_all_variants() {
    into_each_yields_sorted::<AvlTreeMap<i32, i32>>();
    into_each_yields_sorted::<TreapMap<i32, i32>>();
    into_each_yields_sorted::<SplayTreeMap<i32, i32>>();
    into_each_yields_sorted::<BasicTreeMap<i32, i32>>();
}

fn clear_then_reuse<M: OrderedMap<i32, i32> + Default + Checked>() {
    let mut map = M::default();
    for key in 0..100 {
        let _ = map.insert(key, key);
    }
    map.clear();
    assert!(map.is_empty());
    assert_eq!(map.len(), 0);
    for key in 0..10 {
        assert_eq!(map.insert(key, key), Status::Success);
    }
    assert_eq!(map.len(), 10);
    map.check();
}

#[test]
fn test_clear_all_variants() {
    clear_then_reuse::<AvlTreeMap<i32, i32>>();
    clear_then_reuse::<TreapMap<i32, i32>>();
    clear_then_reuse::<SplayTreeMap<i32, i32>>();
    clear_then_reuse::<BasicTreeMap<i32, i32>>();
}

#[test]
fn test_avl_split_scenario() {
    let mut map = AvlTreeMap::new();
    for (key, value) in [
        (50, "fifty"),
        (30, "thirty"),
        (70, "seventy"),
        (20, "twenty"),
        (40, "forty"),
        (60, "sixty"),
        (80, "eighty"),
    ] {
        assert_eq!(map.insert(key, value), Status::Success);
    }

    let upper = map.split(&50);
    map.check_consistency();
    upper.check_consistency();
    assert_eq!(map.len(), 3);
    assert_eq!(upper.len(), 4);
    assert_eq!(map.max().map(|(k, _)| *k), Some(40));
    assert_eq!(upper.min().map(|(k, _)| *k), Some(50));

    let mut map = map;
    assert_eq!(map.join(upper), Status::Success);
    map.check_consistency();
    assert_eq!(map.len(), 7);
    assert_eq!(map.get(&50), Some(&"fifty"));
}

#[test]
fn test_avl_skewed_insert_rebalances_via_view() {
    let mut map = AvlTreeMap::new();
    for key in [30, 20, 10] {
        let _ = map.insert(key, key);
    }
    let view = map.view();
    let root = view.root_node().unwrap();
    assert_eq!(root.key, "20");
    assert_eq!(view.node(root.left.unwrap()).unwrap().key, "10");
    assert_eq!(view.node(root.right.unwrap()).unwrap().key, "30");
}

#[test]
fn test_avl_height_stays_logarithmic() {
    let keys = random_keys(N, 3);
    let mut map = AvlTreeMap::new();
    for key in keys.iter() {
        let _ = map.insert(*key, ());
    }
    map.check_consistency();
    // Worst-case AVL height is below 1.44 * log2(n + 2).
    let bound = (1.44 * ((keys.len() + 2) as f64).log2()).ceil() as i32;
    assert!(map.height() <= bound);
}

#[test]
fn test_treap_sequential_insert_random_removal() {
    let mut map = TreapMap::new();
    for key in 0..100 {
        assert_eq!(map.insert(key, key), Status::Success);
        map.check_consistency();
    }

    let mut keys: Vec<i32> = (0..100).collect();
    let mut rng = StdRng::seed_from_u64(1);
    keys.shuffle(&mut rng);
    for key in keys {
        assert_eq!(map.remove(&key), Status::Success);
        map.check_consistency();
    }
    assert!(map.is_empty());
}

#[test]
fn test_splay_moves_accessed_key_to_root() {
    let mut map = SplayTreeMap::new();
    for key in 1..=20 {
        let _ = map.insert(key, key);
    }
    assert_eq!(map.get(&7), Some(&7));
    let view = map.view();
    assert_eq!(view.root_node().unwrap().key, "7");
    map.check_consistency();
}

#[test]
fn test_index_reads_existing_key() {
    let mut map = AvlTreeMap::new();
    let _ = map.insert(3, "three");
    assert_eq!(map[&3], "three");
}

#[test]
#[should_panic(expected = "key not found")]
fn test_index_panics_on_missing_key() {
    let mut map = AvlTreeMap::new();
    let _ = map.insert(3, "three");
    let _ = map[&4];
}

#[test]
fn test_index_mut_inserts_default() {
    let mut map: TreapMap<i32, i32> = TreapMap::new();
    map[&5] += 7;
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&5), Some(&7));
    map[&5] += 1;
    assert_eq!(map.get(&5), Some(&8));
    map.check_consistency();
}

#[test]
fn test_trace_records_before_and_after() {
    let mut map = AvlTreeMap::new();
    let _ = map.insert(1, 1);
    let (status, forest) = trace(&mut map, |m| m.insert(2, 2));
    assert_eq!(status, Status::Success);
    assert_eq!(forest.len(), 2);
    assert_eq!(forest[0].len(), 1);
    assert_eq!(forest[1].len(), 2);
}

#[test]
fn test_view_reflects_shape() {
    let mut map = BasicTreeMap::new();
    for key in [5, 3, 8] {
        let _ = map.insert(key, key * 10);
    }
    let view = map.view();
    let root = view.root_node().unwrap();
    assert_eq!(root.key, "5");
    assert_eq!(root.value, "50");
    assert_eq!(view.node(root.left.unwrap()).unwrap().key, "3");
    assert_eq!(view.node(root.right.unwrap()).unwrap().key, "8");
    assert!(view.node(root.left.unwrap()).unwrap().left.is_none());
}

#[test]
fn test_cross_variant_stress() {
    let keys = random_keys(N, 11);
    let pivot = keys[keys.len() / 2];

    fn run<M: OrderedMap<i32, i32> + Default + Checked>(keys: &[i32], pivot: i32) {
        let mut map = M::default();
        for key in keys {
            let _ = map.insert(*key, *key);
        }
        let upper = map.split(&pivot);
        map.check();
        upper.check();
        map.traverse(|key, _| assert!(*key < pivot));
        upper.traverse(|key, _| assert!(*key >= pivot));
        assert_eq!(map.len() + upper.len(), keys.len());

        assert_eq!(map.merge(upper), Status::Success);
        map.check();
        assert_eq!(map.len(), keys.len());
    }

    run::<AvlTreeMap<i32, i32>>(&keys, pivot);
    run::<TreapMap<i32, i32>>(&keys, pivot);
    run::<SplayTreeMap<i32, i32>>(&keys, pivot);
    run::<BasicTreeMap<i32, i32>>(&keys, pivot);
}
