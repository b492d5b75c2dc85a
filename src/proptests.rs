use super::*;

use crate::tests::IdentityState;
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use std::collections::HashSet;

/// Checks the directory invariants and that every key sits where its hash
/// points.
fn validate_set<K, const N: usize, S>(s: &ExtendibleSet<K, N, S>)
where
    K: Hash + Eq,
    S: BuildHasher,
{
    let dir_len = s.directory.len();
    assert_eq!(dir_len, 1usize << s.global_depth, "directory length must be 2^global_depth");

    let mut refs = vec![0usize; s.buckets.len()];
    for (slot, &id) in s.directory.iter().enumerate() {
        refs[id] += 1;
        let local = s.buckets[id].local_depth();
        assert!(local <= s.global_depth, "local depth {local} above global");

        let stride = 1usize << local;
        let first = slot % stride;
        assert_eq!(s.first_slot(slot), first);
        assert_eq!(s.directory[first], id, "group of slot {slot} must start at {first}");
        for alias in (first..dir_len).step_by(stride) {
            assert_eq!(s.directory[alias], id, "slot {alias} must alias slot {slot}");
        }
    }

    let mut total = 0usize;
    for (id, bucket) in s.buckets.iter().enumerate() {
        let expected = 1usize << (s.global_depth - bucket.local_depth());
        assert_eq!(refs[id], expected, "bucket #{id} referenced by wrong slot count");
        assert!(bucket.len() <= N);
        total += bucket.len();

        for key in bucket.iter() {
            let slot = (s.hash_of(key) % dir_len as u64) as usize;
            assert_eq!(s.directory[slot], id, "key stored outside its home bucket");
        }
    }
    assert_eq!(total, s.len(), "len must equal the sum of bucket sizes");

    let canonical = (0..dir_len).filter(|&i| s.is_canonical(i)).count();
    assert_eq!(canonical, s.buckets.len(), "one canonical slot per bucket");

    let mut seen = 0usize;
    for key in s.iter() {
        seen += 1;
        assert_eq!(s.count(key), 1);
    }
    assert_eq!(seen, s.len(), "iteration must visit each key once");
}

#[derive(Clone, Debug, Arbitrary)]
enum Op {
    #[proptest(weight = 6)]
    Insert(#[proptest(strategy = "0u64..512")] u64),
    #[proptest(weight = 3)]
    Remove(#[proptest(strategy = "0u64..512")] u64),
    #[proptest(weight = 3)]
    Contains(#[proptest(strategy = "0u64..512")] u64),
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(any::<Op>(), 0..=1000)
}

fn run_ops<const N: usize, S: BuildHasher>(
    s: &mut ExtendibleSet<u64, N, S>,
    ops: Vec<Op>,
) -> std::result::Result<HashSet<u64>, TestCaseError> {
    let mut m: HashSet<u64> = HashSet::new();
    for op in ops {
        match op {
            Op::Insert(k) => {
                prop_assert_eq!(s.insert(k), m.insert(k));
            }
            Op::Remove(k) => {
                prop_assert_eq!(s.remove(&k), m.remove(&k));
            }
            Op::Contains(k) => {
                prop_assert_eq!(s.contains(&k), m.contains(&k));
                prop_assert_eq!(s.get(&k).is_some(), m.contains(&k));
            }
        }
        prop_assert_eq!(s.len(), m.len());
    }
    Ok(m)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_equivalence_random_state(ops in ops_strategy(), dir in 0usize..9) {
        let mut s: ExtendibleSet<u64, 3> = ExtendibleSet::with_directory_size(dir);
        let m = run_ops(&mut s, ops)?;

        validate_set(&s);
        let got: HashSet<u64> = s.iter().copied().collect();
        prop_assert_eq!(got, m);
    }

    #[test]
    fn prop_equivalence_identity_hash(ops in ops_strategy(), dir in 0usize..9) {
        // Identity hashing over a small key range clusters keys on low bits.
        let mut s: ExtendibleSet<u64, 2, IdentityState> =
            ExtendibleSet::with_directory_size_and_hasher(dir, IdentityState::default());
        let m = run_ops(&mut s, ops)?;

        validate_set(&s);
        let got: HashSet<u64> = s.iter().copied().collect();
        prop_assert_eq!(got, m);
    }

    #[test]
    fn prop_insert_order_does_not_matter(
        keys in prop::collection::hash_set(any::<u64>(), 0..300),
    ) {
        let forward: ExtendibleSet<u64, 4> = keys.iter().copied().collect();
        let mut sorted: Vec<u64> = keys.iter().copied().collect();
        sorted.sort_unstable();
        let backward: ExtendibleSet<u64, 4> = sorted.into_iter().rev().collect();

        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(forward.len(), keys.len());

        let mut extra = backward.clone();
        extra.insert(keys.iter().copied().fold(0, u64::wrapping_add) | (1 << 63));
        if extra.len() != forward.len() {
            prop_assert_ne!(&forward, &extra);
        }
    }

    #[test]
    fn prop_clear_then_reuse(
        first in prop::collection::vec(0u64..256, 0..200),
        second in prop::collection::vec(0u64..256, 0..200),
    ) {
        let mut s: ExtendibleSet<u64, 2, IdentityState> =
            ExtendibleSet::with_directory_size_and_hasher(1, IdentityState::default());
        s.extend(first);
        let directory_len = s.directory_len();
        s.clear();
        prop_assert!(s.is_empty());
        prop_assert_eq!(s.directory_len(), directory_len);

        s.extend(second.iter());
        validate_set(&s);
        let expected: HashSet<u64> = second.into_iter().collect();
        prop_assert_eq!(s.len(), expected.len());
        for k in &expected {
            prop_assert!(s.contains(k));
        }
    }
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

// Keys sharing long runs of low bits, so small buckets split deep.
const CLUSTERED_KEYS: [u64; 6] = [0, 8, 16, 24, 1, 9];

#[test]
fn exhaustive_insert_order_small_set() {
    let mut reference: ExtendibleSet<u64, 2, IdentityState> =
        ExtendibleSet::with_directory_size_and_hasher(1, IdentityState::default());
    reference.extend(CLUSTERED_KEYS);

    for_each_permutation(&CLUSTERED_KEYS, |perm| {
        let mut s: ExtendibleSet<u64, 2, IdentityState> =
            ExtendibleSet::with_directory_size_and_hasher(1, IdentityState::default());
        for k in perm {
            assert!(s.insert(k));
            validate_set(&s);
        }
        assert_eq!(s, reference);
        assert_eq!(s.iter().count(), CLUSTERED_KEYS.len());
    });
}

#[test]
fn exhaustive_remove_order_small_set() {
    let mut base: ExtendibleSet<u64, 2, IdentityState> =
        ExtendibleSet::with_directory_size_and_hasher(1, IdentityState::default());
    base.extend(CLUSTERED_KEYS);
    let buckets = base.bucket_count();

    for_each_permutation(&CLUSTERED_KEYS, |perm| {
        let mut s = base.clone();
        let mut remaining = CLUSTERED_KEYS.len();
        for k in perm {
            assert!(s.remove(&k));
            remaining -= 1;
            assert_eq!(s.len(), remaining);
            validate_set(&s);
        }
        assert!(s.is_empty());
        assert!(s.iter().is_end());
        // Buckets never merge.
        assert_eq!(s.bucket_count(), buckets);
    });
}
