use std::collections::{HashMap, HashSet};

use denseset::StringSet;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Add(u16),
    Erase(u16),
    Pop,
    Reserve(u16),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u16..300).prop_map(Op::Add),
        2 => (0u16..300).prop_map(Op::Erase),
        1 => Just(Op::Pop),
        1 => (0u16..128).prop_map(Op::Reserve),
    ]
}

proptest! {
    /// Drives the set against a model `HashSet` and checks the public
    /// counters after every step: live count, bucket/chain accounting and
    /// membership round trips.
    #[test]
    fn matches_model_set(ops in proptest::collection::vec(op_strategy(), 1..400)) {
        let mut set = StringSet::default();
        let mut model: HashSet<Vec<u8>> = HashSet::new();

        for op in ops {
            match op {
                Op::Add(k) => {
                    let key = format!("k{k}").into_bytes();
                    let inserted = set.add(&key, None);
                    prop_assert_eq!(inserted, model.insert(key.clone()));
                    prop_assert!(set.contains(&key));
                }
                Op::Erase(k) => {
                    let key = format!("k{k}").into_bytes();
                    prop_assert_eq!(set.erase(&key), model.remove(&key));
                    prop_assert!(!set.contains(&key));
                }
                Op::Pop => match set.pop() {
                    Some(key) => prop_assert!(model.remove(&key)),
                    None => prop_assert!(model.is_empty()),
                },
                Op::Reserve(n) => set.reserve(n as usize),
            }

            prop_assert_eq!(set.len(), model.len());
            prop_assert_eq!(set.len(), set.used_buckets() + set.chain_links());
        }

        let mut seen = HashSet::new();
        for key in set.iter() {
            prop_assert!(seen.insert(key.to_vec()), "iterator repeated a key");
        }
        prop_assert_eq!(seen, model);
    }

    /// A cursor loop over an untouched set reports every key at least once
    /// and none more than twice.
    #[test]
    fn scan_covers_quiescent_sets(keys in proptest::collection::hash_set("[a-z]{1,12}", 0..200)) {
        let mut set = StringSet::default();
        for key in &keys {
            set.add(key.as_bytes(), None);
        }

        let mut visits: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut cursor = 0;
        loop {
            cursor = set.scan(cursor, |key| {
                *visits.entry(key.to_vec()).or_insert(0) += 1;
            });
            if cursor == 0 {
                break;
            }
        }

        prop_assert_eq!(visits.len(), keys.len());
        for (key, count) in visits {
            prop_assert!(keys.contains(std::str::from_utf8(&key).unwrap()));
            prop_assert!(count <= 2, "{:?} visited {} times", key, count);
        }
    }

    /// Expiry model: a key is live while its stamp is ahead of the clock.
    /// After a flushing scan the lazy deletions have caught up and the live
    /// counts agree.
    #[test]
    fn expiry_matches_model(
        ops in proptest::collection::vec((0u16..60, proptest::option::of(0u32..6), 0u32..3), 1..200),
    ) {
        let mut set = StringSet::default();
        let mut model: HashMap<Vec<u8>, Option<u32>> = HashMap::new();
        let mut now = 0u32;

        for (k, ttl, advance) in ops {
            now = now.saturating_add(advance);
            set.set_time(now);

            let key = format!("k{k}").into_bytes();
            let live = match model.get(&key) {
                Some(None) => true,
                Some(Some(at)) => *at > now,
                None => false,
            };

            let inserted = set.add(&key, ttl);
            prop_assert_eq!(inserted, !live);
            if inserted {
                model.insert(key, ttl.map(|t| now + t));
            }
        }

        let mut cursor = 0;
        loop {
            cursor = set.scan(cursor, |_| {});
            if cursor == 0 {
                break;
            }
        }

        let live = model
            .values()
            .filter(|expire| match expire {
                None => true,
                Some(at) => *at > now,
            })
            .count();
        prop_assert_eq!(set.len(), live);
    }
}
