use std::cell::Cell;
use std::ops::Bound;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::prelude::random;
use rand::{rngs::SmallRng, SeedableRng};

use crate::comparator::{Natural, Reversed};
use crate::error::Error;
use crate::rbtree::RbTree;

#[test]
fn test_len() {
    let tree: RbTree<i64, i64> = RbTree::new();
    assert_eq!(tree.len(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.min(), None);
    assert_eq!(tree.max(), None);
    assert!(tree.validate().is_ok());
}

#[test]
fn test_insert() {
    let mut tree: RbTree<i64, i64> = RbTree::new();
    let mut refns = RefNodes::new(10);

    for key in [2, 1, 3, 6, 5, 4, 8, 0, 9, 7].iter().copied() {
        assert!(tree.insert(key, key * 10).is_none());
        refns.set(key, key * 10);
        assert!(tree.validate().is_ok());
    }

    assert_eq!(tree.len(), 10);
    assert_eq!(tree.min(), Some((&0, &0)));
    assert_eq!(tree.max(), Some((&9, &90)));

    // test get
    for i in 0..10 {
        let val = tree.get(&i).copied();
        let refval = refns.get(i);
        assert_eq!(val, refval);
    }
    assert_eq!(tree.get(&10), None);
    assert!(!tree.contains_key(&-1));

    // test iter
    let (mut iter, mut iter_ref) = (tree.iter(), refns.iter());
    loop {
        match (iter.next(), iter_ref.next()) {
            (Some(item), Some(ref_item)) => {
                assert_eq!(*item.0, ref_item.0);
                assert_eq!(*item.1, ref_item.1);
            }
            (None, None) => break,
            (_, _) => panic!("invalid"),
        }
    }
}

#[test]
fn test_overwrite() {
    let mut tree: RbTree<i64, &str> = RbTree::new();
    assert_eq!(tree.insert(10, "v1"), None);
    assert_eq!(tree.insert(20, "v1"), None);
    assert_eq!(tree.insert(10, "v2"), Some("v1"));
    assert_eq!(tree.len(), 2);
    assert_eq!(tree.get(&10), Some(&"v2"));
    assert!(tree.validate().is_ok());

    // key is replaced along with the value.
    let by_id = |a: &(i64, String), b: &(i64, String)| a.0.cmp(&b.0);
    let mut tree: RbTree<(i64, String), i64, _> = RbTree::with_comparator(by_id);
    tree.insert((1, "old".to_string()), 100);
    tree.insert((1, "new".to_string()), 200);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.min(), Some((&(1, "new".to_string()), &200)));
}

#[test]
fn test_scenario() {
    let mut tree: RbTree<i64, &str> = RbTree::new();
    let entries = [(5, "e"), (6, "f"), (7, "g"), (3, "c"), (4, "d"), (1, "x"), (2, "b")];
    for (key, value) in entries.iter() {
        tree.insert(*key, *value);
    }
    assert_eq!(tree.insert(1, "a"), Some("x"));
    assert_eq!(tree.get(&1), Some(&"a"));
    assert_eq!(tree.len(), 7);

    for key in [10, 20, 23, 11, 18].iter() {
        tree.insert(*key, "b");
    }
    assert_eq!(tree.len(), 12);
    assert_eq!(tree.floor(&9), Some((&7, &"g")));
    assert_eq!(tree.ceil(&9), Some((&10, &"b")));
    assert!(tree.validate().is_ok());

    for key in 0..15 {
        tree.delete(&key);
        assert!(tree.validate().is_ok());
    }
    let keys: Vec<i64> = tree.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![18, 20, 23]);
    assert_eq!(tree.len(), 3);
}

#[test]
fn test_floor_ceil() {
    let mut tree: RbTree<i64, i64> = RbTree::new();
    assert_eq!(tree.floor(&0), None);
    assert_eq!(tree.ceil(&0), None);

    for key in (10..=100).step_by(10) {
        tree.insert(key, key + 1);
    }
    // present keys
    for key in (10..=100).step_by(10) {
        assert_eq!(tree.floor(&key), Some((&key, &(key + 1))));
        assert_eq!(tree.ceil(&key), Some((&key, &(key + 1))));
    }
    // below minimum
    assert_eq!(tree.floor(&9), None);
    assert_eq!(tree.ceil(&9), Some((&10, &11)));
    // above maximum
    assert_eq!(tree.ceil(&101), None);
    assert_eq!(tree.floor(&101), Some((&100, &101)));
    // in between
    assert_eq!(tree.floor(&55), Some((&50, &51)));
    assert_eq!(tree.ceil(&55), Some((&60, &61)));
}

#[test]
fn test_delete() {
    let mut tree: RbTree<i64, i64> = RbTree::new();
    let mut refns = RefNodes::new(11);

    for key in [2, 1, 3, 6, 5, 4, 8, 0, 9, 7].iter().copied() {
        assert!(tree.insert(key, 100).is_none());
        refns.set(key, 100);
    }

    // delete a missing node.
    assert!(tree.delete(&10).is_none());
    assert!(refns.delete(10).is_none());

    assert_eq!(tree.len(), 10);
    assert!(tree.validate().is_ok());

    // delete all entry.
    for i in 0..10 {
        let val = tree.delete(&i);
        let refval = refns.delete(i);
        assert_eq!(val, refval);
        assert!(tree.validate().is_ok());
    }
    assert_eq!(tree.len(), 0);
    assert!(tree.validate().is_ok());
    assert!(tree.iter().next().is_none());
    assert_eq!(tree.min(), None);
    assert_eq!(tree.max(), None);

    // tree is reusable after becoming empty.
    assert!(tree.insert(5, 50).is_none());
    assert_eq!(tree.get(&5), Some(&50));
    assert!(tree.validate().is_ok());
}

#[test]
fn test_delete_internal() {
    // delete nodes with two children, from the root down.
    let mut tree: RbTree<i64, i64> = RbTree::new();
    for key in 0..127 {
        tree.insert(key, -key);
    }
    let mut left = tree.len();
    while let Some(root) = tree.iter().nth(tree.len() / 2).map(|(k, _)| *k) {
        assert_eq!(tree.delete(&root), Some(-root));
        left -= 1;
        assert_eq!(tree.len(), left);
        assert!(tree.validate().is_ok());
    }
    assert!(tree.is_empty());
}

#[test]
fn test_stress() {
    let n = 10_000;
    let mut tree: RbTree<i64, String> = RbTree::new();
    for key in 0..n {
        assert!(tree.insert(key, format!("value{}", key)).is_none());
        if key % 1000 == 0 {
            assert!(tree.validate().is_ok());
        }
    }
    assert_eq!(tree.len(), n as usize);
    assert_eq!(tree.min().map(|(k, _)| *k), Some(0));
    assert_eq!(tree.max().map(|(k, _)| *k), Some(n - 1));
    assert_eq!(tree.get(&4242).map(|v| v.as_str()), Some("value4242"));

    for key in 0..(n + 10) {
        let val = tree.delete(&key);
        assert_eq!(val.is_some(), key < n);
        if key % 500 == 0 {
            assert!(tree.validate().is_ok());
        }
    }
    assert_eq!(tree.len(), 0);
    assert_eq!(tree.min(), None);
    assert!(tree.validate().is_ok());
}

#[test]
fn test_validate_stats() {
    let n = 4095;
    let mut tree: RbTree<i64, i64> = RbTree::new();
    for _ in 0..n {
        let key = (random::<i64>() % 100_000).abs();
        tree.insert(key, key);
    }
    let stats = tree.validate().unwrap();
    assert_eq!(stats.entries(), tree.len());
    assert!(stats.blacks().unwrap() > 0);

    let depths = stats.depths().unwrap();
    assert_eq!(depths.samples(), tree.len() + 1);
    let bound = 2.0 * ((tree.len() + 1) as f64).log2();
    assert!((depths.max() as f64) <= bound, "{} > {}", depths.max(), bound);
    assert!(depths.min() <= depths.mean() && depths.mean() <= depths.max());
}

#[test]
fn test_crud() {
    let size = 1000;
    let mut tree: RbTree<i64, i64> = RbTree::new();
    let mut refns = RefNodes::new(size);

    for _ in 0..100_000 {
        let key: i64 = (random::<i64>() % (size as i64)).abs();
        let value: i64 = random();
        let op: i64 = (random::<i64>() % 4).abs();
        match op {
            0 => {
                let val = tree.insert(key, value);
                let refval = refns.set(key, value);
                assert_eq!(val, refval);
            }
            1 => {
                let val = tree.delete(&key);
                let refval = refns.delete(key);
                assert_eq!(val, refval);
            }
            2 => {
                let val = tree.get(&key).copied();
                let refval = refns.get(key);
                assert_eq!(val, refval);
            }
            3 => {
                let val = tree.floor(&key).map(|(k, v)| (*k, *v));
                assert_eq!(val, refns.floor(key));
                let val = tree.ceil(&key).map(|(k, v)| (*k, *v));
                assert_eq!(val, refns.ceil(key));
            }
            op => panic!("unreachable {}", op),
        };

        assert_eq!(tree.len(), refns.len());
        assert!(tree.validate().is_ok());
    }

    println!("index-length {}", tree.len());

    // test iter
    let (mut iter, mut iter_ref) = (tree.iter(), refns.iter());
    loop {
        match (iter.next(), iter_ref.next()) {
            (Some(item), Some(ref_item)) => {
                assert_eq!(*item.0, ref_item.0);
                assert_eq!(*item.1, ref_item.1);
            }
            (None, None) => break,
            (_, _) => panic!("invalid"),
        }
    }
}

#[test]
fn test_range() {
    let size = 1000;
    let mut tree: RbTree<i64, i64> = RbTree::new();
    let mut refns = RefNodes::new(size);

    for _ in 0..(size / 2) {
        let key: i64 = (random::<i64>() % (size as i64)).abs();
        let value: i64 = random();
        assert_eq!(tree.insert(key, value), refns.set(key, value));
    }

    for _ in 0..10_000 {
        let (low, high) = random_low_high(size);

        let items: Vec<(i64, i64)> = tree
            .range((low, high))
            .map(|(k, v)| (*k, *v))
            .collect();
        let ref_items: Vec<(i64, i64)> = refns.range(low, high).collect();
        assert_eq!(items, ref_items, "{:?} {:?}", low, high);

        let items: Vec<(i64, i64)> = tree
            .range((low, high))
            .rev()
            .map(|(k, v)| (*k, *v))
            .collect();
        let ref_items: Vec<(i64, i64)> = refns.range(low, high).rev().collect();
        assert_eq!(items, ref_items, "{:?} {:?}", low, high);
    }
}

#[test]
fn test_iter_both_ends() {
    let tree: RbTree<i64, i64> = RbTree::load_from(Natural, (0..10).map(|k| (k, k)));
    let mut iter = tree.iter();
    assert_eq!(iter.next(), Some((&0, &0)));
    assert_eq!(iter.next_back(), Some((&9, &9)));
    assert_eq!(iter.next_back(), Some((&8, &8)));
    assert_eq!(iter.next(), Some((&1, &1)));
    let rest: Vec<i64> = iter.map(|(k, _)| *k).collect();
    assert_eq!(rest, vec![2, 3, 4, 5, 6, 7]);

    let mut iter = tree.range(4..5);
    assert_eq!(iter.next_back(), Some((&4, &4)));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next_back(), None);

    let keys: Vec<i64> = (&tree).into_iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, (0..10).collect::<Vec<i64>>());
    assert_eq!(tree.range(7..3).next(), None);
    assert_eq!(tree.range(20..).next(), None);
}

#[test]
fn test_load_from() {
    let items = vec![(3, "c"), (1, "a"), (2, "b"), (1, "z")];
    let tree = RbTree::load_from(Natural, items);
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.get(&1), Some(&"z"));
    assert!(tree.validate().is_ok());
    assert_eq!(format!("{:?}", tree), r#"{1: "z", 2: "b", 3: "c"}"#);
}

#[test]
fn test_reversed() {
    let mut tree: RbTree<i64, i64, Reversed<Natural>> = RbTree::with_comparator(Reversed(Natural));
    for key in 0..100 {
        tree.insert(key, key);
    }
    assert!(tree.validate().is_ok());
    assert_eq!(tree.min(), Some((&99, &99)));
    assert_eq!(tree.max(), Some((&0, &0)));

    let keys: Vec<i64> = tree.iter().take(3).map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![99, 98, 97]);

    // floor and ceil follow comparator order.
    assert_eq!(tree.floor(&150), None);
    assert_eq!(tree.ceil(&150), Some((&99, &99)));
    assert_eq!(tree.floor(&-1), Some((&0, &0)));

    for key in 0..50 {
        assert_eq!(tree.delete(&key), Some(key));
    }
    assert!(tree.validate().is_ok());
    assert_eq!(tree.max(), Some((&50, &50)));
}

#[test]
fn test_random() {
    let mut tree: RbTree<i64, i64> = RbTree::new();
    let mut rng = SmallRng::from_seed(make_seed().to_le_bytes());

    assert_eq!(tree.random(&mut rng), None);

    assert!(tree.insert(0, 0).is_none());
    assert_eq!(tree.random(&mut rng), Some((&0, &0)));

    for key in 1..100_000 {
        assert!(tree.insert(key, key * 10).is_none());
    }
    for _i in 0..200_000 {
        let (key, value) = tree.random(&mut rng).unwrap();
        assert!(*key >= 0 && *key < 100_000);
        assert_eq!(*value, key * 10);
    }
}

#[test]
fn test_get_mut_clear() {
    let mut tree: RbTree<i64, Vec<i64>> = RbTree::new();
    tree.insert(1, vec![]);
    tree.get_mut(&1).unwrap().push(10);
    assert_eq!(tree.get(&1), Some(&vec![10]));
    assert!(tree.get_mut(&2).is_none());

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.get(&1), None);
    assert!(tree.validate().is_ok());
}

#[test]
fn test_dump() {
    let mut tree: RbTree<i64, ()> = RbTree::new();
    assert_eq!(tree.dump(), "RbTree\n");
    for key in [2, 1, 3].iter() {
        tree.insert(*key, ());
    }
    let out = "RbTree\n│   ┌── *3\n└── 2\n    └── *1\n";
    assert_eq!(tree.dump(), out);
}

#[test]
fn test_validate_error() {
    // comparator changing its order after the fact breaks sort order.
    let flip = Cell::new(false);
    let cmp = |a: &i64, b: &i64| if flip.get() { b.cmp(a) } else { a.cmp(b) };
    let mut tree: RbTree<i64, i64, _> = RbTree::with_comparator(cmp);
    for key in [5, 2, 8].iter() {
        tree.insert(*key, 0);
    }
    assert!(tree.validate().is_ok());

    flip.set(true);
    match tree.validate() {
        Err(Error::SortError(child, parent)) => assert_eq!((child, parent), (2, 5)),
        Err(err) => panic!("unexpected {}", err),
        Ok(_) => panic!("expected sort error"),
    }
}

fn make_seed() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos()
}

include!("./ref_test.rs");
