// Load measurement for RbTree instances. Measure:
// * Initial load of N entries.
// * Floor and ceil on every loaded key.
// * Delete N + 10 keys, the last 10 are misses.
//
// N is the first argument, 10000 by default. Set RUST_LOG=info to see
// the timings.

use std::{env, time::Instant};

use log::{error, info};

use rbtree_index::RbTree;

fn main() {
    env_logger::init();

    let n: i64 = match env::args().nth(1).map(|arg| arg.parse()) {
        None => 10_000,
        Some(Ok(n)) => n,
        Some(Err(err)) => {
            error!("invalid load size: {}", err);
            std::process::exit(1);
        }
    };

    let mut tree: RbTree<i64, String> = RbTree::new();
    let start = Instant::now();
    for key in 0..n {
        tree.insert(key, format!("value{}", key));
    }
    info!("loaded {} entries in {:?}", tree.len(), start.elapsed());

    match tree.validate() {
        Ok(stats) => {
            if let Some(depths) = stats.depths() {
                info!("blacks:{:?} depths:{}", stats.blacks(), depths);
            }
        }
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    }

    let start = Instant::now();
    for key in 0..n {
        if tree.floor(&key).is_none() || tree.ceil(&key).is_none() {
            error!("missing key {}", key);
            std::process::exit(1);
        }
    }
    info!("floor/ceil {} keys in {:?}", n, start.elapsed());

    if let (Some((min, _)), Some((max, _))) = (tree.min(), tree.max()) {
        info!("min:{} max:{}", min, max);
    }

    let start = Instant::now();
    for key in 0..(n + 10) {
        tree.delete(&key);
    }
    info!("deleted {} keys in {:?}, left {}", n, start.elapsed(), tree.len());
}
