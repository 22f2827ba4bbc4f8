//! # Bulk build profiler
//!
//! Times the two build paths end to end: a million random-order `put`s into
//! one tree, then an ordered rebuild of that tree through `put_next`, with
//! consistency audits and random point-lookup spot checks along the way.
//! Prints per-phase timings and the page/heap statistics of both trees.
//!
//! ```sh
//! cargo run --example bulk_profile --release
//! ```
//!
//! Override the key count with the first argument:
//!
//! ```sh
//! cargo run --example bulk_profile --release -- 250000
//! ```

use std::time::Instant;

use memdex::Btree;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;

fn main() {
    let count: usize = std::env::args()
        .nth(1)
        .map(|arg| arg.parse().expect("key count must be an integer"))
        .unwrap_or(1_000_000);
    let mut rng = StdRng::seed_from_u64(0xB17E5);

    println!("building {} little-endian counter keys", count);
    let mut keys: Vec<[u8; 8]> = (0..count as u64).map(|i| i.to_le_bytes()).collect();
    keys.shuffle(&mut rng);

    let start = Instant::now();
    let mut random = Btree::new();
    for key in &keys {
        random.put(key, key);
    }
    let put_elapsed = start.elapsed();
    println!(
        "random put:  {:>9.2} ms ({:.0} keys/sec)",
        put_elapsed.as_secs_f64() * 1000.0,
        count as f64 / put_elapsed.as_secs_f64()
    );

    let start = Instant::now();
    random
        .check_consistency()
        .expect("random-built tree failed its audit");
    println!(
        "audit:       {:>9.2} ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    let start = Instant::now();
    let mut bulk = Btree::new();
    for (key, value) in random.start(&[]) {
        bulk.put_next(key, value);
    }
    let bulk_elapsed = start.elapsed();
    println!(
        "bulk rebuild:{:>9.2} ms ({:.0} keys/sec)",
        bulk_elapsed.as_secs_f64() * 1000.0,
        count as f64 / bulk_elapsed.as_secs_f64()
    );

    bulk.check_consistency()
        .expect("bulk-built tree failed its audit");

    let start = Instant::now();
    let probes = 100_000.min(count);
    for _ in 0..probes {
        let key = keys[rng.gen_range(0..keys.len())];
        assert_eq!(random.get(&key), Some(&key[..]));
        assert_eq!(bulk.get(&key), Some(&key[..]));
    }
    let probe_elapsed = start.elapsed();
    println!(
        "spot checks: {:>9.2} ms ({:.0} lookups/sec over both trees)",
        probe_elapsed.as_secs_f64() * 1000.0,
        (2 * probes) as f64 / probe_elapsed.as_secs_f64()
    );

    for (name, tree) in [("random", &random), ("bulk", &bulk)] {
        let stats = tree.stats();
        println!(
            "{:>6}: height {}, {} leaf + {} internal pages, fill {:.1}%, \
             {} KiB pages, {} KiB values",
            name,
            tree.height(),
            stats.leaf_pages,
            stats.internal_pages,
            stats.fill_rate * 100.0,
            stats.page_bytes / 1024,
            stats.value_store_bytes / 1024
        );
    }
}
