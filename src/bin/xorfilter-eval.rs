//! Evaluates an `XorFilter8` against a fixed `hash.bin` / `keys.txt` pair
//! inside a directory: `mayContain(key)` for every newline-delimited key in
//! `keys.txt`, printed one per line.

use std::fs;
use std::path::PathBuf;

use clap::Parser;

use recsplit_xor::xorfilter::XorFilter8;

#[derive(Parser)]
#[command(name = "xorfilter-eval")]
struct Cli {
    /// Directory containing `hash.bin` and `keys.txt`.
    directory: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Cli::parse();

    let hash_path = args.directory.join("hash.bin");
    let keys_path = args.directory.join("keys.txt");

    log::info!("loading filter from {hash_path:?}");
    let filter = XorFilter8::open(&hash_path)?;
    log::info!("filter size={}", filter.size());

    let keys = fs::read_to_string(&keys_path)?;
    let mut hits = 0u64;
    let mut total = 0u64;
    for line in keys.lines() {
        let key = line.trim();
        if key.is_empty() {
            continue;
        }
        let key_hash: u64 = key.parse().unwrap_or_else(|_| {
            // Non-numeric key text is hashed down to a u64 the same way the
            // filter's own SplitMix64 finisher would fold any fixed-width
            // input: via the standard library's hasher, just to produce a
            // stable u64 from arbitrary bytes for this CLI's convenience.
            use std::hash::{Hash, Hasher};
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            key.hash(&mut hasher);
            hasher.finish()
        });
        let contains = filter.may_contain(key_hash);
        println!("{contains}\t{key}");
        total += 1;
        if contains {
            hits += 1;
        }
    }
    log::info!("{hits}/{total} keys reported present");

    Ok(())
}
