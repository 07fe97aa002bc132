//! Evaluates a RecSplit settings/hash file pair against a stream of keys.
//!
//! Positional arguments: `settings-file hash-file [key-file]`. Keys are read
//! one per line from `key-file`, or from stdin if omitted. Exits nonzero on
//! a load failure; a key's MPHF index is printed one per line.

use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;

use recsplit_xor::bitreader::{words_from_bytes, BitReader};
use recsplit_xor::recsplit::RecSplitEvaluator;
use recsplit_xor::settings::Settings;

#[derive(Parser)]
#[command(name = "recsplit-eval")]
struct Cli {
    /// Settings file: leaf size, average bucket size, and the split/rice
    /// tables shared by every bucket.
    settings_file: PathBuf,

    /// Hash file: the bucketed, Golomb-Rice-coded split tree itself.
    hash_file: PathBuf,

    /// Newline-delimited keys to evaluate. Reads stdin if omitted.
    key_file: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Cli::parse();

    log::info!("loading settings from {:?}", args.settings_file);
    let settings_bytes = fs::read(&args.settings_file)?;
    let settings_words = words_from_bytes(&settings_bytes);
    let settings = Settings::load(BitReader::new(&settings_words))?;

    log::info!("loading hash index from {:?}", args.hash_file);
    let hash_bytes = fs::read(&args.hash_file)?;
    let hash_words = words_from_bytes(&hash_bytes);
    let evaluator = RecSplitEvaluator::load(settings, hash_words)?;
    log::info!(
        "size={} bucket_count={}",
        evaluator.size(),
        evaluator.bucket_count()
    );

    let reader: Box<dyn BufRead> = match &args.key_file {
        Some(path) => Box::new(io::BufReader::new(fs::File::open(path)?)),
        None => Box::new(io::BufReader::new(io::stdin())),
    };

    let start = Instant::now();
    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for line in reader.lines() {
        let line = line?;
        let key = line.trim_end();
        let index = evaluator.evaluate(key.as_bytes())?;
        println!("{index}\t{key}");
        sum += index;
        count += 1;
    }
    log::info!(
        "evaluated {count} keys in {:?} (sum={sum})",
        start.elapsed()
    );

    Ok(())
}
