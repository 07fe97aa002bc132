//! `RecSplitEvaluator`: bucket dispatch plus recursive split-tree traversal.
//!
//! This is the core of the crate. The on-disk format records, per internal
//! node of a recursive splitting tree, only the Golomb-Rice-coded hash seed
//! that was found (by the offline builder) to partition that node's keys
//! into the chosen split shape. Evaluating a key re-derives the same
//! computations the builder made: hash the key, read the seed, decide which
//! child it falls into, repeat until a leaf, where a supplemental hash
//! modulo the leaf size gives the final slot.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::bitreader::{words_from_bytes, BitReader};
use crate::error::{RecSplitError, Result};
use crate::hashing::{get_universal_hash_index, reduce, supplemental_hash, universal_hash};
use crate::monotone_list::MultiStageMonotoneList;
use crate::settings::Settings;

/// `ceil(size / average_bucket_size)`.
fn bucket_count(size: u64, average_bucket_size: i32) -> u32 {
    let average_bucket_size = average_bucket_size.max(1) as u64;
    ((size + average_bucket_size - 1) / average_bucket_size) as u32
}

/// At least 1.375 bits per key: the floor on how many bits a bucket's
/// encoded subtree occupies, used to locate where its data starts.
fn get_min_bit_count(size: u32) -> u64 {
    (size as u64 * 11 + 7) >> 3
}

struct BucketGeometry {
    offset: u64,
    bucket_size: u32,
    start_pos: u64,
}

/// A decoded, immutable-after-load RecSplit index. Owns the hash file's word
/// buffer directly and carries no lifetime parameter. `evaluate` builds a
/// fresh `BitReader` cursor over `self.words` on each call.
pub struct RecSplitEvaluator {
    settings: Settings,
    words: Vec<u64>,
    size: u64,
    bucket_count: u32,
    min_offset_diff: u32,
    min_start_diff: u32,
    offset_list: MultiStageMonotoneList,
    start_list: MultiStageMonotoneList,
    start_buckets: u64,
}

impl RecSplitEvaluator {
    /// Decodes a RecSplit index out of `hash_words` (the hash file's
    /// contents, already converted to big-endian words via
    /// [`crate::bitreader::words_from_bytes`]), using the already-decoded
    /// per-tree-size `settings` table from the companion settings file.
    pub fn load(settings: Settings, hash_words: Vec<u64>) -> Result<Self> {
        let mut reader = BitReader::new(&hash_words);
        let size = reader.read_elias_delta()? - 1;
        let count = bucket_count(size, settings.average_bucket_size);
        log::debug!("RecSplit index: size={size} bucket_count={count}");
        if size == 0 {
            log::warn!("RecSplit index declares zero keys");
        }

        let alternative = reader.read_bit()?;
        if alternative != 0 {
            return Err(RecSplitError::UnsupportedFormat(
                "alternative RecSplit header variant is not supported".into(),
            ));
        }
        let min_offset_diff = reader.read_elias_delta()? as u32 - 1;
        let min_start_diff = reader.read_elias_delta()? as u32 - 1;

        let offset_list = MultiStageMonotoneList::load(&mut reader)?;
        let start_list = MultiStageMonotoneList::load(&mut reader)?;
        let start_buckets = reader.pos();

        Ok(RecSplitEvaluator {
            settings,
            words: hash_words,
            size,
            bucket_count: count,
            min_offset_diff,
            min_start_diff,
            offset_list,
            start_list,
            start_buckets,
        })
    }

    /// Memory-maps a settings/hash file pair and decodes a `RecSplitEvaluator`
    /// out of them. The maps are dropped once their contents are copied into
    /// owned, byte-swapped word buffers. Nothing keeps either file open.
    pub fn open<P: AsRef<Path>>(settings_path: P, hash_path: P) -> Result<Self> {
        let settings_words = mmap_words(settings_path)?;
        let settings = Settings::load(BitReader::new(&settings_words))?;
        let hash_words = mmap_words(hash_path)?;
        Self::load(settings, hash_words)
    }

    /// Total number of keys this index was built over.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    /// Resolves a bucket's `[offset, offset + bucketSize)` slot range and
    /// where its encoded subtree starts, or `None` for an empty bucket.
    fn bucket_geometry(&self, b: u32) -> Result<Option<BucketGeometry>> {
        let pair = self.offset_list.get_pair(&self.words, b)?;
        let off_hi = (pair >> 32) as u32;
        let off_lo = pair as u32;
        let offset = off_hi as u64 + b as u64 * self.min_offset_diff as u64;
        let offset_next = off_lo as u64 + (b as u64 + 1) * self.min_offset_diff as u64;
        if offset_next == offset {
            return Ok(None);
        }
        let bucket_size = (offset_next - offset) as u32;
        let start_pos = self.start_buckets
            + get_min_bit_count(offset as u32)
            + self.start_list.get(&self.words, b)? as u64
            + b as u64 * self.min_start_diff as u64;
        Ok(Some(BucketGeometry {
            offset,
            bucket_size,
            start_pos,
        }))
    }

    /// Computes `key`'s minimal perfect hash index in `[0, size)`.
    ///
    /// For a key that was *not* in the structure's build set, the result is
    /// an arbitrary in-range value (or `0`, ambiguous with the valid index
    /// `0`). Foreign keys are not detected here; see the crate's XorFilter8
    /// for that.
    pub fn evaluate(&self, key: &[u8]) -> Result<u64> {
        let hash_code = universal_hash(key, 0);
        let b = if self.bucket_count == 1 {
            0
        } else {
            reduce(hash_code as u32, self.bucket_count)
        };
        let geometry = match self.bucket_geometry(b)? {
            Some(g) => g,
            None => return Ok(0),
        };
        let reader = BitReader::new(&self.words);
        self.descend(
            &reader,
            geometry.start_pos,
            key,
            hash_code,
            0,
            geometry.offset,
            geometry.bucket_size,
        )
    }

    /// Iteratively walks from the root of a bucket's split tree down to a
    /// leaf, reading exactly one Golomb-Rice-coded seed per level and
    /// skipping over sibling subtrees it doesn't need.
    fn descend(
        &self,
        reader: &BitReader<'_>,
        mut pos: u64,
        key: &[u8],
        mut hash_code: u64,
        mut index: u64,
        mut add: u64,
        mut size: u32,
    ) -> Result<u64> {
        loop {
            if size < 2 {
                return Ok(add);
            }
            let shift = self.settings.rice_shift(size);
            let (value, next_pos) = reader.read_rice_at(pos, shift)?;
            pos = next_pos;

            let old_window = get_universal_hash_index(index);
            index += value + 1;
            let new_window = get_universal_hash_index(index);
            if new_window != old_window {
                hash_code = universal_hash(key, new_window);
            }

            if size as i64 <= self.settings.leaf_size as i64 {
                let h = supplemental_hash(hash_code, index);
                return Ok(add + reduce(h, size) as u64);
            }

            let split = self.settings.split(size);
            let h = supplemental_hash(hash_code, index);
            if split < 0 {
                let first_part = (-split) as u32;
                let other_part = size - first_part;
                if reduce(h, size) < first_part {
                    size = first_part;
                    continue;
                }
                pos = self.skip(reader, pos, first_part)?;
                add += first_part as u64;
                size = other_part;
            } else {
                let arity = split as u32;
                let first_part = size / arity;
                let chosen = reduce(h, arity);
                for _ in 0..chosen {
                    pos = self.skip(reader, pos, first_part)?;
                    add += first_part as u64;
                }
                size = first_part;
            }
        }
    }

    /// Advances `pos` past the entire encoded subtree for a node of `size`
    /// keys, without touching any hash state. Used to jump over sibling
    /// children that a descent doesn't need to enter.
    fn skip(&self, reader: &BitReader<'_>, pos: u64, size: u32) -> Result<u64> {
        if size < 2 {
            return Ok(pos);
        }
        let mut pos = reader.skip_golomb_rice(pos, self.settings.rice_shift(size))?;
        if size as i64 <= self.settings.leaf_size as i64 {
            return Ok(pos);
        }
        let split = self.settings.split(size);
        if split < 0 {
            let first_part = (-split) as u32;
            let other_part = size - first_part;
            pos = self.skip(reader, pos, first_part)?;
            pos = self.skip(reader, pos, other_part)?;
        } else {
            let arity = split as u32;
            let part = size / arity;
            for _ in 0..arity {
                pos = self.skip(reader, pos, part)?;
            }
        }
        Ok(pos)
    }
}

fn mmap_words<P: AsRef<Path>>(path: P) -> Result<Vec<u64>> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    Ok(words_from_bytes(&mmap))
}
