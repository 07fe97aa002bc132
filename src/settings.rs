//! The per-tree-size settings table: for every possible bucket/subtree size
//! `s` in `[0, MAX_SIZE)`, how it splits and what Golomb-Rice shift encodes
//! its split-point deltas. Shared by every bucket in a `RecSplitEvaluator`.

use crate::bitreader::BitReader;
use crate::error::{RecSplitError, Result};
use crate::hashing::unfold_signed;

/// Upper bound on a bucket/subtree size this format can describe. Settings
/// entries beyond the encoded table length are never consulted: `leafSize`
/// bounds every subtree this evaluator will ever be asked to split.
pub const MAX_SIZE: usize = 4096;

/// `splits[s]`: positive values mean a symmetric k-way split into `s / k`
/// equal parts; negative values mean an asymmetric 2-way split, with
/// `-splits[s]` the size of the first part.
/// `rice[s]`: the Golomb-Rice remainder width used to encode split points
/// for a subtree of size `s`.
pub struct Settings {
    pub leaf_size: i32,
    pub average_bucket_size: i32,
    splits: Vec<i32>,
    rice: Vec<i32>,
}

impl Settings {
    /// Decodes a settings table starting at `reader`'s cursor.
    pub fn load(mut reader: BitReader<'_>) -> Result<Self> {
        let leaf_size = reader.read_elias_delta()? as i32 - 1;
        let average_bucket_size = reader.read_elias_delta()? as i32 - 1;
        let len = reader.read_elias_delta()? as u32 - 1;
        if len as usize > MAX_SIZE {
            return Err(RecSplitError::UnsupportedFormat(format!(
                "settings table length {len} exceeds MAX_SIZE {MAX_SIZE}"
            )));
        }

        let mut splits = vec![0i32; MAX_SIZE];
        let mut rice = vec![0i32; MAX_SIZE];
        for i in 0..(len as usize) {
            splits[i] = unfold_signed(reader.read_elias_delta()? - 1) as i32;
            rice[i] = reader.read_elias_delta()? as i32 - 1;
        }

        Ok(Settings {
            leaf_size,
            average_bucket_size,
            splits,
            rice,
        })
    }

    pub fn split(&self, size: u32) -> i32 {
        self.splits[size as usize]
    }

    pub fn rice_shift(&self, size: u32) -> u32 {
        self.rice[size as usize] as u32
    }
}
