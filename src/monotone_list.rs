//! `MultiStageMonotoneList`: a compressed, monotone `u32` sequence stored as
//! a linear baseline plus three levels of residual corrections at widening
//! strides.

use crate::bitreader::BitReader;
use crate::error::{RecSplitError, Result};
use crate::hashing::unfold_signed;

const SHIFT1: u32 = 6;
const SHIFT2: u32 = 3;
const FACTOR1: u64 = 32;
const FACTOR2: u64 = 16;

/// A decoded monotone list. Holds only the header fields and the bit
/// positions of its three residual levels, never the underlying buffer.
/// `get`/`get_pair` take the word buffer as an argument, so a list has no
/// lifetime of its own and can be stored alongside (rather than borrowing
/// from) the buffer it was decoded out of.
#[derive(Clone, Copy, Debug)]
pub struct MultiStageMonotoneList {
    count3: u32,
    factor: u64,
    add: u32,
    bit_count1: u32,
    bit_count2: u32,
    bit_count3: u32,
    start_level1: u64,
    start_level2: u64,
    start_level3: u64,
}

impl MultiStageMonotoneList {
    /// Decodes a list starting at `reader`'s current cursor, advancing the
    /// cursor past the whole encoded structure.
    pub fn load(reader: &mut BitReader<'_>) -> Result<Self> {
        let count3 = reader.read_elias_delta()? as u32 - 1;
        let diff = reader.read_elias_delta()? as u32 - 1;
        let factor = scale_factor(diff, count3);
        let add = unfold_signed(reader.read_elias_delta()? - 1) as u32;
        let bit_count1 = reader.read_elias_delta()? as u32 - 1;
        let bit_count2 = reader.read_elias_delta()? as u32 - 1;
        let bit_count3 = reader.read_elias_delta()? as u32 - 1;
        for (name, bits) in [("bitCount1", bit_count1), ("bitCount2", bit_count2), ("bitCount3", bit_count3)] {
            if bits > 32 {
                return Err(RecSplitError::UnsupportedFormat(format!(
                    "{name} = {bits} exceeds the 32-bit residual width this format allows"
                )));
            }
        }

        let start_level1 = reader.pos();
        let count2 = (count3 + (1 << SHIFT2) - 1) >> SHIFT2;
        let count1 = (count3 + (1 << SHIFT1) - 1) >> SHIFT1;
        let start_level2 = start_level1 + count1 as u64 * bit_count1 as u64;
        let start_level3 = start_level2 + count2 as u64 * bit_count2 as u64;
        let end = start_level3 + bit_count3 as u64 * count3 as u64;
        reader.set_pos(end);

        Ok(MultiStageMonotoneList {
            count3,
            factor,
            add,
            bit_count1,
            bit_count2,
            bit_count3,
            start_level1,
            start_level2,
            start_level3,
        })
    }

    /// Number of values this list covers.
    pub fn len(&self) -> u32 {
        self.count3
    }

    pub fn is_empty(&self) -> bool {
        self.count3 == 0
    }

    /// Reconstructs `list[i]` from the linear baseline and the three
    /// residual levels, reading out of `words` (the same buffer this list
    /// was decoded from).
    pub fn get(&self, words: &[u64], i: u32) -> Result<u32> {
        let reader = BitReader::new(words);
        let expected = (((i as u64) * self.factor) >> 32) as u32 + self.add;
        let a = reader.read_number_at(
            self.start_level1 + (i >> SHIFT1) as u64 * self.bit_count1 as u64,
            self.bit_count1,
        )?;
        let b = reader.read_number_at(
            self.start_level2 + (i >> SHIFT2) as u64 * self.bit_count2 as u64,
            self.bit_count2,
        )?;
        let c = reader.read_number_at(self.start_level3 + i as u64 * self.bit_count3 as u64, self.bit_count3)?;
        Ok(expected
            .wrapping_add((a * FACTOR1) as u32)
            .wrapping_add((b * FACTOR2) as u32)
            .wrapping_add(c as u32))
    }

    /// `(list[i] << 32) | list[i + 1]`, the form consumers need for bucket
    /// boundary lookups.
    pub fn get_pair(&self, words: &[u64], i: u32) -> Result<u64> {
        let hi = self.get(words, i)? as u64;
        let lo = self.get(words, i + 1)? as u64;
        Ok((hi << 32) | lo)
    }
}

fn scale_factor(multiply: u32, divide: u32) -> u64 {
    if divide == 0 {
        0
    } else {
        ((multiply as u64) << 32) / divide as u64 + 1
    }
}
