//! `XorFilter8`: a read-only, 3-wise XOR membership filter over 8-bit
//! fingerprints (false-positive rate approximately 2⁻⁸).
//!
//! The on-disk format is a flat byte buffer: a 4-byte big-endian `size`, a
//! 4-byte big-endian `hashIndex` salt, then one fingerprint byte per array
//! slot. The filter is built externally. This module only evaluates it.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{RecSplitError, Result};
use crate::hashing::{hash64, reduce};

const HEADER_LEN: usize = 8;

/// `arrayLength = 3 + 1.23 * size`, split into three equal-length blocks.
fn array_length(size: u32) -> u32 {
    3 + (123u64 * size as u64 / 100) as u32
}

/// The low byte of a SplitMix64 hash: the fingerprint stored per slot.
fn fingerprint(hash: u64) -> u8 {
    (hash & 0xff) as u8
}

/// An evaluation-only XOR filter over a borrowed fingerprint buffer.
pub struct XorFilter8<B> {
    buffer: B,
    size: u32,
    hash_index: u32,
    block_length: u32,
}

impl<'a> XorFilter8<&'a [u8]> {
    /// Parses a filter out of an in-memory byte buffer.
    pub fn from_bytes(buffer: &'a [u8]) -> Result<Self> {
        if buffer.len() < HEADER_LEN {
            return Err(RecSplitError::Truncated {
                needed: HEADER_LEN as u64 * 8,
                available: buffer.len() as u64 * 8,
            });
        }
        let size = u32::from_be_bytes(buffer[0..4].try_into().unwrap());
        let hash_index = u32::from_be_bytes(buffer[4..8].try_into().unwrap());
        let array_length = array_length(size);
        let block_length = array_length / 3;
        if buffer.len() < HEADER_LEN + array_length as usize {
            return Err(RecSplitError::Truncated {
                needed: (HEADER_LEN + array_length as usize) as u64 * 8,
                available: buffer.len() as u64 * 8,
            });
        }
        log::debug!("XorFilter8: size={size} hash_index={hash_index:#x} block_length={block_length}");
        if size == 0 {
            log::warn!("XorFilter8 declares zero keys");
        }
        Ok(XorFilter8 {
            buffer,
            size,
            hash_index,
            block_length,
        })
    }
}

impl XorFilter8<Mmap> {
    /// Memory-maps a filter file. The mapping is kept alive for the life of
    /// the filter so `may_contain` can read straight out of it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let probe = XorFilter8::from_bytes(&mmap)?;
        let (size, hash_index, block_length) = (probe.size, probe.hash_index, probe.block_length);
        Ok(XorFilter8 {
            buffer: mmap,
            size,
            hash_index,
            block_length,
        })
    }
}

impl<B: AsRef<[u8]>> XorFilter8<B> {
    /// Number of keys this filter was built over.
    pub fn size(&self) -> u32 {
        self.size
    }

    fn fingerprints(&self) -> &[u8] {
        &self.buffer.as_ref()[HEADER_LEN..]
    }

    /// Tests whether `key` may be a member. False positives occur at a rate
    /// of about 2⁻⁸ (1 in 256); false negatives never occur for keys that
    /// were present at construction time.
    pub fn may_contain(&self, key: u64) -> bool {
        let hash = hash64(key.wrapping_add(self.hash_index as u64));
        let f = fingerprint(hash);
        let r0 = hash as u32;
        let r1 = (hash >> 16) as u32;
        let r2 = (hash >> 32) as u32;
        let h0 = reduce(r0, self.block_length);
        let h1 = reduce(r1, self.block_length) + self.block_length;
        let h2 = reduce(r2, self.block_length) + 2 * self.block_length;
        let prints = self.fingerprints();
        let combined = f ^ prints[h0 as usize] ^ prints[h1 as usize] ^ prints[h2 as usize];
        combined == 0
    }
}
