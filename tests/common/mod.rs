//! Bit-level encoder and a peeling-based XOR filter builder, shared by the
//! integration tests below. Duplicates the crate's internal test-only
//! `BitWriter`/filter-construction helpers since integration tests compile
//! against the public API only and can't reach the crate's private
//! `#[cfg(test)]` modules.

#![allow(dead_code)]

pub struct BitWriter {
    bits: Vec<u8>,
}

impl BitWriter {
    pub fn new() -> Self {
        BitWriter { bits: Vec::new() }
    }

    pub fn write_bit(&mut self, bit: u8) {
        self.bits.push(bit & 1);
    }

    pub fn write_number(&mut self, value: u64, n: u32) {
        for i in (0..n).rev() {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    pub fn write_elias_delta(&mut self, value: u64) {
        assert!(value >= 1);
        let q = 64 - value.leading_zeros();
        let qq = 31 - q.leading_zeros().min(31);
        for _ in 0..qq {
            self.write_bit(0);
        }
        self.write_bit(1);
        for i in (0..qq).rev() {
            self.write_bit(((q >> i) & 1) as u8);
        }
        for i in (0..(q - 1)).rev() {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    pub fn write_golomb_rice(&mut self, value: u64, shift: u32) {
        let q = value >> shift;
        for _ in 0..q {
            self.write_bit(1);
        }
        self.write_bit(0);
        self.write_number(value, shift);
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn into_words(self) -> Vec<u64> {
        let mut bits = self.bits;
        while bits.len() % 64 != 0 {
            bits.push(0);
        }
        bits.chunks(64)
            .map(|chunk| {
                let mut w = 0u64;
                for &b in chunk {
                    w = (w << 1) | b as u64;
                }
                w
            })
            .collect()
    }
}

pub fn words_to_bytes(words: &[u64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 8);
    for w in words {
        out.extend_from_slice(&w.to_be_bytes());
    }
    out
}

/// Encodes `leafSize`/`averageBucketSize`/`(split, rice)` table entries into
/// the settings file wire format.
pub fn encode_settings(leaf_size: i32, average_bucket_size: i32, entries: &[(i32, i32)]) -> Vec<u64> {
    let mut w = BitWriter::new();
    w.write_elias_delta(leaf_size as u64 + 1);
    w.write_elias_delta(average_bucket_size as u64 + 1);
    w.write_elias_delta(entries.len() as u64 + 1);
    for &(split, rice) in entries {
        let folded = if split == 0 {
            0u64
        } else if split > 0 {
            split as u64 * 2 - 1
        } else {
            (-split) as u64 * 2
        };
        w.write_elias_delta(folded + 1);
        w.write_elias_delta(rice as u64 + 1);
    }
    w.into_words()
}

/// Encodes a non-decreasing `u32` sequence as a `MultiStageMonotoneList` with
/// both low-order residual levels collapsed to zero width (the whole
/// per-index residual lands in level 3).
pub fn encode_monotone_list(w: &mut BitWriter, values: &[u32]) {
    let count3 = values.len() as u32;
    let first = *values.first().unwrap_or(&0);
    let last = *values.last().unwrap_or(&0);
    let bit_count3 = 32 - (last - first).leading_zeros().min(32);
    w.write_elias_delta(count3 as u64 + 1);
    w.write_elias_delta(1); // diff = 0
    w.write_elias_delta(if first == 0 { 1 } else { first as u64 * 2 });
    w.write_elias_delta(1); // bitCount1 = 0
    w.write_elias_delta(1); // bitCount2 = 0
    w.write_elias_delta(bit_count3 as u64 + 1);
    for &v in values {
        w.write_number((v - first) as u64, bit_count3);
    }
}

fn fingerprint(hash: u64) -> u8 {
    (hash & 0xff) as u8
}

fn array_length(size: u32) -> u32 {
    3 + (123u64 * size as u64 / 100) as u32
}

fn hash64(x: u64) -> u64 {
    let mut x = x;
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

fn reduce(hash: u32, n: u32) -> u32 {
    (((hash as u64) * (n as u64)) >> 32) as u32
}

/// `splits[size]`/`rice[size]` for a single fixed splitting rule applied at
/// every size from 2 up to `max_size`: sizes at or under `leaf_size` are
/// leaves; even sizes above it split symmetrically in half; odd sizes split
/// asymmetrically into `size / 2` and `size - size / 2`. Every node uses the
/// same Golomb-Rice shift, since correctness of the wire format doesn't
/// depend on the shift being tuned to the value distribution.
const FIXTURE_RICE_SHIFT: i32 = 4;

fn fixture_settings_entries(max_size: u32, leaf_size: u32) -> Vec<(i32, i32)> {
    (0..=max_size)
        .map(|size| {
            if size < 2 || size <= leaf_size {
                (0, FIXTURE_RICE_SHIFT)
            } else if size % 2 == 0 {
                (2, FIXTURE_RICE_SHIFT)
            } else {
                (-((size / 2) as i32), FIXTURE_RICE_SHIFT)
            }
        })
        .collect()
}

/// Brute-force builds a single-bucket RecSplit settings/hash file pair for
/// `keys`, using `recsplit_xor::hashing`'s own primitives to replay exactly
/// the decisions `RecSplitEvaluator::evaluate`/`skip` would make, so the
/// fixture is guaranteed consistent with the library's decode path.
///
/// Mirrors a real (if unoptimized) RecSplit offline builder: for each node,
/// search increasing seed values until one partitions the node's keys the
/// way the settings table's split rule demands (or, at a leaf, assigns them
/// a bijection onto `0..size`).
pub fn build_recsplit_single_bucket(keys: &[&[u8]], leaf_size: u32) -> (Vec<(i32, i32)>, Vec<u64>) {
    use recsplit_xor::hashing::{reduce, supplemental_hash, universal_hash};

    let n = keys.len() as u32;
    let settings_entries = fixture_settings_entries(n, leaf_size);

    let mut w = BitWriter::new();
    w.write_elias_delta(n as u64 + 1);
    w.write_bit(0); // alternative header variant
    w.write_elias_delta(1); // minOffsetDiff = 0
    w.write_elias_delta(1); // minStartDiff = 0
    encode_monotone_list(&mut w, &[0, n]); // offsetList: one bucket spanning [0, n)
    encode_monotone_list(&mut w, &[0]); // startList: bucket 0's tree starts right here

    let window_of = |index: u64| index >> 18;
    let initial: Vec<(&[u8], u64)> = keys.iter().map(|&k| (k, universal_hash(k, 0))).collect();

    fn recurse(
        items: Vec<(&[u8], u64)>,
        index: u64,
        leaf_size: u32,
        w: &mut BitWriter,
        window_of: &dyn Fn(u64) -> u64,
    ) {
        let size = items.len() as u32;
        if size < 2 {
            return;
        }
        let (split, rice_shift) = fixture_settings_entries(size, leaf_size)[size as usize];
        let old_window = window_of(index);

        for value in 0u64..1_000_000 {
            let new_index = index + value + 1;
            let new_window = window_of(new_index);
            let hashes: Vec<(&[u8], u64)> = if new_window != old_window {
                items
                    .iter()
                    .map(|&(k, _)| (k, universal_hash(k, new_window)))
                    .collect()
            } else {
                items.clone()
            };

            if size <= leaf_size {
                let mut seen = vec![false; size as usize];
                let mut ok = true;
                for &(_, h) in &hashes {
                    let slot = reduce(supplemental_hash(h, new_index), size) as usize;
                    if seen[slot] {
                        ok = false;
                        break;
                    }
                    seen[slot] = true;
                }
                if ok {
                    w.write_golomb_rice(value, rice_shift as u32);
                    return;
                }
                continue;
            }

            if split < 0 {
                let first_part = (-split) as u32;
                let mut left = Vec::new();
                let mut right = Vec::new();
                for &(k, h) in &hashes {
                    let r = reduce(supplemental_hash(h, new_index), size);
                    if r < first_part {
                        left.push((k, h));
                    } else {
                        right.push((k, h));
                    }
                }
                if left.len() as u32 == first_part {
                    w.write_golomb_rice(value, rice_shift as u32);
                    recurse(left, new_index, leaf_size, w, window_of);
                    recurse(right, new_index, leaf_size, w, window_of);
                    return;
                }
            } else {
                let arity = split as u32;
                let first_part = size / arity;
                let mut groups: Vec<Vec<(&[u8], u64)>> = (0..arity).map(|_| Vec::new()).collect();
                for &(k, h) in &hashes {
                    let chosen = reduce(supplemental_hash(h, new_index), arity);
                    groups[chosen as usize].push((k, h));
                }
                if groups.iter().all(|g| g.len() as u32 == first_part) {
                    w.write_golomb_rice(value, rice_shift as u32);
                    for group in groups {
                        recurse(group, new_index, leaf_size, w, window_of);
                    }
                    return;
                }
            }
        }
        panic!("no seed found within the search bound for a node of size {size}");
    }

    recurse(initial, 0, leaf_size, &mut w, &window_of);

    (settings_entries, w.into_words())
}

/// Builds a valid XorFilter8 byte buffer over `keys` via the standard
/// peeling construction, retrying with successive salts starting at
/// `hash_index` on the rare peel failure.
pub fn build_xor_filter(keys: &[u64], hash_index: u32) -> Vec<u8> {
    for salt in hash_index..hash_index.wrapping_add(64) {
        if let Some(bytes) = try_build_xor_filter(keys, salt) {
            return bytes;
        }
    }
    panic!("could not peel a filter for any of 64 salts starting at {hash_index}");
}

fn try_build_xor_filter(keys: &[u64], hash_index: u32) -> Option<Vec<u8>> {
    let size = keys.len() as u32;
    let array_length_total = array_length(size);
    let block_length = array_length_total / 3;
    let array_len = block_length * 3;

    let slots_of_hash = |hash: u64| -> [u32; 3] {
        let r0 = hash as u32;
        let r1 = (hash >> 16) as u32;
        let r2 = (hash >> 32) as u32;
        [
            reduce(r0, block_length),
            reduce(r1, block_length) + block_length,
            reduce(r2, block_length) + 2 * block_length,
        ]
    };

    let hashes: Vec<u64> = keys.iter().map(|&k| hash64(k.wrapping_add(hash_index as u64))).collect();

    let mut slot_count = vec![0u32; array_len as usize];
    let mut slot_xor = vec![0u64; array_len as usize];
    for &hash in &hashes {
        for s in slots_of_hash(hash) {
            slot_count[s as usize] += 1;
            slot_xor[s as usize] ^= hash;
        }
    }

    let mut queue: Vec<u32> = (0..array_len).filter(|&s| slot_count[s as usize] == 1).collect();
    let mut order = Vec::with_capacity(keys.len());
    let mut head = 0usize;
    while head < queue.len() {
        let s = queue[head];
        head += 1;
        if slot_count[s as usize] != 1 {
            continue;
        }
        let hash = slot_xor[s as usize];
        order.push((s, hash));
        for other in slots_of_hash(hash) {
            if slot_count[other as usize] == 0 {
                continue;
            }
            slot_count[other as usize] -= 1;
            slot_xor[other as usize] ^= hash;
            if slot_count[other as usize] == 1 {
                queue.push(other);
            }
        }
    }
    if order.len() != keys.len() {
        return None;
    }

    let mut fingerprints = vec![0u8; array_length_total as usize];
    for &(s, hash) in order.iter().rev() {
        let [a, b, c] = slots_of_hash(hash);
        let mut f = fingerprint(hash);
        for other in [a, b, c] {
            if other != s {
                f ^= fingerprints[other as usize];
            }
        }
        fingerprints[s as usize] = f;
    }

    let mut out = Vec::with_capacity(8 + array_length_total as usize);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(&hash_index.to_be_bytes());
    out.extend_from_slice(&fingerprints);
    Some(out)
}
