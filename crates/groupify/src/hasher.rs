//! Row hashing for the equivalence-class table.
//!
//! FNV-1a over 32-bit words, followed by a 64-bit finalizer so that the low
//! bits used for bucket selection depend on every bit of the row.

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

/// Hashes a transformed row.
#[inline]
pub fn hash_row(row: &[u32]) -> u64 {
    let mut state = FNV_OFFSET;
    for &word in row {
        state ^= word as u64;
        state = state.wrapping_mul(FNV_PRIME);
    }
    finalize(state)
}

/// MurmurHash3 fmix64.
#[inline]
fn finalize(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51afd7ed558ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ceb9fe1a85ec53);
    h ^= h >> 33;
    h
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeSet;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash_row(&[1, 2, 3]), hash_row(&[1, 2, 3]));
        assert_ne!(hash_row(&[1, 2, 3]), hash_row(&[3, 2, 1]));
        assert_ne!(hash_row(&[]), hash_row(&[0]));
    }

    #[test]
    fn test_high_bits_reach_low_bits() {
        // Rows differing only in their top byte must spread over the low bits
        let buckets: BTreeSet<u64> = (0..64u32).map(|i| hash_row(&[i << 24]) & 0xff).collect();
        assert!(buckets.len() > 8);
    }
}
