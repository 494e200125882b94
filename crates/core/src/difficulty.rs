//! Proof-of-work acceptance checks

use crate::params::DIGEST_SIZE;

/// A 256-bit target stored little-endian, like the digest it is compared with
pub type Target = [u8; DIGEST_SIZE];

/// Check if a hash meets the required difficulty
///
/// Difficulty is measured as the number of leading zero bits required.
/// For example, difficulty 16 requires the first 2 bytes to be zero.
///
/// # Example
///
/// ```rust
/// use chainhash_core::meets_difficulty;
///
/// // 0x00, 0x00, 0x0F = 16 + 4 zeros
/// let mut hash = [0xFFu8; 32];
/// hash[0] = 0x00;
/// hash[1] = 0x00;
/// hash[2] = 0x0F;
/// assert!(meets_difficulty(&hash, 20));
/// assert!(!meets_difficulty(&hash, 21));
/// ```
#[inline(always)]
pub fn meets_difficulty(hash: &[u8; DIGEST_SIZE], difficulty: u32) -> bool {
    let mut zero_bits = 0u32;

    for byte in hash.iter() {
        if *byte == 0 {
            zero_bits += 8;
        } else {
            zero_bits += byte.leading_zeros();
            break;
        }
    }

    zero_bits >= difficulty
}

/// [`meets_difficulty`] for a digest read as a little-endian integer
///
/// Zero bits are counted from the most significant end, byte 31 down, which
/// is the end [`meets_target`] compares first.
pub fn meets_difficulty_le(hash: &[u8; DIGEST_SIZE], difficulty: u32) -> bool {
    let mut reversed = *hash;
    reversed.reverse();
    meets_difficulty(&reversed, difficulty)
}

/// `hash <= target`, both read as little-endian 256-bit integers
///
/// This is how 80-byte header chains accept a share: the most significant
/// byte is the last one.
pub fn meets_target(hash: &[u8; DIGEST_SIZE], target: &Target) -> bool {
    for (h, t) in hash.iter().rev().zip(target.iter().rev()) {
        if h != t {
            return h < t;
        }
    }
    true
}

/// Expand the compact `nBits` encoding from a header.
///
/// Returns `None` for negative or overflowing encodings.
pub fn target_from_compact(bits: u32) -> Option<Target> {
    let exponent = (bits >> 24) as usize;
    let mantissa = bits & 0x007f_ffff;
    if bits & 0x0080_0000 != 0 && mantissa != 0 {
        return None;
    }

    let mut target = [0u8; DIGEST_SIZE];
    if exponent <= 3 {
        let value = mantissa >> (8 * (3 - exponent));
        target[..4].copy_from_slice(&value.to_le_bytes());
        return Some(target);
    }

    for (i, &byte) in mantissa.to_le_bytes()[..3].iter().enumerate() {
        let position = exponent - 3 + i;
        if position < DIGEST_SIZE {
            target[position] = byte;
        } else if byte != 0 {
            return None;
        }
    }
    Some(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_check() {
        let mut hash_8_zeros = [0xffu8; 32];
        hash_8_zeros[0] = 0;
        assert!(meets_difficulty(&hash_8_zeros, 8));
        assert!(!meets_difficulty(&hash_8_zeros, 9));

        let mut hash_4_zeros = [0xffu8; 32];
        hash_4_zeros[0] = 0x0f;
        assert!(meets_difficulty(&hash_4_zeros, 4));
        assert!(!meets_difficulty(&hash_4_zeros, 5));

        assert!(meets_difficulty(&[0u8; 32], 256));
        assert!(meets_difficulty(&[0xffu8; 32], 0));
    }

    #[test]
    fn test_little_endian_difficulty_counts_from_byte_31() {
        let mut hash = [0xffu8; 32];
        hash[31] = 0;
        hash[30] = 0x0f;
        assert!(meets_difficulty_le(&hash, 12));
        assert!(!meets_difficulty_le(&hash, 13));
        assert!(!meets_difficulty(&hash, 1));

        let mut low_zeros = [0xffu8; 32];
        low_zeros[0] = 0;
        assert!(meets_difficulty(&low_zeros, 8));
        assert!(!meets_difficulty_le(&low_zeros, 1));
    }

    #[test]
    fn test_difficulty_agrees_with_power_of_two_target() {
        // 12 leading zero bits <=> value <= 2^244 - 1
        let mut target = [0xffu8; 32];
        target[31] = 0;
        target[30] = 0x0f;

        let mut hash = target;
        assert_eq!(meets_difficulty_le(&hash, 12), meets_target(&hash, &target));
        hash[30] = 0x10;
        assert_eq!(meets_difficulty_le(&hash, 12), meets_target(&hash, &target));
        assert!(!meets_target(&hash, &target));
    }

    #[test]
    fn test_target_compares_from_the_top_byte() {
        let mut target = [0u8; 32];
        target[30] = 0x10;

        let mut hash = [0xffu8; 32];
        hash[31] = 0;
        hash[30] = 0x0f;
        assert!(meets_target(&hash, &target));

        hash[30] = 0x10;
        assert!(!meets_target(&hash, &target));

        hash[..30].fill(0);
        assert!(meets_target(&hash, &target), "equal is accepted");

        hash[0] = 1;
        assert!(!meets_target(&hash, &target));
    }

    #[test]
    fn test_compact_target_expansion() {
        let target = target_from_compact(0x1d00_ffff).unwrap();
        let mut expected = [0u8; 32];
        expected[26] = 0xff;
        expected[27] = 0xff;
        assert_eq!(target, expected);

        let small = target_from_compact(0x0200_8000).unwrap();
        assert_eq!(small[0], 0x80);
        assert!(small[1..].iter().all(|&b| b == 0));

        assert_eq!(target_from_compact(0x0180_0001), None);
        assert_eq!(target_from_compact(0x2301_0000), None);
    }
}
