//! 8-bit two's-complement checksum used for both the link header and payload.

/// Computes the checksum byte for `bytes`: the two's-complement negation of
/// their sum, modulo 256.
///
/// Appending the returned byte to `bytes` always makes
/// [`verify`] succeed on the combined buffer.
#[must_use]
pub fn generate(bytes: &[u8]) -> u8 {
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    sum.wrapping_neg()
}

/// Verifies that `bytes` (which must include the trailing checksum byte) sum
/// to zero modulo 256.
#[must_use]
pub fn verify(bytes: &[u8]) -> bool {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)) == 0
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn empty_checksum_is_zero() {
        assert_eq!(generate(&[]), 0);
        assert!(verify(&[0]));
    }

    proptest! {
        #[test]
        fn generated_checksum_always_verifies(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let checksum = generate(&bytes);
            let mut with_checksum = bytes.clone();
            with_checksum.push(checksum);
            prop_assert!(verify(&with_checksum));
        }
    }
}
