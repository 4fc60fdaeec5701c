//! Bit manipulation on 16-bit machine words.

/// Swap the two bytes of a 16-bit word.
///
/// Object images are stored big-endian; the loader swaps every raw
/// little-endian word through this.
#[inline]
pub const fn swap16(value: u16) -> u16 {
    value.rotate_left(8)
}

/// Interpret the low `n` bits of `value` as a two's-complement number.
///
/// Valid for `n` in `1..=16`.
#[inline]
pub const fn sign_extend(value: u16, n: u32) -> i32 {
    debug_assert!(n >= 1 && n <= 16);
    let sign = 1i32 << (n - 1);
    let field = (value as i32) & ((1i32 << n) - 1);
    (field ^ sign) - sign
}

/// Add a sign-extended offset to a base address, wrapping at 16 bits.
#[inline]
pub const fn offset(base: u16, offset: i32) -> u16 {
    base.wrapping_add(offset as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_swap16() {
        assert_eq!(swap16(0x3000), 0x0030);
        assert_eq!(swap16(0x1234), 0x3412);
        assert_eq!(swap16(0x00FF), 0xFF00);
    }

    #[test]
    fn test_sign_extend_boundaries() {
        // imm5
        assert_eq!(sign_extend(0b01111, 5), 15);
        assert_eq!(sign_extend(0b10000, 5), -16);
        assert_eq!(sign_extend(0b11111, 5), -1);

        // offset9, high bits of the instruction must be ignored
        assert_eq!(sign_extend(0x0E01, 9), 1);
        assert_eq!(sign_extend(0x01FF, 9), -1);
        assert_eq!(sign_extend(0x0100, 9), -256);

        assert_eq!(sign_extend(0xFFFF, 16), -1);
        assert_eq!(sign_extend(0x7FFF, 16), 32767);
        assert_eq!(sign_extend(1, 1), -1);
        assert_eq!(sign_extend(0, 1), 0);
    }

    #[test]
    fn test_offset_wraps() {
        assert_eq!(offset(0x0000, -1), 0xFFFF);
        assert_eq!(offset(0xFFFF, 1), 0x0000);
        assert_eq!(offset(0x3001, -2), 0x2FFF);
    }

    proptest! {
        #[test]
        fn swap16_is_involution(x in any::<u16>()) {
            prop_assert_eq!(swap16(swap16(x)), x);
        }

        #[test]
        fn swap16_matches_byte_order(x in any::<u16>()) {
            prop_assert_eq!(swap16(x), u16::from_be_bytes(x.to_le_bytes()));
        }

        #[test]
        fn sign_extend_matches_shift_reference(x in any::<u16>(), n in 1u32..=16) {
            // Reference: move the field to the top of an i32 and arithmetic-shift back.
            let reference = ((x as i32) << (32 - n)) >> (32 - n);
            prop_assert_eq!(sign_extend(x, n), reference);
        }

        #[test]
        fn sign_extend_sign_follows_top_field_bit(x in any::<u16>(), n in 1u32..=16) {
            let negative = x & (1 << (n - 1)) != 0;
            prop_assert_eq!(sign_extend(x, n) < 0, negative);
        }
    }
}
