//! Binary-coded decimal helpers. Every time and alarm register of the chip
//! stores its value as two packed decimal digits.

/// Packed BCD byte to its decimal value.
pub fn bcd2bin(bcd: u8) -> u8 {
    ((bcd >> 4) & 0xF) * 10 + (bcd & 0xF)
}

/// Decimal value (0..=99) to a packed BCD byte.
///
/// Values above 99 are not representable; the result is whatever the nibble
/// arithmetic produces.
pub fn bin2bcd(bin: u8) -> u8 {
    ((bin / 10) << 4) | (bin % 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_known_bytes() {
        assert_eq!(bcd2bin(0x00), 0);
        assert_eq!(bcd2bin(0x09), 9);
        assert_eq!(bcd2bin(0x10), 10);
        assert_eq!(bcd2bin(0x59), 59);
        assert_eq!(bcd2bin(0x99), 99);
    }

    #[test]
    fn encodes_known_values() {
        assert_eq!(bin2bcd(0), 0x00);
        assert_eq!(bin2bcd(7), 0x07);
        assert_eq!(bin2bcd(23), 0x23);
        assert_eq!(bin2bcd(99), 0x99);
    }

    #[test]
    fn every_decimal_survives_the_codec() {
        for v in 0..=99u8 {
            assert_eq!(bcd2bin(bin2bcd(v)), v);
        }
    }

    #[test]
    fn encoded_nibbles_are_decimal_digits() {
        for v in 0..=99u8 {
            let bcd = bin2bcd(v);
            assert!(bcd & 0x0F <= 9);
            assert!(bcd >> 4 <= 9);
        }
    }
}
