use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use crate::Error;

/// Non-negative machine value (address, opcode, size) printed in hex.
///
/// Arithmetic returns new values. Subtraction saturates at zero: signed
/// quantities such as displacements are computed in `i64` and wrapped back
/// with [`Hex::masked`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Hex(u32);

impl Hex {
    pub const ZERO: Hex = Hex(0);

    pub const fn new(value: u32) -> Self {
        Hex(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    pub fn parse_hex(s: &str) -> Result<Self, Error> {
        Self::parse_radix(s, 16)
    }

    pub fn parse_dec(s: &str) -> Result<Self, Error> {
        Self::parse_radix(s, 10)
    }

    pub fn parse_bin(s: &str) -> Result<Self, Error> {
        Self::parse_radix(s, 2)
    }

    fn parse_radix(s: &str, radix: u32) -> Result<Self, Error> {
        let digits = s.trim();
        if digits.is_empty() || digits.starts_with('+') {
            return Err(Error::MalformedNumber(s.to_string()));
        }
        u32::from_str_radix(digits, radix)
            .map(Hex)
            .map_err(|_| Error::MalformedNumber(s.to_string()))
    }

    /// Two's complement of `value` kept to `digits` hex digits.
    pub fn masked(value: i64, digits: usize) -> Self {
        let bits = (digits * 4).min(32) as u32;
        let mask = if bits == 32 { u32::MAX as i64 } else { (1i64 << bits) - 1 };
        Hex((value & mask) as u32)
    }

    /// Exactly `digits` hex digits: zero padded on the left when short,
    /// only the least significant `digits` kept when long.
    pub fn render(self, digits: usize) -> String {
        let text = format!("{:X}", self.0);
        if text.len() >= digits {
            text[text.len() - digits..].to_string()
        } else {
            format!("{:0>width$}", text, width = digits)
        }
    }
}

impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}", self.0)
    }
}

impl FromStr for Hex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Hex::parse_hex(s)
    }
}

impl From<u32> for Hex {
    fn from(value: u32) -> Self {
        Hex(value)
    }
}

impl From<u8> for Hex {
    fn from(value: u8) -> Self {
        Hex(value as u32)
    }
}

impl From<Hex> for u32 {
    fn from(value: Hex) -> Self {
        value.0
    }
}

impl Add for Hex {
    type Output = Hex;

    fn add(self, rhs: Hex) -> Hex {
        Hex(self.0.wrapping_add(rhs.0))
    }
}

impl Add<u32> for Hex {
    type Output = Hex;

    fn add(self, rhs: u32) -> Hex {
        Hex(self.0.wrapping_add(rhs))
    }
}

impl Sub for Hex {
    type Output = Hex;

    fn sub(self, rhs: Hex) -> Hex {
        Hex(self.0.saturating_sub(rhs.0))
    }
}

impl Sub<u32> for Hex {
    type Output = Hex;

    fn sub(self, rhs: u32) -> Hex {
        Hex(self.0.saturating_sub(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors() {
        assert_eq!(Hex::parse_hex("1A").unwrap(), Hex::new(26));
        assert_eq!(Hex::parse_hex("1a").unwrap(), Hex::new(26));
        assert_eq!(Hex::parse_dec("4096").unwrap(), Hex::new(0x1000));
        assert_eq!(Hex::parse_bin("1011").unwrap(), Hex::new(11));
        assert_eq!(
            Hex::parse_hex("XYZ"),
            Err(Error::MalformedNumber("XYZ".to_string()))
        );
        assert!(Hex::parse_dec("").is_err());
        assert!(Hex::parse_bin("102").is_err());
    }

    #[test]
    fn render() {
        assert_eq!(Hex::new(0x1E).render(6), "00001E");
        assert_eq!(Hex::new(0x12345).render(3), "345");
        assert_eq!(Hex::new(0xABC).render(3), "ABC");
        assert_eq!(Hex::new(0x2A).to_string(), "2A");
        assert_eq!(Hex::ZERO.to_string(), "0");
    }

    #[test]
    fn masked() {
        assert_eq!(Hex::masked(-3, 3).render(3), "FFD");
        assert_eq!(Hex::masked(-1, 5).render(5), "FFFFF");
        assert_eq!(Hex::masked(0x7FF, 3).render(3), "7FF");
    }

    #[test]
    fn arithmetic() {
        let a = Hex::new(0x1000);
        assert_eq!(a + 3, Hex::new(0x1003));
        assert_eq!(a + Hex::new(0x10), Hex::new(0x1010));
        assert_eq!(a - 0x10, Hex::new(0xFF0));
        assert_eq!(Hex::new(2) - Hex::new(5), Hex::ZERO);
        // arithmetic does not touch the operands
        assert_eq!(a, Hex::new(0x1000));
    }

    #[test]
    fn round_trip() {
        for text in ["0", "7FF", "1000", "FFFFFF", "12AB"] {
            let value = Hex::parse_hex(text).unwrap();
            assert_eq!(Hex::parse_hex(&value.to_string()).unwrap(), value);
        }
        for text in ["0", "2047", "4096", "16777215"] {
            let value = Hex::parse_dec(text).unwrap();
            assert_eq!(Hex::parse_hex(&value.to_string()).unwrap(), value);
        }
        for text in ["0", "1", "111111111111"] {
            let value = Hex::parse_bin(text).unwrap();
            assert_eq!(value.to_string().parse::<Hex>().unwrap(), value);
        }
    }
}
