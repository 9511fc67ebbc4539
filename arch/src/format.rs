use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::Error;

/// Encoding shape of a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
pub enum Format {
    /// Opcode only, 1 byte
    #[strum(serialize = "1")]
    One,
    /// Opcode and two register nibbles, 2 bytes
    #[strum(serialize = "2")]
    Two,
    /// Format 3, or format 4 with the `+` prefix
    #[strum(serialize = "3")]
    Three,
    /// Legacy SIC word: opcode, index bit, 15-bit address
    #[strum(serialize = "SIC")]
    Sic,
    /// Assembler directive
    #[strum(serialize = "ASM")]
    Asm,
}

impl Format {
    pub fn parse(s: &str) -> Result<Self, Error> {
        s.trim()
            .to_ascii_uppercase()
            .parse::<Self>()
            .map_err(|_| Error::UnknownFormat(s.to_string()))
    }
}

#[test]
fn test() {
    assert_eq!(Format::parse("3"), Ok(Format::Three));
    assert_eq!(Format::parse(" sic "), Ok(Format::Sic));
    assert_eq!(Format::parse("asm"), Ok(Format::Asm));
    assert_eq!(Format::Two.to_string(), "2");
    assert!(Format::parse("5").is_err());
}
