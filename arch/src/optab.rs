use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Error, Format, Hex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpInfo {
    pub opcode: u8,
    pub format: Format,
}

static DEFAULT: Lazy<OpTable> = Lazy::new(|| OpTable::parse(include_str!("../res/optab.txt")).0);

/// Mnemonic -> (opcode, format).
#[derive(Debug, Clone, Default)]
pub struct OpTable(HashMap<String, OpInfo>);

impl OpTable {
    pub fn new() -> Self {
        OpTable(HashMap::new())
    }

    /// SIC/XE instructions and the assembler directives.
    pub fn sicxe() -> Self {
        DEFAULT.clone()
    }

    /// Reads `MNEMONIC OPCODE FORMAT` lines.
    ///
    /// A line whose opcode cannot be read, or a format 3 opcode with the
    /// addressing bits set, is skipped; an unknown format falls back to
    /// [`Format::Asm`]. All are reported, never fatal.
    pub fn parse(text: &str) -> (Self, Vec<Error>) {
        let mut table = OpTable::new();
        let mut warnings = vec![];
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let words: Vec<&str> = line.split_whitespace().collect();
            let (name, opcode, format) = match words.as_slice() {
                [name, opcode, format] => (name, opcode, format),
                _ => {
                    warnings.push(Error::MalformedEntry(idx + 1, raw.to_string()));
                    continue;
                }
            };
            let opcode = match Hex::parse_hex(opcode) {
                Ok(v) if v.value() <= 0xFF => v.value() as u8,
                _ => {
                    warnings.push(Error::MalformedEntry(idx + 1, raw.to_string()));
                    continue;
                }
            };
            let format = Format::parse(format).unwrap_or_else(|err| {
                warnings.push(err);
                Format::Asm
            });
            // the low two bits of a format 3/4 opcode hold `n` and `i`
            if format == Format::Three && opcode & 0b11 != 0 {
                warnings.push(Error::MalformedEntry(idx + 1, raw.to_string()));
                continue;
            }
            table.insert(name, OpInfo { opcode, format });
        }
        (table, warnings)
    }

    pub fn insert(&mut self, mnemonic: &str, info: OpInfo) {
        self.0.insert(mnemonic.trim().to_ascii_uppercase(), info);
    }

    pub fn get(&self, mnemonic: &str) -> Option<OpInfo> {
        self.0.get(&mnemonic.trim().to_ascii_uppercase()).copied()
    }

    pub fn contains(&self, mnemonic: &str) -> bool {
        self.get(mnemonic).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin() {
        let table = OpTable::sicxe();
        assert_eq!(
            table.get("lda"),
            Some(OpInfo {
                opcode: 0x00,
                format: Format::Three
            })
        );
        assert_eq!(table.get("COMPR").map(|i| i.opcode), Some(0xA0));
        assert_eq!(table.get("FIX").map(|i| i.format), Some(Format::One));
        assert_eq!(table.get("RESW").map(|i| i.format), Some(Format::Asm));
        assert_eq!(table.get("NOPE"), None);
    }

    #[test]
    fn malformed_entries() {
        let text = "LDA 00 3\nBAD\nSTA ZZ 3\nFOO 10 9\n";
        let (table, warnings) = OpTable::parse(text);
        assert_eq!(table.len(), 2);
        assert_eq!(warnings.len(), 3);
        assert_eq!(table.get("FOO").map(|i| i.format), Some(Format::Asm));
        assert_eq!(warnings[0], Error::MalformedEntry(2, "BAD".to_string()));
    }

    #[test]
    fn addressing_bits() {
        let (table, warnings) = OpTable::parse("LDA 00 3
ODD 1B 3
SIO F0 1
RMO AC 2
");
        assert_eq!(table.len(), 3);
        assert_eq!(table.get("ODD"), None);
        assert_eq!(warnings, vec![Error::MalformedEntry(2, "ODD 1B 3".to_string())]);
    }
}
