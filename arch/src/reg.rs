use bimap::BiMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

use crate::Error;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    EnumIter,
    Display,
)]
#[repr(u8)]
pub enum Reg {
    A = 0,
    X = 1,
    L = 2,
    B = 3,
    S = 4,
    T = 5,
    F = 6,
    PC = 8,
    SW = 9,
}

static DEFAULT: Lazy<RegTable> = Lazy::new(|| {
    let mut table = RegTable::new();
    for reg in Reg::iter() {
        table.insert(&reg.to_string(), reg.into());
    }
    table
});

/// Register name <-> register number.
#[derive(Debug, Clone, Default)]
pub struct RegTable(BiMap<String, u8>);

impl RegTable {
    pub fn new() -> Self {
        RegTable(BiMap::new())
    }

    /// The SIC/XE register set.
    pub fn sicxe() -> Self {
        DEFAULT.clone()
    }

    /// Reads `NAME NUMBER` lines. Malformed lines are skipped and reported.
    pub fn parse(text: &str) -> (Self, Vec<Error>) {
        let mut table = RegTable::new();
        let mut warnings = vec![];
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                [name, num] => match num.parse::<u8>() {
                    Ok(num) if num < 16 => table.insert(name, num),
                    _ => warnings.push(Error::MalformedEntry(idx + 1, raw.to_string())),
                },
                _ => warnings.push(Error::MalformedEntry(idx + 1, raw.to_string())),
            }
        }
        (table, warnings)
    }

    pub fn insert(&mut self, name: &str, num: u8) {
        self.0.insert(name.trim().to_ascii_uppercase(), num);
    }

    pub fn number(&self, name: &str) -> Option<u8> {
        self.0.get_by_left(&name.trim().to_ascii_uppercase()).copied()
    }

    pub fn name(&self, num: u8) -> Option<&str> {
        self.0.get_by_right(&num).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[test]
fn test() {
    assert_eq!(Reg::SW.to_string(), "SW");
    assert_eq!(u8::from(Reg::PC), 8);
    assert_eq!(Reg::try_from(3u8).ok(), Some(Reg::B));
    assert!(Reg::try_from(7u8).is_err());

    let table = RegTable::sicxe();
    assert_eq!(table.len(), Reg::iter().count());
    for reg in Reg::iter() {
        assert_eq!(table.number(&reg.to_string()), Some(reg.into()));
    }
    assert_eq!(table.number("t"), Some(5));
    assert_eq!(table.name(1), Some("X"));

    let (table, warnings) = RegTable::parse("A 0\nQ\nZ 99\nX 1 # index\n");
    assert_eq!(table.len(), 2);
    assert_eq!(warnings.len(), 2);
}
