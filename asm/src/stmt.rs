use arch::Hex;
use indexmap::IndexMap;

use crate::builder::Block;
use crate::error::Invalid;
use crate::symbol::{normalize, SymbolTable};

/// Operand used when a format 3/4 instruction has none.
const IMMEDIATE_ZERO: &str = "#00";

// ----------------------------------------------------------------------------
// Scope

/// Read-only view used while encoding: the finished symbol table, the
/// control section being written and the layout of its program blocks.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    symbols: &'a SymbolTable,
    section: &'a str,
    blocks: Option<&'a IndexMap<String, Block>>,
}

impl<'a> Scope<'a> {
    pub fn new(symbols: &'a SymbolTable, section: &'a str) -> Self {
        Scope {
            symbols,
            section,
            blocks: None,
        }
    }

    pub fn with_blocks(self, blocks: &'a IndexMap<String, Block>) -> Self {
        Scope {
            blocks: Some(blocks),
            ..self
        }
    }

    fn base(&self, block: &str) -> u32 {
        self.blocks
            .and_then(|blocks| blocks.get(block))
            .map(|b| b.base.value())
            .unwrap_or(0)
    }

    /// Absolute address of a symbol; absolute symbols carry no block.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        let address = self.symbols.get_symbol(name, self.section)?.value();
        Some(match self.symbols.get_block(name, self.section) {
            Some(block) => self.base(block).wrapping_add(address),
            None => address,
        })
    }

    /// Absolute address of a block-relative location.
    pub fn locate(&self, location: Hex, block: &str) -> u32 {
        self.base(block).wrapping_add(location.value())
    }
}

// ----------------------------------------------------------------------------
// Statement

/// Where a statement came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub line: usize,
    pub raw: String,
    pub block: String,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Number(i64),
    Symbol(String),
    /// Supplied by the linker; counts as zero here.
    External(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub negative: bool,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Data {
    /// Object code known while scanning (possibly empty).
    Bytes(String),
    /// `WORD` expression, summed once every symbol is known.
    Word(Vec<Term>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
    /// Format 1
    Single { opcode: u8 },
    /// Format 2
    Register { opcode: u8, r1: u8, r2: u8 },
    /// Format 3, or 4 when `extended`
    Extended(Xe),
    /// Legacy SIC word
    Sic { opcode: u8, args: String },
    Directive { size: Hex, data: Data },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xe {
    pub opcode: u8,
    pub args: String,
    pub extended: bool,
    /// `BASE` symbol in effect where the statement was written
    pub base: Option<String>,
    /// `EXTREF` symbol named by the operand
    pub external: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    /// Offset inside the statement's program block.
    pub location: Hex,
    pub kind: Kind,
    pub tag: Tag,
}

struct Fields {
    code: String,
    n: bool,
    i: bool,
    b: bool,
    p: bool,
    zero: bool,
}

impl Stmt {
    pub fn new(location: Hex, kind: Kind, tag: Tag) -> Self {
        Stmt {
            location,
            kind,
            tag,
        }
    }

    fn bare(location: u32, kind: Kind) -> Self {
        Stmt::new(Hex::new(location), kind, Tag::default())
    }

    pub fn single(location: u32, opcode: u8) -> Self {
        Stmt::bare(location, Kind::Single { opcode })
    }

    pub fn register(location: u32, opcode: u8, r1: u8, r2: u8) -> Self {
        Stmt::bare(location, Kind::Register { opcode, r1, r2 })
    }

    pub fn extended(location: u32, opcode: u8, args: &str) -> Self {
        Stmt::bare(
            location,
            Kind::Extended(Xe {
                opcode,
                args: args.to_string(),
                extended: false,
                base: None,
                external: None,
            }),
        )
    }

    pub fn sic(location: u32, opcode: u8, args: &str) -> Self {
        Stmt::bare(
            location,
            Kind::Sic {
                opcode,
                args: args.to_string(),
            },
        )
    }

    pub fn directive(location: u32, size: u32, code: &str) -> Self {
        Stmt::bare(
            location,
            Kind::Directive {
                size: Hex::new(size),
                data: Data::Bytes(code.to_string()),
            },
        )
    }

    /// Format 4 variant of an extended statement.
    pub fn with_format4(mut self) -> Self {
        if let Kind::Extended(xe) = &mut self.kind {
            xe.extended = true;
        }
        self
    }

    pub fn with_base(mut self, name: &str) -> Self {
        if let Kind::Extended(xe) = &mut self.kind {
            xe.base = Some(name.to_string());
        }
        self
    }

    pub fn with_external(mut self, name: &str) -> Self {
        if let Kind::Extended(xe) = &mut self.kind {
            xe.external = Some(name.to_string());
        }
        self
    }

    pub fn size(&self) -> Hex {
        match &self.kind {
            Kind::Single { .. } => Hex::new(1),
            Kind::Register { .. } => Hex::new(2),
            Kind::Extended(xe) => Hex::new(if xe.extended { 4 } else { 3 }),
            Kind::Sic { .. } => Hex::new(3),
            Kind::Directive { size, .. } => *size,
        }
    }

    /// Reserves space without producing object code (`RESB`, `RESW`).
    pub fn is_blank(&self) -> bool {
        match &self.kind {
            Kind::Directive {
                size,
                data: Data::Bytes(code),
            } => *size > Hex::ZERO && code.is_empty(),
            _ => false,
        }
    }

    /// Object code as hex text.
    pub fn encode(&self, scope: &Scope) -> Result<String, Invalid> {
        match &self.kind {
            Kind::Single { opcode } => Ok(Hex::from(*opcode).render(2)),
            Kind::Register { opcode, r1, r2 } => Ok(format!(
                "{}{}{}",
                Hex::from(*opcode).render(2),
                Hex::from(*r1).render(1),
                Hex::from(*r2).render(1)
            )),
            Kind::Extended(xe) => Ok(self.fields(xe, scope)?.code),
            Kind::Sic { opcode, args } => {
                let (arg, indexed) = split_index(args.trim());
                let arg = arg
                    .strip_prefix('#')
                    .or_else(|| arg.strip_prefix('@'))
                    .unwrap_or(arg)
                    .trim();
                let mut address = match scope.lookup(arg) {
                    Some(address) => address,
                    None if arg.is_empty() => 0,
                    None => number(arg)?.value(),
                };
                if indexed {
                    // 15-bit address under the index bit
                    address = (address & 0x7FFF) | 0x8000;
                }
                Ok(format!(
                    "{}{}",
                    Hex::from(*opcode).render(2),
                    Hex::new(address).render(4)
                ))
            }
            Kind::Directive { data, .. } => match data {
                Data::Bytes(code) => Ok(code.clone()),
                Data::Word(terms) => {
                    let mut sum: i64 = 0;
                    for term in terms {
                        let value = match &term.operand {
                            Operand::Number(v) => *v,
                            Operand::External(_) => 0,
                            Operand::Symbol(name) => scope
                                .lookup(name)
                                .ok_or_else(|| Invalid::UndefinedSymbol(name.clone()))?
                                as i64,
                        };
                        sum += if term.negative { -value } else { value };
                    }
                    Ok(Hex::masked(sum, 6).render(6))
                }
            },
        }
    }

    /// Linker record for a direct, non-relative address field.
    pub fn modification(&self, scope: &Scope) -> Result<Option<String>, Invalid> {
        match &self.kind {
            Kind::Extended(xe) => {
                let fields = self.fields(xe, scope)?;
                if !(fields.n && fields.i) || fields.b || fields.p || fields.zero {
                    return Ok(None);
                }
                let at = Hex::new(scope.locate(self.location, &self.tag.block) + 1);
                let width = if xe.extended { 5 } else { 3 };
                let name = xe
                    .external
                    .as_ref()
                    .map(|name| format!("+{}", normalize(name)))
                    .unwrap_or_default();
                Ok(Some(format!("M{}{:02X}{}", at.render(6), width, name)))
            }
            Kind::Single { .. }
            | Kind::Register { .. }
            | Kind::Sic { .. }
            | Kind::Directive { .. } => Ok(None),
        }
    }

    fn fields(&self, xe: &Xe, scope: &Scope) -> Result<Fields, Invalid> {
        let zero = xe.args.trim().is_empty();
        let args = if zero { IMMEDIATE_ZERO } else { xe.args.trim() };
        let (arg, x) = split_index(args);
        let (n, i, target) = if let Some(rest) = arg.strip_prefix('#') {
            (false, true, rest.trim())
        } else if let Some(rest) = arg.strip_prefix('@') {
            (true, false, rest.trim())
        } else {
            (true, true, arg)
        };

        let (mut b, mut p) = (false, false);
        let value: i64 = match scope.lookup(target) {
            Some(address) if xe.extended => address as i64,
            Some(address) => {
                let next = scope.locate(self.location, &self.tag.block) as i64
                    + self.size().value() as i64;
                let disp = address as i64 - next;
                if (-2048..=2047).contains(&disp) {
                    p = true;
                    disp
                } else {
                    let base = xe.base.as_ref().ok_or(Invalid::MissingBaseRegister)?;
                    let base = scope
                        .lookup(base)
                        .ok_or_else(|| Invalid::UndefinedSymbol(base.clone()))?;
                    let disp = address as i64 - base as i64;
                    if !(0..=4095).contains(&disp) {
                        return Err(Invalid::DisplacementRange(disp));
                    }
                    b = true;
                    disp
                }
            }
            None if xe.external.is_none() => number(target)?.value() as i64,
            None => 0,
        };

        let e = xe.extended;
        let first = xe.opcode as u32 + (n as u32) * 2 + i as u32;
        let flags = (x as u32) << 3 | (b as u32) << 2 | (p as u32) << 1 | e as u32;
        let digits = if e { 5 } else { 3 };
        let code = format!(
            "{}{}{}",
            Hex::new(first).render(2),
            Hex::new(flags).render(1),
            Hex::masked(value, digits).render(digits)
        );
        Ok(Fields {
            code,
            n,
            i,
            b,
            p,
            zero,
        })
    }
}

/// Splits a trailing `,X` (spaces and case ignored).
pub fn split_index(arg: &str) -> (&str, bool) {
    let compact: String = arg.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.to_ascii_uppercase().ends_with(",X") {
        if let Some(pos) = arg.rfind(',') {
            return (arg[..pos].trim_end(), true);
        }
    }
    (arg, false)
}

/// Operand numerals are hexadecimal; anything else is a missing symbol.
pub(crate) fn number(text: &str) -> Result<Hex, Invalid> {
    Hex::parse_hex(text).map_err(|_| match text.chars().next() {
        Some(c) if c.is_ascii_digit() => Invalid::MalformedNumber(text.to_string()),
        _ => Invalid::UndefinedSymbol(text.to_string()),
    })
}
