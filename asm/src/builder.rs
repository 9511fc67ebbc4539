use arch::{Format, Hex};
use indexmap::IndexMap;
use std::collections::VecDeque;

use crate::error::{Error, Invalid};
use crate::macros::Macro;
use crate::session::Session;
use crate::stmt::{number, split_index, Data, Kind, Operand, Scope, Stmt, Tag, Term, Xe};
use crate::symbol::{normalize, SymbolTable};

pub const DEFAULT_NAME: &str = "OUTPUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// SIC/XE: formats 1 to 4, `BASE`, `+` prefix
    #[default]
    Xe,
    /// Legacy SIC: every instruction is a 3-byte SIC word
    Sic,
}

/// Placement of a program block once the whole section is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    pub base: Hex,
    pub length: Hex,
}

/// One control section, ready to be written.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub start: Hex,
    pub length: Hex,
    pub stmts: Vec<Stmt>,
    pub blocks: IndexMap<String, Block>,
    pub ext_defs: Vec<String>,
    pub ext_refs: Vec<String>,
    /// Modification records for external terms of `WORD` expressions.
    pub ref_mods: Vec<String>,
}

impl Section {
    pub fn scope<'a>(&'a self, symbols: &'a SymbolTable) -> Scope<'a> {
        Scope::new(symbols, &self.name).with_blocks(&self.blocks)
    }
}

// ----------------------------------------------------------------------------
// Builder

struct Pending {
    line: usize,
    raw: String,
    depth: usize,
}

struct Definition {
    name: String,
    line: usize,
    raw: String,
    body: Macro,
    nesting: usize,
}

struct Literal {
    name: String,
    def: String,
    size: Hex,
    data: Data,
}

struct RefMod {
    location: Hex,
    block: String,
    negative: bool,
    name: String,
}

struct Line<'a> {
    label: Option<&'a str>,
    mnemonic: &'a str,
    args: &'a str,
}

/// Scans the source of one control section: location counters, labels,
/// literals, macros. Object code is produced later from the [`Section`].
pub struct Builder<'s> {
    session: &'s mut Session,
    dialect: Dialect,
    name: String,
    start: Hex,
    block: String,
    counters: IndexMap<String, Hex>,
    stmts: Vec<Stmt>,
    pool: Vec<Literal>,
    literals: IndexMap<String, String>,
    base: Option<String>,
    ext_defs: Vec<String>,
    ext_refs: Vec<String>,
    ref_mods: Vec<RefMod>,
    queue: VecDeque<Pending>,
    defining: Option<Definition>,
}

impl<'s> Builder<'s> {
    pub fn new(session: &'s mut Session, dialect: Dialect, name: Option<&str>) -> Self {
        let mut counters = IndexMap::new();
        counters.insert(String::new(), Hex::ZERO);
        Builder {
            session,
            dialect,
            name: normalize(name.unwrap_or(DEFAULT_NAME)),
            start: Hex::ZERO,
            block: String::new(),
            counters,
            stmts: vec![],
            pool: vec![],
            literals: IndexMap::new(),
            base: None,
            ext_defs: vec![],
            ext_refs: vec![],
            ref_mods: vec![],
            queue: VecDeque::new(),
            defining: None,
        }
    }

    /// Scan every line, then finish.
    pub fn build<'a, I>(
        session: &'s mut Session,
        dialect: Dialect,
        name: Option<&str>,
        lines: I,
    ) -> Result<Section, Error>
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        let mut builder = Builder::new(session, dialect, name);
        for (line, raw) in lines {
            builder.feed(line, raw)?;
        }
        builder.finish()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locctr(&self) -> Hex {
        self.counters.get(&self.block).copied().unwrap_or_default()
    }

    pub fn feed(&mut self, line: usize, raw: &str) -> Result<(), Error> {
        self.queue.push_back(Pending {
            line,
            raw: raw.to_string(),
            depth: 0,
        });
        while let Some(next) = self.queue.pop_front() {
            self.process(&next)
                .map_err(|kind| Error::invalid(next.line, &next.raw, kind))?;
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<Section, Error> {
        if let Some(def) = self.defining.take() {
            return Err(Error::invalid(
                def.line,
                &def.raw,
                Invalid::UnterminatedMacro(def.name),
            ));
        }
        if !self.pool.is_empty() {
            let line = self.stmts.last().map(|s| s.tag.line).unwrap_or(0);
            self.flush(line);
        }

        let mut blocks = IndexMap::new();
        let mut cursor = self.start;
        for (idx, (name, counter)) in self.counters.iter().enumerate() {
            // the default block counts from the start address, the others from 0
            let block = if idx == 0 {
                Block {
                    base: Hex::ZERO,
                    length: *counter - self.start,
                }
            } else {
                Block {
                    base: cursor,
                    length: *counter,
                }
            };
            cursor = cursor + block.length;
            blocks.insert(name.clone(), block);
        }

        let ref_mods = self
            .ref_mods
            .iter()
            .map(|m| {
                let base = blocks.get(&m.block).map(|b| b.base).unwrap_or_default();
                format!(
                    "M{}06{}{}",
                    (base + m.location).render(6),
                    if m.negative { '-' } else { '+' },
                    m.name
                )
            })
            .collect();

        Ok(Section {
            length: cursor - self.start,
            name: self.name,
            start: self.start,
            stmts: self.stmts,
            blocks,
            ext_defs: self.ext_defs,
            ext_refs: self.ext_refs,
            ref_mods,
        })
    }

    // ------------------------------------------------------------------------

    fn process(&mut self, pending: &Pending) -> Result<(), Invalid> {
        if self.defining.is_some() {
            self.capture(&pending.raw);
            return Ok(());
        }

        let code = strip_comment(&pending.raw).trim();
        if code.is_empty() {
            return Ok(());
        }
        let Line {
            label,
            mnemonic,
            args,
        } = self.split(code)?;
        let (extended, mnemonic) = match mnemonic.strip_prefix('+') {
            Some(rest) => (true, rest.to_ascii_uppercase()),
            None => (false, mnemonic.to_ascii_uppercase()),
        };

        match mnemonic.as_str() {
            "MACRO" => {
                let name = label.ok_or_else(|| Invalid::TokenCount(code.to_string()))?;
                self.defining = Some(Definition {
                    name: name.to_string(),
                    line: pending.line,
                    raw: pending.raw.clone(),
                    body: Macro::new(split_list(args)),
                    nesting: 0,
                });
                return Ok(());
            }
            "MEND" => return Err(Invalid::StrayMend),
            _ => {}
        }

        if let Some(definition) = self.session.symbols.get_macro(&mnemonic) {
            let limit = self.session.options.max_macro_depth;
            if pending.depth >= limit {
                return Err(Invalid::MacroDepth(limit));
            }
            let mut definition = definition.clone();
            definition.set_label(label.map(str::to_string));
            let lines = definition.lines(&split_list(args))?;
            for raw in lines.into_iter().rev() {
                self.queue.push_front(Pending {
                    line: pending.line,
                    raw,
                    depth: pending.depth + 1,
                });
            }
            return Ok(());
        }

        let info = self
            .session
            .optab
            .get(&mnemonic)
            .ok_or_else(|| Invalid::UnknownMnemonic(mnemonic.clone()))?;
        if extended && (info.format != Format::Three || self.dialect == Dialect::Sic) {
            return Err(Invalid::UnknownMnemonic(format!("+{}", mnemonic)));
        }

        if info.format == Format::Asm && mnemonic == "START" {
            let start = match args.trim() {
                "" => Hex::ZERO,
                text => Hex::parse_hex(text)?,
            };
            self.start = start;
            self.counters.insert(self.block.clone(), start);
        }

        if let Some(label) = label {
            self.define(label, &mnemonic, args)?;
        }

        let literal;
        let args = if args.trim_start().starts_with('=') {
            literal = self.literal(args)?;
            literal.as_str()
        } else {
            args
        };

        let kind = match (info.format, self.dialect) {
            (Format::Asm, _) => self.directive(&mnemonic, args, pending.line)?,
            (Format::One, Dialect::Xe) => Kind::Single {
                opcode: info.opcode,
            },
            (Format::Two, Dialect::Xe) => {
                let (r1, r2) = self.registers(args)?;
                Kind::Register {
                    opcode: info.opcode,
                    r1,
                    r2,
                }
            }
            (Format::Three, Dialect::Xe) => Kind::Extended(Xe {
                opcode: info.opcode,
                args: args.to_string(),
                extended,
                base: self.base.clone(),
                external: self.external(args),
            }),
            (Format::Sic, _) | (Format::Three, Dialect::Sic) => Kind::Sic {
                opcode: info.opcode,
                args: args.to_string(),
            },
            (Format::One | Format::Two, Dialect::Sic) => {
                return Err(Invalid::UnknownMnemonic(mnemonic));
            }
        };

        let stmt = Stmt::new(self.locctr(), kind, self.tag(pending.line, &pending.raw));
        self.push(stmt);
        Ok(())
    }

    fn split<'a>(&self, code: &'a str) -> Result<Line<'a>, Invalid> {
        let fields = fields(code);
        let line = match fields.as_slice() {
            [] => return Err(Invalid::TokenCount(code.to_string())),
            [(_, op)] => Line {
                label: None,
                mnemonic: *op,
                args: "",
            },
            [(_, first), (_, second)] => {
                if !self.is_operation(first) && self.is_operation(second) {
                    Line {
                        label: Some(*first),
                        mnemonic: *second,
                        args: "",
                    }
                } else {
                    Line {
                        label: None,
                        mnemonic: *first,
                        args: *second,
                    }
                }
            }
            [(_, first), (at, second), (rest, _), ..] => {
                if self.is_operation(first) && !self.is_operation(second) {
                    Line {
                        label: None,
                        mnemonic: *first,
                        args: code[*at..].trim(),
                    }
                } else {
                    Line {
                        label: Some(*first),
                        mnemonic: *second,
                        args: code[*rest..].trim(),
                    }
                }
            }
        };
        let spaced = line.args.split_whitespace().count() > 1;
        if spaced && !line.args.contains(',') && !line.args.contains('\'') {
            return Err(Invalid::TokenCount(code.to_string()));
        }
        Ok(line)
    }

    fn is_operation(&self, word: &str) -> bool {
        let word = word.strip_prefix('+').unwrap_or(word);
        self.session.optab.contains(word) || self.session.symbols.get_macro(word).is_some()
    }

    fn define(&mut self, label: &str, mnemonic: &str, args: &str) -> Result<(), Invalid> {
        if self.session.symbols.contains_symbol(label, &self.name) {
            return Err(Invalid::DuplicateLabel(label.to_string()));
        }
        if mnemonic == "EQU" {
            let (value, block) = self.equ(args)?;
            self.session
                .symbols
                .add_symbol(label, value, block.as_deref(), &self.name);
        } else {
            let here = self.locctr();
            self.session
                .symbols
                .add_symbol(label, here, Some(&self.block), &self.name);
        }
        Ok(())
    }

    /// `*`, a number, a symbol, or a sum/difference of those.
    fn equ(&self, args: &str) -> Result<(Hex, Option<String>), Invalid> {
        let text = args.trim();
        if text == "*" {
            return Ok((self.locctr(), Some(self.block.clone())));
        }
        let symbols = &self.session.symbols;
        let mut value: i64 = 0;
        let mut relocation = 0;
        let mut block = None;
        for (negative, token) in split_terms(text)? {
            let (v, b) = match symbols.get_symbol(&token, &self.name) {
                Some(addr) => (
                    addr.value() as i64,
                    symbols.get_block(&token, &self.name).map(str::to_string),
                ),
                None => (number(&token)?.value() as i64, None),
            };
            if b.is_some() {
                relocation += if negative { -1 } else { 1 };
                if !negative {
                    block = b;
                }
            }
            value += if negative { -v } else { v };
        }
        // a difference of two labels is a plain number
        let block = if relocation == 1 { block } else { None };
        Ok((Hex::masked(value, 6), block))
    }

    fn literal(&mut self, args: &str) -> Result<String, Invalid> {
        let (def, indexed) = split_index(args.trim());
        let def = def.trim_start_matches('=').trim();
        let name = match self.literals.get(def) {
            Some(name) => name.clone(),
            None => {
                let name = format!("={:05}", self.literals.len() + 1);
                let (size, data) = literal_data(def)?;
                self.literals.insert(def.to_string(), name.clone());
                self.pool.push(Literal {
                    name: name.clone(),
                    def: def.to_string(),
                    size,
                    data,
                });
                name
            }
        };
        Ok(if indexed { format!("{},X", name) } else { name })
    }

    fn directive(&mut self, mnemonic: &str, args: &str, line: usize) -> Result<Kind, Invalid> {
        let sized = |size: Hex| Kind::Directive {
            size,
            data: Data::Bytes(String::new()),
        };
        let xe = self.dialect == Dialect::Xe;
        match mnemonic {
            "START" | "EQU" | "CSECT" => Ok(sized(Hex::ZERO)),
            "END" | "LTORG" => {
                self.flush(line);
                Ok(sized(Hex::ZERO))
            }
            "BYTE" => {
                let (size, code) = byte(args)?;
                Ok(Kind::Directive {
                    size,
                    data: Data::Bytes(code),
                })
            }
            "WORD" => Ok(Kind::Directive {
                size: Hex::new(3),
                data: Data::Word(self.word(args)?),
            }),
            "RESB" => Ok(sized(Hex::parse_dec(args)?)),
            "RESW" => {
                let words = Hex::parse_dec(args)?.value();
                let size = words
                    .checked_mul(3)
                    .ok_or_else(|| Invalid::MalformedNumber(args.trim().to_string()))?;
                Ok(sized(Hex::new(size)))
            }
            "BASE" if xe => {
                self.base = Some(args.trim().to_string());
                Ok(sized(Hex::ZERO))
            }
            "NOBASE" if xe => {
                self.base = None;
                Ok(sized(Hex::ZERO))
            }
            "USE" => {
                self.block = args.trim().to_ascii_uppercase();
                self.counters.entry(self.block.clone()).or_default();
                Ok(sized(Hex::ZERO))
            }
            "EXTDEF" => {
                self.ext_defs
                    .extend(split_list(args).iter().map(|s| normalize(s)));
                Ok(sized(Hex::ZERO))
            }
            "EXTREF" => {
                self.ext_refs
                    .extend(split_list(args).iter().map(|s| normalize(s)));
                Ok(sized(Hex::ZERO))
            }
            _ => Err(Invalid::UnknownMnemonic(mnemonic.to_string())),
        }
    }

    fn word(&mut self, args: &str) -> Result<Vec<Term>, Invalid> {
        let mut terms = vec![];
        for (negative, token) in split_terms(args.trim())? {
            let operand = if token.starts_with(|c: char| c.is_ascii_digit()) {
                Operand::Number(Hex::parse_dec(&token)?.value() as i64)
            } else if self.ext_refs.contains(&normalize(&token)) {
                self.ref_mods.push(RefMod {
                    location: self.locctr(),
                    block: self.block.clone(),
                    negative,
                    name: normalize(&token),
                });
                Operand::External(token)
            } else {
                Operand::Symbol(token)
            };
            terms.push(Term { negative, operand });
        }
        Ok(terms)
    }

    fn registers(&self, args: &str) -> Result<(u8, u8), Invalid> {
        let regs = &self.session.regs;
        let reg = |text: &str| -> Result<u8, Invalid> {
            let text = text.trim();
            regs.number(text)
                .or_else(|| text.parse::<u8>().ok().filter(|n| *n < 16))
                .ok_or_else(|| Invalid::InvalidRegister(text.to_string()))
        };
        let mut fields = args.split(',');
        let r1 = reg(fields.next().unwrap_or(""))?;
        let r2 = match fields.next() {
            Some(text) => reg(text)?,
            None => 0,
        };
        Ok((r1, r2))
    }

    /// The `EXTREF` symbol an instruction operand names, if any.
    fn external(&self, args: &str) -> Option<String> {
        let (arg, _) = split_index(args.trim());
        let arg = arg.trim_start_matches(['#', '@']);
        let name = normalize(arg);
        self.ext_refs.contains(&name).then_some(name)
    }

    /// Places the pending literals at the current location.
    fn flush(&mut self, line: usize) {
        for literal in std::mem::take(&mut self.pool) {
            if self
                .session
                .symbols
                .contains_symbol(&literal.name, &self.name)
            {
                continue;
            }
            let here = self.locctr();
            self.session
                .symbols
                .add_symbol(&literal.name, here, Some(&self.block), &self.name);
            let kind = Kind::Directive {
                size: literal.size,
                data: literal.data,
            };
            let raw = format!("*       ={}", literal.def);
            let stmt = Stmt::new(here, kind, self.tag(line, &raw));
            self.push(stmt);
        }
    }

    /// Record a macro body line; the matching `MEND` stores the macro.
    fn capture(&mut self, raw: &str) {
        let words: Vec<String> = strip_comment(raw)
            .split_whitespace()
            .take(2)
            .map(|w| w.to_ascii_uppercase())
            .collect();
        let has = |kw: &str| words.iter().any(|w| w == kw);

        let Some(def) = self.defining.as_mut() else {
            return;
        };
        if has("MEND") {
            if def.nesting == 0 {
                if let Some(def) = self.defining.take() {
                    self.session.symbols.add_macro(&def.name, def.body);
                }
                return;
            }
            def.nesting -= 1;
        } else if has("MACRO") {
            def.nesting += 1;
        }
        def.body.add_line(raw);
    }

    fn tag(&self, line: usize, raw: &str) -> Tag {
        Tag {
            line,
            raw: raw.to_string(),
            block: self.block.clone(),
            section: self.name.clone(),
        }
    }

    fn push(&mut self, stmt: Stmt) {
        let size = stmt.size();
        if let Some(counter) = self.counters.get_mut(&self.block) {
            *counter = *counter + size;
        }
        self.stmts.push(stmt);
    }
}

// ----------------------------------------------------------------------------
// Line helpers

/// Drops everything from the first `.` outside quotes.
pub fn strip_comment(raw: &str) -> &str {
    let mut quoted = false;
    for (idx, c) in raw.char_indices() {
        match c {
            '\'' => quoted = !quoted,
            '.' if !quoted => return &raw[..idx],
            _ => {}
        }
    }
    raw
}

/// Whitespace separated words with their byte offsets.
fn fields(code: &str) -> Vec<(usize, &str)> {
    let mut out = vec![];
    let mut start = None;
    for (idx, c) in code.char_indices() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(idx),
            (true, Some(s)) => {
                out.push((s, &code[s..idx]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &code[s..]));
    }
    out
}

fn split_list(args: &str) -> Vec<String> {
    if args.trim().is_empty() {
        return vec![];
    }
    args.split(',').map(|s| s.trim().to_string()).collect()
}

fn split_terms(text: &str) -> Result<Vec<(bool, String)>, Invalid> {
    let mut terms = vec![];
    let mut negative = false;
    let mut current = String::new();
    for c in text.chars() {
        if c == '+' || c == '-' {
            if !current.trim().is_empty() {
                terms.push((negative, current.trim().to_string()));
                current.clear();
            }
            negative = c == '-';
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        terms.push((negative, current.trim().to_string()));
    }
    if terms.is_empty() {
        return Err(Invalid::MalformedNumber(text.to_string()));
    }
    Ok(terms)
}

/// `C'..'` or `X'..'`: size and object code.
pub fn byte(args: &str) -> Result<(Hex, String), Invalid> {
    let text = args.trim();
    let invalid = || Invalid::InvalidByteArgument(text.to_string());
    let body = text
        .get(1..)
        .and_then(|rest| rest.strip_prefix('\''))
        .and_then(|rest| rest.strip_suffix('\''));
    match (text.chars().next().map(|c| c.to_ascii_uppercase()), body) {
        (Some('C'), Some(body)) => {
            let code = body.bytes().map(|b| format!("{:02X}", b)).collect();
            Ok((Hex::new(body.len() as u32), code))
        }
        (Some('X'), Some(body)) => {
            if body.is_empty() || !body.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(Invalid::MalformedNumber(body.to_string()));
            }
            let size = (body.len() as u32 + 1) / 2;
            let code = format!("{:0>width$}", body, width = size as usize * 2);
            Ok((Hex::new(size), code.to_ascii_uppercase()))
        }
        _ => Err(invalid()),
    }
}

fn literal_data(def: &str) -> Result<(Hex, Data), Invalid> {
    match def.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('C') | Some('X') if def.get(1..2) == Some("'") => {
            let (size, code) = byte(def)?;
            Ok((size, Data::Bytes(code)))
        }
        _ => {
            let value = Hex::parse_dec(def)?;
            Ok((Hex::new(3), Data::Bytes(value.render(6))))
        }
    }
}
