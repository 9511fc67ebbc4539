use arch::{OpTable, RegTable};

use crate::builder::{strip_comment, Builder, Dialect, Section};
use crate::error::Error;
use crate::symbol::SymbolTable;
use crate::writer::ObjectWriter;

/// First source line selecting the legacy SIC dialect.
pub const SIC_SENTINEL: &str = "!USE SIC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub max_macro_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { max_macro_depth: 64 }
    }
}

/// Everything one assembly run shares: tables, symbols, macros.
#[derive(Debug, Clone)]
pub struct Session {
    pub symbols: SymbolTable,
    pub optab: OpTable,
    pub regs: RegTable,
    pub options: Options,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

/// Source lines of one control section.
struct Chunk<'a> {
    name: Option<&'a str>,
    lines: Vec<(usize, &'a str)>,
}

impl Session {
    pub fn new() -> Self {
        Session::with_tables(OpTable::sicxe(), RegTable::sicxe())
    }

    pub fn with_tables(optab: OpTable, regs: RegTable) -> Self {
        Session {
            symbols: SymbolTable::new(),
            optab,
            regs,
            options: Options::default(),
        }
    }

    /// Forget every symbol and macro; the tables stay.
    pub fn clear(&mut self) {
        self.symbols.clear();
    }

    /// Scan the whole source, one [`Section`] per control section.
    pub fn build(&mut self, source: &str) -> Result<Vec<Section>, Error> {
        let (dialect, lines) = dialect(source);
        let chunks = split_sections(lines);
        let count = chunks.len();
        let mut sections = vec![];
        for (idx, chunk) in chunks.into_iter().enumerate() {
            let section = Builder::build(self, dialect, chunk.name, chunk.lines)?;
            // nothing but comments or macro definitions ahead of the first CSECT
            if idx == 0 && count > 1 && section.stmts.is_empty() {
                continue;
            }
            sections.push(section);
        }
        Ok(sections)
    }

    /// Object program for already scanned sections.
    pub fn write(&self, sections: &[Section]) -> Result<String, Error> {
        let mut writer = ObjectWriter::new(Vec::new());
        for section in sections {
            writer.execute(section, &self.symbols)?;
        }
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }

    pub fn assemble(&mut self, source: &str) -> Result<String, Error> {
        let sections = self.build(source)?;
        self.write(&sections)
    }
}

/// Dialect and numbered lines, without the sentinel.
pub fn dialect(source: &str) -> (Dialect, Vec<(usize, &str)>) {
    let mut lines: Vec<(usize, &str)> = source
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line))
        .collect();
    match lines.first() {
        Some((_, first)) if first.trim() == SIC_SENTINEL => {
            lines.remove(0);
            (Dialect::Sic, lines)
        }
        _ => (Dialect::Xe, lines),
    }
}

/// Cuts the source at every `CSECT`. A section is named by its `START` or
/// `CSECT` label.
fn split_sections(lines: Vec<(usize, &str)>) -> Vec<Chunk<'_>> {
    let mut chunks = vec![Chunk {
        name: None,
        lines: vec![],
    }];
    for (idx, raw) in lines {
        let words: Vec<&str> = strip_comment(raw).split_whitespace().collect();
        let directive = words.get(1).map(|w| w.to_ascii_uppercase());
        match directive.as_deref() {
            Some("CSECT") => chunks.push(Chunk {
                name: words.first().copied(),
                lines: vec![],
            }),
            Some("START") => {
                if let Some(chunk) = chunks.last_mut() {
                    chunk.name = chunk.name.or(words.first().copied());
                }
            }
            _ => {}
        }
        if let Some(chunk) = chunks.last_mut() {
            chunk.lines.push((idx, raw));
        }
    }
    chunks
}
