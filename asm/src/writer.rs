use arch::Hex;
use std::io::Write;

use crate::builder::Section;
use crate::error::{Error, Invalid};
use crate::stmt::{Scope, Stmt};
use crate::symbol::SymbolTable;

/// Longest text record, `T` + address + length + 30 bytes of code.
const TEXT_LIMIT: usize = 69;
const TEXT_HEADER: usize = 9;
const DEFINE_LIMIT: usize = 60;
const REFER_LIMIT: usize = 66;

fn at(stmt: &Stmt, kind: Invalid) -> Error {
    Error::invalid(stmt.tag.line, &stmt.tag.raw, kind)
}

/// Writes object programs (H, D, R, T, M, E records) to one destination.
///
/// Several sections can be written in a row; only the first gets the
/// start address on its `E` record.
pub struct ObjectWriter<W: Write> {
    dest: W,
    used: bool,
}

impl<W: Write> ObjectWriter<W> {
    pub fn new(dest: W) -> Self {
        ObjectWriter { dest, used: false }
    }

    pub fn into_inner(self) -> W {
        self.dest
    }

    pub fn execute(&mut self, section: &Section, symbols: &SymbolTable) -> Result<(), Error> {
        let scope = section.scope(symbols);
        let mut records = vec![format!(
            "H{:<6}{}{}",
            section.name,
            section.start.render(6),
            section.length.render(6)
        )];
        records.extend(Self::define(section, &scope)?);
        records.extend(Self::refer(section));
        records.extend(Self::text(section, &scope)?);
        for stmt in &section.stmts {
            if let Some(record) = stmt.modification(&scope).map_err(|k| at(stmt, k))? {
                records.push(record);
            }
        }
        records.extend(section.ref_mods.iter().cloned());
        records.push(if self.used {
            "E".to_string()
        } else {
            format!("E{}", section.start.render(6))
        });
        self.used = true;

        for record in records {
            writeln!(self.dest, "{}", record.to_uppercase()).map_err(Error::FileWrite)?;
        }
        self.dest.flush().map_err(Error::FileWrite)
    }

    fn define(section: &Section, scope: &Scope) -> Result<Vec<String>, Error> {
        let mut out = vec![];
        let mut line = String::from("D");
        for name in &section.ext_defs {
            if line.len() > DEFINE_LIMIT {
                out.push(std::mem::replace(&mut line, String::from("D")));
            }
            let address = scope.lookup(name).ok_or_else(|| {
                Error::invalid(
                    0,
                    &format!("EXTDEF {}", name.trim_end()),
                    Invalid::UndefinedSymbol(name.trim_end().to_string()),
                )
            })?;
            line.push_str(&format!("{:<6}{}", name, Hex::new(address).render(6)));
        }
        if line.len() > 1 {
            out.push(line);
        }
        Ok(out)
    }

    fn refer(section: &Section) -> Vec<String> {
        let mut out = vec![];
        let mut line = String::from("R");
        for name in &section.ext_refs {
            if line.len() >= REFER_LIMIT {
                out.push(std::mem::replace(&mut line, String::from("R")));
            }
            line.push_str(&format!("{:<6}", name));
        }
        if line.len() > 1 {
            out.push(line);
        }
        out
    }

    fn text(section: &Section, scope: &Scope) -> Result<Vec<String>, Error> {
        let mut out = vec![];
        // record text and the program block it belongs to
        let mut record: Option<(String, &str)> = None;
        for stmt in &section.stmts {
            let code = stmt.encode(scope).map_err(|k| at(stmt, k))?;
            if stmt.is_blank() {
                close(&mut record, &mut out);
                continue;
            }
            if code.is_empty() {
                continue;
            }
            let block = stmt.tag.block.as_str();
            let mut address = scope.locate(stmt.location, block);
            let mut rest = code.as_str();
            while !rest.is_empty() {
                if let Some((text, current)) = &record {
                    if *current != block || text.len() + rest.len() > TEXT_LIMIT {
                        close(&mut record, &mut out);
                    }
                }
                let (text, _) = record.get_or_insert_with(|| {
                    (format!("T{}00", Hex::new(address).render(6)), block)
                });
                let take = (TEXT_LIMIT - text.len()).min(rest.len());
                text.push_str(&rest[..take]);
                rest = &rest[take..];
                address += (take / 2) as u32;
            }
        }
        close(&mut record, &mut out);
        Ok(out)
    }
}

/// Patch the length field and emit, unless the record holds no code.
fn close(record: &mut Option<(String, &str)>, out: &mut Vec<String>) {
    if let Some((mut text, _)) = record.take() {
        if text.len() > TEXT_HEADER {
            let bytes = (text.len() - TEXT_HEADER + 1) / 2;
            text.replace_range(7..9, &Hex::new(bytes as u32).render(2));
            out.push(text);
        }
    }
}
