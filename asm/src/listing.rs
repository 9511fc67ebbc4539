use arch::{Hex, RegTable};
use color_print::cformat;

use crate::builder::Section;
use crate::stmt::{Kind, Stmt};
use crate::symbol::{block_name, SymbolTable};

/// Widest object code shown before it is cut with `..`.
const CODE_WIDTH: usize = 12;

/// Register operands of a format 2 statement, by name when the table knows it.
fn registers(stmt: &Stmt, regs: &RegTable) -> Option<String> {
    let Kind::Register { r1, r2, .. } = &stmt.kind else {
        return None;
    };
    let name = |num: u8| {
        regs.name(num)
            .map(str::to_string)
            .unwrap_or_else(|| num.to_string())
    };
    Some(format!("{},{}", name(*r1), name(*r2)))
}

pub fn print_dump(sections: &[Section], symbols: &SymbolTable, regs: &RegTable) {
    for section in sections {
        let name = section.name.trim_end();
        println!(
            "{}+------[{}]{}",
            "-".repeat(19),
            name,
            "-".repeat(45usize.saturating_sub(name.len()))
        );
        let scope = section.scope(symbols);
        for stmt in &section.stmts {
            let loc = Hex::new(scope.locate(stmt.location, &stmt.tag.block)).render(6);
            let code = match stmt.encode(&scope) {
                Ok(code) if code.len() > CODE_WIDTH => {
                    cformat!("<y>{}..</>", &code[..CODE_WIDTH - 2])
                }
                Ok(code) => cformat!("<y>{:<12}</>", code),
                Err(_) => cformat!("<r,s>{:<12}</>", "!!"),
            };
            let block = if stmt.tag.block.is_empty() {
                String::new()
            } else {
                cformat!(" <c>[{}]</>", stmt.tag.block)
            };
            let regs = registers(stmt, regs)
                .map(|r| cformat!(" <m>({})</>", r))
                .unwrap_or_default();
            println!(
                "[{}] {} | {:>4}: {}{}{}",
                loc, code, stmt.tag.line, stmt.tag.raw, block, regs
            );
        }
        println!("{:19}|", "");
        for (sym, addr) in symbols.section(name) {
            let block = symbols
                .get_block(sym, name)
                .map(block_name)
                .unwrap_or_else(|| "absolute".to_string());
            println!(
                "{:19}| {}",
                "",
                cformat!("<g>{}</> <y>{}</> <c>{}</>", sym, addr.render(6), block)
            );
        }
    }

    let mut macros = symbols.macro_names().peekable();
    if macros.peek().is_some() {
        println!("-------------------+-----------[macros]--------------------------------------");
    }
    for name in macros {
        let Some(body) = symbols.get_macro(name) else {
            continue;
        };
        let size = if body.is_empty() {
            "empty".to_string()
        } else {
            format!("{} line(s)", body.len())
        };
        println!(
            "{:19}| {}",
            "",
            cformat!("<g>{}</> {} <c>{}</>", name, body.params().join(","), size)
        );
    }
    println!("-------------------+-----------------------------------------------------");
}
