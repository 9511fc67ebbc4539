pub mod builder;
pub mod error;
pub mod listing;
pub mod macros;
pub mod msg;
pub mod session;
pub mod stmt;
pub mod symbol;
pub mod writer;

pub use builder::{Builder, Dialect, Section};
pub use error::{Error, Invalid};
pub use macros::Macro;
pub use session::{Options, Session};
pub use stmt::{Scope, Stmt};
pub use symbol::SymbolTable;
pub use writer::ObjectWriter;

/// Assemble `source` in a fresh session.
pub fn assemble(source: &str) -> Result<String, Error> {
    Session::new().assemble(source)
}
