pub mod error;
pub mod format;
pub mod hex;
pub mod optab;
pub mod reg;

pub use error::Error;
pub use format::Format;
pub use hex::Hex;
pub use optab::{OpInfo, OpTable};
pub use reg::{Reg, RegTable};
