use thiserror::Error;

use crate::msg::Msg;

/// Reasons a source line is rejected. Any of them aborts the assembly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Invalid {
    #[error("Wrong number of fields: `{0}`")]
    TokenCount(String),

    #[error("Re-defined label: `{0}`")]
    DuplicateLabel(String),

    #[error("Unknown operation: `{0}`")]
    UnknownMnemonic(String),

    #[error("Invalid BYTE argument: `{0}`")]
    InvalidByteArgument(String),

    #[error("Base-relative addressing required but no BASE is set")]
    MissingBaseRegister,

    #[error("Displacement {0} is out of range")]
    DisplacementRange(i64),

    #[error("Macro expects {expected} argument(s), got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Malformed number: `{0}`")]
    MalformedNumber(String),

    #[error("Undefined symbol: `{0}`")]
    UndefinedSymbol(String),

    #[error("Unknown register: `{0}`")]
    InvalidRegister(String),

    #[error("Macro expansion nested deeper than {0}")]
    MacroDepth(usize),

    #[error("Macro `{0}` is missing MEND")]
    UnterminatedMacro(String),

    #[error("MEND without MACRO")]
    StrayMend,
}

impl From<arch::Error> for Invalid {
    fn from(err: arch::Error) -> Self {
        match err {
            arch::Error::MalformedNumber(s) => Invalid::MalformedNumber(s),
            other => Invalid::MalformedNumber(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("line {line}: {kind}")]
    Invalid {
        line: usize,
        raw: String,
        #[source]
        kind: Invalid,
    },

    #[error("Failed to open file: {0}")]
    FileOpen(String, #[source] std::io::Error),

    #[error("Failed to create file: {0}")]
    FileCreate(String, #[source] std::io::Error),

    #[error("Failed to write object program")]
    FileWrite(#[source] std::io::Error),

    #[error("Failed to export symbols")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub fn invalid(line: usize, raw: &str, kind: Invalid) -> Self {
        Error::Invalid {
            line,
            raw: raw.to_string(),
            kind,
        }
    }

    /// The reason, when the error comes from a source line.
    pub fn kind(&self) -> Option<&Invalid> {
        match self {
            Error::Invalid { kind, .. } => Some(kind),
            _ => None,
        }
    }

    /// Print error with diagnostic information showing file location and line content
    pub fn print_diag(&self, file: &str) {
        match self {
            Error::Invalid { line, raw, kind } => {
                Msg::Error(kind.to_string()).diag((file, *line, raw));
            }
            other => Msg::Error(other.to_string()).print(),
        }
    }
}
