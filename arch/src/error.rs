use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Malformed number: `{0}`")]
    MalformedNumber(String),

    #[error("Unknown instruction format: `{0}`")]
    UnknownFormat(String),

    #[error("Malformed table entry (line {0}): `{1}`")]
    MalformedEntry(usize, String),
}
