// src/core/error.rs

use std::fmt;
use std::io;

#[derive(Debug)]
pub enum SimpqsError {
    /// Input had fewer decimal digits than the sieve supports.
    InputTooSmall(usize),
    /// Input was not a positive decimal integer.
    InvalidNumber(String),
    /// Temp-file or relation-stream I/O failure. Fatal.
    Io(io::Error),
    /// A relation line did not match the on-disk format.
    RelationFormat(String),
}

impl fmt::Display for SimpqsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimpqsError::InputTooSmall(digits) => {
                write!(f, "number has {} digits, need at least 40", digits)
            }
            SimpqsError::InvalidNumber(s) => write!(f, "not a valid number: {}", s),
            SimpqsError::Io(e) => write!(f, "relation file I/O error: {}", e),
            SimpqsError::RelationFormat(line) => write!(f, "bad relation line: {}", line),
        }
    }
}

impl std::error::Error for SimpqsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimpqsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SimpqsError {
    fn from(e: io::Error) -> Self {
        SimpqsError::Io(e)
    }
}
