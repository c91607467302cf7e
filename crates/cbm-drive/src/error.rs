//! Drive setup errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DriveError {
    #[error("drive ROM must be {expected} bytes, got {found}")]
    RomSize { expected: usize, found: usize },
}
