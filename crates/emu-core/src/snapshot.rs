//! Binary snapshot framing.
//!
//! A snapshot is a sequence of modules. Each module starts with a 16-byte
//! NUL-padded name, a major and minor version byte, and a little-endian
//! dword holding the module size including this 22-byte header.

use thiserror::Error;

const NAME_LEN: usize = 16;
const HEADER_LEN: usize = NAME_LEN + 2 + 4;

/// Errors raised while reading a snapshot.
///
/// A CPU whose snapshot read fails must be reset before it is stepped again.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot truncated at offset {offset}")]
    UnexpectedEof { offset: usize },
    #[error("expected module {expected:?}, found {found:?}")]
    ModuleNameMismatch { expected: String, found: String },
    #[error("module {module} has unsupported version {major}.{minor}")]
    UnsupportedVersion {
        module: String,
        major: u8,
        minor: u8,
    },
    #[error("invalid value {value:#x} for {field}")]
    InvalidValue { field: &'static str, value: u32 },
}

/// Start of a module being written; passed back to [`SnapshotWriter::end_module`].
#[derive(Debug, Clone, Copy)]
#[must_use]
pub struct ModuleMark(usize);

/// Little-endian snapshot writer.
#[derive(Debug, Default)]
pub struct SnapshotWriter {
    buf: Vec<u8>,
}

impl SnapshotWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a module header. The size field is patched by `end_module`.
    pub fn begin_module(&mut self, name: &str, major: u8, minor: u8) -> ModuleMark {
        let start = self.buf.len();
        let mut padded = [0u8; NAME_LEN];
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_LEN);
        padded[..len].copy_from_slice(&bytes[..len]);
        self.buf.extend_from_slice(&padded);
        self.buf.push(major);
        self.buf.push(minor);
        self.buf.extend_from_slice(&[0; 4]);
        ModuleMark(start)
    }

    pub fn end_module(&mut self, mark: ModuleMark) {
        let size = (self.buf.len() - mark.0) as u32;
        let at = mark.0 + NAME_LEN + 2;
        self.buf[at..at + 4].copy_from_slice(&size.to_le_bytes());
    }

    pub fn write_byte(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_word(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_dword(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Little-endian snapshot reader over a borrowed buffer.
#[derive(Debug)]
pub struct SnapshotReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SnapshotReader<'a> {
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current read offset.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SnapshotError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(SnapshotError::UnexpectedEof {
                offset: self.data.len(),
            });
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read and check a module header, returning its version.
    pub fn open_module(&mut self, name: &str) -> Result<(u8, u8), SnapshotError> {
        let header = self.take(HEADER_LEN)?;
        let raw_name = &header[..NAME_LEN];
        let found_len = raw_name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        let found = &raw_name[..found_len];
        let expected = &name.as_bytes()[..name.len().min(NAME_LEN)];
        if found != expected {
            return Err(SnapshotError::ModuleNameMismatch {
                expected: name.to_owned(),
                found: String::from_utf8_lossy(found).into_owned(),
            });
        }
        Ok((header[NAME_LEN], header[NAME_LEN + 1]))
    }

    pub fn read_byte(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_word(&mut self) -> Result<u16, SnapshotError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_dword(&mut self) -> Result<u32, SnapshotError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), SnapshotError> {
        out.copy_from_slice(self.take(out.len())?);
        Ok(())
    }
}
