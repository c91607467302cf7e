//! Observability trait for inspecting component state.
//!
//! Every CPU exposes its registers and timing state by path for debugging.
//! Queries never affect emulation state.

use std::fmt;

/// A dynamically-typed value for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// 8-bit register.
    U8(u8),
    /// 16-bit register or 6502 address.
    U16(u16),
    /// 24-bit 65816 address (bank:offset).
    Address24(u32),
    /// Clock values and packed words.
    U32(u32),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::U8(v) => write!(f, "${v:02X}"),
            Value::U16(v) => write!(f, "${v:04X}"),
            Value::Address24(v) => write!(f, "${:02X}:{:04X}", v >> 16, v & 0xFFFF),
            Value::U32(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

/// A component whose state can be inspected.
pub trait Observable {
    /// Query a specific property by path.
    ///
    /// Paths are hierarchical, separated by dots:
    /// - `pc` - Program counter
    /// - `a` - Accumulator
    /// - `flags.z` - Zero flag
    ///
    /// Returns `None` if the path is not recognised.
    fn query(&self, path: &str) -> Option<Value>;

    /// List all available query paths.
    fn query_paths(&self) -> &'static [&'static str];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_hex_for_registers() {
        assert_eq!(Value::U8(0x0A).to_string(), "$0A");
        assert_eq!(Value::U16(0xC000).to_string(), "$C000");
        assert_eq!(Value::Address24(0x01_8000).to_string(), "$01:8000");
        assert_eq!(Value::U32(1234).to_string(), "1234");
        assert_eq!(Value::from(true).to_string(), "true");
    }
}
