use std::fmt;

use thiserror::Error;

/// Fatal blob-level parse failure. The offset is relative to the start of
/// the blob so it can be cross-checked against a hex dump.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DtbError {
    #[error("malformed blob at offset {offset:#x}: {what}")]
    Malformed { offset: usize, what: &'static str },
}

/// The semantic type a caller asked a property to decode as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Str,
    U32,
    U32Array,
    Empty,
    Phandle,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PropertyType::Str => "null-terminated string",
            PropertyType::U32 => "single u32 cell",
            PropertyType::U32Array => "array of u32 cells",
            PropertyType::Empty => "empty property",
            PropertyType::Phandle => "phandle cell",
        };
        f.write_str(s)
    }
}

/// A property payload did not match the type the caller expected.
///
/// Whether this is fatal is the caller's decision: required properties
/// propagate it, optional ones downgrade it to a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("property '{name}': expected {expected}, got {len} byte(s)")]
    Mismatch {
        name: String,
        expected: PropertyType,
        len: usize,
    },
}
