//! Errors raised while decoding a class file.
use std::path::PathBuf;

use thiserror::Error;

/// Result type for decoding operations.
pub type Result<T> = std::result::Result<T, DecodeError>;

/// `DecodeError` is fatal to decoding: the first one raised aborts the whole
/// class file and is handed back to the caller unchanged.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("truncated input at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("bad magic 0x{found:08X}, expected 0xCAFEBABE")]
    BadMagic { found: u32 },

    #[error("unknown constant pool tag {tag} for entry #{index} at offset {offset}")]
    UnknownConstantTag { tag: u8, index: u16, offset: usize },

    #[error("unknown attribute \"{name}\" at offset {offset}")]
    UnknownAttribute { name: String, offset: usize },

    #[error("constant #{index} is not a {expected} entry{}", at_offset(.offset))]
    UnresolvedConstant {
        index: u16,
        expected: &'static str,
        offset: Option<usize>,
    },

    #[error("invalid descriptor \"{descriptor}\" at position {position}: {reason}")]
    InvalidDescriptor {
        descriptor: String,
        position: usize,
        reason: &'static str,
    },

    #[error("invalid text in Utf8 constant #{index} at offset {offset}")]
    InvalidText { index: u16, offset: usize },

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no method named \"{name}\" in class")]
    MissingMethod { name: String },

    #[error("method \"{method}\" has no Code attribute")]
    MissingCode { method: String },
}

impl DecodeError {
    /// Create an unresolved constant error for a reference read at `offset`.
    pub fn unresolved(index: u16, expected: &'static str, offset: usize) -> Self {
        Self::UnresolvedConstant {
            index,
            expected,
            offset: Some(offset),
        }
    }

    /// Create an unresolved constant error for an index followed after
    /// decoding, when there is no input offset to report.
    pub fn unresolved_index(index: u16, expected: &'static str) -> Self {
        Self::UnresolvedConstant {
            index,
            expected,
            offset: None,
        }
    }

    /// Create a descriptor error pointing at `position` inside `descriptor`.
    pub fn descriptor(descriptor: &str, position: usize, reason: &'static str) -> Self {
        Self::InvalidDescriptor {
            descriptor: descriptor.to_owned(),
            position,
            reason,
        }
    }
}

fn at_offset(offset: &Option<usize>) -> String {
    match offset {
        Some(offset) => format!(" (referenced at offset {})", offset),
        None => String::new(),
    }
}
