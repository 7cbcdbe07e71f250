//! Decoding entry points.
//!
//! [`decode_slice`] runs one decode pass over a document already resident in
//! memory; [`decode_reader`] (requiring Cargo feature `std`) buffers a reader
//! to its end and does the same. A pass always yields a [`Decoded`], even
//! when the document is structurally damaged: whatever was decoded before
//! the damage is retained alongside the terminal [`Error`], and purely
//! informational anomalies are collected as [`Diagnostic`] values.
//!
//! All state a pass accumulates (the definition table, accumulator totals,
//! developer field descriptions, the timestamp reference) is private to that
//! pass and discarded with it, so independent callers may decode documents
//! concurrently with no shared state.

#[cfg(feature = "std")]
pub mod reader;
pub mod slice;

mod session;

#[cfg(feature = "std")]
pub use reader::decode as decode_reader;
pub use slice::decode as decode_slice;

use alloc::vec::Vec;
use core::fmt;

use thiserror::Error;

use crate::table::Tables;
use crate::wire::cursor::Truncated;
use crate::wire::header::FileHeaderError;

/// An unrecoverable structural error.
///
/// Any of these halts the stream loop: the bytes after the failure point
/// cannot be framed. Messages decoded before the failure are still returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Incorrect file header.
    #[error("Incorrect file header: {0}")]
    Header(#[from] FileHeaderError),
    /// Ran out of bytes mid-record.
    #[error(transparent)]
    Truncated(#[from] Truncated),
    /// A data record referenced a local message slot no definition record
    /// had filled, so its field layout is unknowable.
    #[error("Data record references undefined local message {0}.")]
    UndefinedSlot(u8),
    /// A compressed-timestamp record arrived before any explicit timestamp
    /// to resolve it against.
    #[error("Compressed timestamp encountered before any explicit timestamp.")]
    MissingTimestampReference,
}

/// Which checksum a [`Diagnostic::ChecksumMismatch`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumScope {
    /// The optional checksum of a fourteen-byte header, covering the header
    /// itself.
    Header,
    /// The trailing checksum covering the header and record section.
    File,
}

impl fmt::Display for ChecksumScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => write!(f, "header"),
            Self::File => write!(f, "file"),
        }
    }
}

/// A non-fatal anomaly observed during a pass.
///
/// Diagnostics never halt decoding; callers decide their tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// Calculated and found checksum values do not match.
    #[error("Calculated ({calculated:#06X}) and found ({found:#06X}) {scope} CRC values do not match.")]
    ChecksumMismatch {
        scope: ChecksumScope,
        calculated: u16,
        found: u16,
    },
    /// A field number the profile does not know; its value is preserved
    /// keyed by number. Reported once per message and field number.
    #[error("Message {message} carries unknown field {field}.")]
    UnknownField { message: u16, field: u8 },
    /// A developer field with no registered field description; its bytes are
    /// preserved opaquely. Reported once per index and field number.
    #[error("Developer field {field} under data index {index} has no registered description.")]
    UndefinedDeveloperField { index: u8, field: u8 },
}

/// The outcome of one decode pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Decoded message tables, keyed by global message number.
    pub tables: Tables,
    /// Non-fatal anomalies, in observation order.
    pub diagnostics: Vec<Diagnostic>,
    /// The structural error that ended the pass early, if one did.
    pub failure: Option<Error>,
}
