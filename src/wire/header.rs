//! Document and record headers.

use tartan_bitfield::bitfield;
use thiserror::Error;
use zerocopy::FromBytes;

use super::cursor::{Cursor, Truncated};

/// An error reading a document header.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FileHeaderError {
    /// Incorrect filetype marker.
    #[error("Incorrect file type marker.")]
    NotFitData,
    /// Unknown header length.
    #[error("Unknown header length ({0}).")]
    UnknownHeaderLength(u8),
    /// Too few bytes to hold a header.
    #[error(transparent)]
    Truncated(#[from] Truncated),
}

/// The header opening a document.
///
/// Headers are twelve or fourteen bytes; the longer form appends a checksum
/// over the first twelve, which devices may leave as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Declared header length in bytes (12 or 14).
    pub length: u8,
    /// Protocol version the document was written against.
    pub protocol_version: u8,
    /// Profile version the document was written against.
    pub profile_version: u16,
    /// Length of the record section in bytes, excluding header and trailing
    /// checksum.
    pub data_size: u32,
    /// Stored header checksum, present only in fourteen-byte headers.
    pub checksum: Option<u16>,
}

impl FileHeader {
    /// Read and validate a document header.
    pub fn read(r: &mut Cursor) -> Result<Self, FileHeaderError> {
        #[repr(C, packed)]
        #[derive(FromBytes)]
        struct Layout {
            length: u8,
            protocol_version: u8,
            profile_version: [u8; 2],
            data_size: [u8; 4],
            data_type: [u8; 4],
        }

        let Layout {
            length,
            protocol_version,
            profile_version,
            data_size,
            data_type,
        } = zerocopy::transmute!(r.read_array::<12>()?);

        if &data_type != b".FIT" {
            Err(FileHeaderError::NotFitData)?;
        }

        let checksum = match length {
            14 => Some(u16::from_le_bytes(r.read_array::<2>()?)),
            12 => None,
            _ => Err(FileHeaderError::UnknownHeaderLength(length))?,
        };

        Ok(Self {
            length,
            protocol_version,
            profile_version: u16::from_le_bytes(profile_version),
            data_size: u32::from_le_bytes(data_size),
            checksum,
        })
    }
}

/// The classified form of a one-byte record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A definition record, installing a field layout into a local slot.
    Definition {
        /// Target local message slot.
        local: u8,
        /// Whether a developer field list follows the ordinary one.
        developer: bool,
    },
    /// A data record against a previously defined slot.
    Data {
        /// Referenced local message slot.
        local: u8,
    },
    /// A data record in the compressed-timestamp form.
    CompressedData {
        /// Referenced local message slot.
        local: u8,
        /// Five-bit offset in seconds against the last explicit timestamp.
        offset: u8,
    },
}

impl RecordKind {
    /// Classify a record header byte.
    ///
    /// A pure function of the byte: no side effects, no failure modes.
    pub fn of(r: u8) -> Self {
        bitfield! {
            struct Header(u8) {
                [7] is_compressed,
            }
        }

        if Header(r).is_compressed() {
            bitfield! {
                struct CompressedHeader(u8) {
                    [0..5] time_offset: u8,
                    [5..7] local_message: u8,
                }
            }

            let header = CompressedHeader(r);

            Self::CompressedData {
                local: header.local_message(),
                offset: header.time_offset(),
            }
        } else {
            bitfield! {
                struct NormalHeader(u8) {
                    [0..4] local_message: u8,
                    [5] is_developer,
                    [6] is_definition,
                }
            }

            let header = NormalHeader(r);

            if header.is_definition() {
                Self::Definition {
                    local: header.local_message(),
                    developer: header.is_developer(),
                }
            } else {
                Self::Data {
                    local: header.local_message(),
                }
            }
        }
    }
}
