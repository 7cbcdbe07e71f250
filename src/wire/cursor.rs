//! Sequential reader over a document's bytes.

use thiserror::Error;

/// Ran out of bytes mid-structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unexpectedly reached the end of the document.")]
pub struct Truncated;

/// A cursor over a byte slice, advancing as structures are read.
///
/// The cursor hands out raw bytes only; interpreting them (including applying
/// the endianness a definition record declared for its slot) is left to the
/// caller.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    r: &'a [u8],
    i: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at the start of a slice.
    pub fn new(r: &'a [u8]) -> Self {
        Self { r, i: 0 }
    }

    /// Take an exact number of bytes, advancing the position.
    pub fn read(&mut self, n: usize) -> Result<&'a [u8], Truncated> {
        let s = self.i;
        let e = s.checked_add(n).ok_or(Truncated)?;

        let bytes = self.r.get(s..e).ok_or(Truncated)?;
        self.i = e;

        Ok(bytes)
    }

    /// Take an exact number of bytes as an array, advancing the position.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Truncated> {
        Ok(self.read(N)?.try_into().unwrap())
    }

    /// The number of bytes read so far.
    pub fn position(&self) -> usize {
        self.i
    }

    /// The number of bytes left.
    pub fn remaining(&self) -> usize {
        self.r.len() - self.i
    }
}
