//! Reader-based decoder implementation.
//!
//! _Requires Cargo feature `std`._

use alloc::vec::Vec;

use std::io::Read;

use crate::profile::Profile;

use super::Decoded;

extern crate std;

/// Decode a document from a reader.
///
/// The reader is buffered to its end before decoding begins; the pass itself
/// never blocks on I/O.
///
/// This method is also re-exported as `cassette::decode::decode_reader`.
///
/// _Requires Cargo feature `std`._
pub fn decode(r: &mut impl Read, profile: &Profile) -> std::io::Result<Decoded> {
    let mut buffer = Vec::new();
    r.read_to_end(&mut buffer)?;

    Ok(super::slice::decode(&buffer, profile))
}
