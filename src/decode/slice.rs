//! Slice-based decoder implementation.

use crate::profile::Profile;

use super::Decoded;
use super::session::Session;

/// Decode a document from a slice of its bytes.
///
/// This method is also re-exported as `cassette::decode::decode_slice`.
pub fn decode(r: &[u8], profile: &Profile) -> Decoded {
    Session::new(profile).run(r)
}
