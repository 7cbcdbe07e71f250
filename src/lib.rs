#![no_std]

//! A profile-driven decoder for Garmin's Flexible and Interoperable Data
//! Transfer protocol.
//!
//! Cassette walks a FIT document in a single pass, maintaining the sixteen
//! local message slots the protocol allows a stream to redefine mid-file, and
//! produces one table of decoded messages per global message number. Field
//! semantics (names, scaling, units, enumerations, conditional subfields) come
//! from an injected [`profile::Profile`], an immutable dictionary supplied at
//! decode time; without one, fields are preserved as opaque values keyed by
//! field number.
//!
//! Most users should begin with [`decode::decode_slice`]. Structural damage to
//! a document is reported alongside whatever was decoded before it, and purely
//! informational anomalies (checksum mismatches, unrecognized fields) are
//! collected as [`decode::Diagnostic`] values rather than failing the pass.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `std`: enable the reader-based entry point (default).

extern crate alloc;

pub mod decode;
pub mod profile;
pub mod table;
pub mod value;
pub mod wire;
