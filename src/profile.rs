//! The injectable protocol dictionary.
//!
//! A [`Profile`] maps global message numbers to field semantics: names,
//! scaling, units, enumeration labels, accumulation, and conditional
//! subfields. The decoder treats it as read-only for the life of a pass.
//!
//! Profiles are expected to be generated data, so every table is a `'static`
//! slice and the builder methods are `const fn`, keeping both generated
//! dictionaries and test fixtures literal-friendly:
//!
//! ```
//! static MESSAGES: &[MessageSpec] = &[MessageSpec::new(
//!     20,
//!     "record",
//!     &[
//!         FieldSpec::new(253, "timestamp").with_units("s"),
//!         FieldSpec::new(2, "altitude").with_scale(5.0, 500.0).with_units("m"),
//!     ],
//! )];
//!
//! let profile = Profile::new(MESSAGES);
//! ```
//!
//! Decoding without a profile (or with one missing a message) still works;
//! fields are then preserved as opaque values keyed by field number.

use alloc::collections::BTreeMap;

use either::Either::{self, Left, Right};

/// The field semantics of one global message number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MessageSpec {
    /// Global message number.
    pub number: u16,
    /// Message name, used to title the decoded table.
    pub name: &'static str,
    /// Field semantics, keyed by field number.
    pub fields: &'static [FieldSpec],
}

impl MessageSpec {
    /// Describe a message.
    pub const fn new(number: u16, name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self {
            number,
            name,
            fields,
        }
    }

    /// Look up the semantics of a field number, if the profile knows it.
    pub fn field(&self, number: u8) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.number == number)
    }
}

/// The semantics of one field slot within a message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Field number within the message.
    pub number: u8,
    /// Default field name, used unless a subfield interpretation applies.
    pub name: &'static str,
    /// Divisor applied to valid raw values; `1.0` leaves them untouched.
    pub scale: f64,
    /// Subtrahend applied after scaling.
    pub offset: f64,
    /// Unit string for the physical value.
    pub units: Option<&'static str>,
    /// Enumeration labels, keyed by raw value.
    pub values: &'static [(i64, &'static str)],
    /// Whether occurrences accumulate across records, reconstructing a
    /// counter wider than its on-wire type.
    pub accumulate: bool,
    /// Conditional interpretations, in declaration priority order.
    pub subfields: &'static [Subfield],
}

impl FieldSpec {
    /// Describe a field with unit scaling and no further semantics.
    pub const fn new(number: u8, name: &'static str) -> Self {
        Self {
            number,
            name,
            scale: 1.0,
            offset: 0.0,
            units: None,
            values: &[],
            accumulate: false,
            subfields: &[],
        }
    }

    /// Declare a scale divisor and offset: `physical = raw / scale - offset`.
    pub const fn with_scale(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    /// Declare a unit string.
    pub const fn with_units(mut self, units: &'static str) -> Self {
        self.units = Some(units);
        self
    }

    /// Declare enumeration labels.
    pub const fn with_values(mut self, values: &'static [(i64, &'static str)]) -> Self {
        self.values = values;
        self
    }

    /// Mark the field as accumulating across records.
    pub const fn accumulated(mut self) -> Self {
        self.accumulate = true;
        self
    }

    /// Declare conditional interpretations, in priority order.
    pub const fn with_subfields(mut self, subfields: &'static [Subfield]) -> Self {
        self.subfields = subfields;
        self
    }

    /// Select the interpretation of this field for one message.
    ///
    /// `reference` supplies the already extracted raw value of a sibling
    /// field by number. Candidates are evaluated in declaration order and the
    /// first whose guard matches wins, so a dictionary declaring overlapping
    /// guards resolves deterministically to the earlier one; when none
    /// match, the field's own (default) interpretation applies.
    pub fn interpret(
        &self,
        reference: impl Fn(u8) -> Option<i64>,
    ) -> Either<&Subfield, &FieldSpec> {
        for subfield in self.subfields {
            let matched = subfield
                .references
                .iter()
                .any(|guard| reference(guard.field) == Some(guard.value));

            if matched {
                return Left(subfield);
            }
        }

        Right(self)
    }
}

/// One conditional interpretation of a field slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Subfield {
    /// Name the field resolves to under this interpretation.
    pub name: &'static str,
    /// Divisor applied to valid raw values under this interpretation.
    pub scale: f64,
    /// Subtrahend applied after scaling.
    pub offset: f64,
    /// Unit string under this interpretation.
    pub units: Option<&'static str>,
    /// Enumeration labels under this interpretation.
    pub values: &'static [(i64, &'static str)],
    /// Guards selecting this interpretation; any single match suffices.
    pub references: &'static [Reference],
}

impl Subfield {
    /// Describe an interpretation guarded by `references`.
    pub const fn new(name: &'static str, references: &'static [Reference]) -> Self {
        Self {
            name,
            scale: 1.0,
            offset: 0.0,
            units: None,
            values: &[],
            references,
        }
    }

    /// Declare a scale divisor and offset for this interpretation.
    pub const fn with_scale(mut self, scale: f64, offset: f64) -> Self {
        self.scale = scale;
        self.offset = offset;
        self
    }

    /// Declare a unit string for this interpretation.
    pub const fn with_units(mut self, units: &'static str) -> Self {
        self.units = Some(units);
        self
    }

    /// Declare enumeration labels for this interpretation.
    pub const fn with_values(mut self, values: &'static [(i64, &'static str)]) -> Self {
        self.values = values;
        self
    }
}

/// A guard over a sibling reference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    /// Field number of the reference field within the same message.
    pub field: u8,
    /// Raw value the reference field must hold.
    pub value: i64,
}

impl Reference {
    /// Guard on a sibling field holding a raw value.
    pub const fn new(field: u8, value: i64) -> Self {
        Self { field, value }
    }
}

/// An indexed, immutable dictionary of message semantics.
///
/// The empty profile (via [`Default`]) decodes every field as opaque.
#[derive(Debug, Clone, Default)]
pub struct Profile {
    messages: BTreeMap<u16, &'static MessageSpec>,
}

impl Profile {
    /// Index a generated message table.
    ///
    /// Later entries with a duplicate message number shadow earlier ones.
    pub fn new(messages: &'static [MessageSpec]) -> Self {
        Self {
            messages: messages.iter().map(|m| (m.number, m)).collect(),
        }
    }

    /// Look up the semantics of a global message number.
    pub fn message(&self, number: u16) -> Option<&'static MessageSpec> {
        self.messages.get(&number).copied()
    }
}
