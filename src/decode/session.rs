//! Per-pass decoder state and the record loop.

use alloc::borrow::Cow;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use either::Either::{Left, Right};

use crate::profile::{FieldSpec, Profile, Subfield};
use crate::table::{Field, Message, Tables};
use crate::value::Value;
use crate::wire::base::{BaseType, RawScalar};
use crate::wire::check::compute_crc;
use crate::wire::cursor::Cursor;
use crate::wire::definition::{DefinitionMessage, DefinitionTable, FieldDefinition};
use crate::wire::header::{FileHeader, RecordKind};

use super::{ChecksumScope, Decoded, Diagnostic, Error};

/// Global message number carrying developer field descriptions.
const FIELD_DESCRIPTION: u16 = 206;

/// Field number conventionally holding a message's explicit timestamp.
const TIMESTAMP: u8 = 253;

/// One decode pass over one document.
///
/// Everything mutable lives here, so concurrent passes over different
/// documents cannot interfere.
pub(super) struct Session<'p> {
    definitions: DefinitionTable,
    pass: Pass<'p>,
}

impl<'p> Session<'p> {
    pub(super) fn new(profile: &'p Profile) -> Self {
        Self {
            definitions: DefinitionTable::default(),
            pass: Pass {
                profile,
                accumulator: Accumulator::default(),
                developer: BTreeMap::new(),
                last_timestamp: None,
                tables: Tables::default(),
                diagnostics: Vec::new(),
                reported_unknown: BTreeSet::new(),
                reported_undefined: BTreeSet::new(),
            },
        }
    }

    /// Run the pass to completion, pairing partial tables with any failure.
    pub(super) fn run(mut self, r: &[u8]) -> Decoded {
        let failure = self.stream(r).err();

        Decoded {
            tables: self.pass.tables,
            diagnostics: self.pass.diagnostics,
            failure,
        }
    }

    fn stream(&mut self, r: &[u8]) -> Result<(), Error> {
        let cursor = &mut Cursor::new(r);

        let header = FileHeader::read(cursor)?;

        // A stored header checksum of zero means the writer skipped it.
        if let Some(found) = header.checksum.filter(|c| *c != 0) {
            let calculated = compute_crc(0, &r[..12]);

            if calculated != found {
                log::warn!("Header CRC mismatch: calculated {calculated:#06X}, found {found:#06X}.");
                self.pass.diagnostics.push(Diagnostic::ChecksumMismatch {
                    scope: ChecksumScope::Header,
                    calculated,
                    found,
                });
            }
        }

        // Offset to the end of the record section. A declared size larger
        // than the buffer is caught by the cursor mid-record, keeping the
        // records decoded up to that point.
        let end = cursor.position() + header.data_size as usize;

        while cursor.position() < end {
            match RecordKind::of(cursor.read_array::<1>()?[0]) {
                RecordKind::Definition { local, developer } => {
                    let message = DefinitionMessage::read(cursor, developer)?;
                    log::debug!(
                        "Local message {local} defined as global message {}.",
                        message.global
                    );
                    self.definitions.define(local, message);
                }
                RecordKind::Data { local } => {
                    let definition = self
                        .definitions
                        .lookup(local)
                        .ok_or(Error::UndefinedSlot(local))?;
                    self.pass.data_record(cursor, definition, None)?;
                }
                RecordKind::CompressedData { local, offset } => {
                    let definition = self
                        .definitions
                        .lookup(local)
                        .ok_or(Error::UndefinedSlot(local))?;
                    self.pass.data_record(cursor, definition, Some(offset))?;
                }
            }
        }

        // The loop only completes once `r` covers the record section, so the
        // checked range is in bounds.
        let calculated = compute_crc(0, &r[..end]);
        let found = u16::from_le_bytes(cursor.read_array::<2>()?);

        if calculated != found {
            log::warn!("File CRC mismatch: calculated {calculated:#06X}, found {found:#06X}.");
            self.pass.diagnostics.push(Diagnostic::ChecksumMismatch {
                scope: ChecksumScope::File,
                calculated,
                found,
            });
        }

        Ok(())
    }
}

/// Pass state apart from the definition table, split off so a borrowed
/// definition can be threaded through a mutable decode step.
struct Pass<'p> {
    profile: &'p Profile,
    accumulator: Accumulator,
    developer: BTreeMap<(u8, u8), DeveloperField>,
    last_timestamp: Option<u32>,
    tables: Tables,
    diagnostics: Vec<Diagnostic>,
    reported_unknown: BTreeSet<(u16, u8)>,
    reported_undefined: BTreeSet<(u8, u8)>,
}

impl Pass<'_> {
    /// Decode one data record against its slot's installed definition.
    fn data_record(
        &mut self,
        cursor: &mut Cursor,
        definition: &DefinitionMessage,
        time_offset: Option<u8>,
    ) -> Result<(), Error> {
        let message_spec = self.profile.message(definition.global);

        // First pass: take every field's bytes, so a reference field late in
        // byte order can still disambiguate an earlier subfield.
        let mut raws = Vec::with_capacity(definition.fields.len());
        for field in &definition.fields {
            raws.push((field, cursor.read(field.size as usize)?));
        }

        let mut developer_raws = Vec::with_capacity(definition.developer_fields.len());
        for field in &definition.developer_fields {
            developer_raws.push((field, cursor.read(field.size as usize)?));
        }

        let mut message = Message {
            number: definition.global,
            timestamp: None,
            fields: Vec::with_capacity(raws.len() + developer_raws.len()),
        };

        if let Some(offset) = time_offset {
            let last = self.last_timestamp.ok_or(Error::MissingTimestampReference)?;
            let resolved = advance_timestamp(last, offset);

            self.last_timestamp = Some(resolved);
            message.timestamp = Some(resolved);
        }

        let reference = |number: u8| {
            raws.iter()
                .find(|(field, _)| field.number == number)
                .and_then(|&(field, bytes)| first_scalar(field, bytes, definition.big_endian))
                .map(RawScalar::as_i64)
        };

        // Second pass: interpret and scale.
        for &(field, bytes) in &raws {
            if field.number == TIMESTAMP {
                if let Some(RawScalar::Unsigned(t)) =
                    first_scalar(field, bytes, definition.big_endian)
                {
                    self.last_timestamp = Some(t as u32);
                    message.timestamp = Some(t as u32);
                }
            }

            let interpretation = match message_spec.and_then(|m| m.field(field.number)) {
                Some(spec) => Interpretation::of(spec.interpret(&reference), spec.accumulate),
                None => {
                    self.unknown_field(definition.global, field.number);
                    Interpretation::opaque()
                }
            };

            if let Some((value, label)) =
                self.decode_field(definition.global, field, bytes, definition.big_endian, &interpretation)
            {
                message.fields.push(Field {
                    number: field.number,
                    name: interpretation.name.map(Cow::Borrowed),
                    value,
                    units: interpretation.units.map(Cow::Borrowed),
                    label,
                });
            }
        }

        for &(field, bytes) in &developer_raws {
            match self.developer.get(&(field.index, field.number)) {
                Some(description) => {
                    if let Some(value) = developer_value(bytes, description, definition.big_endian)
                    {
                        message.fields.push(Field {
                            number: field.number,
                            name: Some(Cow::Owned(description.name.clone())),
                            value,
                            units: description.units.clone().map(Cow::Owned),
                            label: None,
                        });
                    }
                }
                None => {
                    self.undefined_developer(field.index, field.number);
                    message.fields.push(Field {
                        number: field.number,
                        name: None,
                        value: Value::Bytes(bytes.to_vec()),
                        units: None,
                        label: None,
                    });
                }
            }
        }

        if definition.global == FIELD_DESCRIPTION {
            self.register_developer_field(&message);
        }

        self.tables.push(message_spec.map(|m| m.name), message);

        Ok(())
    }

    /// Decode one field's bytes under an interpretation.
    ///
    /// Returns `None` when the field holds its invalid sentinel; absence,
    /// never zero, is the decoded form of 'no value'.
    fn decode_field(
        &mut self,
        global: u16,
        field: &FieldDefinition,
        bytes: &[u8],
        big_endian: bool,
        interpretation: &Interpretation,
    ) -> Option<(Value, Option<&'static str>)> {
        match field.base {
            BaseType::Text => text_value(bytes).map(|v| (v, None)),
            BaseType::Byte => byte_value(bytes).map(|v| (v, None)),
            base => {
                let width = base.size();

                if bytes.len() / width == 1 {
                    let mut raw = base.extract(bytes.get(..width)?, big_endian)?;

                    if interpretation.accumulate {
                        raw = self.accumulate(global, field.number, raw, width as u32 * 8);
                    }

                    let label = interpretation.label(raw);

                    Some((interpretation.scaled(raw), label))
                } else {
                    let elements: Vec<Value> = bytes
                        .chunks_exact(width)
                        .filter_map(|chunk| base.extract(chunk, big_endian))
                        .map(|raw| interpretation.scaled(raw))
                        .collect();

                    (!elements.is_empty()).then(|| (Value::Array(elements), None))
                }
            }
        }
    }

    fn accumulate(&mut self, global: u16, field: u8, raw: RawScalar, bits: u32) -> RawScalar {
        match raw {
            RawScalar::Unsigned(x) => {
                RawScalar::Unsigned(self.accumulator.advance(global, field, x, bits))
            }
            other => other,
        }
    }

    /// Register a developer field description decoded from the stream.
    fn register_developer_field(&mut self, message: &Message) {
        let byte = |number: u8| {
            message
                .field_number(number)
                .and_then(|f| f.value.as_u64())
                .map(|x| x as u8)
        };

        let (Some(index), Some(number)) = (byte(0), byte(1)) else {
            log::warn!("Ignored field description without a data index or field number.");
            return;
        };

        let Some(name) = message.field_number(3).and_then(|f| f.value.as_str()) else {
            log::warn!("Ignored field description without a field name.");
            return;
        };

        let base = byte(2)
            .and_then(BaseType::from_code)
            .unwrap_or(BaseType::Byte);
        let scale = byte(6).map_or(1.0, |s| if s == 0 { 1.0 } else { f64::from(s) });
        let offset = message
            .field_number(7)
            .and_then(|f| f.value.as_i64())
            .unwrap_or(0) as f64;
        let units = message
            .field_number(8)
            .and_then(|f| f.value.as_str())
            .map(String::from);

        self.developer.insert(
            (index, number),
            DeveloperField {
                name: String::from(name),
                units,
                base,
                scale,
                offset,
            },
        );
    }

    fn unknown_field(&mut self, message: u16, field: u8) {
        if self.reported_unknown.insert((message, field)) {
            log::debug!("Message {message} carries unknown field {field}.");
            self.diagnostics
                .push(Diagnostic::UnknownField { message, field });
        }
    }

    fn undefined_developer(&mut self, index: u8, field: u8) {
        if self.reported_undefined.insert((index, field)) {
            log::warn!("Developer field {field} under data index {index} has no description.");
            self.diagnostics
                .push(Diagnostic::UndefinedDeveloperField { index, field });
        }
    }
}

/// The semantics a field slot resolved to for one message.
struct Interpretation {
    name: Option<&'static str>,
    scale: f64,
    offset: f64,
    units: Option<&'static str>,
    values: &'static [(i64, &'static str)],
    accumulate: bool,
}

impl Interpretation {
    fn of(resolved: either::Either<&'static Subfield, &'static FieldSpec>, accumulate: bool) -> Self {
        match resolved {
            Left(subfield) => Self {
                name: Some(subfield.name),
                scale: subfield.scale,
                offset: subfield.offset,
                units: subfield.units,
                values: subfield.values,
                accumulate,
            },
            Right(field) => Self {
                name: Some(field.name),
                scale: field.scale,
                offset: field.offset,
                units: field.units,
                values: field.values,
                accumulate,
            },
        }
    }

    /// The interpretation of a field the profile does not know: no name, no
    /// scaling, the raw value preserved.
    fn opaque() -> Self {
        Self {
            name: None,
            scale: 1.0,
            offset: 0.0,
            units: None,
            values: &[],
            accumulate: false,
        }
    }

    /// Apply `physical = raw / scale - offset` to a valid raw value.
    fn scaled(&self, raw: RawScalar) -> Value {
        if self.scale != 1.0 || self.offset != 0.0 {
            Value::Float(raw.as_f64() / self.scale - self.offset)
        } else {
            match raw {
                RawScalar::Unsigned(x) => Value::Unsigned(x),
                RawScalar::Signed(x) => Value::Signed(x),
                RawScalar::Float(x) => Value::Float(x),
            }
        }
    }

    fn label(&self, raw: RawScalar) -> Option<&'static str> {
        if self.scale != 1.0 || self.offset != 0.0 {
            return None;
        }

        let key = raw.as_i64();
        self.values
            .iter()
            .find(|(value, _)| *value == key)
            .map(|(_, label)| *label)
    }
}

/// Running totals of accumulating fields, keyed per message and field
/// number across the whole pass.
#[derive(Default)]
struct Accumulator {
    totals: BTreeMap<(u16, u8), (u64, u64)>,
}

impl Accumulator {
    /// Fold one occurrence into the running total.
    ///
    /// The first occurrence seeds the total with the raw value. A later raw
    /// value below the last one implies the on-wire counter wrapped, adding
    /// one modulus of 2^bits.
    fn advance(&mut self, message: u16, field: u8, raw: u64, bits: u32) -> u64 {
        match self.totals.get_mut(&(message, field)) {
            None => {
                self.totals.insert((message, field), (raw, raw));
                raw
            }
            Some((last, total)) => {
                let delta = if bits >= 64 {
                    raw.wrapping_sub(*last)
                } else if raw < *last {
                    (1u64 << bits) - *last + raw
                } else {
                    raw - *last
                };

                *last = raw;
                *total = total.wrapping_add(delta);
                *total
            }
        }
    }
}

/// A developer field description registered from a field description
/// message.
struct DeveloperField {
    name: String,
    units: Option<String>,
    base: BaseType,
    scale: f64,
    offset: f64,
}

/// Resolve a five-bit compressed time offset against the last explicit
/// timestamp, rolling the low bits forward across a wrap.
fn advance_timestamp(last: u32, offset: u8) -> u32 {
    let offset = u32::from(offset);
    let base = last & !0x1F;

    if offset >= last & 0x1F {
        base + offset
    } else {
        base + offset + 0x20
    }
}

/// The first element of a field's bytes, for timestamps and subfield guards.
fn first_scalar(field: &FieldDefinition, bytes: &[u8], big_endian: bool) -> Option<RawScalar> {
    bytes
        .get(..field.base.size())
        .and_then(|element| field.base.extract(element, big_endian))
}

/// Decode a string field: null-terminated UTF-8, absent when empty.
fn text_value(bytes: &[u8]) -> Option<Value> {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let text = &bytes[..end];

    (!text.is_empty()).then(|| Value::Text(String::from_utf8_lossy(text).into_owned()))
}

/// Decode an opaque byte field, absent when every byte is the sentinel.
fn byte_value(bytes: &[u8]) -> Option<Value> {
    (!bytes.iter().all(|b| *b == 0xFF)).then(|| Value::Bytes(bytes.to_vec()))
}

/// Decode a developer field's bytes through its registered description.
fn developer_value(bytes: &[u8], description: &DeveloperField, big_endian: bool) -> Option<Value> {
    match description.base {
        BaseType::Text => text_value(bytes),
        BaseType::Byte => byte_value(bytes),
        base => {
            let width = base.size();
            let scaled = |raw: RawScalar| {
                if description.scale != 1.0 || description.offset != 0.0 {
                    Value::Float(raw.as_f64() / description.scale - description.offset)
                } else {
                    match raw {
                        RawScalar::Unsigned(x) => Value::Unsigned(x),
                        RawScalar::Signed(x) => Value::Signed(x),
                        RawScalar::Float(x) => Value::Float(x),
                    }
                }
            };

            if bytes.len() / width == 1 {
                base.extract(bytes.get(..width)?, big_endian).map(scaled)
            } else {
                let elements: Vec<Value> = bytes
                    .chunks_exact(width)
                    .filter_map(|chunk| base.extract(chunk, big_endian))
                    .map(scaled)
                    .collect();

                (!elements.is_empty()).then(|| Value::Array(elements))
            }
        }
    }
}
