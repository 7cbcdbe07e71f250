//! The decoded output model.
//!
//! One decode pass produces a [`Tables`] value: per global message number,
//! the ordered sequence of decoded [`Message`]s in document order, each table
//! annotated with the column and unit metadata its rows introduced. Tables
//! are immutable once the pass completes and owned by the caller.

use alloc::borrow::Cow;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::value::Value;

/// One decoded field of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field number on the wire.
    pub number: u8,
    /// Resolved field name. `None` for fields the profile does not know;
    /// those stay addressable by number.
    pub name: Option<Cow<'static, str>>,
    /// Physical value, sentinel-checked and scaled.
    pub value: Value,
    /// Unit string from the profile or a developer field description.
    pub units: Option<Cow<'static, str>>,
    /// Enumeration label, when the profile marks the field as an enumeration
    /// and the raw value has one.
    pub label: Option<&'static str>,
}

/// One decoded message.
///
/// Fields appear in wire order. A field whose raw value was its base type's
/// invalid sentinel is absent from [`Self::fields`] entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Global message number.
    pub number: u16,
    /// Message timestamp in seconds, either the explicit timestamp field or
    /// one derived from a compressed-timestamp record header.
    pub timestamp: Option<u32>,
    /// Decoded fields, in wire order.
    pub fields: Vec<Field>,
}

impl Message {
    /// Look up a field by resolved name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.as_deref() == Some(name))
    }

    /// Look up a field by wire field number.
    pub fn field_number(&self, number: u8) -> Option<&Field> {
        self.fields.iter().find(|f| f.number == number)
    }

    /// Look up a field's value by resolved name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.field(name).map(|f| &f.value)
    }
}

/// Column metadata of a table: one entry per distinct field seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Field number on the wire.
    pub number: u8,
    /// Resolved field name, if any row resolved one.
    pub name: Option<Cow<'static, str>>,
    /// Unit string, from the first row that carried the column.
    pub units: Option<Cow<'static, str>>,
}

/// The ordered decoded messages of one global message number.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    number: u16,
    name: Option<&'static str>,
    columns: Vec<Column>,
    rows: Vec<Message>,
}

impl Table {
    /// Global message number of every row.
    pub fn number(&self) -> u16 {
        self.number
    }

    /// Message name from the profile, if it knows this message.
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Column metadata, in first-appearance order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Decoded messages in document order.
    pub fn rows(&self) -> &[Message] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn push(&mut self, message: Message) {
        for field in &message.fields {
            let seen = self
                .columns
                .iter()
                .any(|c| c.number == field.number && c.name == field.name);

            if !seen {
                self.columns.push(Column {
                    number: field.number,
                    name: field.name.clone(),
                    units: field.units.clone(),
                });
            }
        }

        self.rows.push(message);
    }
}

/// Decoded tables keyed by global message number.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tables {
    tables: BTreeMap<u16, Table>,
}

impl Tables {
    /// The table for a global message number, if any of its messages decoded.
    pub fn get(&self, number: u16) -> Option<&Table> {
        self.tables.get(&number)
    }

    /// The table titled `name` by the profile, if one decoded.
    pub fn by_name(&self, name: &str) -> Option<&Table> {
        self.tables.values().find(|t| t.name == Some(name))
    }

    /// Iterate tables in ascending message number order.
    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Number of distinct message numbers decoded.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether nothing decoded.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub(crate) fn push(&mut self, name: Option<&'static str>, message: Message) {
        let table = self.tables.entry(message.number).or_default();

        if table.rows.is_empty() {
            table.number = message.number;
            table.name = name;
        }

        table.push(message);
    }
}
