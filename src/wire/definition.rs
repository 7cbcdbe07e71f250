//! Definition record payloads and the local message slot table.

use alloc::vec::Vec;

use zerocopy::FromBytes;

use super::base::BaseType;
use super::cursor::{Cursor, Truncated};

/// One entry of a definition record's field list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    /// Field number, the key into the profile for this message.
    pub number: u8,
    /// Declared size in bytes; arrays declare a multiple of the element width.
    pub size: u8,
    /// Declared base type. Unknown codes fall back to [`BaseType::Byte`].
    pub base: BaseType,
}

/// One entry of a definition record's developer field list.
///
/// Developer fields are typed by a field description registered earlier in
/// the stream rather than by the static profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeveloperFieldDefinition {
    /// Field number within the developer's namespace.
    pub number: u8,
    /// Declared size in bytes.
    pub size: u8,
    /// Developer data index keying the registered field description.
    pub index: u8,
}

/// The field layout installed into a local message slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionMessage {
    /// Global message number data records in this slot decode as.
    pub global: u16,
    /// Whether multi-byte fields in this slot are big-endian.
    pub big_endian: bool,
    /// Ordered field list.
    pub fields: Vec<FieldDefinition>,
    /// Ordered developer field list, usually empty.
    pub developer_fields: Vec<DeveloperFieldDefinition>,
}

impl DefinitionMessage {
    /// Read a definition record payload (everything after the record header).
    ///
    /// `developer` is the record header's developer-data flag; when set, a
    /// second field list follows the first.
    pub fn read(r: &mut Cursor, developer: bool) -> Result<Self, Truncated> {
        #[repr(C, packed)]
        #[derive(FromBytes)]
        struct Preamble {
            _reserved: u8,
            architecture: u8,
            global_message: [u8; 2],
            fields: u8,
        }

        let Preamble {
            architecture,
            global_message,
            fields,
            ..
        } = zerocopy::transmute!(r.read_array::<5>()?);

        let big_endian = architecture != 0;
        let global = if big_endian {
            u16::from_be_bytes(global_message)
        } else {
            u16::from_le_bytes(global_message)
        };

        #[repr(C, packed)]
        #[derive(FromBytes)]
        struct FieldHeader {
            number: u8,
            size: u8,
            base_type: u8,
        }

        let mut field_list = Vec::with_capacity(fields as usize);
        for _ in 0..fields {
            let FieldHeader {
                number,
                size,
                base_type,
            } = zerocopy::transmute!(r.read_array::<3>()?);

            field_list.push(FieldDefinition {
                number,
                size,
                base: BaseType::from_code(base_type).unwrap_or(BaseType::Byte),
            });
        }

        let mut developer_list = Vec::new();
        if developer {
            #[repr(C, packed)]
            #[derive(FromBytes)]
            struct DeveloperFieldHeader {
                number: u8,
                size: u8,
                index: u8,
            }

            let count = r.read_array::<1>()?[0];
            developer_list.reserve(count as usize);

            for _ in 0..count {
                let DeveloperFieldHeader {
                    number,
                    size,
                    index,
                } = zerocopy::transmute!(r.read_array::<3>()?);

                developer_list.push(DeveloperFieldDefinition {
                    number,
                    size,
                    index,
                });
            }
        }

        Ok(Self {
            global,
            big_endian,
            fields: field_list,
            developer_fields: developer_list,
        })
    }
}

/// The sixteen reusable local message slots of one decode pass.
///
/// Slot numbers are four bits on the wire, so a fixed arena indexed by slot
/// replaces any keyed map. Redefinition overwrites; history is never kept.
#[derive(Debug, Default)]
pub struct DefinitionTable {
    slots: [Option<DefinitionMessage>; 16],
}

impl DefinitionTable {
    /// Install a layout into a slot, overwriting unconditionally.
    pub fn define(&mut self, local: u8, message: DefinitionMessage) {
        self.slots[usize::from(local & 0xF)] = Some(message);
    }

    /// Look up the layout last installed into a slot, if any.
    pub fn lookup(&self, local: u8) -> Option<&DefinitionMessage> {
        self.slots[usize::from(local & 0xF)].as_ref()
    }
}
