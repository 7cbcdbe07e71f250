use cassette::decode::{ChecksumScope, Diagnostic, Error, decode_reader, decode_slice};
use cassette::profile::{FieldSpec, MessageSpec, Profile, Reference, Subfield};
use cassette::value::Value;
use cassette::wire::check::compute_crc;
use cassette::wire::cursor::Truncated;
use cassette::wire::header::FileHeaderError;

#[test]
fn decodes_minimal_document() {
    let doc = document(&[
        definition(0, 0, &[(0, 1, ENUM), (1, 2, UINT16), (4, 4, UINT32)]),
        data(0, &[4, 0x01, 0x00, 0x40, 0x42, 0x0F, 0x00]),
        definition(1, 20, &[(2, 2, UINT16), (3, 1, UINT8)]),
        data(1, &[0xB8, 0x0B, 120]),
    ]);

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.failure, None);
    assert!(decoded.diagnostics.is_empty());

    let file_id = decoded.tables.by_name("file_id").unwrap();
    assert_eq!(file_id.len(), 1);
    let row = &file_id.rows()[0];
    assert_eq!(row.field("type").unwrap().label, Some("activity"));
    assert_eq!(row.value("manufacturer"), Some(&Value::Unsigned(1)));
    assert_eq!(row.value("time_created"), Some(&Value::Unsigned(1_000_000)));

    let record = decoded.tables.by_name("record").unwrap();
    assert_eq!(record.number(), 20);
    assert_eq!(record.len(), 1);

    // Raw 3000 at scale 5, offset 500: 3000 / 5 - 500 = 100 m.
    let row = &record.rows()[0];
    assert_eq!(row.value("altitude"), Some(&Value::Float(100.0)));
    assert_eq!(row.field("altitude").unwrap().units.as_deref(), Some("m"));
    assert_eq!(row.value("heart_rate"), Some(&Value::Unsigned(120)));

    let altitude = record.columns().iter().find(|c| c.number == 2).unwrap();
    assert_eq!(altitude.name.as_deref(), Some("altitude"));
    assert_eq!(altitude.units.as_deref(), Some("m"));
}

#[test]
fn decoding_is_deterministic() {
    let doc = document(&[
        definition(1, 20, &[(2, 2, UINT16), (3, 1, UINT8)]),
        data(1, &[0xB8, 0x0B, 120]),
        data(1, &[0xFF, 0xFF, 0xFF]),
    ]);

    let profile = profile();
    assert_eq!(decode_slice(&doc, &profile), decode_slice(&doc, &profile));
}

#[test]
fn decode_reader_matches_slice() {
    let doc = document(&[
        definition(1, 20, &[(2, 2, UINT16), (3, 1, UINT8)]),
        data(1, &[0xB8, 0x0B, 120]),
    ]);

    let profile = profile();
    let buffered = decode_reader(&mut doc.as_slice(), &profile).unwrap();
    assert_eq!(buffered, decode_slice(&doc, &profile));
}

#[test]
fn invalid_sentinel_is_absent() {
    let doc = document(&[
        definition(0, 20, &[(2, 2, UINT16), (3, 1, UINT8)]),
        data(0, &[0xB8, 0x0B, 0xFF]),
    ]);

    let decoded = decode_slice(&doc, &profile());
    let row = &decoded.tables.by_name("record").unwrap().rows()[0];

    // The invalid marker decodes to absence, not to zero or to 255.
    assert_eq!(row.field("heart_rate"), None);
    assert_eq!(row.value("altitude"), Some(&Value::Float(100.0)));
}

#[test]
fn accumulating_field_infers_wraparound() {
    let doc = document(&[
        definition(0, 0xFF00, &[(0, 1, UINT8)]),
        data(0, &[250]),
        data(0, &[10]),
        data(0, &[20]),
    ]);

    let decoded = decode_slice(&doc, &profile());
    let rows = decoded.tables.by_name("vendor_counter").unwrap().rows();

    let totals: Vec<_> = rows.iter().map(|r| r.value("cycles").unwrap()).collect();
    assert_eq!(
        totals,
        [
            &Value::Unsigned(250),
            &Value::Unsigned(266),
            &Value::Unsigned(276)
        ]
    );
}

#[test]
fn compressed_timestamps_resolve_against_last_explicit() {
    let doc = document(&[
        definition(0, 20, &[(253, 4, UINT32), (3, 1, UINT8)]),
        data(0, &[0xE8, 0x03, 0x00, 0x00, 100]),
        definition(1, 20, &[(3, 1, UINT8)]),
        // 1000 & 0x1F = 8; offset 24 >= 8, so the timestamp is 992 + 24.
        compressed(1, 24, &[101]),
        // Offset 4 < 24 rolls the five-bit window over: 992 + 4 + 32.
        compressed(1, 4, &[102]),
    ]);

    let decoded = decode_slice(&doc, &profile());
    let rows = decoded.tables.by_name("record").unwrap().rows();

    assert_eq!(decoded.failure, None);
    assert_eq!(rows[0].timestamp, Some(1000));
    assert_eq!(rows[1].timestamp, Some(1016));
    assert_eq!(rows[2].timestamp, Some(1028));
}

#[test]
fn compressed_timestamp_without_reference_fails() {
    let doc = document(&[
        definition(1, 20, &[(3, 1, UINT8)]),
        compressed(1, 16, &[100]),
    ]);

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.failure, Some(Error::MissingTimestampReference));
    assert!(decoded.tables.is_empty());
}

#[test]
fn truncation_preserves_decoded_messages() {
    let mut doc = document(&[
        definition(0, 20, &[(2, 2, UINT16), (3, 1, UINT8)]),
        data(0, &[0xB8, 0x0B, 100]),
        data(0, &[0xBD, 0x0B, 101]),
        data(0, &[0xC2, 0x0B, 102]),
        data(0, &[0xC7, 0x0B, 103]),
    ]);

    // Cut mid-way through the fourth data record, discarding the trailing
    // CRC with it.
    doc.truncate(doc.len() - 4);

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.failure, Some(Error::Truncated(Truncated)));
    assert_eq!(decoded.tables.by_name("record").unwrap().len(), 3);
}

#[test]
fn subfields_resolve_against_reference_fields() {
    // The guard field lands after the guarded field in byte order.
    let doc = document(&[
        definition(0, 21, &[(3, 4, UINT32), (0, 1, ENUM)]),
        data(0, &[0, 0, 0, 0, 0]),
        data(0, &[2, 0, 0, 0, 42]),
    ]);

    let decoded = decode_slice(&doc, &profile());
    let rows = decoded.tables.by_name("event").unwrap().rows();

    let trigger = rows[0].field("timer_trigger").unwrap();
    assert_eq!(trigger.value, Value::Unsigned(0));
    assert_eq!(trigger.label, Some("manual"));
    assert_eq!(rows[0].field("gear_change_data"), None);

    let gears = rows[1].field("gear_change_data").unwrap();
    assert_eq!(gears.value, Value::Unsigned(2));
    assert_eq!(rows[1].field("timer_trigger"), None);
    assert_eq!(rows[1].field("event").unwrap().label, Some("front_gear_change"));
}

#[test]
fn corrupt_data_is_reported_not_fatal() {
    let mut doc = document(&[
        definition(0, 20, &[(2, 2, UINT16), (3, 1, UINT8)]),
        data(0, &[0xB8, 0x0B, 120]),
    ]);

    // Flip the heart rate byte without correcting the trailing CRC.
    let i = doc.len() - 3;
    doc[i] ^= 0x01;

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.failure, None);

    let row = &decoded.tables.by_name("record").unwrap().rows()[0];
    assert_eq!(row.value("heart_rate"), Some(&Value::Unsigned(121)));

    assert_eq!(decoded.diagnostics.len(), 1);
    assert!(matches!(
        decoded.diagnostics[0],
        Diagnostic::ChecksumMismatch {
            scope: ChecksumScope::File,
            ..
        }
    ));
}

#[test]
fn header_checksum_mismatch_is_reported() {
    let records = definition(0, 20, &[(3, 1, UINT8)]);

    let mut doc = vec![14, 0x20];
    doc.extend_from_slice(&2132u16.to_le_bytes());
    doc.extend_from_slice(&(records.len() as u32).to_le_bytes());
    doc.extend_from_slice(b".FIT");
    // Any nonzero value different from the real checksum; zero would mean
    // the writer skipped the check.
    let wrong = (compute_crc(0, &doc) ^ 0x0100) | 0x0001;
    doc.extend_from_slice(&wrong.to_le_bytes());
    doc.extend_from_slice(&records);
    let crc = compute_crc(0, &doc);
    doc.extend_from_slice(&crc.to_le_bytes());

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.failure, None);
    assert!(matches!(
        decoded.diagnostics[..],
        [Diagnostic::ChecksumMismatch {
            scope: ChecksumScope::Header,
            ..
        }]
    ));
}

#[test]
fn unknown_fields_are_preserved_by_number() {
    let doc = document(&[
        definition(0, 20, &[(200, 1, UINT8), (3, 1, UINT8)]),
        data(0, &[7, 100]),
        data(0, &[8, 101]),
    ]);

    let decoded = decode_slice(&doc, &profile());
    let rows = decoded.tables.by_name("record").unwrap().rows();

    let unknown = rows[0].field_number(200).unwrap();
    assert_eq!(unknown.name, None);
    assert_eq!(unknown.value, Value::Unsigned(7));
    assert_eq!(rows[1].field_number(200).unwrap().value, Value::Unsigned(8));

    // One diagnostic per message and field number, not per record.
    assert_eq!(
        decoded.diagnostics,
        [Diagnostic::UnknownField {
            message: 20,
            field: 200
        }]
    );
}

#[test]
fn undefined_slot_is_fatal() {
    let doc = document(&[data(0, &[0xB8, 0x0B, 120])]);

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.failure, Some(Error::UndefinedSlot(0)));
    assert!(decoded.tables.is_empty());
}

#[test]
fn bad_marker_is_fatal() {
    let mut doc = document(&[definition(0, 20, &[(3, 1, UINT8)]), data(0, &[100])]);
    doc[8..12].copy_from_slice(b"XFIT");

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(
        decoded.failure,
        Some(Error::Header(FileHeaderError::NotFitData))
    );
    assert!(decoded.tables.is_empty());
}

#[test]
fn strings_trim_at_terminator() {
    let doc = document(&[
        definition(0, 31, &[(5, 8, STRING)]),
        data(0, b"Morning\0"),
        data(0, &[0; 8]),
    ]);

    let decoded = decode_slice(&doc, &profile());
    let rows = decoded.tables.by_name("course").unwrap().rows();

    assert_eq!(rows[0].value("name").unwrap().as_str(), Some("Morning"));
    // An empty string is absent, not "".
    assert_eq!(rows[1].field("name"), None);
}

#[test]
fn arrays_keep_valid_elements() {
    let doc = document(&[
        definition(0, 20, &[(13, 3, SINT8)]),
        data(0, &[5, 0x7F, 0xFD]),
        data(0, &[0x7F, 0x7F, 0x7F]),
    ]);

    let decoded = decode_slice(&doc, &profile());
    let rows = decoded.tables.by_name("record").unwrap().rows();

    assert_eq!(
        rows[0].value("temperature"),
        Some(&Value::Array(vec![Value::Signed(5), Value::Signed(-3)]))
    );
    assert_eq!(rows[1].field("temperature"), None);
}

#[test]
fn big_endian_slots_decode() {
    let doc = document(&[
        definition_be(0, 20, &[(2, 2, UINT16)]),
        data(0, &[0x0B, 0xB8]),
    ]);

    let decoded = decode_slice(&doc, &profile());
    let row = &decoded.tables.by_name("record").unwrap().rows()[0];

    assert_eq!(row.value("altitude"), Some(&Value::Float(100.0)));
}

#[test]
fn slot_redefinition_overwrites() {
    let doc = document(&[
        definition(0, 20, &[(3, 1, UINT8)]),
        data(0, &[120]),
        definition(0, 0xFF00, &[(0, 1, UINT8)]),
        data(0, &[10]),
    ]);

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.tables.by_name("record").unwrap().len(), 1);
    assert_eq!(decoded.tables.by_name("vendor_counter").unwrap().len(), 1);
}

#[test]
fn twelve_byte_headers_decode() {
    let records = [definition(0, 20, &[(3, 1, UINT8)]), data(0, &[100])].concat();

    let mut doc = vec![12, 0x10];
    doc.extend_from_slice(&2132u16.to_le_bytes());
    doc.extend_from_slice(&(records.len() as u32).to_le_bytes());
    doc.extend_from_slice(b".FIT");
    doc.extend_from_slice(&records);
    let crc = compute_crc(0, &doc);
    doc.extend_from_slice(&crc.to_le_bytes());

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.failure, None);
    assert_eq!(decoded.tables.by_name("record").unwrap().len(), 1);
}

#[test]
fn developer_fields_decode_through_descriptions() {
    let doc = document(&[
        definition(
            0,
            206,
            &[(0, 1, UINT8), (1, 1, UINT8), (2, 1, UINT8), (3, 6, STRING), (8, 6, STRING)],
        ),
        data(0, &[0, 0, UINT16, b'p', b'o', b'w', b'e', b'r', 0, b'w', b'a', b't', b't', b's', 0]),
        developer_definition(1, 20, &[(3, 1, UINT8)], &[(0, 2, 0)]),
        data(1, &[120, 250, 0]),
    ]);

    let decoded = decode_slice(&doc, &profile());

    assert_eq!(decoded.failure, None);
    assert!(decoded.diagnostics.is_empty());

    let row = &decoded.tables.by_name("record").unwrap().rows()[0];
    let power = row.field("power").unwrap();
    assert_eq!(power.value, Value::Unsigned(250));
    assert_eq!(power.units.as_deref(), Some("watts"));
}

#[test]
fn developer_fields_without_description_are_opaque() {
    let doc = document(&[
        developer_definition(0, 20, &[(3, 1, UINT8)], &[(5, 2, 3)]),
        data(0, &[120, 0xAB, 0xCD]),
    ]);

    let decoded = decode_slice(&doc, &profile());

    let row = &decoded.tables.by_name("record").unwrap().rows()[0];
    let opaque = row.field_number(5).unwrap();
    assert_eq!(opaque.name, None);
    assert_eq!(opaque.value, Value::Bytes(vec![0xAB, 0xCD]));

    assert_eq!(
        decoded.diagnostics,
        [Diagnostic::UndefinedDeveloperField { index: 3, field: 5 }]
    );
}

#[test]
fn empty_profile_decodes_opaquely() {
    let doc = document(&[
        definition(0, 20, &[(3, 1, UINT8)]),
        data(0, &[120]),
    ]);

    let decoded = decode_slice(&doc, &Profile::default());

    let table = decoded.tables.get(20).unwrap();
    assert_eq!(table.name(), None);
    assert_eq!(
        table.rows()[0].field_number(3).unwrap().value,
        Value::Unsigned(120)
    );
}

const ENUM: u8 = 0x00;
const SINT8: u8 = 0x01;
const UINT8: u8 = 0x02;
const UINT16: u8 = 0x84;
const UINT32: u8 = 0x86;
const STRING: u8 = 0x07;

static MESSAGES: &[MessageSpec] = &[
    MessageSpec::new(
        0,
        "file_id",
        &[
            FieldSpec::new(0, "type").with_values(&[(4, "activity")]),
            FieldSpec::new(1, "manufacturer"),
            FieldSpec::new(2, "product"),
            FieldSpec::new(3, "serial_number"),
            FieldSpec::new(4, "time_created").with_units("s"),
        ],
    ),
    MessageSpec::new(
        20,
        "record",
        &[
            FieldSpec::new(253, "timestamp").with_units("s"),
            FieldSpec::new(2, "altitude").with_scale(5.0, 500.0).with_units("m"),
            FieldSpec::new(3, "heart_rate").with_units("bpm"),
            FieldSpec::new(6, "speed").with_scale(1000.0, 0.0).with_units("m/s"),
            FieldSpec::new(13, "temperature").with_units("C"),
        ],
    ),
    MessageSpec::new(
        21,
        "event",
        &[
            FieldSpec::new(0, "event").with_values(&[(0, "timer"), (42, "front_gear_change")]),
            FieldSpec::new(1, "event_type").with_values(&[(0, "start"), (4, "stop_all")]),
            FieldSpec::new(3, "data").with_subfields(&[
                Subfield::new("timer_trigger", &[Reference::new(0, 0)])
                    .with_values(&[(0, "manual")]),
                Subfield::new("gear_change_data", &[Reference::new(0, 42)]),
            ]),
        ],
    ),
    MessageSpec::new(31, "course", &[FieldSpec::new(5, "name")]),
    MessageSpec::new(
        206,
        "field_description",
        &[
            FieldSpec::new(0, "developer_data_index"),
            FieldSpec::new(1, "field_definition_number"),
            FieldSpec::new(2, "fit_base_type_id"),
            FieldSpec::new(3, "field_name"),
            FieldSpec::new(8, "units"),
        ],
    ),
    MessageSpec::new(
        0xFF00,
        "vendor_counter",
        &[FieldSpec::new(0, "cycles").accumulated().with_units("cycles")],
    ),
];

fn profile() -> Profile {
    Profile::new(MESSAGES)
}

/// Assemble a document: header, records, and a correct trailing CRC.
fn document(records: &[Vec<u8>]) -> Vec<u8> {
    let size: usize = records.iter().map(Vec::len).sum();

    let mut doc = vec![14, 0x20];
    doc.extend_from_slice(&2132u16.to_le_bytes());
    doc.extend_from_slice(&(size as u32).to_le_bytes());
    doc.extend_from_slice(b".FIT");
    let crc = compute_crc(0, &doc);
    doc.extend_from_slice(&crc.to_le_bytes());

    for record in records {
        doc.extend_from_slice(record);
    }

    let crc = compute_crc(0, &doc);
    doc.extend_from_slice(&crc.to_le_bytes());

    doc
}

fn definition(local: u8, global: u16, fields: &[(u8, u8, u8)]) -> Vec<u8> {
    let mut r = vec![0x40 | local, 0, 0];
    r.extend_from_slice(&global.to_le_bytes());
    r.push(fields.len() as u8);

    for &(number, size, base) in fields {
        r.extend_from_slice(&[number, size, base]);
    }

    r
}

fn definition_be(local: u8, global: u16, fields: &[(u8, u8, u8)]) -> Vec<u8> {
    let mut r = vec![0x40 | local, 0, 1];
    r.extend_from_slice(&global.to_be_bytes());
    r.push(fields.len() as u8);

    for &(number, size, base) in fields {
        r.extend_from_slice(&[number, size, base]);
    }

    r
}

fn developer_definition(
    local: u8,
    global: u16,
    fields: &[(u8, u8, u8)],
    developer: &[(u8, u8, u8)],
) -> Vec<u8> {
    let mut r = vec![0x60 | local, 0, 0];
    r.extend_from_slice(&global.to_le_bytes());
    r.push(fields.len() as u8);

    for &(number, size, base) in fields {
        r.extend_from_slice(&[number, size, base]);
    }

    r.push(developer.len() as u8);
    for &(number, size, index) in developer {
        r.extend_from_slice(&[number, size, index]);
    }

    r
}

fn data(local: u8, payload: &[u8]) -> Vec<u8> {
    let mut r = vec![local];
    r.extend_from_slice(payload);
    r
}

fn compressed(local: u8, offset: u8, payload: &[u8]) -> Vec<u8> {
    let mut r = vec![0x80 | local << 5 | offset];
    r.extend_from_slice(payload);
    r
}
