//! Fixed-length streams in character and byte mode

use anyhow::Result;
use encoding_rs::SHIFT_JIS;
use flatbind_adapter_fixed::{FixedLengthConfig, FixedLengthSink, FixedLengthSource};
use flatbind_engine::{BeanError, BeanReader, BeanWriter, ErrorKind};
use flatbind_ir::{Bean, Value};
use flatbind_schema::{FieldDefinition, Justify, LengthUnit, RecordDefinition, StreamDefinition, StreamFormat};
use flatbind_types::TypeHandlerRegistry;
use std::sync::Arc;

fn greetings() -> Arc<StreamDefinition> {
    StreamDefinition::builder("greetings", StreamFormat::FixedLength)
        .encoding("Shift_JIS")
        .length_unit(LengthUnit::Bytes)
        .record(
            RecordDefinition::new("greeting")
                .field(FieldDefinition::new("exact").length(10))
                .field(FieldDefinition::new("bounded").max_length(4)),
        )
        .build(&TypeHandlerRegistry::with_defaults())
        .unwrap()
}

fn ledger() -> Arc<StreamDefinition> {
    StreamDefinition::builder("ledger", StreamFormat::FixedLength)
        .record(
            RecordDefinition::new("header")
                .bean_type("Header")
                .occurs(1, 1)
                .field(FieldDefinition::new("type").length(1).key("H").unbound())
                .field(FieldDefinition::new("date").length(8).type_name("date").format("%Y%m%d")),
        )
        .record(
            RecordDefinition::new("entry")
                .bean_type("Entry")
                .unbounded(0)
                .min_length(16)
                .field(FieldDefinition::new("type").length(1).key("E").unbound())
                .field(FieldDefinition::new("account").length(6))
                .field(
                    FieldDefinition::new("amount")
                        .length(9)
                        .justify(Justify::Right)
                        .type_name("double")
                        .format("0.00"),
                ),
        )
        .build(&TypeHandlerRegistry::with_defaults())
        .unwrap()
}

fn read_line(stream: Arc<StreamDefinition>, line: &[u8]) -> Result<Option<Bean>, BeanError> {
    let source = FixedLengthSource::new(line, &stream, &FixedLengthConfig::new());
    BeanReader::new(stream, source).read()
}

#[test]
fn test_short_line_in_byte_mode() {
    let (line, _, _) = SHIFT_JIS.encode("ハロー");
    assert_eq!(line.len(), 6);
    let err = read_line(greetings(), &line).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    let faults = err.field_errors();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].field, "exact");
    assert_eq!(faults[0].message, "Invalid field length, expected 10 bytes");
}

#[test]
fn test_bounded_field_in_byte_mode() {
    let (line, _, _) = SHIFT_JIS.encode("ハロー1234ハロー");
    let err = read_line(greetings(), &line).unwrap_err();
    let faults = err.field_errors();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].field, "bounded");
    assert_eq!(faults[0].message, "Maximum field length is 4 bytes");
}

#[test]
fn test_correctly_sized_line() -> Result<()> {
    let (line, _, _) = SHIFT_JIS.encode("ハロー1234ハロ");
    let bean = read_line(greetings(), &line)?.unwrap();
    assert_eq!(bean.value("exact"), Some(&Value::from("ハロー1234")));
    assert_eq!(bean.value("bounded"), Some(&Value::from("ハロ")));
    Ok(())
}

#[test]
fn test_same_line_in_character_mode() -> Result<()> {
    let stream = StreamDefinition::builder("greetings", StreamFormat::FixedLength)
        .encoding("Shift_JIS")
        .record(RecordDefinition::new("greeting").field(FieldDefinition::new("exact").length(3)))
        .build(&TypeHandlerRegistry::with_defaults())?;
    let (line, _, _) = SHIFT_JIS.encode("ハロー");
    let bean = read_line(stream, &line)?.unwrap();
    assert_eq!(bean.value("exact"), Some(&Value::from("ハロー")));
    Ok(())
}

#[test]
fn test_ledger_round_trip() -> Result<()> {
    let input = "H20240131\nE100200   125.50\nE100300    -3.00\n";
    let source = FixedLengthSource::new(input.as_bytes(), &ledger(), &FixedLengthConfig::new());
    let mut reader = BeanReader::new(ledger(), source);
    let mut beans = Vec::new();
    while let Some(bean) = reader.read()? {
        beans.push(bean);
    }
    assert_eq!(beans.len(), 3);
    assert_eq!(beans[1].value("account"), Some(&Value::from("100200")));
    assert_eq!(beans[2].value("amount"), Some(&Value::Float(-3.0)));

    let sink = FixedLengthSink::new(Vec::new(), &ledger(), &FixedLengthConfig::new())?;
    let mut writer = BeanWriter::new(ledger(), sink);
    for bean in &beans {
        writer.write_bean(bean)?;
    }
    writer.close()?;
    let output = writer.into_sink().into_inner().unwrap_or_default();
    assert_eq!(String::from_utf8(output)?, input);
    Ok(())
}

#[test]
fn test_record_too_short() {
    let input = "H20240131\nE1002\n";
    let source = FixedLengthSource::new(input.as_bytes(), &ledger(), &FixedLengthConfig::new());
    let mut reader = BeanReader::new(ledger(), source);
    assert!(reader.read().unwrap().is_some());
    let err = reader.read().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedRecord);
    assert_eq!(err.line(), Some(2));
    assert!(err.to_string().ends_with("Record too short; expected at least 16 characters"));
}
