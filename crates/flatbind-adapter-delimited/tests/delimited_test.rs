//! Delimited streams end to end: tokenizing, binding and writing back

use anyhow::Result;
use flatbind_adapter_delimited::{DelimitedConfig, DelimitedSink, DelimitedSource};
use flatbind_engine::{BeanReader, BeanWriter, ErrorKind};
use flatbind_ir::{Bean, Property, Value};
use flatbind_schema::{FieldDefinition, RecordDefinition, SegmentDefinition, StreamDefinition, StreamFormat};
use flatbind_types::TypeHandlerRegistry;
use std::sync::Arc;

fn contacts(encoding: &str) -> Arc<StreamDefinition> {
    StreamDefinition::builder("contacts", StreamFormat::Delimited)
        .encoding(encoding)
        .record(
            RecordDefinition::new("contact")
                .bean_type("Contact")
                .field(FieldDefinition::new("type").key("C").unbound())
                .field(FieldDefinition::new("name").required())
                .field(FieldDefinition::new("born").type_name("date"))
                .segment(
                    SegmentDefinition::new("phones")
                        .unbounded(0)
                        .field(FieldDefinition::new("kind"))
                        .field(FieldDefinition::new("number")),
                ),
        )
        .build(&TypeHandlerRegistry::with_defaults())
        .unwrap()
}

fn read_all(stream: Arc<StreamDefinition>, input: &[u8]) -> Result<Vec<Bean>> {
    let source = DelimitedSource::new(input, &stream, &DelimitedConfig::new())?;
    let mut reader = BeanReader::new(stream, source);
    let mut beans = Vec::new();
    while let Some(bean) = reader.read()? {
        beans.push(bean);
    }
    Ok(beans)
}

fn write_all(stream: Arc<StreamDefinition>, beans: &[Bean]) -> Result<Vec<u8>> {
    let sink = DelimitedSink::new(Vec::new(), &stream, &DelimitedConfig::new())?;
    let mut writer = BeanWriter::new(stream, sink);
    for bean in beans {
        writer.write_bean(bean)?;
    }
    writer.close()?;
    Ok(writer.into_sink().into_inner().unwrap_or_default())
}

#[test]
fn test_read_repeating_segments() -> Result<()> {
    let input = "C,Ann,1990-05-01,home,555-1234,work,555-9876\nC,Bob,,\n";
    let beans = read_all(contacts("UTF-8"), input.as_bytes())?;

    assert_eq!(beans.len(), 2);
    let phones = beans[0].property("phones").and_then(Property::as_list).unwrap();
    assert_eq!(phones.len(), 2);
    assert_eq!(
        phones[1].as_bean().and_then(|b| b.value("number")),
        Some(&Value::from("555-9876"))
    );
    assert!(matches!(beans[0].value("born"), Some(Value::Date(_))));
    assert!(beans[1].property("phones").is_none());
    assert!(beans[1].property("born").is_none());
    Ok(())
}

#[test]
fn test_write_back_is_identical() -> Result<()> {
    let input = "C,Ann,1990-05-01,home,555-1234\nC,\"Smith, Jo\",2001-12-31\n";
    let beans = read_all(contacts("UTF-8"), input.as_bytes())?;
    let output = write_all(contacts("UTF-8"), &beans)?;
    assert_eq!(String::from_utf8(output)?, input);
    Ok(())
}

#[test]
fn test_single_byte_encoding() -> Result<()> {
    let stream = contacts("windows-1252");
    let input = b"C,Ren\xe9e,\n";
    let beans = read_all(Arc::clone(&stream), input)?;
    assert_eq!(beans[0].value("name"), Some(&Value::from("Renée")));

    let output = write_all(stream, &beans)?;
    assert_eq!(output, b"C,Ren\xe9e,\n");
    Ok(())
}

#[test]
fn test_invalid_date_is_reported_with_line() {
    let input = "C,Ann,1990-05-01\nC,Bob,not-a-date\n";
    let err = read_all(contacts("UTF-8"), input.as_bytes()).unwrap_err();
    let err = err.downcast::<flatbind_engine::BeanError>().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidRecord);
    assert_eq!(err.line(), Some(2));
    assert_eq!(err.field_errors()[0].field, "born");
    assert_eq!(err.text(), Some("C,Bob,not-a-date"));
}

#[test]
fn test_malformed_encoding_is_fatal() {
    let err = read_all(contacts("UTF-8"), b"C,\xff\xfe\n").unwrap_err();
    let err = err.downcast::<flatbind_engine::BeanError>().unwrap();
    assert_eq!(err.kind(), ErrorKind::Fatal);
}

#[test]
fn test_decimal_amounts_write_back_unchanged() -> Result<()> {
    let amounts = || {
        StreamDefinition::builder("amounts", StreamFormat::Delimited)
            .record(
                RecordDefinition::new("amount")
                    .bean_type("Amount")
                    .field(FieldDefinition::new("type").key("R").unbound())
                    .field(FieldDefinition::new("amount").type_name("decimal")),
            )
            .build(&TypeHandlerRegistry::with_defaults())
            .unwrap()
    };
    let input = "R,125.50\nR,12345678901234567.89\nR,-0.001\n";
    let beans = read_all(amounts(), input.as_bytes())?;
    assert_eq!(
        beans[1].value("amount").map(ToString::to_string).as_deref(),
        Some("12345678901234567.89")
    );
    assert!(matches!(beans[0].value("amount"), Some(Value::Decimal(_))));

    let output = write_all(amounts(), &beans)?;
    assert_eq!(String::from_utf8(output)?, input);
    Ok(())
}
