//! Field and record binding

use crate::error::FieldError;
use crate::measure::{fit, measure};
use crate::view::{Extract, FieldLocation, RecordView, Scope};
use flatbind_ir::{Bean, Property, PropertyAccess, Value};
use flatbind_schema::{FieldDefinition, Member, RecordDefinition, SegmentDefinition, StreamDefinition, StreamFormat};
use flatbind_types::HandlerContext;

/// One formatted field occurrence, ready for a sink
#[derive(Debug, Clone)]
pub struct RenderedField<'a> {
    pub field: &'a FieldDefinition,
    pub offset: usize,
    pub occurrence: usize,
    pub scope: Vec<Scope<'a>>,
    pub text: String,
    /// No value was bound; hierarchical sinks omit the node
    pub absent: bool,
}

/// A record formatted field by field, in declaration order
#[derive(Debug, Clone)]
pub struct RenderedRecord<'a> {
    pub record: &'a RecordDefinition,
    pub fields: Vec<RenderedField<'a>>,
}

/// Binds records of one stream to beans and back
#[derive(Debug, Clone, Copy)]
pub struct RecordBinder<'s> {
    stream: &'s StreamDefinition,
}

impl<'s> RecordBinder<'s> {
    pub fn new(stream: &'s StreamDefinition) -> Self {
        Self { stream }
    }

    /// Whether every identifying field of `record` matches the input
    pub fn identifies<V: RecordView>(&self, record: &RecordDefinition, view: &V) -> bool {
        if let Some(name) = view.element_name() {
            if name != record.node_name() {
                return false;
            }
        }
        record.identifiers().into_iter().all(|(segments, field)| {
            let scope: Vec<Scope<'_>> = segments
                .into_iter()
                .map(|segment| Scope { segment, occurrence: 0 })
                .collect();
            let location = FieldLocation {
                field,
                offset: field.offset(),
                occurrence: 0,
                scope: &scope,
            };
            match view.extract(&location) {
                Extract::Text(raw) => field.key_matches(field.unpad(&raw)),
                Extract::Absent | Extract::Fault { .. } => false,
            }
        })
    }

    /// Record length violation, checked before any field is bound
    pub fn check_length<V: RecordView>(&self, record: &RecordDefinition, view: &V) -> Option<String> {
        let length = view.record_length()?;
        let unit = self.stream.length_unit();
        match self.stream.format() {
            StreamFormat::Delimited => {
                if let Some(min) = record.min_length.filter(|min| length < *min) {
                    return Some(format!("Too few fields; expected at least {min}"));
                }
                if let Some(max) = record.max_length.filter(|max| length > *max) {
                    return Some(format!("Too many fields; expected at most {max}"));
                }
            }
            StreamFormat::FixedLength => {
                if let Some(min) = record.min_length.filter(|min| length < *min) {
                    return Some(format!("Record too short; expected at least {min} {unit}"));
                }
                if let Some(max) = record.max_length.filter(|max| length > *max) {
                    return Some(format!("Record too long; expected at most {max} {unit}"));
                }
            }
            StreamFormat::Xml => {}
        }
        None
    }

    /// Bind every field of the record, collecting all field faults
    pub fn read<'r, V: RecordView>(
        &self,
        record: &'r RecordDefinition,
        view: &V,
        cx: &mut HandlerContext,
    ) -> Result<Bean, Vec<FieldError>> {
        let mut bean = match &record.bean_type {
            Some(type_name) => Bean::of_type(type_name.as_str()),
            None => Bean::new(),
        };
        let mut pass = ReadPass {
            stream: self.stream,
            view,
            cx,
            faults: Vec::new(),
            scope: Vec::new(),
        };
        pass.members(&record.members, 0, &mut bean);
        if pass.faults.is_empty() {
            Ok(bean)
        } else {
            Err(pass.faults)
        }
    }

    /// Format every field of the record from `source`
    pub fn write<'r>(
        &self,
        record: &'r RecordDefinition,
        source: &dyn PropertyAccess,
        cx: &mut HandlerContext,
    ) -> Result<RenderedRecord<'r>, Vec<FieldError>> {
        let mut pass = WritePass {
            stream: self.stream,
            cx,
            faults: Vec::new(),
            scope: Vec::new(),
            fields: Vec::new(),
        };
        pass.members(&record.members, 0, source);
        if pass.faults.is_empty() {
            Ok(RenderedRecord {
                record,
                fields: pass.fields,
            })
        } else {
            Err(pass.faults)
        }
    }
}

struct ReadPass<'p, 'r, V> {
    stream: &'p StreamDefinition,
    view: &'p V,
    cx: &'p mut HandlerContext,
    faults: Vec<FieldError>,
    scope: Vec<Scope<'r>>,
}

impl<'r, V: RecordView> ReadPass<'_, 'r, V> {
    fn members(&mut self, members: &'r [Member], base: usize, target: &mut Bean) {
        for member in members {
            match member {
                Member::Field(field) => self.field(field, base, target),
                Member::Segment(segment) => self.segment(segment, base, target),
            }
        }
    }

    fn field(&mut self, field: &'r FieldDefinition, base: usize, target: &mut Bean) {
        let max = field.max_occurs.unwrap_or(usize::MAX);
        let mut values = Vec::new();
        let mut failed = false;
        let mut occurrence = 0;

        while occurrence < max {
            let location = FieldLocation {
                field,
                offset: base + field.offset() + occurrence * field.stride(),
                occurrence,
                scope: &self.scope,
            };
            let converted = match self.view.extract(&location) {
                Extract::Absent if field.is_repeating() => break,
                Extract::Absent => self.convert(field, None).map_err(|m| (None, m)),
                Extract::Fault { text, message } => Err((Some(text), message)),
                Extract::Text(raw) => {
                    if field.is_repeating() && occurrence >= field.min_occurs && field.unpad(&raw).is_empty() {
                        break;
                    }
                    self.convert(field, Some(&raw)).map_err(|m| (Some(raw), m))
                }
            };
            match converted {
                Ok(value) => values.push(value),
                Err((text, message)) => {
                    self.faults.push(FieldError::new(&field.name, text, message));
                    failed = true;
                }
            }
            occurrence += 1;
        }

        if field.is_repeating() && occurrence < field.min_occurs && !failed {
            self.faults.push(FieldError::new(
                &field.name,
                None,
                format!("Expected minimum {} occurrences", field.min_occurs),
            ));
        }
        if failed {
            return;
        }
        let Some(path) = &field.property else {
            return;
        };
        let property = if field.is_repeating() {
            if values.is_empty() {
                return;
            }
            Property::List(values.into_iter().map(Property::Value).collect())
        } else {
            match values.pop() {
                Some(value) if !value.is_null() => Property::Value(value),
                _ => return,
            }
        };
        if let Err(e) = target.set(path, property) {
            self.faults.push(FieldError::new(&field.name, None, e.to_string()));
        }
    }

    /// Validate and convert one occurrence; the error is the fault message
    fn convert(&mut self, field: &FieldDefinition, raw: Option<&str>) -> Result<Value, String> {
        let mut text = raw.map_or("", |raw| field.unpad(raw));
        if text.is_empty() {
            match &field.default {
                Some(default) => text = default,
                None if field.required => return Err("Required field not set".to_string()),
                None => return Ok(Value::Null),
            }
        }
        if let Some(literal) = &field.literal {
            if text != literal {
                return Err(format!("Expected literal value '{literal}'"));
            }
        }
        let unit = field.length_unit();
        if field.min_length.is_some() || field.max_length.is_some() {
            let size = measure(text, unit, self.stream.encoding());
            if let Some(min) = field.min_length.filter(|min| size < *min) {
                return Err(format!("Minimum field length is {min} {unit}"));
            }
            if let Some(max) = field.max_length.filter(|max| size > *max) {
                return Err(format!("Maximum field length is {max} {unit}"));
            }
        }
        if !field.matches_regex(text) {
            return Err(format!(
                "Value does not match pattern '{}'",
                field.regex.as_deref().unwrap_or_default()
            ));
        }
        field
            .type_handler()
            .parse(text, self.cx)
            .map_err(|e| e.message().to_string())
    }

    fn segment(&mut self, segment: &'r SegmentDefinition, base: usize, target: &mut Bean) {
        let max = segment.max_occurs.unwrap_or(usize::MAX);
        let span = segment.span().unwrap_or(0);
        let mut items = Vec::new();
        let mut occurrence = 0;

        while occurrence < max {
            let member_base = base + occurrence * span;
            self.scope.push(Scope { segment, occurrence });
            let present = self.view.has_segment(&self.scope, member_base + segment.offset());
            let optional = segment.is_repeating() || segment.min_occurs == 0;
            let done = if !present {
                optional
            } else {
                segment.is_repeating()
                    && occurrence >= segment.min_occurs
                    && self.is_blank(&segment.members, member_base)
            };
            if done {
                self.scope.pop();
                break;
            }
            match &segment.property {
                Some(_) => {
                    let mut child = Bean::new();
                    self.members(&segment.members, member_base, &mut child);
                    items.push(child);
                }
                None => self.members(&segment.members, member_base, target),
            }
            self.scope.pop();
            occurrence += 1;
        }

        if segment.is_repeating() && occurrence < segment.min_occurs {
            self.faults.push(FieldError::new(
                &segment.name,
                None,
                format!("Expected minimum {} occurrences", segment.min_occurs),
            ));
        }
        let Some(path) = &segment.property else {
            return;
        };
        let property = if segment.is_repeating() {
            if items.is_empty() {
                return;
            }
            Property::List(items.into_iter().map(Property::Bean).collect())
        } else {
            match items.pop() {
                Some(child) if !child.is_empty() || segment.min_occurs > 0 => Property::Bean(child),
                _ => return,
            }
        };
        if let Err(e) = target.set(path, property) {
            self.faults.push(FieldError::new(&segment.name, None, e.to_string()));
        }
    }

    /// Whether every field of one segment occurrence is absent or empty
    fn is_blank(&mut self, members: &'r [Member], base: usize) -> bool {
        members.iter().all(|member| match member {
            Member::Field(field) => {
                let location = FieldLocation {
                    field,
                    offset: base + field.offset(),
                    occurrence: 0,
                    scope: &self.scope,
                };
                match self.view.extract(&location) {
                    Extract::Absent => true,
                    Extract::Text(raw) => field.unpad(&raw).is_empty(),
                    Extract::Fault { .. } => false,
                }
            }
            Member::Segment(nested) => {
                self.scope.push(Scope {
                    segment: nested,
                    occurrence: 0,
                });
                let blank = self.is_blank(&nested.members, base);
                self.scope.pop();
                blank
            }
        })
    }
}

struct WritePass<'p, 'r> {
    stream: &'p StreamDefinition,
    cx: &'p mut HandlerContext,
    faults: Vec<FieldError>,
    scope: Vec<Scope<'r>>,
    fields: Vec<RenderedField<'r>>,
}

impl<'r> WritePass<'_, 'r> {
    fn members(&mut self, members: &'r [Member], base: usize, source: &dyn PropertyAccess) {
        for member in members {
            match member {
                Member::Field(field) => self.field(field, base, source),
                Member::Segment(segment) => self.segment(segment, base, source),
            }
        }
    }

    fn field(&mut self, field: &'r FieldDefinition, base: usize, source: &dyn PropertyAccess) {
        let values: Vec<Option<&Value>> = match field.property.as_deref().map(|path| source.get(path)) {
            None | Some(Ok(None)) => Vec::new(),
            Some(Ok(Some(Property::Value(value)))) => vec![Some(value)],
            Some(Ok(Some(Property::List(items)))) => items.iter().map(Property::as_value).collect(),
            Some(Ok(Some(Property::Bean(_)))) => {
                self.faults
                    .push(FieldError::new(&field.name, None, "Expected a value, found a bean"));
                return;
            }
            Some(Err(e)) => {
                self.faults.push(FieldError::new(&field.name, None, e.to_string()));
                return;
            }
        };

        let max = field.max_occurs.unwrap_or(usize::MAX);
        let count = if field.is_repeating() {
            values.len().max(field.min_occurs).min(max)
        } else {
            1
        };
        for occurrence in 0..count {
            let value = values.get(occurrence).copied().flatten().filter(|v| !v.is_null());
            let absent = value.is_none() && field.literal.is_none() && field.default.is_none();
            match self.format(field, value) {
                Ok(text) => self.fields.push(RenderedField {
                    field,
                    offset: base + field.offset() + occurrence * field.stride(),
                    occurrence,
                    scope: self.scope.clone(),
                    text,
                    absent,
                }),
                Err(message) => {
                    let text = value.map(ToString::to_string);
                    self.faults.push(FieldError::new(&field.name, text, message));
                }
            }
        }
    }

    fn format(&mut self, field: &FieldDefinition, value: Option<&Value>) -> Result<String, String> {
        let text = match (&field.literal, value) {
            (Some(literal), _) => literal.clone(),
            (None, Some(value)) => field
                .type_handler()
                .format(value, self.cx)
                .map_err(|e| e.message().to_string())?,
            (None, None) => match &field.default {
                Some(default) => default.clone(),
                None if field.required => return Err("Required field not set".to_string()),
                None => String::new(),
            },
        };
        fit(&text, field, self.stream.encoding())
    }

    fn segment(&mut self, segment: &'r SegmentDefinition, base: usize, source: &dyn PropertyAccess) {
        let empty = Bean::new();
        let items: Vec<&dyn PropertyAccess> = match segment.property.as_deref().map(|path| source.get(path)) {
            None => vec![source],
            Some(Ok(None)) => Vec::new(),
            Some(Ok(Some(Property::Bean(bean)))) => vec![bean as &dyn PropertyAccess],
            Some(Ok(Some(Property::List(items)))) => items
                .iter()
                .map(|item| match item {
                    Property::Bean(bean) => bean as &dyn PropertyAccess,
                    _ => &empty as &dyn PropertyAccess,
                })
                .collect(),
            Some(Ok(Some(Property::Value(value)))) if value.is_null() => Vec::new(),
            Some(Ok(Some(Property::Value(_)))) => {
                self.faults
                    .push(FieldError::new(&segment.name, None, "Expected a bean, found a value"));
                return;
            }
            Some(Err(e)) => {
                self.faults.push(FieldError::new(&segment.name, None, e.to_string()));
                return;
            }
        };

        let max = segment.max_occurs.unwrap_or(usize::MAX);
        let count = if segment.is_repeating() {
            items.len().max(segment.min_occurs).min(max)
        } else {
            1
        };
        let span = segment.span().unwrap_or(0);
        for occurrence in 0..count {
            let item = items.get(occurrence).copied().unwrap_or(&empty);
            self.scope.push(Scope { segment, occurrence });
            self.members(&segment.members, base + occurrence * span, item);
            self.scope.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbind_schema::{FieldDefinition, Justify, RecordDefinition, SegmentDefinition, StreamDefinition};
    use flatbind_types::TypeHandlerRegistry;
    use std::sync::Arc;

    /// Delimited record for tests: token index is the field offset
    struct Tokens {
        text: String,
        tokens: Vec<String>,
    }

    impl Tokens {
        fn new(text: &str) -> Self {
            Self {
                text: text.to_string(),
                tokens: text.split(',').map(String::from).collect(),
            }
        }
    }

    impl RecordView for Tokens {
        fn line_number(&self) -> usize {
            1
        }

        fn text(&self) -> &str {
            &self.text
        }

        fn record_length(&self) -> Option<usize> {
            Some(self.tokens.len())
        }

        fn extract(&self, location: &FieldLocation<'_>) -> Extract {
            match self.tokens.get(location.offset) {
                Some(token) => Extract::Text(token.clone()),
                None => Extract::Absent,
            }
        }
    }

    fn stream(record: RecordDefinition) -> Arc<StreamDefinition> {
        StreamDefinition::builder("test", StreamFormat::Delimited)
            .record(record)
            .build(&TypeHandlerRegistry::with_defaults())
            .unwrap()
    }

    fn person() -> RecordDefinition {
        RecordDefinition::new("person")
            .bean_type("Person")
            .field(FieldDefinition::new("type").key("P").unbound())
            .field(FieldDefinition::new("name").required())
            .field(FieldDefinition::new("age").type_name("int"))
            .segment(
                SegmentDefinition::new("address")
                    .occurs(0, 1)
                    .field(FieldDefinition::new("city"))
                    .field(FieldDefinition::new("zip").type_name("int")),
            )
            .field(FieldDefinition::new("numbers").type_name("int").unbounded(0))
    }

    fn record(stream: &StreamDefinition) -> &RecordDefinition {
        stream.records().next().unwrap().1
    }

    #[test]
    fn test_identifies_by_key() {
        let stream = stream(person());
        let binder = RecordBinder::new(&stream);
        assert!(binder.identifies(record(&stream), &Tokens::new("P,Joe")));
        assert!(!binder.identifies(record(&stream), &Tokens::new("Q,Joe")));
        assert!(!binder.identifies(record(&stream), &Tokens::new("")));
    }

    #[test]
    fn test_read_nested_and_repeating() {
        let stream = stream(person());
        let binder = RecordBinder::new(&stream);
        let mut cx = HandlerContext::new();
        let bean = binder
            .read(record(&stream), &Tokens::new("P,Joe,42,Paris,75001,1,2,3"), &mut cx)
            .unwrap();

        assert_eq!(bean.type_name.as_deref(), Some("Person"));
        assert_eq!(bean.value("name"), Some(&Value::from("Joe")));
        assert_eq!(bean.value("age"), Some(&Value::Integer(42)));
        assert!(bean.property("type").is_none());
        assert_eq!(bean.get("address.city").unwrap().and_then(Property::as_value), Some(&Value::from("Paris")));
        let numbers = bean.property("numbers").and_then(Property::as_list).unwrap();
        assert_eq!(numbers.len(), 3);
        assert_eq!(numbers[2].as_value(), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_absent_values_are_not_stored() {
        let stream = stream(person());
        let binder = RecordBinder::new(&stream);
        let bean = binder
            .read(record(&stream), &Tokens::new("P,Joe,"), &mut HandlerContext::new())
            .unwrap();
        assert!(bean.property("age").is_none());
        assert!(bean.property("address").is_none());
        assert!(bean.property("numbers").is_none());
    }

    #[test]
    fn test_faults_accumulate_in_field_order() {
        let stream = stream(person());
        let binder = RecordBinder::new(&stream);
        let faults = binder
            .read(record(&stream), &Tokens::new("P,,abc,Paris,x1"), &mut HandlerContext::new())
            .unwrap_err();

        let messages: Vec<_> = faults.iter().map(|f| (f.field.as_str(), f.message.as_str())).collect();
        assert_eq!(
            messages,
            [
                ("name", "Required field not set"),
                ("age", "Invalid Integer value 'abc'"),
                ("zip", "Invalid Integer value 'x1'"),
            ]
        );
        assert_eq!(faults[1].text.as_deref(), Some("abc"));
    }

    #[test]
    fn test_default_literal_and_lengths() {
        let stream = stream(
            RecordDefinition::new("r")
                .field(FieldDefinition::new("kind").literal("K"))
                .field(FieldDefinition::new("code").min_length(2).max_length(3))
                .field(FieldDefinition::new("flag").default_value("N"))
                .field(FieldDefinition::new("ref").regex("[A-Z]{2}[0-9]+")),
        );
        let binder = RecordBinder::new(&stream);
        let mut cx = HandlerContext::new();

        let bean = binder.read(record(&stream), &Tokens::new("K,ab,,XY12"), &mut cx).unwrap();
        assert_eq!(bean.value("flag"), Some(&Value::from("N")));

        let faults = binder.read(record(&stream), &Tokens::new("J,a,,xy"), &mut cx).unwrap_err();
        let messages: Vec<_> = faults.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "Expected literal value 'K'",
                "Minimum field length is 2 characters",
                "Value does not match pattern '[A-Z]{2}[0-9]+'",
            ]
        );

        let faults = binder.read(record(&stream), &Tokens::new("K,abcd"), &mut cx).unwrap_err();
        assert_eq!(faults[0].message, "Maximum field length is 3 characters");
    }

    #[test]
    fn test_minimum_field_occurrences() {
        let stream = stream(RecordDefinition::new("r").field(FieldDefinition::new("n").type_name("int").occurs(2, 4)));
        let binder = RecordBinder::new(&stream);
        let faults = binder
            .read(record(&stream), &Tokens::new("1"), &mut HandlerContext::new())
            .unwrap_err();
        assert_eq!(faults[0].message, "Expected minimum 2 occurrences");
    }

    #[test]
    fn test_write_mirrors_read() {
        let stream = stream(person());
        let binder = RecordBinder::new(&stream);
        let mut cx = HandlerContext::new();
        let bean = binder
            .read(record(&stream), &Tokens::new("P,Joe,42,Paris,75001,1,2"), &mut cx)
            .unwrap();

        let rendered = binder.write(record(&stream), &bean, &mut cx).unwrap();
        let texts: Vec<_> = rendered.fields.iter().map(|f| (f.offset, f.text.as_str())).collect();
        assert_eq!(
            texts,
            [(0, "P"), (1, "Joe"), (2, "42"), (3, "Paris"), (4, "75001"), (5, "1"), (6, "2")]
        );
    }

    #[test]
    fn test_write_absent_and_padding() {
        let stream = StreamDefinition::builder("fixed", StreamFormat::FixedLength)
            .record(
                RecordDefinition::new("r")
                    .field(FieldDefinition::new("id").length(5).padding('0').justify(Justify::Right).type_name("int"))
                    .field(FieldDefinition::new("name").length(4)),
            )
            .build(&TypeHandlerRegistry::with_defaults())
            .unwrap();
        let binder = RecordBinder::new(&stream);
        let bean = Bean::new().with("id", 42i64);
        let rendered = binder.write(record(&stream), &bean, &mut HandlerContext::new()).unwrap();

        assert_eq!(rendered.fields[0].text, "00042");
        assert!(!rendered.fields[0].absent);
        assert_eq!(rendered.fields[1].text, "    ");
        assert!(rendered.fields[1].absent);
        assert_eq!(rendered.fields[1].offset, 5);
    }

    #[test]
    fn test_write_overflow_is_a_fault() {
        let stream = StreamDefinition::builder("fixed", StreamFormat::FixedLength)
            .record(RecordDefinition::new("r").field(FieldDefinition::new("name").length(3)))
            .build(&TypeHandlerRegistry::with_defaults())
            .unwrap();
        let binder = RecordBinder::new(&stream);
        let bean = Bean::new().with("name", "abcd");
        let faults = binder.write(record(&stream), &bean, &mut HandlerContext::new()).unwrap_err();
        assert_eq!(faults[0].message, "Value exceeds maximum field length of 3 characters");
        assert_eq!(faults[0].text.as_deref(), Some("abcd"));
    }
}
