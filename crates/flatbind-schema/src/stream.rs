//! Stream definitions and the builder that validates them

use crate::field::LengthUnit;
use crate::group::{Component, GroupDefinition};
use crate::record::RecordDefinition;
use crate::{Error, Result};
use encoding_rs::Encoding;
use flatbind_types::TypeHandlerRegistry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Physical layout of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    Delimited,
    FixedLength,
    Xml,
}

impl StreamFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::FixedLength => "fixedlength",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stream-wide settings fields are compiled against
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub format: StreamFormat,
    pub unit: LengthUnit,
    pub encoding: &'static Encoding,
}

/// Immutable definition of one kind of stream
///
/// Built once by [`StreamBuilder::build`] and shared read-only by every
/// reader and writer of the stream.
#[derive(Debug, Clone)]
pub struct StreamDefinition {
    name: String,
    format: StreamFormat,
    encoding: &'static Encoding,
    length_unit: LengthUnit,
    ignore_unidentified: bool,
    xml_root: Option<String>,
    root: GroupDefinition,
    record_paths: HashMap<String, Vec<usize>>,
    record_order: Vec<String>,
}

impl StreamDefinition {
    /// Start describing a stream
    pub fn builder(name: impl Into<String>, format: StreamFormat) -> StreamBuilder {
        StreamBuilder::new(name, format)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Count mode of fixed-length widths
    pub fn length_unit(&self) -> LengthUnit {
        self.length_unit
    }

    pub fn ignore_unidentified(&self) -> bool {
        self.ignore_unidentified
    }

    /// Name of the document element; defaults to the stream name
    pub fn xml_root(&self) -> &str {
        self.xml_root.as_deref().unwrap_or(&self.name)
    }

    /// The implicit top-level group
    pub fn root(&self) -> &GroupDefinition {
        &self.root
    }

    /// Component at a child index path; the empty path is not a component
    pub fn component_at(&self, path: &[usize]) -> Option<&Component> {
        let (last, parents) = path.split_last()?;
        self.group_at(parents)?.child(*last)
    }

    /// Group at a child index path; the empty path is the root
    pub fn group_at(&self, path: &[usize]) -> Option<&GroupDefinition> {
        let mut group = &self.root;
        for index in path {
            group = group.child(*index)?.as_group()?;
        }
        Some(group)
    }

    pub fn record_at(&self, path: &[usize]) -> Option<&RecordDefinition> {
        self.component_at(path)?.as_record()
    }

    /// Record by name with its child index path
    pub fn find_record(&self, name: &str) -> Option<(&[usize], &RecordDefinition)> {
        let path = self.record_paths.get(name)?;
        Some((path.as_slice(), self.record_at(path)?))
    }

    /// Every record in declaration order
    pub fn records(&self) -> impl Iterator<Item = (&[usize], &RecordDefinition)> {
        self.record_order.iter().filter_map(|name| self.find_record(name))
    }

    /// Records bound to `bean_type`, in declaration order
    pub fn records_for_type<'a>(
        &'a self,
        bean_type: &'a str,
    ) -> impl Iterator<Item = (&'a [usize], &'a RecordDefinition)> + 'a {
        self.records()
            .filter(move |(_, record)| record.bean_type.as_deref() == Some(bean_type))
    }
}

/// Builder for [`StreamDefinition`]
#[derive(Debug, Clone)]
pub struct StreamBuilder {
    name: String,
    format: StreamFormat,
    encoding: String,
    length_unit: LengthUnit,
    ignore_unidentified: bool,
    xml_root: Option<String>,
    root: GroupDefinition,
}

impl StreamBuilder {
    pub fn new(name: impl Into<String>, format: StreamFormat) -> Self {
        let name = name.into();
        Self {
            root: GroupDefinition::new(name.clone()).occurs(1, 1),
            name,
            format,
            encoding: "UTF-8".to_string(),
            length_unit: LengthUnit::Characters,
            ignore_unidentified: false,
            xml_root: None,
        }
    }

    /// Character encoding by WHATWG label, e.g. `Shift_JIS`
    pub fn encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    pub fn length_unit(mut self, unit: LengthUnit) -> Self {
        self.length_unit = unit;
        self
    }

    /// Accept top-level children in any order
    pub fn unordered(mut self) -> Self {
        self.root.ordered = false;
        self
    }

    /// Skip input no record recognises instead of failing
    pub fn ignore_unidentified(mut self) -> Self {
        self.ignore_unidentified = true;
        self
    }

    pub fn xml_root(mut self, name: impl Into<String>) -> Self {
        self.xml_root = Some(name.into());
        self
    }

    pub fn record(mut self, record: RecordDefinition) -> Self {
        self.root.children.push(Component::Record(record));
        self
    }

    pub fn group(mut self, group: GroupDefinition) -> Self {
        self.root.children.push(Component::Group(group));
        self
    }

    /// Validate the definition tree and resolve every field's handler
    pub fn build(self, registry: &TypeHandlerRegistry) -> Result<Arc<StreamDefinition>> {
        let encoding = Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| Error::UnknownEncoding(self.encoding.clone()))?;
        let layout = Layout {
            format: self.format,
            unit: self.length_unit,
            encoding,
        };

        let mut root = self.root;
        if root.children.is_empty() {
            return Err(Error::invalid(&self.name, "stream has no records"));
        }
        root.compile(&layout, registry)?;

        let mut record_paths = HashMap::new();
        let mut record_order = Vec::new();
        let mut names = Vec::new();
        index_group(&root, &mut Vec::new(), &mut names, &mut record_paths, &mut record_order)?;

        debug!(
            stream = %self.name,
            format = %self.format,
            encoding = encoding.name(),
            records = record_order.len(),
            "Built stream definition"
        );

        Ok(Arc::new(StreamDefinition {
            name: self.name,
            format: self.format,
            encoding,
            length_unit: self.length_unit,
            ignore_unidentified: self.ignore_unidentified,
            xml_root: self.xml_root,
            root,
            record_paths,
            record_order,
        }))
    }
}

fn index_group(
    group: &GroupDefinition,
    path: &mut Vec<usize>,
    names: &mut Vec<String>,
    record_paths: &mut HashMap<String, Vec<usize>>,
    record_order: &mut Vec<String>,
) -> Result<()> {
    for (index, child) in group.children.iter().enumerate() {
        if names.iter().any(|n| n == child.name()) {
            return Err(Error::invalid(child.name(), "duplicate record or group name"));
        }
        names.push(child.name().to_string());
        path.push(index);
        match child {
            Component::Record(record) => {
                record_paths.insert(record.name.clone(), path.clone());
                record_order.push(record.name.clone());
            }
            Component::Group(nested) => {
                if nested.children.is_empty() {
                    return Err(Error::invalid(&nested.name, "group has no children"));
                }
                index_group(nested, path, names, record_paths, record_order)?;
            }
        }
        path.pop();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldDefinition;

    fn registry() -> TypeHandlerRegistry {
        TypeHandlerRegistry::with_defaults()
    }

    fn sample() -> StreamBuilder {
        StreamDefinition::builder("orders", StreamFormat::Delimited)
            .record(RecordDefinition::new("header").occurs(1, 1).field(FieldDefinition::new("type").key("H")))
            .group(
                GroupDefinition::new("batch")
                    .record(RecordDefinition::new("detail").field(FieldDefinition::new("type").key("D")))
                    .record(RecordDefinition::new("trailer").field(FieldDefinition::new("type").key("T"))),
            )
    }

    #[test]
    fn test_build_indexes_records() {
        let stream = sample().build(&registry()).unwrap();
        let names: Vec<_> = stream.records().map(|(_, r)| r.name.as_str()).collect();
        assert_eq!(names, ["header", "detail", "trailer"]);

        let (path, record) = stream.find_record("trailer").unwrap();
        assert_eq!(path, [1, 1]);
        assert_eq!(record.name, "trailer");
        assert_eq!(stream.group_at(&[1]).unwrap().name, "batch");
        assert_eq!(stream.group_at(&[]).unwrap().name, "orders");
        assert!(stream.record_at(&[1]).is_none());
        assert!(stream.find_record("missing").is_none());
    }

    #[test]
    fn test_default_settings() {
        let stream = sample().build(&registry()).unwrap();
        assert_eq!(stream.encoding(), encoding_rs::UTF_8);
        assert_eq!(stream.xml_root(), "orders");
        assert!(stream.root().ordered);
        assert!(!stream.ignore_unidentified());
    }

    #[test]
    fn test_unknown_encoding() {
        let err = sample().encoding("klingon").build(&registry()).unwrap_err();
        assert_eq!(err, Error::UnknownEncoding("klingon".to_string()));
    }

    #[test]
    fn test_encoding_labels() {
        let stream = sample().encoding("shift_jis").build(&registry()).unwrap();
        assert_eq!(stream.encoding(), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = sample()
            .record(RecordDefinition::new("detail").field(FieldDefinition::new("x")))
            .build(&registry())
            .unwrap_err();
        assert!(err.to_string().contains("duplicate record or group name"));
    }

    #[test]
    fn test_empty_stream_rejected() {
        let err = StreamDefinition::builder("empty", StreamFormat::Xml).build(&registry()).unwrap_err();
        assert!(err.to_string().contains("stream has no records"));
    }

    #[test]
    fn test_bad_group_bounds_rejected() {
        let err = StreamDefinition::builder("s", StreamFormat::Delimited)
            .group(
                GroupDefinition::new("g")
                    .occurs(2, 1)
                    .record(RecordDefinition::new("r").field(FieldDefinition::new("a"))),
            )
            .build(&registry())
            .unwrap_err();
        assert!(err.to_string().contains("minimum occurrences 2 exceed maximum 1"));
    }

    #[test]
    fn test_records_for_type() {
        let stream = StreamDefinition::builder("s", StreamFormat::Delimited)
            .record(RecordDefinition::new("a").bean_type("Person").field(FieldDefinition::new("x").key("A")))
            .record(RecordDefinition::new("b").field(FieldDefinition::new("x").key("B")))
            .record(RecordDefinition::new("c").bean_type("Person").field(FieldDefinition::new("x").key("C")))
            .build(&registry())
            .unwrap();
        let names: Vec<_> = stream.records_for_type("Person").map(|(_, r)| r.name.as_str()).collect();
        assert_eq!(names, ["a", "c"]);
    }
}
