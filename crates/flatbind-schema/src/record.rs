//! Record and segment definitions

use crate::field::{FieldDefinition, XmlNode};
use crate::stream::{Layout, StreamFormat};
use crate::{Error, Result};
use flatbind_types::TypeHandlerRegistry;

/// A nested composite of fields and segments
#[derive(Debug, Clone)]
pub struct SegmentDefinition {
    pub name: String,
    /// Property holding the segment's bean; `None` binds members on the parent
    pub property: Option<String>,
    pub min_occurs: usize,
    pub max_occurs: Option<usize>,
    pub xml_name: Option<String>,
    pub members: Vec<Member>,
    offset: usize,
    span: Option<usize>,
}

impl SegmentDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            property: Some(name.clone()),
            name,
            min_occurs: 1,
            max_occurs: Some(1),
            xml_name: None,
            members: Vec::new(),
            offset: 0,
            span: Some(0),
        }
    }

    pub fn property(mut self, path: impl Into<String>) -> Self {
        self.property = Some(path.into());
        self
    }

    /// Bind members directly on the enclosing bean
    pub fn inline(mut self) -> Self {
        self.property = None;
        self
    }

    pub fn occurs(mut self, min: usize, max: usize) -> Self {
        self.min_occurs = min;
        self.max_occurs = Some(max);
        self
    }

    pub fn unbounded(mut self, min: usize) -> Self {
        self.min_occurs = min;
        self.max_occurs = None;
        self
    }

    pub fn xml_name(mut self, name: impl Into<String>) -> Self {
        self.xml_name = Some(name.into());
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.members.push(Member::Field(field));
        self
    }

    pub fn segment(mut self, segment: SegmentDefinition) -> Self {
        self.members.push(Member::Segment(segment));
        self
    }

    /// Position of the first member of the first occurrence
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Width of one occurrence; `None` when it has no fixed extent
    pub fn span(&self) -> Option<usize> {
        self.span
    }

    pub fn node_name(&self) -> &str {
        self.xml_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_repeating(&self) -> bool {
        self.max_occurs != Some(1)
    }
}

/// A child of a record or segment
#[derive(Debug, Clone)]
pub enum Member {
    Field(FieldDefinition),
    Segment(SegmentDefinition),
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Self::Field(f) => &f.name,
            Self::Segment(s) => &s.name,
        }
    }
}

impl From<FieldDefinition> for Member {
    fn from(field: FieldDefinition) -> Self {
        Self::Field(field)
    }
}

impl From<SegmentDefinition> for Member {
    fn from(segment: SegmentDefinition) -> Self {
        Self::Segment(segment)
    }
}

/// One structured unit of input bound to one bean
#[derive(Debug, Clone)]
pub struct RecordDefinition {
    pub name: String,
    /// Bean type produced on read and accepted by `write_bean`
    pub bean_type: Option<String>,
    pub min_occurs: usize,
    pub max_occurs: Option<usize>,
    /// Minimum tokens (delimited) or units (fixed-length)
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub xml_name: Option<String>,
    pub members: Vec<Member>,
}

impl RecordDefinition {
    /// Record that may occur any number of times
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bean_type: None,
            min_occurs: 0,
            max_occurs: None,
            min_length: None,
            max_length: None,
            xml_name: None,
            members: Vec::new(),
        }
    }

    pub fn bean_type(mut self, type_name: impl Into<String>) -> Self {
        self.bean_type = Some(type_name.into());
        self
    }

    pub fn occurs(mut self, min: usize, max: usize) -> Self {
        self.min_occurs = min;
        self.max_occurs = Some(max);
        self
    }

    pub fn unbounded(mut self, min: usize) -> Self {
        self.min_occurs = min;
        self.max_occurs = None;
        self
    }

    pub fn min_length(mut self, length: usize) -> Self {
        self.min_length = Some(length);
        self
    }

    pub fn max_length(mut self, length: usize) -> Self {
        self.max_length = Some(length);
        self
    }

    pub fn xml_name(mut self, name: impl Into<String>) -> Self {
        self.xml_name = Some(name.into());
        self
    }

    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.members.push(Member::Field(field));
        self
    }

    pub fn segment(mut self, segment: SegmentDefinition) -> Self {
        self.members.push(Member::Segment(segment));
        self
    }

    pub fn node_name(&self) -> &str {
        self.xml_name.as_deref().unwrap_or(&self.name)
    }

    /// Identifying fields with the segments enclosing each, outermost first
    pub fn identifiers(&self) -> Vec<(Vec<&SegmentDefinition>, &FieldDefinition)> {
        let mut found = Vec::new();
        collect_identifiers(&self.members, &mut Vec::new(), &mut found);
        found
    }

    pub(crate) fn compile(&mut self, layout: &Layout, registry: &TypeHandlerRegistry) -> Result<()> {
        check_occurs(&self.name, self.min_occurs, self.max_occurs)?;
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(Error::invalid(&self.name, format!("minimum length {min} exceeds maximum {max}")));
            }
        }
        if self.members.is_empty() {
            return Err(Error::invalid(&self.name, "record has no fields"));
        }
        layout_members(&self.name, &mut self.members, 0, true, false, layout, registry)?;
        Ok(())
    }
}

pub(crate) fn check_occurs(name: &str, min: usize, max: Option<usize>) -> Result<()> {
    match max {
        Some(0) => Err(Error::invalid(name, "maximum occurrences must be at least 1")),
        Some(max) if min > max => Err(Error::invalid(
            name,
            format!("minimum occurrences {min} exceed maximum {max}"),
        )),
        _ => Ok(()),
    }
}

fn collect_identifiers<'a>(
    members: &'a [Member],
    scope: &mut Vec<&'a SegmentDefinition>,
    found: &mut Vec<(Vec<&'a SegmentDefinition>, &'a FieldDefinition)>,
) {
    for member in members {
        match member {
            Member::Field(field) if field.is_identifier() => found.push((scope.clone(), field)),
            Member::Field(_) => {}
            Member::Segment(segment) => {
                scope.push(segment);
                collect_identifiers(&segment.members, scope, found);
                scope.pop();
            }
        }
    }
}

/// Assign positions to `members` starting at `start`
///
/// Returns the lowest position used and the end of the extent, which is
/// `None` when a member has no fixed width.
fn layout_members(
    owner: &str,
    members: &mut [Member],
    start: usize,
    top_level: bool,
    repeated: bool,
    layout: &Layout,
    registry: &TypeHandlerRegistry,
) -> Result<(usize, Option<usize>)> {
    let positional = layout.format != StreamFormat::Xml;
    let count = members.len();
    let mut cursor = Some(start);
    let mut lowest = None::<usize>;
    let mut end = Some(start);
    let mut text_nodes = 0;

    for (index, member) in members.iter_mut().enumerate() {
        let last = index + 1 == count;
        let (first, member_end) = match member {
            Member::Field(field) => {
                let position = match (field.position, cursor) {
                    (Some(p), _) => p,
                    (None, Some(c)) => c,
                    (None, None) if !positional => 0,
                    (None, None) => {
                        return Err(Error::invalid(
                            &field.name,
                            "position cannot follow a member of variable width",
                        ));
                    }
                };
                if field.is_identifier() && repeated {
                    return Err(Error::invalid(&field.name, "identifying fields cannot repeat"));
                }
                if field.xml_node == XmlNode::Text {
                    text_nodes += 1;
                }
                field.compile(position, top_level && last, layout, registry)?;
                let width = match (field.stride(), field.max_occurs) {
                    (0, _) | (_, None) => None,
                    (stride, Some(max)) => Some(stride * max),
                };
                (position, width.map(|w| position + w))
            }
            Member::Segment(segment) => {
                check_occurs(&segment.name, segment.min_occurs, segment.max_occurs)?;
                if segment.property.is_none() && segment.is_repeating() {
                    return Err(Error::invalid(&segment.name, "inline segments cannot repeat"));
                }
                let from = cursor.unwrap_or(0);
                if cursor.is_none() && positional {
                    return Err(Error::invalid(
                        &segment.name,
                        "position cannot follow a member of variable width",
                    ));
                }
                let nested_repeat = repeated || segment.is_repeating();
                let (first, inner_end) = layout_members(
                    &segment.name,
                    &mut segment.members,
                    from,
                    false,
                    nested_repeat,
                    layout,
                    registry,
                )?;
                segment.offset = first;
                segment.span = inner_end.map(|e| e - first);
                if positional && segment.is_repeating() && segment.span.is_none_or(|s| s == 0) {
                    return Err(Error::invalid(&segment.name, "repeating segment needs a fixed width"));
                }
                let width = match (segment.span, segment.max_occurs) {
                    (Some(span), Some(max)) => Some(span * max),
                    _ => None,
                };
                (first, width.map(|w| first + w))
            }
        };

        lowest = Some(lowest.map_or(first, |l| l.min(first)));
        end = match (end, member_end) {
            (Some(e), Some(m)) => Some(e.max(m)),
            _ => None,
        };
        // after a variable width member only explicit positions are valid
        cursor = member_end;
    }

    if text_nodes > 1 {
        return Err(Error::invalid(owner, "only one field may bind to element text"));
    }
    Ok((lowest.unwrap_or(start), end))
}
