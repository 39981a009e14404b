//! Group definitions

use crate::record::{RecordDefinition, check_occurs};
use crate::stream::Layout;
use crate::Result;
use flatbind_types::TypeHandlerRegistry;

/// An ordered, repeatable collection of records and nested groups
#[derive(Debug, Clone)]
pub struct GroupDefinition {
    pub name: String,
    pub min_occurs: usize,
    pub max_occurs: Option<usize>,
    /// Children must appear in declaration order
    pub ordered: bool,
    pub children: Vec<Component>,
}

impl GroupDefinition {
    /// Ordered group that may occur any number of times
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_occurs: 0,
            max_occurs: None,
            ordered: true,
            children: Vec::new(),
        }
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

    /// Accept children in any order
    pub fn unordered(mut self) -> Self {
        self.ordered = false;
        self
    }

    pub fn record(mut self, record: RecordDefinition) -> Self {
        self.children.push(Component::Record(record));
        self
    }

    pub fn group(mut self, group: GroupDefinition) -> Self {
        self.children.push(Component::Group(group));
        self
    }

    pub fn child(&self, index: usize) -> Option<&Component> {
        self.children.get(index)
    }

    pub(crate) fn compile(&mut self, layout: &Layout, registry: &TypeHandlerRegistry) -> Result<()> {
        check_occurs(&self.name, self.min_occurs, self.max_occurs)?;
        for child in &mut self.children {
            match child {
                Component::Group(group) => group.compile(layout, registry)?,
                Component::Record(record) => record.compile(layout, registry)?,
            }
        }
        Ok(())
    }
}

/// A child of a group
#[derive(Debug, Clone)]
pub enum Component {
    Group(GroupDefinition),
    Record(RecordDefinition),
}

impl Component {
    pub fn name(&self) -> &str {
        match self {
            Self::Group(g) => &g.name,
            Self::Record(r) => &r.name,
        }
    }

    pub fn min_occurs(&self) -> usize {
        match self {
            Self::Group(g) => g.min_occurs,
            Self::Record(r) => r.min_occurs,
        }
    }

    pub fn max_occurs(&self) -> Option<usize> {
        match self {
            Self::Group(g) => g.max_occurs,
            Self::Record(r) => r.max_occurs,
        }
    }

    /// `record` or `group`, for messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Group(_) => "group",
            Self::Record(_) => "record",
        }
    }

    pub fn as_record(&self) -> Option<&RecordDefinition> {
        match self {
            Self::Record(r) => Some(r),
            Self::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupDefinition> {
        match self {
            Self::Group(g) => Some(g),
            Self::Record(_) => None,
        }
    }
}

impl From<RecordDefinition> for Component {
    fn from(record: RecordDefinition) -> Self {
        Self::Record(record)
    }
}

impl From<GroupDefinition> for Component {
    fn from(group: GroupDefinition) -> Self {
        Self::Group(group)
    }
}
