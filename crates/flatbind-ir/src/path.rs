//! Property paths of the form `address.lines[2].text`

use crate::bean::{Bean, Property};
use crate::{Error, Result};
use std::fmt;

/// One step of a property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSegment {
    /// Property name
    pub name: String,
    /// List index, when the step is written `name[i]`
    pub index: Option<usize>,
}

/// A parsed property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    source: String,
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Parse a dotted path with optional `[i]` indexes
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Err(Error::invalid_path(path, "empty path"));
        }

        let mut segments = Vec::new();
        for part in path.split('.') {
            if part.is_empty() {
                return Err(Error::invalid_path(path, "empty path segment"));
            }

            let segment = if let Some(bracket) = part.find('[') {
                let Some(inner) = part[bracket + 1..].strip_suffix(']') else {
                    return Err(Error::invalid_path(path, "unterminated index"));
                };
                let index = inner
                    .parse()
                    .map_err(|_| Error::invalid_path(path, format!("invalid index '{inner}'")))?;
                PathSegment {
                    name: part[..bracket].to_string(),
                    index: Some(index),
                }
            } else {
                PathSegment {
                    name: part.to_string(),
                    index: None,
                }
            };

            if segment.name.is_empty() {
                return Err(Error::invalid_path(path, "missing property name"));
            }
            segments.push(segment);
        }

        Ok(Self {
            source: path.to_string(),
            segments,
        })
    }

    /// Path steps in order
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Original text of the path
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Path-based read and write access to a bound object
///
/// Readers assign properties through `set`; writers pull them back out
/// with `get`. Implemented for [`Bean`]; applications may implement it
/// over their own types.
pub trait PropertyAccess {
    /// Property at `path`, `None` when any step is missing
    fn get(&self, path: &str) -> Result<Option<&Property>>;

    /// Assign the property at `path`, creating intermediate beans
    fn set(&mut self, path: &str, value: Property) -> Result<()>;
}

impl PropertyAccess for Bean {
    fn get(&self, path: &str) -> Result<Option<&Property>> {
        let parsed = PropertyPath::parse(path)?;
        let (last, parents) = split_path(&parsed)?;

        let mut current = self;
        for segment in parents {
            let Some(next) = step(current.property(&segment.name), segment, path)? else {
                return Ok(None);
            };
            match next {
                Property::Bean(bean) => current = bean,
                other => return Err(Error::type_mismatch(path, "bean", other.kind())),
            }
        }

        step(current.property(&last.name), last, path)
    }

    fn set(&mut self, path: &str, value: Property) -> Result<()> {
        let parsed = PropertyPath::parse(path)?;
        let (last, parents) = split_path(&parsed)?;

        let mut current = self;
        for segment in parents {
            let slot = slot_mut(current, segment, path, || Property::Bean(Bean::new()))?;
            current = slot.as_bean_mut().ok_or_else(|| Error::not_a_bean(path))?;
        }

        match last.index {
            None => {
                current.insert(last.name.clone(), value);
            }
            Some(_) => {
                let slot = slot_mut(current, last, path, || Property::Value(crate::Value::Null))?;
                *slot = value;
            }
        }
        Ok(())
    }
}

fn split_path(path: &PropertyPath) -> Result<(&PathSegment, &[PathSegment])> {
    path.segments()
        .split_last()
        .ok_or_else(|| Error::invalid_path(path.as_str(), "empty path"))
}

/// Resolve one step for reading
fn step<'a>(
    property: Option<&'a Property>,
    segment: &PathSegment,
    path: &str,
) -> Result<Option<&'a Property>> {
    let Some(property) = property else {
        return Ok(None);
    };
    match segment.index {
        None => Ok(Some(property)),
        Some(index) => match property {
            Property::List(items) => Ok(items.get(index)),
            other => Err(Error::type_mismatch(path, "list", other.kind())),
        },
    }
}

/// Resolve one step for writing, creating the slot when missing
fn slot_mut<'a>(
    bean: &'a mut Bean,
    segment: &PathSegment,
    path: &str,
    fill: impl Fn() -> Property,
) -> Result<&'a mut Property> {
    if bean.property(&segment.name).is_none() {
        let initial = match segment.index {
            None => fill(),
            Some(_) => Property::List(Vec::new()),
        };
        bean.insert(segment.name.clone(), initial);
    }

    let Some(property) = bean.entry_mut(&segment.name) else {
        return Err(Error::invalid_path(path, "property vanished during assignment"));
    };

    let Some(index) = segment.index else {
        return Ok(property);
    };

    let found = property.kind();
    let Property::List(items) = property else {
        return Err(Error::type_mismatch(path, "list", found));
    };
    let len = items.len();
    if index > len {
        return Err(Error::IndexOutOfBounds {
            path: path.to_string(),
            index,
            len,
        });
    }
    if index == len {
        items.push(fill());
    }
    Ok(&mut items[index])
}
