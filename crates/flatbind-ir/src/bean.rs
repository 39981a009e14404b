//! Bean containers for bound records and segments

use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A bound property: scalar, nested bean, or list of either
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    /// Scalar value
    Value(Value),

    /// Nested bean (a non-repeating segment)
    Bean(Bean),

    /// Repeated values or beans, in stream order
    List(Vec<Property>),
}

impl Property {
    /// Borrow the scalar value
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Property::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow the nested bean
    pub fn as_bean(&self) -> Option<&Bean> {
        match self {
            Property::Bean(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow the list items
    pub fn as_list(&self) -> Option<&[Property]> {
        match self {
            Property::List(items) => Some(items),
            _ => None,
        }
    }

    /// Check for a null scalar
    pub fn is_null(&self) -> bool {
        matches!(self, Property::Value(Value::Null))
    }

    /// Name of the property's shape, used in messages
    pub fn kind(&self) -> &'static str {
        match self {
            Property::Value(v) => v.type_name(),
            Property::Bean(_) => "bean",
            Property::List(_) => "list",
        }
    }

    pub(crate) fn as_bean_mut(&mut self) -> Option<&mut Bean> {
        match self {
            Property::Bean(b) => Some(b),
            _ => None,
        }
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Value(value)
    }
}

macro_rules! scalar_property {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Property {
                fn from(value: $ty) -> Self {
                    Property::Value(Value::from(value))
                }
            }
        )*
    };
}

scalar_property!(
    &str,
    String,
    char,
    i64,
    i32,
    f64,
    bool,
    chrono::NaiveDate,
    chrono::NaiveTime,
    chrono::NaiveDateTime,
    chrono::DateTime<chrono::FixedOffset>,
);

impl From<Bean> for Property {
    fn from(bean: Bean) -> Self {
        Property::Bean(bean)
    }
}

impl From<Vec<Property>> for Property {
    fn from(items: Vec<Property>) -> Self {
        Property::List(items)
    }
}

/// A bound record or segment
///
/// Properties are kept in name order so that serialized beans compare
/// stably.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bean {
    /// Application type the bean stands for, if the record names one
    pub type_name: Option<String>,

    properties: BTreeMap<String, Property>,
}

impl Bean {
    /// Create an untyped, empty bean
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty bean of the given type
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: Some(type_name.into()),
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style insert of a direct property
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Property>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert a direct property, returning the previous one
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Property>) -> Option<Property> {
        self.properties.insert(name.into(), value.into())
    }

    /// Direct property by name
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    /// Direct scalar property by name
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.property(name).and_then(Property::as_value)
    }

    /// Remove a direct property
    pub fn remove(&mut self, name: &str) -> Option<Property> {
        self.properties.remove(name)
    }

    /// Iterate direct properties in name order
    pub fn properties(&self) -> impl Iterator<Item = (&str, &Property)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of direct properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True when no property is set
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Move every property of `other` into this bean
    pub fn merge(&mut self, other: Bean) {
        self.properties.extend(other.properties);
    }

    pub(crate) fn entry_mut(&mut self, name: &str) -> Option<&mut Property> {
        self.properties.get_mut(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bean_builder() {
        let bean = Bean::of_type("Person")
            .with("id", 1)
            .with("firstName", "Joe")
            .with(
                "numbers",
                vec![Property::from(1), Property::from(2)],
            );

        assert_eq!(bean.type_name.as_deref(), Some("Person"));
        assert_eq!(bean.len(), 3);
        assert_eq!(bean.value("firstName"), Some(&Value::from("Joe")));
        assert_eq!(bean.property("numbers").unwrap().as_list().unwrap().len(), 2);
    }

    #[test]
    fn test_merge_overwrites() {
        let mut a = Bean::new().with("x", 1).with("y", 2);
        a.merge(Bean::new().with("y", 3));
        assert_eq!(a.value("y"), Some(&Value::Integer(3)));
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_property_kind() {
        assert_eq!(Property::from(Bean::new()).kind(), "bean");
        assert_eq!(Property::from(Vec::new()).kind(), "list");
        assert!(Property::from(Value::Null).is_null());
    }
}
