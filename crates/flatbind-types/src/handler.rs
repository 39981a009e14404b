//! The type handler contract and its per-context state

use crate::locale::Locale;
use crate::zone::TimeZoneId;
use crate::{ConfigResult, ConversionResult};
use flatbind_ir::{Value, ValueType};
use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Property key carrying a handler's format pattern
pub const FORMAT_SETTING: &str = "format";

/// Converts between field text and a typed value
///
/// Implementations are immutable after construction and shared across
/// threads. Any mutable formatting state goes through the
/// [`HandlerContext`] passed to each call.
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// Type of values produced by `parse`
    fn target_type(&self) -> ValueType;

    /// Parse field text into a value. Empty text yields [`Value::Null`].
    fn parse(&self, text: &str, cx: &mut HandlerContext) -> ConversionResult<Value>;

    /// Format a value as field text. [`Value::Null`] formats as empty text.
    fn format(&self, value: &Value, cx: &mut HandlerContext) -> ConversionResult<String>;

    /// Produce a variant configured by `config`
    ///
    /// Returns `Ok(None)` when this handler already satisfies the
    /// configuration. Settings a handler does not support are ignored.
    fn configure(&self, config: &HandlerConfig) -> ConfigResult<Option<Arc<dyn TypeHandler>>> {
        let _ = config;
        Ok(None)
    }
}

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a handler instance, used to key cached formatters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

impl HandlerId {
    /// Allocate a fresh identity
    pub fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Formatter cache owned by one reader or writer
///
/// Holds at most one formatter per handler instance. Formatters are built
/// on first use and dropped with the context; they are never shared
/// between contexts, so no locking is involved.
#[derive(Default)]
pub struct HandlerContext {
    formatters: HashMap<(HandlerId, TypeId), Box<dyn Any + Send>>,
}

impl HandlerContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Formatter of type `F` for handler `id`, built with `build` on first use
    pub fn formatter<F, B>(&mut self, id: HandlerId, build: B) -> Option<&mut F>
    where
        F: Any + Send,
        B: FnOnce() -> F,
    {
        self.formatters
            .entry((id, TypeId::of::<F>()))
            .or_insert_with(|| Box::new(build()) as Box<dyn Any + Send>)
            .downcast_mut::<F>()
    }

    /// Number of formatters built so far
    pub fn len(&self) -> usize {
        self.formatters.len()
    }

    /// True when no formatter has been built
    pub fn is_empty(&self) -> bool {
        self.formatters.is_empty()
    }

    /// Drop every cached formatter
    pub fn clear(&mut self) {
        self.formatters.clear();
    }
}

impl fmt::Debug for HandlerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerContext")
            .field("formatters", &self.formatters.len())
            .finish()
    }
}

/// Settings requested for a field's handler
///
/// The `format` pattern is carried in the general property map under
/// [`FORMAT_SETTING`]; the other settings have dedicated slots. Unset
/// settings inherit the prototype's configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandlerConfig {
    properties: BTreeMap<String, String>,
    /// Locale for number symbols
    pub locale: Option<Locale>,
    /// Accept out-of-range calendar fields by rolling them over
    pub lenient: Option<bool>,
    /// Zone used to produce and interpret instants
    pub time_zone: Option<TimeZoneId>,
    /// Accept any XML temporal subtype, not only the handler's own
    pub lenient_datatype: Option<bool>,
    /// Accept an offset in XML temporal text
    pub time_zone_allowed: Option<bool>,
}

impl HandlerConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the format pattern
    pub fn format(self, pattern: impl Into<String>) -> Self {
        self.property(FORMAT_SETTING, pattern)
    }

    /// Set an arbitrary property
    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Set the locale
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = Some(locale);
        self
    }

    /// Set lenient calendar parsing
    pub fn lenient(mut self, lenient: bool) -> Self {
        self.lenient = Some(lenient);
        self
    }

    /// Set the time zone
    pub fn time_zone(mut self, zone: TimeZoneId) -> Self {
        self.time_zone = Some(zone);
        self
    }

    /// Set lenient XML subtype checking
    pub fn lenient_datatype(mut self, lenient: bool) -> Self {
        self.lenient_datatype = Some(lenient);
        self
    }

    /// Allow or forbid offsets in XML temporal text
    pub fn time_zone_allowed(mut self, allowed: bool) -> Self {
        self.time_zone_allowed = Some(allowed);
        self
    }

    /// Non-empty format pattern, if one was set
    pub fn pattern(&self) -> Option<&str> {
        self.get(FORMAT_SETTING).filter(|p| !p.is_empty())
    }

    /// Property by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// True when nothing was requested
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.locale.is_none()
            && self.lenient.is_none()
            && self.time_zone.is_none()
            && self.lenient_datatype.is_none()
            && self.time_zone_allowed.is_none()
    }
}
