//! Name and type keyed registry of handler prototypes

use crate::handler::{HandlerConfig, TypeHandler};
use crate::number::{DecimalTypeHandler, FloatKind, FloatTypeHandler, IntegerKind, IntegerTypeHandler};
use crate::temporal::{DateTypeHandler, TemporalKind};
use crate::text::{BooleanTypeHandler, CharTypeHandler, StringTypeHandler};
use crate::xml::XmlTemporalTypeHandler;
use crate::{ConfigError, ConfigResult};
use flatbind_ir::ValueType;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Registry of shared handler prototypes
///
/// Lookups by name are case-insensitive. Resolving a handler with a
/// configuration never mutates the registered prototype.
#[derive(Debug, Clone, Default)]
pub struct TypeHandlerRegistry {
    by_name: HashMap<String, Arc<dyn TypeHandler>>,
    by_type: HashMap<ValueType, Arc<dyn TypeHandler>>,
}

impl TypeHandlerRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in handlers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        let string: Arc<dyn TypeHandler> = Arc::new(StringTypeHandler::new());
        let character: Arc<dyn TypeHandler> = Arc::new(CharTypeHandler::new());
        let long: Arc<dyn TypeHandler> = Arc::new(IntegerTypeHandler::new(IntegerKind::Long));
        let int: Arc<dyn TypeHandler> = Arc::new(IntegerTypeHandler::new(IntegerKind::Int));
        let double: Arc<dyn TypeHandler> = Arc::new(FloatTypeHandler::new(FloatKind::Double));
        let decimal: Arc<dyn TypeHandler> = Arc::new(DecimalTypeHandler::new());
        let date: Arc<dyn TypeHandler> = Arc::new(DateTypeHandler::new(TemporalKind::Date));
        let time: Arc<dyn TypeHandler> = Arc::new(DateTypeHandler::new(TemporalKind::Time));
        let datetime: Arc<dyn TypeHandler> = Arc::new(DateTypeHandler::new(TemporalKind::DateTime));
        let boolean: Arc<dyn TypeHandler> = Arc::new(BooleanTypeHandler::new());

        registry.register("string", string.clone());
        registry.register("char", character.clone());
        registry.register("character", character.clone());
        registry.register("boolean", boolean.clone());
        registry.register("byte", Arc::new(IntegerTypeHandler::new(IntegerKind::Byte)));
        registry.register("short", Arc::new(IntegerTypeHandler::new(IntegerKind::Short)));
        registry.register("int", int.clone());
        registry.register("integer", int);
        registry.register("long", long.clone());
        registry.register("float", Arc::new(FloatTypeHandler::new(FloatKind::Float)));
        registry.register("double", double.clone());
        registry.register("decimal", decimal.clone());
        registry.register("date", date.clone());
        registry.register("time", time.clone());
        registry.register("datetime", datetime.clone());
        registry.register("xml:date", Arc::new(XmlTemporalTypeHandler::date()));
        registry.register("xml:time", Arc::new(XmlTemporalTypeHandler::time()));
        registry.register("xml:datetime", Arc::new(XmlTemporalTypeHandler::date_time()));

        registry.register_for_type(ValueType::String, string);
        registry.register_for_type(ValueType::Char, character);
        registry.register_for_type(ValueType::Integer, long);
        registry.register_for_type(ValueType::Float, double);
        registry.register_for_type(ValueType::Decimal, decimal);
        registry.register_for_type(ValueType::Boolean, boolean);
        registry.register_for_type(ValueType::Date, date);
        registry.register_for_type(ValueType::Time, time);
        registry.register_for_type(ValueType::DateTime, datetime.clone());
        registry.register_for_type(ValueType::Timestamp, datetime);

        debug!(handlers = registry.by_name.len(), "Registered built-in type handlers");
        registry
    }

    /// Register a prototype under a name, replacing any previous one
    pub fn register(&mut self, name: &str, handler: Arc<dyn TypeHandler>) {
        self.by_name.insert(name.to_ascii_lowercase(), handler);
    }

    /// Register the default prototype for a value type
    pub fn register_for_type(&mut self, value_type: ValueType, handler: Arc<dyn TypeHandler>) {
        self.by_type.insert(value_type, handler);
    }

    /// Prototype registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<dyn TypeHandler>> {
        self.by_name.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Default prototype for a value type
    pub fn for_type(&self, value_type: ValueType) -> Option<Arc<dyn TypeHandler>> {
        self.by_type.get(&value_type).cloned()
    }

    /// Handler for `name` configured by `config`
    ///
    /// Returns the prototype itself when it already satisfies the
    /// configuration, otherwise a new configured handler.
    pub fn resolve(&self, name: &str, config: &HandlerConfig) -> ConfigResult<Arc<dyn TypeHandler>> {
        let prototype = self
            .get(name)
            .ok_or_else(|| ConfigError::UnknownHandler(name.to_string()))?;
        Self::configure(prototype, config)
    }

    /// Handler for a value type configured by `config`
    pub fn resolve_type(
        &self,
        value_type: ValueType,
        config: &HandlerConfig,
    ) -> ConfigResult<Arc<dyn TypeHandler>> {
        let prototype = self
            .for_type(value_type)
            .ok_or_else(|| ConfigError::UnknownHandler(value_type.to_string()))?;
        Self::configure(prototype, config)
    }

    fn configure(prototype: Arc<dyn TypeHandler>, config: &HandlerConfig) -> ConfigResult<Arc<dyn TypeHandler>> {
        if config.is_empty() {
            return Ok(prototype);
        }
        match prototype.configure(config)? {
            Some(handler) => {
                trace!(?config, "Configured new type handler from prototype");
                Ok(handler)
            }
            None => Ok(prototype),
        }
    }
}
