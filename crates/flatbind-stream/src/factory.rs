//! Registry of built streams

use crate::codec::RecordCodec;
use crate::error::{Error, Result};
use crate::format::{AnySink, AnySource, FormatConfig};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use flatbind_engine::{BeanReader, BeanWriter};
use flatbind_schema::{StreamBuilder, StreamDefinition};
use flatbind_types::TypeHandlerRegistry;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::debug;

/// Reader for a stream of any format
pub type StreamReader<R> = BeanReader<AnySource<R>>;

/// Writer for a stream of any format
pub type StreamWriter<W> = BeanWriter<AnySink<W>>;

#[derive(Debug, Clone)]
struct Registered {
    stream: Arc<StreamDefinition>,
    config: FormatConfig,
}

/// Creates readers and writers for registered streams
///
/// The factory can be shared between threads; every reader and writer
/// it creates holds its own traversal state and shares only the
/// immutable definition.
#[derive(Debug)]
pub struct StreamFactory {
    streams: DashMap<String, Registered>,
    registry: TypeHandlerRegistry,
}

impl StreamFactory {
    /// Create a factory using the default type handlers
    pub fn new() -> Self {
        Self::with_registry(TypeHandlerRegistry::with_defaults())
    }

    pub fn with_registry(registry: TypeHandlerRegistry) -> Self {
        Self {
            streams: DashMap::new(),
            registry,
        }
    }

    /// Type handlers used by [`define`](Self::define)
    pub fn registry(&self) -> &TypeHandlerRegistry {
        &self.registry
    }

    /// Build a stream with this factory's type handlers and register it
    pub fn define(&self, builder: StreamBuilder) -> Result<Arc<StreamDefinition>> {
        let stream = builder.build(&self.registry)?;
        self.register(Arc::clone(&stream))?;
        Ok(stream)
    }

    /// Register a stream with the default options of its format
    pub fn register(&self, stream: Arc<StreamDefinition>) -> Result<()> {
        let config = FormatConfig::default_for(stream.format());
        self.register_with(stream, config)
    }

    pub fn register_with(&self, stream: Arc<StreamDefinition>, config: impl Into<FormatConfig>) -> Result<()> {
        let config = config.into();
        if config.format() != stream.format() {
            return Err(Error::FormatMismatch {
                stream: stream.name().to_string(),
                format: stream.format().to_string(),
            });
        }
        match self.streams.entry(stream.name().to_string()) {
            Entry::Occupied(entry) => Err(Error::DuplicateStream(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(stream = %stream.name(), format = %stream.format(), "Registered stream");
                entry.insert(Registered { stream, config });
                Ok(())
            }
        }
    }

    pub fn remove(&self, name: &str) -> Option<Arc<StreamDefinition>> {
        self.streams.remove(name).map(|(_, registered)| registered.stream)
    }

    pub fn get(&self, name: &str) -> Option<Arc<StreamDefinition>> {
        self.streams.get(name).map(|entry| Arc::clone(&entry.stream))
    }

    /// Format options a stream was registered with
    pub fn config(&self, name: &str) -> Option<FormatConfig> {
        self.streams.get(name).map(|entry| entry.config.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    /// Registered stream names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.streams.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Open a reader for stream `name` over `input`
    pub fn create_reader<R: Read>(&self, name: &str, input: R) -> Result<StreamReader<R>> {
        let Registered { stream, config } = self.lookup(name)?;
        let source = AnySource::open(input, &stream, &config)?;
        Ok(BeanReader::new(stream, source))
    }

    /// Open a writer for stream `name` over `output`
    pub fn create_writer<W: Write>(&self, name: &str, output: W) -> Result<StreamWriter<W>> {
        let Registered { stream, config } = self.lookup(name)?;
        let sink = AnySink::open(output, &stream, &config)?;
        Ok(BeanWriter::new(stream, sink))
    }

    /// Single-record codec for stream `name`
    pub fn create_codec(&self, name: &str) -> Result<RecordCodec> {
        let Registered { stream, config } = self.lookup(name)?;
        RecordCodec::with_config(stream, config)
    }

    fn lookup(&self, name: &str) -> Result<Registered> {
        self.streams
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::UnknownStream(name.to_string()))
    }
}

impl Default for StreamFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatbind_adapter_delimited::DelimitedConfig;
    use flatbind_adapter_fixed::FixedLengthConfig;
    use flatbind_schema::{FieldDefinition, RecordDefinition, StreamFormat};

    fn builder(name: &str) -> StreamBuilder {
        StreamDefinition::builder(name, StreamFormat::Delimited)
            .record(RecordDefinition::new("line").field(FieldDefinition::new("text")))
    }

    #[test]
    fn test_define_and_lookup() {
        let factory = StreamFactory::new();
        assert!(factory.is_empty());
        factory.define(builder("b")).unwrap();
        factory.define(builder("a")).unwrap();
        assert_eq!(factory.names(), vec!["a", "b"]);
        assert!(factory.contains("a"));
        assert_eq!(factory.get("a").map(|s| s.name().to_string()), Some("a".to_string()));
        assert_eq!(factory.config("a"), Some(FormatConfig::Delimited(DelimitedConfig::default())));
        assert!(factory.remove("a").is_some());
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_duplicate_name() {
        let factory = StreamFactory::new();
        factory.define(builder("a")).unwrap();
        let err = factory.define(builder("a")).unwrap_err();
        assert_eq!(err, Error::DuplicateStream("a".to_string()));
    }

    #[test]
    fn test_unknown_stream() {
        let factory = StreamFactory::new();
        let err = factory.create_reader("missing", &b""[..]).map(|_| ()).unwrap_err();
        assert_eq!(err.to_string(), "Stream 'missing' is not registered");
    }

    #[test]
    fn test_format_mismatch() {
        let factory = StreamFactory::new();
        let stream = builder("a").build(factory.registry()).unwrap();
        let err = factory.register_with(stream, FixedLengthConfig::new()).unwrap_err();
        assert!(matches!(err, Error::FormatMismatch { .. }));
        assert!(factory.is_empty());
    }
}
