//! Sequential record writer

use crate::binder::{RecordBinder, RenderedRecord};
use crate::error::{BeanError, Result};
use crate::navigate::{Navigator, Rejection};
use flatbind_ir::{Bean, PropertyAccess};
use flatbind_schema::{RecordDefinition, StreamDefinition};
use flatbind_types::HandlerContext;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Consumes formatted records
pub trait RecordSink {
    fn write_record(&mut self, record: &RecordDefinition, rendered: &RenderedRecord<'_>) -> Result<()>;

    fn flush(&mut self) -> Result<()>;

    /// Finish the output; called once
    fn close(&mut self) -> Result<()>;
}

/// Writes beans to a record sink
///
/// Writes are validated against the same group structure a reader
/// enforces, so every output the writer accepts reads back.
pub struct BeanWriter<S: RecordSink> {
    stream: Arc<StreamDefinition>,
    sink: S,
    navigator: Navigator,
    handlers: HandlerContext,
    record_count: usize,
    closed: bool,
}

impl<S: RecordSink> BeanWriter<S> {
    pub fn new(stream: Arc<StreamDefinition>, sink: S) -> Self {
        debug!(stream = %stream.name(), format = %stream.format(), "Opened writer");
        Self {
            navigator: Navigator::new(&stream),
            stream,
            sink,
            handlers: HandlerContext::new(),
            record_count: 0,
            closed: false,
        }
    }

    pub fn stream(&self) -> &StreamDefinition {
        &self.stream
    }

    /// Records written so far
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Write `source` as the record named `record_name`
    pub fn write(&mut self, record_name: &str, source: &dyn PropertyAccess) -> Result<()> {
        self.ensure_open()?;
        let stream = Arc::clone(&self.stream);
        let line = self.record_count + 1;
        let (path, record) = stream
            .find_record(record_name)
            .ok_or_else(|| BeanError::unidentified(line, record_name))?;
        let candidate = self
            .navigator
            .locate(&stream, |candidate, _| candidate == path)
            .map_err(|rejection| rejected(rejection, line, record_name))?;
        self.emit(&stream, record, source, candidate)
    }

    /// Write a bean as the first record bound to its type that is valid here
    pub fn write_bean(&mut self, bean: &Bean) -> Result<()> {
        self.ensure_open()?;
        let stream = Arc::clone(&self.stream);
        let line = self.record_count + 1;
        let type_name = bean
            .type_name
            .as_deref()
            .ok_or_else(|| BeanError::unidentified(line, "bean without a type"))?;
        let candidate = self
            .navigator
            .locate(&stream, |_, record| record.bean_type.as_deref() == Some(type_name))
            .map_err(|rejection| rejected(rejection, line, type_name))?;
        let record = stream
            .record_at(candidate.path())
            .ok_or_else(|| BeanError::fatal(format!("No record at {:?}", candidate.path())))?;
        self.emit(&stream, record, bean, candidate)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }

    /// Close the sink, then check no required record is missing
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink.close()?;
        if let Some(missing) = self.navigator.finish(&self.stream) {
            return Err(BeanError::unexpected(
                self.record_count,
                missing.name.clone(),
                "",
                format!("End of stream reached, expected {} '{}'", missing.kind, missing.name),
            ));
        }
        debug!(stream = %self.stream.name(), records = self.record_count, "Closed writer");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(BeanError::fatal("Writer is closed"));
        }
        Ok(())
    }

    fn emit(
        &mut self,
        stream: &StreamDefinition,
        record: &RecordDefinition,
        source: &dyn PropertyAccess,
        candidate: crate::navigate::Candidate,
    ) -> Result<()> {
        let line = self.record_count + 1;
        let rendered = RecordBinder::new(stream)
            .write(record, source, &mut self.handlers)
            .map_err(|faults| BeanError::invalid(line, &record.name, "", faults))?;
        self.navigator.commit(stream, candidate);
        self.sink.write_record(record, &rendered)?;
        self.record_count = line;
        trace!(record = %record.name, line, "Wrote record");
        Ok(())
    }
}

fn rejected(rejection: Rejection, line: usize, name: &str) -> BeanError {
    match rejection {
        Rejection::Unidentified => BeanError::unidentified(line, name),
        Rejection::Unexpected { record, message } => BeanError::unexpected(line, record, "", message),
    }
}

impl<S: RecordSink> fmt::Debug for BeanWriter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanWriter")
            .field("stream", &self.stream.name())
            .field("record_count", &self.record_count)
            .field("closed", &self.closed)
            .finish()
    }
}
