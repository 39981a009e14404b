//! Sequential record reader

use crate::binder::RecordBinder;
use crate::dispatch::{ErrorHandler, PropagateAll};
use crate::error::{BeanError, ErrorKind, Result};
use crate::navigate::{Navigator, Rejection};
use crate::view::RecordView;
use flatbind_ir::Bean;
use flatbind_schema::StreamDefinition;
use flatbind_types::HandlerContext;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Produces the records of one input stream
pub trait RecordSource {
    type View: RecordView;

    /// Next record, or `None` at end of input
    fn next_record(&mut self) -> Result<Option<Self::View>>;

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Open,
    Finished,
    Failed(BeanError),
    Closed,
}

enum Step {
    Record(Bean),
    Skipped,
    End,
}

/// Reads beans from a record source
///
/// One reader owns its traversal state and formatter cache; it is not
/// meant to be shared between threads while in use.
pub struct BeanReader<S: RecordSource> {
    stream: Arc<StreamDefinition>,
    source: S,
    navigator: Navigator,
    handlers: HandlerContext,
    error_handler: Box<dyn ErrorHandler + Send>,
    line: usize,
    record_name: Option<String>,
    record_count: usize,
    state: State,
}

impl<S: RecordSource> BeanReader<S> {
    pub fn new(stream: Arc<StreamDefinition>, source: S) -> Self {
        debug!(stream = %stream.name(), format = %stream.format(), "Opened reader");
        Self {
            navigator: Navigator::new(&stream),
            stream,
            source,
            handlers: HandlerContext::new(),
            error_handler: Box::new(PropagateAll),
            line: 0,
            record_name: None,
            record_count: 0,
            state: State::Open,
        }
    }

    /// Route faults through `handler` instead of returning them
    pub fn with_error_handler(mut self, handler: impl ErrorHandler + Send + 'static) -> Self {
        self.error_handler = Box::new(handler);
        self
    }

    pub fn set_error_handler(&mut self, handler: impl ErrorHandler + Send + 'static) {
        self.error_handler = Box::new(handler);
    }

    pub fn stream(&self) -> &StreamDefinition {
        &self.stream
    }

    /// Line or record number of the last record read
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Name of the record definition the last record matched
    pub fn record_name(&self) -> Option<&str> {
        self.record_name.as_deref()
    }

    /// Records identified so far
    pub fn record_count(&self) -> usize {
        self.record_count
    }

    /// Next bean, or `None` at end of input
    pub fn read(&mut self) -> Result<Option<Bean>> {
        loop {
            match self.step(true)? {
                Step::Record(bean) => return Ok(Some(bean)),
                Step::Skipped => {}
                Step::End => return Ok(None),
            }
        }
    }

    /// Identify and validate up to `count` records without binding them
    pub fn skip(&mut self, count: usize) -> Result<usize> {
        let mut skipped = 0;
        while skipped < count {
            match self.step(false)? {
                Step::Record(_) => skipped += 1,
                Step::Skipped => {}
                Step::End => break,
            }
        }
        Ok(skipped)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Release the source; further reads fail
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        self.state = State::Closed;
        self.source.close()
    }

    fn step(&mut self, bind: bool) -> Result<Step> {
        match &self.state {
            State::Open => {}
            State::Finished => return Ok(Step::End),
            State::Failed(error) => return Err(error.clone()),
            State::Closed => return Err(BeanError::fatal("Reader is closed")),
        }
        match self.next(bind) {
            Ok(step) => Ok(step),
            Err(error) => {
                let fatal = error.kind() == ErrorKind::Fatal;
                if fatal {
                    self.state = State::Failed(error.clone());
                }
                self.error_handler.handle_error(error)?;
                Ok(if fatal { Step::End } else { Step::Skipped })
            }
        }
    }

    fn next(&mut self, bind: bool) -> Result<Step> {
        let stream = Arc::clone(&self.stream);
        let binder = RecordBinder::new(&stream);
        loop {
            let Some(view) = self.source.next_record()? else {
                return self.end(&stream);
            };
            self.line = view.line_number();
            self.record_name = None;

            let path = match self.navigator.advance(&stream, |_, record| binder.identifies(record, &view)) {
                Ok(path) => path,
                Err(Rejection::Unidentified) if stream.ignore_unidentified() => {
                    trace!(line = self.line, "Skipping unidentified record");
                    continue;
                }
                Err(Rejection::Unidentified) => {
                    return Err(BeanError::unidentified(self.line, view.text()));
                }
                Err(Rejection::Unexpected { record, message }) => {
                    self.record_name = Some(record.clone());
                    return Err(BeanError::unexpected(self.line, record, view.text(), message));
                }
            };
            let record = stream
                .record_at(&path)
                .ok_or_else(|| BeanError::fatal(format!("No record at {path:?}")))?;
            self.record_name = Some(record.name.clone());
            self.record_count += 1;
            trace!(line = self.line, record = %record.name, "Identified record");

            if let Some(message) = binder.check_length(record, &view) {
                return Err(BeanError::malformed(self.line, view.text(), message));
            }
            if !bind {
                return Ok(Step::Record(Bean::new()));
            }
            return match binder.read(record, &view, &mut self.handlers) {
                Ok(bean) => Ok(Step::Record(bean)),
                Err(faults) => Err(BeanError::invalid(self.line, &record.name, view.text(), faults)),
            };
        }
    }

    fn end(&mut self, stream: &StreamDefinition) -> Result<Step> {
        self.state = State::Finished;
        self.record_name = None;
        if let Some(missing) = self.navigator.finish(stream) {
            return Err(BeanError::unexpected(
                self.line,
                missing.name.clone(),
                "",
                format!("End of stream reached, expected {} '{}'", missing.kind, missing.name),
            ));
        }
        debug!(stream = %stream.name(), records = self.record_count, "Reader reached end of stream");
        Ok(Step::End)
    }
}

impl<S: RecordSource> fmt::Debug for BeanReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanReader")
            .field("stream", &self.stream.name())
            .field("line", &self.line)
            .field("record_count", &self.record_count)
            .field("state", &self.state)
            .finish()
    }
}
