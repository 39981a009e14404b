//! Routing faults to a caller-supplied error handler

use crate::error::{BeanError, ErrorKind, Result};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Receives every fault raised by a reader or writer
///
/// [`handle_error`](Self::handle_error) routes by kind to one hook per
/// kind. Every hook re-raises by default; returning `Ok(())` recovers and
/// the offending record is skipped.
pub trait ErrorHandler {
    fn handle_error(&mut self, error: BeanError) -> Result<()> {
        match error.kind() {
            ErrorKind::InvalidRecord => self.invalid_record(error),
            ErrorKind::MalformedRecord => self.malformed_record(error),
            ErrorKind::UnidentifiedRecord => self.unidentified_record(error),
            ErrorKind::UnexpectedRecord => self.unexpected_record(error),
            ErrorKind::Fatal => self.fatal_error(error),
        }
    }

    fn invalid_record(&mut self, error: BeanError) -> Result<()> {
        Err(error)
    }

    fn malformed_record(&mut self, error: BeanError) -> Result<()> {
        Err(error)
    }

    fn unidentified_record(&mut self, error: BeanError) -> Result<()> {
        Err(error)
    }

    fn unexpected_record(&mut self, error: BeanError) -> Result<()> {
        Err(error)
    }

    fn fatal_error(&mut self, error: BeanError) -> Result<()> {
        Err(error)
    }
}

/// Re-raises everything
#[derive(Debug, Clone, Copy, Default)]
pub struct PropagateAll;

impl ErrorHandler for PropagateAll {}

type Hook = Box<dyn FnMut(BeanError) -> Result<()> + Send>;

/// Error handler assembled from one closure per fault kind
///
/// Kinds without an entry propagate.
#[derive(Default)]
pub struct DispatchTable {
    hooks: HashMap<ErrorKind, Hook>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the hook for `kind`, replacing any previous one
    pub fn on<F>(mut self, kind: ErrorKind, hook: F) -> Self
    where
        F: FnMut(BeanError) -> Result<()> + Send + 'static,
    {
        self.hooks.insert(kind, Box::new(hook));
        self
    }

    /// Recover from `kind` by skipping the record
    pub fn skip(self, kind: ErrorKind) -> Self {
        self.on(kind, |_| Ok(()))
    }
}

impl ErrorHandler for DispatchTable {
    fn handle_error(&mut self, error: BeanError) -> Result<()> {
        match self.hooks.get_mut(&error.kind()) {
            Some(hook) => hook(error),
            None => Err(error),
        }
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.hooks.keys().collect();
        kinds.sort();
        f.debug_struct("DispatchTable").field("kinds", &kinds).finish()
    }
}

/// Logs and skips invalid, unidentified and unexpected records
///
/// Malformed and fatal faults still propagate.
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientErrorHandler;

impl LenientErrorHandler {
    fn skip(error: &BeanError) -> Result<()> {
        warn!(
            kind = %error.kind(),
            line = error.line(),
            record = error.record_name(),
            faults = error.field_errors().len(),
            "Skipping record: {error}"
        );
        Ok(())
    }
}

impl ErrorHandler for LenientErrorHandler {
    fn invalid_record(&mut self, error: BeanError) -> Result<()> {
        Self::skip(&error)
    }

    fn unidentified_record(&mut self, error: BeanError) -> Result<()> {
        Self::skip(&error)
    }

    fn unexpected_record(&mut self, error: BeanError) -> Result<()> {
        Self::skip(&error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unidentified() -> BeanError {
        BeanError::unidentified(4, "ZZ")
    }

    #[test]
    fn test_defaults_propagate() {
        let mut handler = PropagateAll;
        assert_eq!(handler.handle_error(unidentified()), Err(unidentified()));
    }

    struct SkipInvalid;

    impl ErrorHandler for SkipInvalid {
        fn invalid_record(&mut self, _error: BeanError) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_overriding_one_hook_keeps_the_rest() {
        let mut handler = SkipInvalid;
        assert!(handler.handle_error(BeanError::invalid(1, "r", "x", Vec::new())).is_ok());
        assert!(handler.handle_error(BeanError::malformed(1, "x", "bad")).is_err());
        assert!(handler.handle_error(BeanError::fatal("io")).is_err());
    }

    #[test]
    fn test_dispatch_table() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut table = DispatchTable::new()
            .on(ErrorKind::UnidentifiedRecord, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .skip(ErrorKind::InvalidRecord);

        assert!(table.handle_error(unidentified()).is_ok());
        assert!(table.handle_error(BeanError::invalid(1, "r", "x", Vec::new())).is_ok());
        assert_eq!(table.handle_error(BeanError::fatal("io")), Err(BeanError::fatal("io")));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lenient_handler() {
        let mut handler = LenientErrorHandler;
        assert!(handler.handle_error(unidentified()).is_ok());
        assert!(handler.handle_error(BeanError::unexpected(2, "r", "x", "out of order")).is_ok());
        assert!(handler.handle_error(BeanError::malformed(1, "x", "bad")).is_err());
        assert!(handler.handle_error(BeanError::fatal("io")).is_err());
    }
}
