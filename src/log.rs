//! Injectable logging seam.
//!
//! The engine never logs directly; it goes through a [`Logger`] supplied at
//! construction so adapters can route diagnostics into whatever their
//! platform provides. [`TracingLogger`] is the batteries-included
//! implementation that forwards to the [`tracing`] macros.
//!
//! `time`/`time_end` exist for span instrumentation and default to no-ops;
//! implementations without timing support simply leave them unimplemented.

/// Logging interface injected into the engine and exposed on the request
/// [`Context`](crate::context::Context).
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    /// Start a named timing span. No-op by default.
    fn time(&self, _label: &str) {}

    /// End a named timing span. No-op by default.
    fn time_end(&self, _label: &str) {}
}

/// Forwards [`Logger`] calls to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn time(&self, label: &str) {
        tracing::trace!("begin {label}");
    }

    fn time_end(&self, label: &str) {
        tracing::trace!("end {label}");
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use super::Logger;

    /// Collects log lines for assertions, tagged by level.
    #[derive(Default)]
    pub struct MemoryLogger {
        pub lines: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl MemoryLogger {
        pub fn new() -> (Arc<Self>, Arc<Mutex<Vec<(String, String)>>>) {
            let logger = Arc::new(Self::default());
            let lines = logger.lines.clone();
            (logger, lines)
        }
    }

    impl Logger for MemoryLogger {
        fn debug(&self, message: &str) {
            self.lines
                .lock()
                .unwrap()
                .push(("debug".to_string(), message.to_string()));
        }

        fn warn(&self, message: &str) {
            self.lines
                .lock()
                .unwrap()
                .push(("warn".to_string(), message.to_string()));
        }

        fn error(&self, message: &str) {
            self.lines
                .lock()
                .unwrap()
                .push(("error".to_string(), message.to_string()));
        }
    }
}
