//! Core traits shared by the solvers

use log::Level;

/// Destination for solver progress messages.
///
/// Solvers never print directly; the caller injects a sink on entry.
pub trait ProgressSink {
    /// Receive one message at the given severity
    fn emit(&self, level: Level, message: &str);
}

/// Forwards solver messages to the `log` facade
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn emit(&self, level: Level, message: &str) {
        log::log!(target: "rlinear", level, "{message}");
    }
}

/// Discards every message
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl ProgressSink for SilentSink {
    fn emit(&self, _level: Level, _message: &str) {}
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Sink that records messages for assertions
    #[derive(Default)]
    pub struct RecordingSink {
        pub messages: RefCell<Vec<(Level, String)>>,
    }

    impl ProgressSink for RecordingSink {
        fn emit(&self, level: Level, message: &str) {
            self.messages.borrow_mut().push((level, message.to_string()));
        }
    }

    impl RecordingSink {
        pub fn count(&self, level: Level) -> usize {
            self.messages
                .borrow()
                .iter()
                .filter(|(l, _)| *l == level)
                .count()
        }
    }
}
