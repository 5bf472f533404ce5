//! Records flowing through the pipeline
//!
//! A [`LogRecord`] is built at the call site and consumed by the formatter.
//! The formatter produces a [`LogMessage`], which is what sinks receive.

use super::log_level::Level;
use std::fmt::{self, Display};
use std::sync::Arc;

/// Borrowed record for a single logging call.
///
/// `A` is the argument representation: `&dyn Display` on the blocking path,
/// owned `String`s once a record has been captured for a worker thread.
#[derive(Debug, Clone, Copy)]
pub struct LogRecord<'a, A: Display = &'a dyn Display> {
    pub level: Level,
    pub tag: &'a str,
    pub format: &'a str,
    pub args: &'a [A],
}

impl<'a, A: Display> LogRecord<'a, A> {
    pub fn new(level: Level, tag: &'a str, format: &'a str, args: &'a [A]) -> Self {
        Self {
            level,
            tag,
            format,
            args,
        }
    }
}

/// Record whose arguments were converted to text at the call site, so it can
/// cross a thread boundary without borrowing caller memory.
#[derive(Debug, Clone)]
pub struct OwnedRecord {
    pub level: Level,
    pub tag: Arc<str>,
    pub format: String,
    pub args: Vec<String>,
}

impl OwnedRecord {
    pub fn capture(record: &LogRecord<'_, &dyn Display>, tag: Arc<str>) -> Self {
        Self {
            level: record.level,
            tag,
            format: record.format.to_owned(),
            args: record.args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    pub fn as_record(&self) -> LogRecord<'_, String> {
        LogRecord::new(self.level, &self.tag, &self.format, &self.args)
    }
}

/// Rendered, newline-terminated bytes plus the level they were logged at.
#[derive(Clone, Copy)]
pub struct LogMessage<'a> {
    level: Level,
    bytes: &'a [u8],
    truncated: bool,
}

impl<'a> LogMessage<'a> {
    pub fn new(level: Level, bytes: &'a [u8]) -> Self {
        Self {
            level,
            bytes,
            truncated: false,
        }
    }

    pub(crate) fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    #[inline]
    pub fn level(&self) -> Level {
        self.level
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the message body was cut to fit the buffer
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn to_string_lossy(&self) -> std::borrow::Cow<'a, str> {
        String::from_utf8_lossy(self.bytes)
    }
}

impl fmt::Debug for LogMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogMessage")
            .field("level", &self.level)
            .field("text", &self.to_string_lossy())
            .field("truncated", &self.truncated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_converts_arguments() {
        let user = "alice";
        let attempts = 3;
        let args: [&dyn Display; 2] = [&user, &attempts];
        let record = LogRecord::new(Level::Warn, "auth", "{} failed {} times", &args);

        let owned = OwnedRecord::capture(&record, Arc::from("auth"));
        assert_eq!(owned.args, vec!["alice".to_string(), "3".to_string()]);

        let borrowed = owned.as_record();
        assert_eq!(borrowed.level, Level::Warn);
        assert_eq!(borrowed.tag, "auth");
        assert_eq!(borrowed.format, "{} failed {} times");
    }

    #[test]
    fn test_message_accessors() {
        let msg = LogMessage::new(Level::Info, b"hello\n");
        assert_eq!(msg.level(), Level::Info);
        assert_eq!(msg.len(), 6);
        assert!(!msg.is_truncated());
        assert_eq!(msg.to_string_lossy(), "hello\n");
    }
}
