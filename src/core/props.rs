//! Declarative logger configuration
//!
//! [`LoggerProps`] describes a logger in plain data (and deserializes from any
//! serde format); [`Logger::from_props`] turns it into a wired-up instance.

use super::{
    error::{LoggerError, Result},
    formatter::DEFAULT_OVERFLOW_POSTFIX,
    log_level::Level,
    logger::{Logger, LoggerBuilder, DEFAULT_QUEUE_CAPACITY, DEFAULT_TAG},
    pattern::Pattern,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerProps {
    /// Dispatch on the worker pool instead of the calling thread
    #[serde(rename = "async")]
    pub async_mode: bool,
    pub console_logger: bool,
    pub colored: bool,
    pub tag: String,
    /// Empty means the default pattern
    pub pattern: String,
    pub filter: Level,

    pub file_logger: bool,
    pub path: String,
    /// `None` never rotates on size
    pub bytes_per_file: Option<u64>,
    /// Files kept including the active one; 0 keeps everything
    pub log_files: usize,
    pub rotate_logs: bool,
    pub compress_logs: bool,

    pub queue_capacity: usize,
    pub overflow_postfix: String,
}

impl Default for LoggerProps {
    fn default() -> Self {
        Self {
            async_mode: true,
            console_logger: true,
            colored: true,
            tag: DEFAULT_TAG.to_string(),
            pattern: String::new(),
            filter: Level::Trace,
            file_logger: false,
            path: String::new(),
            bytes_per_file: None,
            log_files: 0,
            rotate_logs: true,
            compress_logs: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            overflow_postfix: DEFAULT_OVERFLOW_POSTFIX.to_string(),
        }
    }
}

impl LoggerProps {
    /// Check for settings [`Logger::from_props`] would quietly drop or adjust
    ///
    /// # Errors
    ///
    /// Returns the first problem found: `InvalidConfiguration` for a file sink
    /// without a path, a zero rotation size or a zero queue capacity, and
    /// `InvalidPattern` for a pattern that does not compile
    pub fn validate(&self) -> Result<()> {
        if self.file_logger && self.path.is_empty() {
            return Err(LoggerError::config(
                "file sink",
                "file logging is enabled but no path is set",
            ));
        }
        if self.file_logger && self.rotate_logs && self.bytes_per_file == Some(0) {
            return Err(LoggerError::config(
                "file rotation",
                "bytes_per_file must be greater than zero",
            ));
        }
        if self.async_mode && self.queue_capacity == 0 {
            return Err(LoggerError::config(
                "async queue",
                "queue_capacity must be at least 1",
            ));
        }
        Pattern::compile(&self.pattern)?;
        Ok(())
    }

    #[cfg(feature = "file")]
    pub fn rotation_policy(&self) -> crate::sinks::RotationPolicy {
        crate::sinks::RotationPolicy::default()
            .with_max_bytes(self.bytes_per_file)
            .with_max_files(self.log_files)
            .with_rotation(self.rotate_logs)
            .with_compression(self.compress_logs)
    }
}

impl Logger {
    /// Build a logger from `props`.
    ///
    /// File logging with an empty path attaches no file sink. A file sink that
    /// cannot be opened is reported on stderr and left out; the logger is still
    /// returned with whatever sinks could be attached.
    pub fn from_props(props: &LoggerProps) -> Logger {
        let mut builder = LoggerBuilder::new()
            .tag(props.tag.clone())
            .filter(props.filter)
            .pattern(props.pattern.clone())
            .overflow_postfix(props.overflow_postfix.clone());

        if props.async_mode {
            builder = builder.async_mode(props.queue_capacity);
        }

        if props.console_logger {
            builder = attach_console(builder, props.colored);
        }

        if props.file_logger && !props.path.is_empty() {
            builder = attach_file(builder, props);
        }

        builder.build()
    }

    /// Async logger printing to the console
    pub fn async_console(tag: impl Into<String>, filter: Level, colored: bool) -> Logger {
        Self::from_props(&LoggerProps {
            tag: tag.into(),
            filter,
            colored,
            ..LoggerProps::default()
        })
    }

    /// Blocking logger printing to the console
    pub fn blocking_console(tag: impl Into<String>, filter: Level, colored: bool) -> Logger {
        Self::from_props(&LoggerProps {
            async_mode: false,
            tag: tag.into(),
            filter,
            colored,
            ..LoggerProps::default()
        })
    }
}

#[cfg(feature = "console")]
fn attach_console(builder: LoggerBuilder, colored: bool) -> LoggerBuilder {
    use crate::sinks::{ColoredConsoleSink, ConsoleSink};

    if colored {
        builder.sink(ColoredConsoleSink::new())
    } else {
        builder.sink(ConsoleSink::new())
    }
}

#[cfg(not(feature = "console"))]
fn attach_console(builder: LoggerBuilder, _colored: bool) -> LoggerBuilder {
    eprintln!("[LOGGER WARNING] Console logging requested but the `console` feature is disabled");
    builder
}

#[cfg(feature = "file")]
fn attach_file(builder: LoggerBuilder, props: &LoggerProps) -> LoggerBuilder {
    use crate::sinks::RotatingFileSink;

    match RotatingFileSink::open(&props.path, props.rotation_policy()) {
        Ok(sink) => builder.sink(sink),
        Err(e) => {
            eprintln!("[LOGGER ERROR] File sink for '{}' not attached: {}", props.path, e);
            builder
        }
    }
}

#[cfg(not(feature = "file"))]
fn attach_file(builder: LoggerBuilder, _props: &LoggerProps) -> LoggerBuilder {
    eprintln!("[LOGGER WARNING] File logging requested but the `file` feature is disabled");
    builder
}
