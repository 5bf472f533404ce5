//! # blogger
//!
//! A pattern-based logger that renders every message into a fixed-size buffer
//! and hands the bytes to a set of sinks.
//!
//! ## Features
//!
//! - **Bounded output**: messages never exceed [`BUFFER_CAPACITY`] bytes; an
//!   overlong body is cut on a character boundary and marked
//! - **Blocking or async**: async loggers share one worker pool and keep
//!   per-logger call order
//! - **Sinks**: console, colored console and size-rotated files, or your own
//!   [`Sink`]
//! - **Configurable**: build with [`LoggerBuilder`] or from a deserialized
//!   [`LoggerProps`]
//!
//! ## Example
//!
//! ```
//! use blogger::prelude::*;
//!
//! let logger = Logger::builder()
//!     .tag("net")
//!     .filter(Level::Info)
//!     .pattern("{lvl}{tag}{msg}")
//!     .build();
//!
//! logger.info("connected to {} in {}ms", &[&"db-1", &12]);
//! blogger::warn!(logger, "retrying {}", 3);
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        DispatchMode, Level, LogMessage, Logger, LoggerBuilder, LoggerError, LoggerMetrics,
        LoggerProps, Pattern, Result, Sink, WorkerPool,
    };
    #[cfg(feature = "console")]
    pub use crate::sinks::{ColoredConsoleSink, ConsoleSink};
    #[cfg(feature = "file")]
    pub use crate::sinks::{RotatingFileSink, RotationPolicy};
}

pub use self::core::{
    DispatchMode, Formatter, Level, LogBuffer, LogMessage, LogRecord, Logger, LoggerBuilder,
    LoggerError, LoggerMetrics, LoggerProps, OwnedRecord, Pattern, Result, Sink, Token,
    WorkerPool, BUFFER_CAPACITY, DEFAULT_OVERFLOW_POSTFIX, DEFAULT_PATTERN, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_TAG,
};
#[cfg(feature = "console")]
pub use sinks::{ColoredConsoleSink, ConsoleSink};
#[cfg(feature = "file")]
pub use sinks::{RotatingFileSink, RotationPolicy};
