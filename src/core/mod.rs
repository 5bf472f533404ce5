//! Core logger types and traits

pub mod buffer;
pub(crate) mod dispatch;
pub mod error;
pub mod formatter;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod pattern;
pub mod props;
pub mod record;
pub mod sink;
pub mod worker_pool;

pub use buffer::{LogBuffer, BUFFER_CAPACITY};
pub use error::{LoggerError, Result};
pub use formatter::{Formatter, DEFAULT_OVERFLOW_POSTFIX};
pub use log_level::Level;
pub use logger::{DispatchMode, Logger, LoggerBuilder, DEFAULT_QUEUE_CAPACITY, DEFAULT_TAG};
pub use metrics::LoggerMetrics;
pub use pattern::{Pattern, Token, DEFAULT_PATTERN};
pub use props::LoggerProps;
pub use record::{LogMessage, LogRecord, OwnedRecord};
pub use sink::Sink;
pub use worker_pool::WorkerPool;
