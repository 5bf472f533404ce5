//! Sink trait for log output destinations

use super::{error::Result, record::LogMessage};
use parking_lot::Mutex;
use std::sync::Arc;

/// Destination for rendered log messages.
///
/// A sink is owned by one logger and driven from whichever thread that
/// logger dispatches on, hence `Send`. To feed one sink from several loggers,
/// share it as `Arc<Mutex<S>>`, which is itself a `Sink`.
pub trait Sink: Send {
    fn write(&mut self, message: &LogMessage<'_>) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, message: &LogMessage<'_>) -> Result<()> {
        (**self).write(message)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<S: Sink + ?Sized> Sink for Arc<Mutex<S>> {
    fn write(&mut self, message: &LogMessage<'_>) -> Result<()> {
        self.lock().write(message)
    }

    fn flush(&mut self) -> Result<()> {
        self.lock().flush()
    }

    fn name(&self) -> &str {
        "shared"
    }
}
