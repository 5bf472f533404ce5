//! Logging macros
//!
//! These build the `&[&dyn Display]` argument slice for the logger's methods,
//! so callers can pass values directly.
//!
//! # Examples
//!
//! ```
//! use blogger::prelude::*;
//! use blogger::info;
//!
//! let logger = Logger::new("server");
//!
//! // Basic logging
//! info!(logger, "Server started");
//!
//! // Each {} takes the next argument
//! let port = 8080;
//! info!(logger, "Server listening on port {}", port);
//!
//! let user_id = 42;
//! let action = "login";
//! info!(logger, "User {} performed action: {}", user_id, action);
//! ```

/// Log at an explicit level.
///
/// # Examples
///
/// ```
/// # use blogger::prelude::*;
/// # let logger = Logger::new("app");
/// use blogger::log;
/// log!(logger, Level::Info, "Simple message");
/// log!(logger, Level::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $fmt:expr $(, $arg:expr)* $(,)?) => {
        $logger.log(
            $level,
            $fmt,
            &[$(&$arg as &dyn ::core::fmt::Display),*],
        )
    };
}

/// Log a trace-level message.
///
/// # Examples
///
/// ```
/// # use blogger::prelude::*;
/// # let logger = Logger::new("app");
/// use blogger::trace;
/// trace!(logger, "Entering function: calculate()");
/// trace!(logger, "Variable value: {}", 42);
/// ```
#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Trace, $($arg)+)
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Info, $($arg)+)
    };
}

/// Log a warning-level message.
///
/// # Examples
///
/// ```
/// # use blogger::prelude::*;
/// # let logger = Logger::new("app");
/// use blogger::warn;
/// warn!(logger, "Low disk space");
/// warn!(logger, "Retry attempt {} of {}", 3, 5);
/// ```
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Error, $($arg)+)
    };
}

/// Log a critical-level message.
///
/// # Examples
///
/// ```
/// # use blogger::prelude::*;
/// # let logger = Logger::new("app");
/// use blogger::crit;
/// crit!(logger, "Critical system failure");
/// crit!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! crit {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Crit, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Level, LogMessage, Logger, Result, Sink};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Lines(Arc<Mutex<Vec<String>>>);

    impl Sink for Lines {
        fn write(&mut self, message: &LogMessage<'_>) -> Result<()> {
            self.0.lock().push(message.to_string_lossy().into_owned());
            Ok(())
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "lines"
        }
    }

    fn logger() -> (Logger, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let logger = Logger::builder()
            .tag("m")
            .pattern("{lvl}{msg}")
            .sink(Lines(Arc::clone(&lines)))
            .build();
        (logger, lines)
    }

    #[test]
    fn test_log_macro() {
        let (logger, lines) = logger();
        log!(logger, Level::Info, "Test message");
        log!(logger, Level::Info, "Formatted: {}", 42);
        log!(logger, Level::Info, "Trailing comma {}", 1,);

        assert_eq!(
            *lines.lock(),
            vec![
                "[INFO] Test message\n",
                "[INFO] Formatted: 42\n",
                "[INFO] Trailing comma 1\n",
            ]
        );
    }

    #[test]
    fn test_level_macros() {
        let (logger, lines) = logger();
        trace!(logger, "t {}", 1);
        debug!(logger, "d");
        info!(logger, "i {} {}", "a", 'b');
        warn!(logger, "w");
        error!(logger, "e {}", 2.5);
        crit!(logger, "c");

        assert_eq!(
            *lines.lock(),
            vec![
                "[TRACE] t 1\n",
                "[DEBUG] d\n",
                "[INFO] i a b\n",
                "[WARNING] w\n",
                "[ERROR] e 2.5\n",
                "[CRITICAL] c\n",
            ]
        );
    }

    #[test]
    fn test_macro_respects_filter() {
        let (logger, lines) = logger();
        logger.set_filter(Level::Error);
        info!(logger, "hidden {}", 1);
        error!(logger, "shown");

        assert_eq!(*lines.lock(), vec!["[ERROR] shown\n"]);
    }
}
