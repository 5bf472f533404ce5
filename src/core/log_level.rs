//! Log level definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Message severity. Ordering follows the discriminant: lower is more verbose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Trace = 0,
    Debug = 1,
    Info = 2,
    #[serde(alias = "warning")]
    Warn = 3,
    Error = 4,
    #[serde(alias = "critical", alias = "fatal")]
    Crit = 5,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Crit,
    ];

    /// Keyword written by the `{lvl}` pattern token
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARNING",
            Level::Error => "ERROR",
            Level::Crit => "CRITICAL",
        }
    }

    /// Whether a message at `self` passes a logger filtering at `filter`
    #[inline]
    pub fn passes(self, filter: Level) -> bool {
        self >= filter
    }

    pub(crate) fn from_u8(value: u8) -> Level {
        match value {
            0 => Level::Trace,
            1 => Level::Debug,
            2 => Level::Info,
            3 => Level::Warn,
            4 => Level::Error,
            _ => Level::Crit,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(Level::Trace),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARN" | "WARNING" => Ok(Level::Warn),
            "ERROR" => Ok(Level::Error),
            "CRIT" | "CRITICAL" | "FATAL" => Ok(Level::Crit),
            _ => Err(format!("Invalid log level: '{}'", s)),
        }
    }
}
