//! Output destinations

#[cfg(feature = "console")]
pub mod console;
#[cfg(feature = "file")]
pub mod rotating_file;

#[cfg(feature = "console")]
pub use console::{level_color, ColoredConsoleSink, ConsoleSink};
#[cfg(feature = "file")]
pub use rotating_file::{RotatingFileSink, RotationPolicy};
