//! Console sinks
//!
//! Every console sink in the process writes under one lock, so a message
//! (and its color sequences) is never interleaved with another's.

use crate::core::{Level, LogMessage, Result, Sink};
use colored::Color;
use parking_lot::Mutex;
use std::io::{self, Write};

static CONSOLE_WRITE_LOCK: Mutex<()> = parking_lot::const_mutex(());

const COLOR_RESET: &[u8] = b"\x1b[0m";

/// Plain console output. Writes to stdout unless built with
/// [`with_writer`](ConsoleSink::with_writer).
pub struct ConsoleSink<W: Write + Send = io::Stdout> {
    out: W,
}

impl ConsoleSink<io::Stdout> {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for ConsoleSink<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Caller must hold the console lock
    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)
    }
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn write(&mut self, message: &LogMessage<'_>) -> Result<()> {
        let _guard = CONSOLE_WRITE_LOCK.lock();
        self.write_raw(message.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let _guard = CONSOLE_WRITE_LOCK.lock();
        self.out.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Terminal color for each level
pub fn level_color(level: Level) -> Color {
    match level {
        Level::Trace => Color::BrightBlack,
        Level::Debug => Color::Blue,
        Level::Info => Color::Green,
        Level::Warn => Color::Yellow,
        Level::Error => Color::Red,
        Level::Crit => Color::BrightRed,
    }
}

/// Console output wrapped in the level's ANSI color
pub struct ColoredConsoleSink<W: Write + Send = io::Stdout> {
    inner: ConsoleSink<W>,
    use_colors: bool,
}

impl ColoredConsoleSink<io::Stdout> {
    /// Colors are on when `colored` detects a capable terminal
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for ColoredConsoleSink<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> ColoredConsoleSink<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            inner: ConsoleSink::with_writer(out),
            use_colors: colored::control::SHOULD_COLORIZE.should_colorize(),
        }
    }

    /// Force colors on or off
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn uses_colors(&self) -> bool {
        self.use_colors
    }

    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }
}

impl<W: Write + Send> Sink for ColoredConsoleSink<W> {
    fn write(&mut self, message: &LogMessage<'_>) -> Result<()> {
        let _guard = CONSOLE_WRITE_LOCK.lock();

        if !self.use_colors {
            self.inner.write_raw(message.as_bytes())?;
            return Ok(());
        }

        let color = format!("\x1b[{}m", level_color(message.level()).to_fg_str());
        self.inner.write_raw(color.as_bytes())?;
        self.inner.write_raw(message.as_bytes())?;
        self.inner.write_raw(COLOR_RESET)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn name(&self) -> &str {
        "colored_console"
    }
}
