//! Pattern formatter
//!
//! Renders a [`LogRecord`] into a fixed 128-byte [`LogBuffer`]. Pattern tokens
//! are written all-or-nothing; the message body is the only part that can be
//! cut short, in which case it ends with the overflow postfix. The result is
//! always newline-terminated and never longer than [`BUFFER_CAPACITY`].

use super::buffer::{BodyWriter, LogBuffer, BUFFER_CAPACITY};
use super::pattern::{Pattern, Token};
use super::record::{LogMessage, LogRecord};
use chrono::{Local, NaiveTime, Timelike};
use std::fmt::{self, Display, Write};
use std::sync::Arc;

/// Marker appended to a message body that did not fit
pub const DEFAULT_OVERFLOW_POSTFIX: &str = "...";

const ARG_PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone)]
pub struct Formatter {
    pattern: Arc<Pattern>,
    overflow_postfix: Arc<str>,
    buffer: LogBuffer,
    truncated: bool,
}

impl Formatter {
    pub fn new(pattern: Pattern) -> Self {
        Self::with_postfix(Arc::new(pattern), Arc::from(DEFAULT_OVERFLOW_POSTFIX))
    }

    pub fn with_postfix(pattern: Arc<Pattern>, overflow_postfix: Arc<str>) -> Self {
        Self {
            pattern,
            overflow_postfix,
            buffer: LogBuffer::new(),
            truncated: false,
        }
    }

    /// A formatter sharing this one's pattern and postfix but owning a fresh buffer
    pub fn fork(&self) -> Self {
        Self::with_postfix(Arc::clone(&self.pattern), Arc::clone(&self.overflow_postfix))
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn set_pattern(&mut self, pattern: Pattern) {
        self.pattern = Arc::new(pattern);
    }

    pub fn overflow_postfix(&self) -> &str {
        &self.overflow_postfix
    }

    pub fn set_overflow_postfix(&mut self, postfix: &str) {
        self.overflow_postfix = Arc::from(postfix);
    }

    /// Bytes of the most recent render
    pub fn output(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Render `record` stamped with the current local time.
    ///
    /// The clock is only read when the pattern contains a timestamp token.
    pub fn render<A: Display>(&mut self, record: &LogRecord<'_, A>) -> LogMessage<'_> {
        let now = if self.pattern.has_timestamp() {
            Local::now().time()
        } else {
            NaiveTime::MIN
        };
        self.render_at(record, now)
    }

    /// Render `record` with an explicit time of day
    pub fn render_at<A: Display>(
        &mut self,
        record: &LogRecord<'_, A>,
        time: NaiveTime,
    ) -> LogMessage<'_> {
        self.buffer.reset();
        self.truncated = false;

        let mut args = record.args.iter();

        for token in self.pattern.tokens() {
            match token {
                Token::Literal(text) => {
                    self.buffer.write(text.as_bytes());
                }
                Token::Timestamp => {
                    self.buffer.write_enclosed(&clock_digits(time), b'[', b']');
                }
                Token::Level => {
                    self.buffer
                        .write_enclosed(record.level.as_str().as_bytes(), b'[', b']');
                }
                Token::Tag => {
                    self.buffer.write_enclosed(record.tag.as_bytes(), b'[', b']');
                }
                Token::Argument => {
                    if let Some(arg) = args.next() {
                        self.buffer.write_display(arg);
                    }
                }
                Token::Message => {
                    let needs_space = self
                        .buffer
                        .last()
                        .is_some_and(|b| !b.is_ascii_whitespace());
                    if needs_space {
                        self.buffer.push(b' ');
                    }
                    let truncated = write_body(
                        &mut self.buffer,
                        record.format,
                        &mut args,
                        &self.overflow_postfix,
                    );
                    self.truncated |= truncated;
                }
            }
        }

        self.buffer.terminate();

        LogMessage::new(record.level, self.buffer.as_bytes()).with_truncated(self.truncated)
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(Pattern::default())
    }
}

/// Substitute `{}` placeholders left to right. A newline is always kept
/// free at the end of the buffer for the terminator.
fn write_body<'r, A, I>(buffer: &mut LogBuffer, format: &str, args: &mut I, postfix: &str) -> bool
where
    A: Display + 'r,
    I: Iterator<Item = &'r A>,
{
    let mut body = BodyWriter::new(buffer, BUFFER_CAPACITY - 1);
    let mut rest = format;

    while let Some(at) = rest.find(ARG_PLACEHOLDER) {
        let _ = body.write_str(&rest[..at]);
        match args.next() {
            Some(arg) => {
                let _ = fmt::write(&mut body, format_args!("{}", arg));
            }
            None => {
                let _ = body.write_str(ARG_PLACEHOLDER);
            }
        }
        rest = &rest[at + ARG_PLACEHOLDER.len()..];
        if body.overflowed() {
            break;
        }
    }
    let _ = body.write_str(rest);

    body.finish(postfix)
}

fn clock_digits(time: NaiveTime) -> [u8; 8] {
    let two = |n: u32| [b'0' + (n / 10 % 10) as u8, b'0' + (n % 10) as u8];
    let [h1, h2] = two(time.hour());
    let [m1, m2] = two(time.minute());
    let [s1, s2] = two(time.second());
    [h1, h2, b':', m1, m2, b':', s1, s2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::log_level::Level;

    fn noon() -> NaiveTime {
        NaiveTime::from_hms_opt(12, 34, 56).unwrap()
    }

    fn render(formatter: &mut Formatter, level: Level, format: &str, args: &[&dyn Display]) -> String {
        let record = LogRecord::new(level, "core", format, args);
        formatter.render_at(&record, noon()).to_string_lossy().into_owned()
    }

    #[test]
    fn test_default_pattern_layout() {
        let mut formatter = Formatter::default();
        let out = render(&mut formatter, Level::Info, "hello", &[]);
        assert_eq!(out, "[12:34:56][INFO][core] hello\n");
    }

    #[test]
    fn test_placeholders_substituted_in_order() {
        let mut formatter = Formatter::new(Pattern::compile("{msg}").unwrap());
        let out = render(&mut formatter, Level::Info, "[{}] value={}", &[&"x", &42]);
        assert_eq!(out, "[x] value=42\n");
    }

    #[test]
    fn test_missing_and_excess_arguments() {
        let mut formatter = Formatter::new(Pattern::compile("{msg}").unwrap());
        assert_eq!(render(&mut formatter, Level::Info, "{} and {}", &[&1]), "1 and {}\n");
        assert_eq!(render(&mut formatter, Level::Info, "only {}", &[&1, &2, &3]), "only 1\n");
    }

    #[test]
    fn test_layout_argument_token_consumes_first() {
        let mut formatter = Formatter::new(Pattern::compile("<{}>{msg}").unwrap());
        let out = render(&mut formatter, Level::Debug, "then {}", &[&"a", &"b"]);
        assert_eq!(out, "<a> then b\n");
    }

    #[test]
    fn test_static_pattern_ignores_message() {
        let mut formatter = Formatter::new(Pattern::compile("tick{lvl}").unwrap());
        let out = render(&mut formatter, Level::Error, "ignored {}", &[&1]);
        assert_eq!(out, "tick[ERROR]\n");
    }

    #[test]
    fn test_exact_capacity_is_retained() {
        let mut formatter = Formatter::new(Pattern::compile("{msg}").unwrap());
        let body = "a".repeat(BUFFER_CAPACITY - 1);
        let record = LogRecord::<&dyn Display>::new(Level::Info, "t", &body, &[]);
        let msg = formatter.render_at(&record, noon());
        assert_eq!(msg.len(), BUFFER_CAPACITY);
        assert!(!msg.is_truncated());
        assert_eq!(&msg.as_bytes()[..BUFFER_CAPACITY - 1], body.as_bytes());
        assert_eq!(msg.as_bytes()[BUFFER_CAPACITY - 1], b'\n');
    }

    #[test]
    fn test_one_byte_over_is_truncated() {
        let mut formatter = Formatter::new(Pattern::compile("{msg}").unwrap());
        let body = "a".repeat(BUFFER_CAPACITY);
        let record = LogRecord::<&dyn Display>::new(Level::Info, "t", &body, &[]);
        let msg = formatter.render_at(&record, noon());
        assert_eq!(msg.len(), BUFFER_CAPACITY);
        assert!(msg.is_truncated());
        assert!(msg.as_bytes().ends_with(b"...\n"));
    }

    #[test]
    fn test_custom_postfix() {
        let mut formatter = Formatter::new(Pattern::compile("{msg}").unwrap());
        formatter.set_overflow_postfix("~");
        let body = "b".repeat(300);
        let record = LogRecord::<&dyn Display>::new(Level::Info, "t", &body, &[]);
        let msg = formatter.render_at(&record, noon());
        assert!(msg.as_bytes().ends_with(b"b~\n"));
    }

    #[test]
    fn test_tokens_exhausting_capacity_leave_no_body() {
        let long_tag = "t".repeat(BUFFER_CAPACITY - 2);
        let mut formatter = Formatter::new(Pattern::compile("{tag}{msg}").unwrap());
        let record = LogRecord::<&dyn Display>::new(Level::Info, &long_tag, "body", &[]);
        let msg = formatter.render_at(&record, noon());
        assert_eq!(msg.len(), BUFFER_CAPACITY);
        assert_eq!(msg.as_bytes()[BUFFER_CAPACITY - 1], b'\n');
        assert!(!msg.to_string_lossy().contains("body"));
    }

    #[test]
    fn test_consecutive_renders_do_not_leak() {
        let mut formatter = Formatter::new(Pattern::compile("{msg}").unwrap());
        render(&mut formatter, Level::Info, "a much longer first message", &[]);
        let out = render(&mut formatter, Level::Info, "short", &[]);
        assert_eq!(out, "short\n");
    }

    #[test]
    fn test_fork_keeps_configuration() {
        let mut formatter = Formatter::new(Pattern::compile("{lvl}{msg}").unwrap());
        formatter.set_overflow_postfix("!");
        let fork = formatter.fork();
        assert_eq!(fork.pattern(), formatter.pattern());
        assert_eq!(fork.overflow_postfix(), "!");
        assert!(fork.output().is_empty());
    }

    #[test]
    fn test_clock_digits() {
        let t = NaiveTime::from_hms_opt(7, 5, 9).unwrap();
        assert_eq!(&clock_digits(t), b"07:05:09");
    }
}
