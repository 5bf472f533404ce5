//! Fixed-capacity render buffer
//!
//! Every rendered message lives in a [`LogBuffer`]: a stack array plus an
//! occupied-length counter. All writes are capacity-checked; a write that does
//! not fit is dropped whole rather than partially copied. The only partial
//! write is [`BodyWriter`], which the formatter uses for the message body.

use std::fmt;

/// Capacity in bytes of a rendered message, trailing newline included
pub const BUFFER_CAPACITY: usize = 128;

#[derive(Clone)]
pub struct LogBuffer {
    data: [u8; BUFFER_CAPACITY],
    len: usize,
}

impl LogBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0; BUFFER_CAPACITY],
            len: 0,
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.len = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        BUFFER_CAPACITY
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        BUFFER_CAPACITY - self.len
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn last(&self) -> Option<u8> {
        self.as_bytes().last().copied()
    }

    /// Append `bytes` if they fit entirely. Returns whether anything was written.
    pub fn write(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.remaining() {
            return false;
        }
        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        true
    }

    pub fn push(&mut self, byte: u8) -> bool {
        self.write(&[byte])
    }

    /// Append `bytes` surrounded by `open`/`close`, or nothing at all.
    pub fn write_enclosed(&mut self, bytes: &[u8], open: u8, close: u8) -> bool {
        if bytes.len() + 2 > self.remaining() {
            return false;
        }
        self.data[self.len] = open;
        self.data[self.len + 1..self.len + 1 + bytes.len()].copy_from_slice(bytes);
        self.data[self.len + 1 + bytes.len()] = close;
        self.len += bytes.len() + 2;
        true
    }

    /// Format `value` into the buffer, rolling back if it does not fit.
    pub fn write_display(&mut self, value: &dyn fmt::Display) -> bool {
        let start = self.len;
        let mut writer = BodyWriter::new(self, BUFFER_CAPACITY);
        // BodyWriter never reports an error, overflow is tracked instead
        let _ = fmt::write(&mut writer, format_args!("{}", value));
        if writer.overflowed() {
            self.len = start;
            return false;
        }
        true
    }

    /// Shrink the occupied length. Growing is not possible through this call.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            self.len = len;
        }
    }

    /// Terminate the message with `\n`.
    ///
    /// When the buffer is full the last occupied byte is replaced, so the
    /// result is always newline-terminated and never exceeds capacity.
    pub fn terminate(&mut self) {
        if self.remaining() == 0 {
            self.data[BUFFER_CAPACITY - 1] = b'\n';
        } else {
            self.data[self.len] = b'\n';
            self.len += 1;
        }
    }

    fn is_continuation(&self, index: usize) -> bool {
        index < self.len && (self.data[index] & 0xC0) == 0x80
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogBuffer")
            .field("len", &self.len)
            .field("contents", &String::from_utf8_lossy(self.as_bytes()))
            .finish()
    }
}

/// `fmt::Write` adapter that copies into a [`LogBuffer`] up to an absolute
/// length `limit`, cutting on a UTF-8 boundary and remembering that it did.
pub struct BodyWriter<'b> {
    buffer: &'b mut LogBuffer,
    start: usize,
    limit: usize,
    overflowed: bool,
}

impl<'b> BodyWriter<'b> {
    pub fn new(buffer: &'b mut LogBuffer, limit: usize) -> Self {
        let start = buffer.len;
        Self {
            buffer,
            start,
            limit: limit.clamp(start, BUFFER_CAPACITY),
            overflowed: false,
        }
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Mark a truncated body with `postfix`, cutting back far enough for it to
    /// fit below the limit. A postfix longer than the body area is skipped.
    pub fn finish(self, postfix: &str) -> bool {
        if !self.overflowed {
            return false;
        }
        let room = self.limit - self.start;
        if postfix.len() > room {
            return true;
        }
        let mut cut = self.limit - postfix.len();
        while cut > self.start && self.buffer.is_continuation(cut) {
            cut -= 1;
        }
        self.buffer.truncate(cut);
        self.buffer.write(postfix.as_bytes());
        true
    }
}

impl fmt::Write for BodyWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.overflowed {
            return Ok(());
        }
        let room = self.limit - self.buffer.len;
        if s.len() <= room {
            self.buffer.write(s.as_bytes());
            return Ok(());
        }
        let mut end = room;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buffer.write(&s.as_bytes()[..end]);
        self.overflowed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_write_is_all_or_nothing() {
        let mut buf = LogBuffer::new();
        assert!(buf.write(&[b'a'; BUFFER_CAPACITY - 2]));
        assert!(!buf.write(b"xyz"));
        assert_eq!(buf.len(), BUFFER_CAPACITY - 2);
        assert!(buf.write(b"xy"));
        assert_eq!(buf.remaining(), 0);
        assert!(!buf.push(b'!'));
    }

    #[test]
    fn test_enclosed_needs_room_for_brackets() {
        let mut buf = LogBuffer::new();
        buf.write(&[b'a'; BUFFER_CAPACITY - 5]);
        assert!(!buf.write_enclosed(b"abcd", b'[', b']'));
        assert!(buf.write_enclosed(b"abc", b'[', b']'));
        assert_eq!(&buf.as_bytes()[BUFFER_CAPACITY - 5..], b"[abc]");
    }

    #[test]
    fn test_terminate_overwrites_when_full() {
        let mut buf = LogBuffer::new();
        buf.write(&[b'a'; BUFFER_CAPACITY]);
        buf.terminate();
        assert_eq!(buf.len(), BUFFER_CAPACITY);
        assert_eq!(buf.last(), Some(b'\n'));

        buf.reset();
        buf.write(b"hi");
        buf.terminate();
        assert_eq!(buf.as_bytes(), b"hi\n");
    }

    #[test]
    fn test_reset_forgets_previous_contents() {
        let mut buf = LogBuffer::new();
        buf.write(b"first message");
        buf.reset();
        assert!(buf.is_empty());
        buf.write(b"2nd");
        assert_eq!(buf.as_bytes(), b"2nd");
    }

    #[test]
    fn test_body_writer_cuts_on_char_boundary() {
        let mut buf = LogBuffer::new();
        buf.write(&[b'a'; BUFFER_CAPACITY - 3]);
        let mut body = BodyWriter::new(&mut buf, BUFFER_CAPACITY);
        // 'é' is two bytes; only one full char fits in the 3 remaining bytes
        body.write_str("éé").unwrap();
        assert!(body.overflowed());
        assert_eq!(buf.len(), BUFFER_CAPACITY - 1);
        assert!(std::str::from_utf8(buf.as_bytes()).is_ok());
    }

    #[test]
    fn test_body_writer_postfix() {
        let mut buf = LogBuffer::new();
        let mut body = BodyWriter::new(&mut buf, 10);
        body.write_str("0123456789abcdef").unwrap();
        assert!(body.finish("..."));
        assert_eq!(buf.as_bytes(), b"0123456...");
    }

    #[test]
    fn test_body_writer_no_postfix_when_fitting() {
        let mut buf = LogBuffer::new();
        let mut body = BodyWriter::new(&mut buf, 10);
        body.write_str("0123456789").unwrap();
        assert!(!body.finish("..."));
        assert_eq!(buf.as_bytes(), b"0123456789");
    }

    #[test]
    fn test_write_display_rolls_back() {
        let mut buf = LogBuffer::new();
        buf.write(&[b'a'; BUFFER_CAPACITY - 2]);
        assert!(!buf.write_display(&12345));
        assert_eq!(buf.len(), BUFFER_CAPACITY - 2);
        assert!(buf.write_display(&42));
        assert_eq!(&buf.as_bytes()[BUFFER_CAPACITY - 2..], b"42");
    }
}
