use std::time::Duration;

use thiserror::Error;

use super::event::Message;

/// Error returned by [`Message::unmarshal`] when the input is not a valid
/// single SSE event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnmarshalError {
    /// The input ran out before the blank line that terminates an event.
    #[error("unexpected end of input before the end of the event")]
    UnexpectedEof,
    /// A field carried a value the parser rejects.
    #[error("invalid value {value:?} for field {field:?}: {reason}")]
    MalformedField {
        field: String,
        value: String,
        reason: FieldReason,
    },
}

/// Why a field value was rejected during decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldReason {
    #[error("contains character {0:?}, which is not an ASCII digit")]
    NotAsciiDigit(char),
    #[error("the value is empty")]
    Empty,
    #[error("the value does not fit in 64 bits")]
    TooLarge,
}

impl Message {
    /// Decodes a single SSE event from `input`, replacing the contents of
    /// `self`.
    ///
    /// The parser follows the SSE stream rules for one event: lines are
    /// terminated by `\n`, `\r`, or `\r\n`; a leading `:` marks a comment;
    /// otherwise the text up to the first `:` names the field and the rest,
    /// after at most one optional space, is its value. `data` lines become
    /// data chunks, `event` sets the type, `id` sets the ID unless the value
    /// contains a NUL byte (then the field is ignored), and `retry` must be
    /// a non-empty ASCII decimal number of milliseconds. For `event`, `id`,
    /// and `retry` the last occurrence wins; unknown fields are skipped.
    ///
    /// Parsing stops at the first empty line; bytes after it are left
    /// unconsumed. If the input ends without one, decoding fails with
    /// [`UnmarshalError::UnexpectedEof`]. On any failure `self` is reset to
    /// the empty message.
    pub fn unmarshal(&mut self, input: &[u8]) -> Result<(), UnmarshalError> {
        self.reset();
        if let Err(e) = decode_into(self, input) {
            self.reset();
            return Err(e);
        }
        Ok(())
    }
}

fn decode_into(message: &mut Message, mut input: &[u8]) -> Result<(), UnmarshalError> {
    while let Some(line) = next_line(&mut input) {
        if line.is_empty() {
            return Ok(());
        }
        dispatch_line(message, line)?;
    }
    Err(UnmarshalError::UnexpectedEof)
}

// Returns the next terminator-delimited line, or None once the input is
// exhausted. An unterminated trailing fragment is not a line; it is dropped
// so the caller reports EOF, as the event terminator was never seen.
fn next_line<'a>(input: &mut &'a [u8]) -> Option<&'a [u8]> {
    let at = input.iter().position(|&b| b == b'\n' || b == b'\r')?;
    let line = &input[..at];
    let separator = if input[at] == b'\r' && input.get(at + 1) == Some(&b'\n') {
        2
    } else {
        1
    };
    *input = &input[at + separator..];
    Some(line)
}

fn dispatch_line(message: &mut Message, line: &[u8]) -> Result<(), UnmarshalError> {
    if line[0] == b':' {
        let value = strip_leading_space(&line[1..]);
        message.push_chunk(decode_value(value), true);
        return Ok(());
    }

    let (name, value) = match line.iter().position(|&b| b == b':') {
        Some(at) => (&line[..at], strip_leading_space(&line[at + 1..])),
        None => (line, &[][..]),
    };

    match name {
        b"data" => message.push_chunk(decode_value(value), false),
        b"event" => message.event_type = decode_value(value),
        b"id" => {
            // Per the SSE specification, an id containing NUL is ignored.
            if !value.contains(&0) {
                message.id = decode_value(value);
            }
        }
        b"retry" => message.retry = parse_retry(value)?,
        _ => {}
    }
    Ok(())
}

fn strip_leading_space(value: &[u8]) -> &[u8] {
    match value.first() {
        Some(b' ') => &value[1..],
        _ => value,
    }
}

fn decode_value(value: &[u8]) -> String {
    String::from_utf8_lossy(value).into_owned()
}

fn parse_retry(value: &[u8]) -> Result<Duration, UnmarshalError> {
    let malformed = |reason| UnmarshalError::MalformedField {
        field: "retry".to_owned(),
        value: decode_value(value),
        reason,
    };

    if value.is_empty() {
        return Err(malformed(FieldReason::Empty));
    }

    let mut millis: u64 = 0;
    for &b in value {
        if !b.is_ascii_digit() {
            return Err(malformed(FieldReason::NotAsciiDigit(b as char)));
        }
        millis = millis
            .checked_mul(10)
            .and_then(|m| m.checked_add(u64::from(b - b'0')))
            .ok_or_else(|| malformed(FieldReason::TooLarge))?;
    }

    Ok(Duration::from_millis(millis))
}
