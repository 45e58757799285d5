use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// A single already-split line of a message's payload.
///
/// Chunks are created by [`Message::append_data`] and [`Message::comment`],
/// which split their input on line separators, so a chunk's content never
/// contains `\n` or `\r`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub(crate) content: String,
    pub(crate) is_comment: bool,
}

/// A single Server-Sent Events message.
///
/// A `Message` carries an optional event type and ID, an optional retry hint
/// for the client, an optional expiry instant consulted by replay providers,
/// a topic used for routing at publish time (never serialized), and the
/// payload as an ordered list of single-line chunks.
///
/// The zero value (`Message::default()`) is an empty, unnamed message with
/// no payload.
///
/// # Example
///
/// ```rust
/// use ssepub::message::Message;
///
/// let mut message = Message::default();
/// message.append_data(["first line\nsecond line"]);
/// message.comment(["a comment"]);
///
/// let mut encoded = Vec::new();
/// message.write_to(&mut encoded).unwrap();
/// assert_eq!(encoded, b"data: first line\ndata: second line\n: a comment\n\n");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// The event ID. Empty means the message has no ID.
    /// Must not contain `\n`, `\r`, or NUL.
    pub id: String,
    /// The event type (the `event:` field). Empty means the event is unnamed.
    /// Must not contain `\n`, `\r`, or NUL.
    pub event_type: String,
    /// The client reconnection delay, encoded as integer milliseconds.
    /// Zero means the field is absent.
    pub retry: Duration,
    /// The instant after which the message no longer qualifies for replay.
    /// `None` means the message never expires.
    pub expires_at: Option<Instant>,
    /// The routing key the broker uses to select subscribers.
    /// Not part of the wire format.
    pub topic: String,
    pub(crate) chunks: Vec<Chunk>,
}

impl Message {
    /// Appends payload data to the message.
    ///
    /// Each value is split on `\r\n`, `\n`, and `\r` into one chunk per line,
    /// so multi-line input turns into multiple `data:` lines on the wire.
    /// Consecutive separators produce empty chunks; an empty value or a
    /// trailing separator produces none.
    pub fn append_data<S: AsRef<str>>(&mut self, values: impl IntoIterator<Item = S>) {
        for value in values {
            push_lines(&mut self.chunks, value.as_ref(), false);
        }
    }

    /// Appends comment lines to the message.
    ///
    /// Values are split exactly like [`append_data`](Self::append_data), but
    /// the resulting chunks serialize as `:` lines, which clients ignore.
    pub fn comment<S: AsRef<str>>(&mut self, values: impl IntoIterator<Item = S>) {
        for value in values {
            push_lines(&mut self.chunks, value.as_ref(), true);
        }
    }

    /// Clears every field back to its zero state.
    pub fn reset(&mut self) {
        *self = Message::default();
    }

    /// Serializes the message to the SSE wire format.
    ///
    /// Fields are written in a fixed order, each terminated by `\n`: `id:`
    /// if the ID is non-empty, `event:` if the type is non-empty, `retry:`
    /// if the retry span is non-zero, then every chunk in insertion order
    /// (`data:` lines, or `:` lines for comments), and finally the blank
    /// line that ends the event.
    ///
    /// On success the returned count equals the total encoded length. A sink
    /// failure is reported through [`WriteError`], which carries the number
    /// of bytes written before the error.
    pub fn write_to<W: Write>(&self, sink: W) -> Result<u64, WriteError> {
        let mut sink = CountingSink { inner: sink, written: 0 };

        if !self.id.is_empty() {
            sink.put(b"id: ")?;
            sink.put(self.id.as_bytes())?;
            sink.put(b"\n")?;
        }
        if !self.event_type.is_empty() {
            sink.put(b"event: ")?;
            sink.put(self.event_type.as_bytes())?;
            sink.put(b"\n")?;
        }
        if !self.retry.is_zero() {
            sink.put(b"retry: ")?;
            sink.put(self.retry.as_millis().to_string().as_bytes())?;
            sink.put(b"\n")?;
        }
        for chunk in &self.chunks {
            sink.put(if chunk.is_comment { b": " } else { b"data: " })?;
            sink.put(chunk.content.as_bytes())?;
            sink.put(b"\n")?;
        }
        sink.put(b"\n")?;

        Ok(sink.written)
    }

    pub(crate) fn push_chunk(&mut self, content: String, is_comment: bool) {
        self.chunks.push(Chunk { content, is_comment });
    }
}

/// Error returned by [`Message::write_to`] when the sink fails.
#[derive(Debug, Error)]
#[error("message write failed after {written} bytes")]
pub struct WriteError {
    /// Bytes successfully written before the failure.
    pub written: u64,
    #[source]
    pub source: io::Error,
}

struct CountingSink<W> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingSink<W> {
    fn put(&mut self, mut bytes: &[u8]) -> Result<(), WriteError> {
        while !bytes.is_empty() {
            match self.inner.write(bytes) {
                Ok(0) => {
                    return Err(WriteError {
                        written: self.written,
                        source: io::ErrorKind::WriteZero.into(),
                    })
                }
                Ok(n) => {
                    self.written += n as u64;
                    bytes = &bytes[n..];
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(WriteError {
                        written: self.written,
                        source: e,
                    })
                }
            }
        }
        Ok(())
    }
}

// Splits `value` on \r\n, \n and \r, pushing one chunk per terminated line
// plus one for a non-empty unterminated remainder. "a\r\rb\r\n" becomes
// ["a", "", "b"]; the empty string becomes nothing.
fn push_lines(chunks: &mut Vec<Chunk>, value: &str, is_comment: bool) {
    let mut rest = value;
    loop {
        match rest.find(['\r', '\n']) {
            Some(at) => {
                chunks.push(Chunk {
                    content: rest[..at].to_owned(),
                    is_comment,
                });
                let bytes = rest.as_bytes();
                let separator = if bytes[at] == b'\r' && bytes.get(at + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                rest = &rest[at + separator..];
            }
            None => {
                if !rest.is_empty() {
                    chunks.push(Chunk {
                        content: rest.to_owned(),
                        is_comment,
                    });
                }
                return;
            }
        }
    }
}
