use std::io::{self, Write};
use std::time::Duration;

use super::event::Chunk;
use super::{FieldReason, Message, UnmarshalError};

fn data_chunk(content: &str) -> Chunk {
    Chunk {
        content: content.to_owned(),
        is_comment: false,
    }
}

fn comment_chunk(content: &str) -> Chunk {
    Chunk {
        content: content.to_owned(),
        is_comment: true,
    }
}

#[test]
fn test_append_data_splits_lines() {
    let mut message = Message {
        id: "lol".to_owned(),
        event_type: "x".to_owned(),
        retry: Duration::from_secs(1),
        ..Message::default()
    };
    message.append_data(["whatever", "input", "will\nbe\nchunked", "amazing"]);

    let expected = vec![
        data_chunk("whatever"),
        data_chunk("input"),
        data_chunk("will"),
        data_chunk("be"),
        data_chunk("chunked"),
        data_chunk("amazing"),
    ];
    assert_eq!(message.chunks, expected);
}

#[test]
fn test_append_data_preserves_interior_empty_lines() {
    let mut message = Message::default();
    message.append_data(["a\r\rb\r\n", ""]);

    // The separator pair yields an empty line between "a" and "b"; the
    // trailing separator and the empty value yield nothing.
    let expected = vec![data_chunk("a"), data_chunk(""), data_chunk("b")];
    assert_eq!(message.chunks, expected);
}

#[test]
fn test_chunks_contain_no_line_breaks() {
    let mut message = Message::default();
    message.append_data(["first\rsecond\r\nthird\n", "\n\nfourth"]);
    message.comment(["note\nacross lines\r"]);

    assert!(!message.chunks.is_empty());
    for chunk in &message.chunks {
        assert!(!chunk.content.contains('\n'));
        assert!(!chunk.content.contains('\r'));
    }
}

#[test]
fn test_write_to_encodes_fields_in_order() {
    let mut message = Message {
        id: "example_id".to_owned(),
        event_type: "test_event".to_owned(),
        retry: Duration::from_secs(5),
        ..Message::default()
    };
    message.append_data(["This is an example\nOf an event", "", "a string here"]);
    message.comment(["This test should pass"]);
    message.append_data(["Important data\nImportant again\r\rVery important\r\n"]);

    let expected = "id: example_id\nevent: test_event\nretry: 5000\n\
                    data: This is an example\ndata: Of an event\ndata: a string here\n\
                    : This test should pass\n\
                    data: Important data\ndata: Important again\ndata: \ndata: Very important\n\n";

    let mut output = Vec::new();
    let written = message.write_to(&mut output).expect("write failed");

    assert_eq!(output, expected.as_bytes());
    assert_eq!(written, expected.len() as u64);
}

#[test]
fn test_write_to_omits_empty_fields() {
    let mut message = Message::default();
    message.append_data(["payload"]);

    let mut output = Vec::new();
    message.write_to(&mut output).expect("write failed");

    assert_eq!(output, b"data: payload\n\n");
}

// A sink that accepts a fixed number of bytes, then fails.
struct ShortSink {
    room: usize,
}

impl Write for ShortSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.room == 0 {
            return Err(io::ErrorKind::BrokenPipe.into());
        }
        let n = buf.len().min(self.room);
        self.room -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_write_to_reports_partial_byte_count() {
    let mut message = Message {
        id: "1".to_owned(),
        ..Message::default()
    };
    message.append_data(["hello"]);

    let err = message
        .write_to(ShortSink { room: 9 })
        .expect_err("write should fail");

    // "id: 1\n" plus "dat" of the next line fit before the sink broke.
    assert_eq!(err.written, 9);
    assert_eq!(err.source.kind(), io::ErrorKind::BrokenPipe);
}

#[test]
fn test_unmarshal_valid_stream() {
    let input = b"data: raw bytes here\nretry: 500\nretry: 1000\nid: 1000\nid: 2000\nid: \x001\n: with comments\ndata: again raw bytes\ndata: from multiple lines\nevent: overwritten name\nevent: my name here\n\ndata: I should be ignored";

    let mut message = Message::default();
    message.unmarshal(input).expect("unmarshal failed");

    let expected = Message {
        id: "2000".to_owned(),
        event_type: "my name here".to_owned(),
        retry: Duration::from_secs(1),
        chunks: vec![
            data_chunk("raw bytes here"),
            comment_chunk("with comments"),
            data_chunk("again raw bytes"),
            data_chunk("from multiple lines"),
        ],
        ..Message::default()
    };
    assert_eq!(message, expected);
}

#[test]
fn test_unmarshal_empty_input() {
    let mut message = Message::default();
    let err = message.unmarshal(b"").expect_err("unmarshal should fail");

    assert_eq!(err, UnmarshalError::UnexpectedEof);
    assert_eq!(message, Message::default());
}

#[test]
fn test_unmarshal_missing_terminator() {
    let mut message = Message::default();
    let err = message
        .unmarshal(b"data: first\ndata:second\ndata:third")
        .expect_err("unmarshal should fail");

    assert_eq!(err, UnmarshalError::UnexpectedEof);
    assert_eq!(message, Message::default());
}

#[test]
fn test_unmarshal_invalid_retry() {
    let mut message = Message::default();
    message.append_data(["stale"]);

    let err = message
        .unmarshal(b"retry: sigma male\n")
        .expect_err("unmarshal should fail");

    assert_eq!(
        err,
        UnmarshalError::MalformedField {
            field: "retry".to_owned(),
            value: "sigma male".to_owned(),
            reason: FieldReason::NotAsciiDigit('s'),
        }
    );
    assert_eq!(
        err.to_string(),
        "invalid value \"sigma male\" for field \"retry\": \
         contains character 's', which is not an ASCII digit"
    );
    // A failed decode resets the message, stale chunks included.
    assert_eq!(message, Message::default());
}

#[test]
fn test_unmarshal_empty_retry() {
    let mut message = Message::default();
    let err = message
        .unmarshal(b"retry:\n\n")
        .expect_err("unmarshal should fail");

    assert_eq!(
        err,
        UnmarshalError::MalformedField {
            field: "retry".to_owned(),
            value: String::new(),
            reason: FieldReason::Empty,
        }
    );
}

#[test]
fn test_unmarshal_accepts_every_line_terminator() {
    let mut message = Message::default();
    message
        .unmarshal(b"data: one\r\ndata: two\rdata: three\n\n")
        .expect("unmarshal failed");

    let expected = vec![data_chunk("one"), data_chunk("two"), data_chunk("three")];
    assert_eq!(message.chunks, expected);
}

#[test]
fn test_unmarshal_field_without_colon_and_unknown_fields() {
    let mut message = Message::default();
    message
        .unmarshal(b"data\nunknown: ignored\nevent: named\n\n")
        .expect("unmarshal failed");

    // A bare field name has an empty value; unknown fields are skipped.
    assert_eq!(message.chunks, vec![data_chunk("")]);
    assert_eq!(message.event_type, "named");
}

#[test]
fn test_unmarshal_round_trips_encoded_message() {
    let mut original = Message {
        id: "42".to_owned(),
        event_type: "update".to_owned(),
        retry: Duration::from_millis(2500),
        ..Message::default()
    };
    original.append_data(["one\ntwo", "three"]);
    original.comment(["keep alive"]);

    let mut encoded = Vec::new();
    original.write_to(&mut encoded).expect("write failed");

    let mut decoded = Message::default();
    decoded.unmarshal(&encoded).expect("unmarshal failed");

    assert_eq!(decoded, original);
}

#[test]
fn test_reset_clears_all_fields() {
    let mut message = Message {
        id: "7".to_owned(),
        event_type: "gone".to_owned(),
        retry: Duration::from_secs(3),
        topic: "updates".to_owned(),
        ..Message::default()
    };
    message.append_data(["payload"]);

    message.reset();
    assert_eq!(message, Message::default());
}
