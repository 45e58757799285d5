//! The `message` module defines the SSE message model and its wire codec.
//!
//! It provides the `Message` struct, which assembles an event out of
//! single-line payload chunks, and the encoder/decoder pair for the
//! `text/event-stream` wire format: `Message::write_to` emits the byte-exact
//! field lines, and `Message::unmarshal` parses a single event back out of a
//! byte stream.

pub mod codec;
pub mod event;

pub use codec::{FieldReason, UnmarshalError};
pub use event::{Message, WriteError};

#[cfg(test)]
mod tests;
