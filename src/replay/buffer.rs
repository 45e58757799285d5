use std::collections::VecDeque;

use crate::message::Message;

use super::provider::ReplayError;

/// An ordered, ID-addressable queue of buffered messages.
///
/// The buffer either trusts callers to set unique message IDs, or assigns
/// monotonically increasing decimal IDs itself when constructed with
/// `auto_ids`. Appending and removing are O(1) amortized; looking up the
/// tail that starts at a given ID is a linear scan.
#[derive(Debug)]
pub(crate) struct Buffer {
    events: VecDeque<Message>,
    auto_ids: bool,
    next_id: u64,
}

impl Buffer {
    pub(crate) fn new(auto_ids: bool, capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            auto_ids,
            next_id: 1,
        }
    }

    /// Appends a message, assigning it the next ID when auto-IDs are on.
    /// The caller's message is updated in place so publishers observe the
    /// assigned ID; the buffer keeps its own copy.
    pub(crate) fn queue(&mut self, message: &mut Message) {
        if self.auto_ids {
            message.id = self.next_id.to_string();
            self.next_id += 1;
        }
        self.events.push_back(message.clone());
    }

    /// Removes and returns the oldest message, if any.
    pub(crate) fn dequeue(&mut self) -> Option<Message> {
        self.events.pop_front()
    }

    /// Peeks at the oldest message without removing it.
    pub(crate) fn front(&self) -> Option<&Message> {
        self.events.front()
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns the contiguous run of messages starting at the one whose ID
    /// equals `from_id` (first match wins), or `IdNotFound` if no buffered
    /// message carries that ID. The anchor itself is the first element;
    /// callers replaying "everything after" skip it.
    pub(crate) fn slice(
        &self,
        from_id: &str,
    ) -> Result<impl Iterator<Item = &Message>, ReplayError> {
        match self.events.iter().position(|event| event.id == from_id) {
            Some(at) => Ok(self.events.iter().skip(at)),
            None => Err(ReplayError::IdNotFound {
                id: from_id.to_owned(),
            }),
        }
    }
}
