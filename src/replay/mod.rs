//! The `replay` module buffers published messages and resends them to new
//! subscribers.
//!
//! It contains the following main components:
//!
//! - `Buffer`: an ordered, ID-addressable queue of messages.
//! - `ReplayProvider`: the capability the broker calls on publish, on
//!   subscribe, and on its GC tick.
//! - `Noop`, `Finite`, `Valid`: the bundled retention policies (no replay,
//!   bounded count, and expiry-based validity).

mod buffer;
pub mod provider;

pub use provider::{Finite, Noop, ReplayError, ReplayProvider, Valid};
