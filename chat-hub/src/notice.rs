//! System messages synthesized by the hub and the transport adapters.
//!
//! Every notice carries the `(chatbot): ` prefix so clients can tell them apart
//! from relayed chat text. Existing clients match on these strings, so keep
//! them stable.

use crate::error::NameError;

/// Tag every notice starts with.
pub const PREFIX: &str = "(chatbot): ";

/// Banner sent privately to every new arrival and again on `/help`.
pub const HELP: &str = "(chatbot): Hello, welcome to the chat room\n\
Commands:\n  /help    see this help message again (example: /help)";

/// Sent privately to an arrival refused because the room is at capacity.
pub const ROOM_FULL: &str = "(chatbot): The chat room is full, try again later";

/// Sent privately when one inbound unit holds more than one line.
pub const SINGLE_LINE_ONLY: &str = "(chatbot): Messages must fit on a single line";

/// Broadcast once when the hub loop is asked to stop.
pub const SHUTTING_DOWN: &str = "(chatbot): The chat server is shutting down";

pub fn joined(name: &str) -> String {
    format!("{PREFIX}New user {name} has joined.")
}

pub fn left(name: &str) -> String {
    format!("{PREFIX}user {name} left the chat")
}

pub fn message_too_long(max: usize) -> String {
    format!("{PREFIX}Messages cannot be more than {max} characters")
}

pub fn name_rejected(error: &NameError) -> String {
    format!("{PREFIX}{error}")
}
