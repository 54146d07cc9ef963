//! Adapters that turn connections into participants for the hub.

pub mod line;
pub mod tcp;
pub mod web;

pub use tcp::TcpParticipant;
pub use web::WebParticipant;
