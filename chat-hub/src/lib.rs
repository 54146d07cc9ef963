//! Broadcast chat hub: every line one client sends is relayed to every
//! connected client, whether it joined over raw TCP or over a WebSocket.
//!
//! A single hub loop owns the set of participants and processes arrivals,
//! messages and departures one at a time; everything else talks to it through
//! channels. Each module focuses on a concrete responsibility:
//!
//! - [`hub`] runs that loop, keeps the [`registry`] and fans messages out.
//! - [`participant`] defines the transport-independent [`participant::Participant`]
//!   trait and the per-participant receive task.
//! - [`event`] carries the three event streams into the loop.
//! - [`transport`] holds the TCP and WebSocket adapters that produce
//!   participants, plus the landing page.
//! - [`boundary`] screens names and messages before they reach the hub.
//! - [`server`] binds both transports and wires them to a hub.
//! - [`cli`] and [`config`] parse flags into runtime configuration.
//! - [`client`] is a small terminal client for the TCP transport.
//! - [`notice`] holds the system messages clients see.

pub mod boundary;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod hub;
pub mod notice;
pub mod participant;
pub mod registry;
pub mod server;
pub mod transport;

#[cfg(test)]
mod testing;
