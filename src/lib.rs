//! RustyCall is the session core of a peer-to-peer video call.
//!
//! One participant hosts a room; others join it by the host's participant id.
//! Each pair of participants talks over its own connection, carrying a small
//! binary control protocol (chat, roster, moderation) next to the media tracks.
//!
//! It provides one binary:
//! - `loopback_call`: runs a host and two guests in one process over the
//!   in-memory signaling hub and prints how their rosters converge.
//!
//! The entry point for embedders is [`core::CallSession`].

/// Handles configuration loading and management.
pub mod config;
/// Owns the per-peer connections, their handshakes and reader threads.
pub mod connection_manager;
/// Binary encoding of the messages exchanged on the control channel.
pub mod control_protocol;
/// Call session state machine, its events and errors.
pub mod core;
/// Logging utilities for the application.
pub mod log;
/// Local capture devices and the tracks sent to peers.
pub mod media_source_manager;
/// Participant list replicated from the host.
pub mod roster;
/// Rendezvous used to reach a participant by id.
pub mod signaling_client;
/// Paired control and media channels between two participants.
pub mod transport;
/// Small helpers shared across modules.
pub mod utils;
