//! # Servers
//!
//! Transport layer for the tiered note store. The `notes_logic` module holds
//! configuration, bootstrap and the axum routes; the `server_notes` binary wires
//! them to a listener and OS signals.

pub mod notes_logic;
