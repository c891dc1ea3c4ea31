//! # palaver-shared
//!
//! Domain types and contracts shared across the Palaver client crates:
//! identifiers, the message and draft models, the push-channel contract,
//! and the wire payloads exchanged over it.

pub mod channel;
pub mod constants;
pub mod models;
pub mod protocol;
pub mod types;
