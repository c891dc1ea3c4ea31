//! # palaver-store
//!
//! Client-side conversation synchronization core. Three concurrent input
//! streams — user actions, server responses, and push events — are
//! reconciled into one consistent view by serializing every state mutation
//! onto a single store task. External layers drive the store through
//! [`StoreHandle`], observe it through [`StoreNotification`]s, and read it
//! through [`StoreSnapshot`]s; they never mutate its state directly.

pub mod directory;
pub mod presence;
pub mod relay;
pub mod store;
pub mod timeline;
pub mod unread;

mod error;

pub use error::{Result, StoreError};
pub use store::{
    spawn_store, StoreCommand, StoreConfig, StoreHandle, StoreNotification, StoreSnapshot,
};
