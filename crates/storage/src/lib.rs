#![forbid(unsafe_code)]

pub mod http;
pub mod repository;

pub use http::{HttpSessionStore, HttpStoreConfig};
pub use repository::{InMemorySessionStore, SessionStore, StorageError};
