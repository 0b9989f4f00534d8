//! Webshell Storage Layer
//!
//! SQLite-backed key-value store shared by the deep link queue, the push
//! token lifecycle and the navigation router. Every write is a single
//! statement, so each key is replaced atomically; ordering across keys is
//! not guaranteed.

mod database;
mod error;
pub mod keys;
mod migrations;

pub use database::Database;
pub use error::StorageError;

pub type Result<T> = std::result::Result<T, StorageError>;
