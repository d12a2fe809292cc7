//! SQLite storage backend for the chama ledger.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
