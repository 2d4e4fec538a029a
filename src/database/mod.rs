/*!
 * Database module for the persistent translation memory.
 *
 * This module provides SQLite-based persistence for translations keyed by
 * (source text, target language), shared across runs and documents.
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{ConflictPolicy, InsertOutcome, MemoryStats};
pub use repository::Repository;
