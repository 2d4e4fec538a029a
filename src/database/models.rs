/*!
 * Database entity models.
 *
 * These structures map directly to the translation memory table and to the
 * outcomes the repository reports back to callers.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// What to do when an insert hits an existing (source text, target language) key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Replace the stored translation with the new one
    #[default]
    Overwrite,
    /// Leave the stored translation untouched
    KeepExisting,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictPolicy::Overwrite => write!(f, "overwrite"),
            ConflictPolicy::KeepExisting => write!(f, "keep_existing"),
        }
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "keep_existing" | "keep-existing" => Ok(ConflictPolicy::KeepExisting),
            _ => Err(anyhow::anyhow!("Invalid conflict policy: {}", s)),
        }
    }
}

/// Result of a translation memory insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// No entry existed for the key; a new one was written
    Inserted,
    /// An entry with a different translation existed and was replaced
    Replaced,
    /// The stored entry was left as is (same text, or policy kept it)
    Unchanged,
}

/// Translation memory record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Database ID
    pub id: i64,
    /// SHA256 hash of source text
    pub source_text_hash: String,
    /// Original source text
    pub source_text: String,
    /// Target locale code
    pub target_language: String,
    /// Translated text
    pub translated_text: String,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
    /// Last update timestamp (RFC 3339)
    pub updated_at: String,
    /// Number of lookups served by this entry
    pub hit_count: i64,
}

/// Aggregate translation memory statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    /// Total number of entries
    pub total_entries: i64,
    /// Sum of hit counts over all entries
    pub total_hits: i64,
    /// Entry count per target language, sorted by language
    pub entries_by_language: Vec<(String, i64)>,
}

impl fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entries, {} hits", self.total_entries, self.total_hits)?;
        for (language, count) in &self.entries_by_language {
            write!(f, "\n  {}: {}", language, count)?;
        }
        Ok(())
    }
}
