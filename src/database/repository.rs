/*!
 * Repository layer for translation memory operations.
 *
 * This module provides a high-level API over the `translation_memory` table,
 * abstracting away the SQL details and providing type-safe access.
 */

use anyhow::Result;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};

use super::connection::DatabaseConnection;
use super::models::{ConflictPolicy, InsertOutcome, MemoryRecord, MemoryStats};

/// Repository for translation memory operations
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        let db = DatabaseConnection::new_default()?;
        Ok(Self::new(db))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Compute SHA256 hash of text
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Look up a stored translation by exact source text and target language
    ///
    /// A hit bumps the entry's hit counter.
    pub async fn lookup(&self, source_text: &str, target_language: &str) -> Result<Option<String>> {
        let source_text_hash = Self::hash_text(source_text);
        let source_text = source_text.to_string();
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                let found = Self::find_sync(conn, &source_text_hash, &source_text, &target_language)?;

                if let Some((id, translated_text)) = found {
                    conn.execute(
                        "UPDATE translation_memory SET hit_count = hit_count + 1 WHERE id = ?1",
                        [id],
                    )?;
                    debug!("Translation memory hit ({})", target_language);
                    Ok(Some(translated_text))
                } else {
                    Ok(None)
                }
            })
            .await
    }

    /// Find an entry id and translation (synchronous, for use inside other operations)
    fn find_sync(
        conn: &Connection,
        source_text_hash: &str,
        source_text: &str,
        target_language: &str,
    ) -> Result<Option<(i64, String)>> {
        let result = conn
            .query_row(
                r#"
                SELECT id, translated_text
                FROM translation_memory
                WHERE source_text_hash = ?1
                  AND source_text = ?2
                  AND target_language = ?3
                "#,
                params![source_text_hash, source_text, target_language],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(result)
    }

    /// Store a translation, resolving key conflicts with the given policy
    pub async fn insert(
        &self,
        source_text: &str,
        target_language: &str,
        translated_text: &str,
        policy: ConflictPolicy,
    ) -> Result<InsertOutcome> {
        let source_text_hash = Self::hash_text(source_text);
        let source_text = source_text.to_string();
        let target_language = target_language.to_string();
        let translated_text = translated_text.to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.db
            .transaction_async(move |tx| {
                let existing =
                    Self::find_sync(tx, &source_text_hash, &source_text, &target_language)?;

                let outcome = match existing {
                    None => {
                        tx.execute(
                            r#"
                            INSERT INTO translation_memory (
                                source_text_hash, source_text, target_language,
                                translated_text, created_at, updated_at, hit_count
                            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5, 0)
                            "#,
                            params![
                                source_text_hash,
                                source_text,
                                target_language,
                                translated_text,
                                now,
                            ],
                        )?;
                        InsertOutcome::Inserted
                    }
                    Some((_, current)) if current == translated_text => InsertOutcome::Unchanged,
                    Some(_) if policy == ConflictPolicy::KeepExisting => InsertOutcome::Unchanged,
                    Some((id, _)) => {
                        tx.execute(
                            "UPDATE translation_memory SET translated_text = ?1, updated_at = ?2 WHERE id = ?3",
                            params![translated_text, now, id],
                        )?;
                        InsertOutcome::Replaced
                    }
                };

                Ok(outcome)
            })
            .await
    }

    /// Get all entries for a target language, most used first
    pub async fn entries_for_language(&self, target_language: &str) -> Result<Vec<MemoryRecord>> {
        let target_language = target_language.to_string();

        self.db
            .execute_async(move |conn| {
                let mut stmt = conn.prepare(
                    r#"
                    SELECT id, source_text_hash, source_text, target_language, translated_text,
                           created_at, updated_at, hit_count
                    FROM translation_memory
                    WHERE target_language = ?1
                    ORDER BY hit_count DESC, id ASC
                    "#,
                )?;

                let rows = stmt.query_map([&target_language], |row| {
                    Ok(MemoryRecord {
                        id: row.get(0)?,
                        source_text_hash: row.get(1)?,
                        source_text: row.get(2)?,
                        target_language: row.get(3)?,
                        translated_text: row.get(4)?,
                        created_at: row.get(5)?,
                        updated_at: row.get(6)?,
                        hit_count: row.get(7)?,
                    })
                })?;

                let records = rows.collect::<rusqlite::Result<Vec<MemoryRecord>>>()?;
                Ok(records)
            })
            .await
    }

    /// Get translation memory statistics
    pub async fn stats(&self) -> Result<MemoryStats> {
        self.db
            .execute_async(|conn| {
                let total_entries: i64 =
                    conn.query_row("SELECT COUNT(*) FROM translation_memory", [], |row| row.get(0))?;

                let total_hits: i64 = conn.query_row(
                    "SELECT COALESCE(SUM(hit_count), 0) FROM translation_memory",
                    [],
                    |row| row.get(0),
                )?;

                let mut stmt = conn.prepare(
                    r#"
                    SELECT target_language, COUNT(*)
                    FROM translation_memory
                    GROUP BY target_language
                    ORDER BY target_language
                    "#,
                )?;
                let entries_by_language = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;

                Ok(MemoryStats {
                    total_entries,
                    total_hits,
                    entries_by_language,
                })
            })
            .await
    }

    /// Remove every entry, or only those of one target language
    pub async fn clear(&self, target_language: Option<&str>) -> Result<i64> {
        let target_language = target_language.map(str::to_string);

        self.db
            .execute_async(move |conn| {
                let deleted = match target_language {
                    Some(language) => conn.execute(
                        "DELETE FROM translation_memory WHERE target_language = ?1",
                        [language],
                    )?,
                    None => conn.execute("DELETE FROM translation_memory", [])?,
                };
                Ok(deleted as i64)
            })
            .await
    }
}
