/*!
 * Translation memory stores.
 *
 * The pipeline talks to the translation memory through the `TranslationMemory`
 * trait. Two stores are provided:
 * - `SqliteMemory`: the persistent store backed by the database repository
 * - `InMemoryMemory`: a process-local map, used for dry runs, tests and benchmarks
 *
 * Keys are compared by exact equality. Callers trim before calling.
 */

use async_trait::async_trait;
use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::database::{ConflictPolicy, InsertOutcome, Repository};
use crate::errors::CacheError;

/// Keyed store of previous translations
#[async_trait]
pub trait TranslationMemory: Send + Sync + Debug {
    /// Look up the translation of `source_text` into `target_language`
    ///
    /// A miss is `Ok(None)`, never an error.
    async fn lookup(&self, source_text: &str, target_language: &str) -> Result<Option<String>, CacheError>;

    /// Store a translation, reporting how an existing entry was treated
    async fn insert(
        &self,
        source_text: &str,
        target_language: &str,
        translated_text: &str,
    ) -> Result<InsertOutcome, CacheError>;
}

/// Translation memory persisted in SQLite
#[derive(Clone)]
pub struct SqliteMemory {
    repository: Repository,
    policy: ConflictPolicy,
}

impl Debug for SqliteMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMemory")
            .field("path", &self.repository.connection().path())
            .field("policy", &self.policy)
            .finish()
    }
}

impl SqliteMemory {
    /// Wrap a repository, resolving key conflicts with `policy`
    pub fn new(repository: Repository, policy: ConflictPolicy) -> Self {
        Self { repository, policy }
    }

    /// The conflict policy applied on insert
    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// The underlying repository
    pub fn repository(&self) -> &Repository {
        &self.repository
    }
}

#[async_trait]
impl TranslationMemory for SqliteMemory {
    async fn lookup(&self, source_text: &str, target_language: &str) -> Result<Option<String>, CacheError> {
        Ok(self.repository.lookup(source_text, target_language).await?)
    }

    async fn insert(
        &self,
        source_text: &str,
        target_language: &str,
        translated_text: &str,
    ) -> Result<InsertOutcome, CacheError> {
        let outcome = self
            .repository
            .insert(source_text, target_language, translated_text, self.policy)
            .await?;

        if outcome == InsertOutcome::Replaced {
            debug!(
                "Overwrote stored translation for '{}' ({})",
                truncate_text(source_text, 30),
                target_language
            );
        }

        Ok(outcome)
    }
}

/// Cache key combining source text and target language
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MemoryKey {
    source_text: String,
    target_language: String,
}

impl MemoryKey {
    fn new(source_text: &str, target_language: &str) -> Self {
        Self {
            source_text: source_text.to_string(),
            target_language: target_language.to_string(),
        }
    }
}

/// Process-local translation memory
///
/// Clones share the same entries. Lookups and inserts can be made to fail on
/// demand to exercise degraded paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMemory {
    entries: Arc<RwLock<HashMap<MemoryKey, String>>>,
    policy: ConflictPolicy,
    fail_lookups: Arc<AtomicBool>,
    fail_inserts: Arc<AtomicBool>,
    lookups: Arc<AtomicUsize>,
    inserts: Arc<AtomicUsize>,
}

impl InMemoryMemory {
    /// Create an empty store with the default conflict policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given conflict policy
    pub fn with_policy(policy: ConflictPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Seed an entry without counting it as an insert
    pub fn seed(&self, source_text: &str, target_language: &str, translated_text: &str) {
        self.entries
            .write()
            .insert(MemoryKey::new(source_text, target_language), translated_text.to_string());
    }

    /// Read an entry without counting it as a lookup
    pub fn get(&self, source_text: &str, target_language: &str) -> Option<String> {
        self.entries
            .read()
            .get(&MemoryKey::new(source_text, target_language))
            .cloned()
    }

    /// Make every subsequent lookup fail (or succeed again)
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent insert fail (or succeed again)
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of lookup calls received
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// Number of insert calls received
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Get the number of entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove all entries
    pub fn clear(&self) {
        self.entries.write().clear();
        debug!("In-memory translation memory cleared");
    }
}

#[async_trait]
impl TranslationMemory for InMemoryMemory {
    async fn lookup(&self, source_text: &str, target_language: &str) -> Result<Option<String>, CacheError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("simulated lookup failure".to_string()));
        }

        Ok(self.get(source_text, target_language))
    }

    async fn insert(
        &self,
        source_text: &str,
        target_language: &str,
        translated_text: &str,
    ) -> Result<InsertOutcome, CacheError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("simulated insert failure".to_string()));
        }

        let mut entries = self.entries.write();
        let key = MemoryKey::new(source_text, target_language);

        let outcome = match entries.get(&key) {
            None => InsertOutcome::Inserted,
            Some(current) if current == translated_text => InsertOutcome::Unchanged,
            Some(_) if self.policy == ConflictPolicy::KeepExisting => InsertOutcome::Unchanged,
            Some(_) => InsertOutcome::Replaced,
        };

        if matches!(outcome, InsertOutcome::Inserted | InsertOutcome::Replaced) {
            entries.insert(key, translated_text.to_string());
        }

        Ok(outcome)
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_length).collect();
        format!("{}...", head)
    }
}
