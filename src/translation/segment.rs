/*!
 * Segments and batches.
 *
 * A `Segment` is one translatable unit of a document. A `Batch` is a bounded,
 * ordered group of segments that missed the translation memory, together with
 * the slots needed to route each result back to its segment.
 */

/// One translatable unit of text within a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Identifier, stable within a document
    pub id: String,
    /// Source text as it appears in the document
    pub source: String,
    /// Translated text, absent until a pipeline run fills it
    pub target: Option<String>,
    /// Index preserving document order
    pub position: usize,
}

impl Segment {
    /// Create an untranslated segment
    pub fn new(id: impl Into<String>, source: impl Into<String>, position: usize) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: None,
            position,
        }
    }

    /// Build the ordered segment list for `(id, source)` pairs
    pub fn from_pairs<I, S, T>(pairs: I) -> Vec<Segment>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        pairs
            .into_iter()
            .enumerate()
            .map(|(position, (id, source))| Segment::new(id, source, position))
            .collect()
    }

    /// Whether the source is empty or whitespace-only
    pub fn is_malformed(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// The text used both as translation memory key and as MT payload
    pub fn key(&self) -> &str {
        self.source.trim()
    }

    /// Whether a target text is present
    pub fn is_translated(&self) -> bool {
        self.target.is_some()
    }
}

/// A pending segment inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    /// Index of the segment in the slice the pipeline was given
    pub slot: usize,
    /// Identifier of the segment
    pub id: String,
    /// Trimmed source text sent to the backend
    pub source: String,
}

/// An ordered group of pending segments sent in one backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Zero-based index of the batch within the document
    pub index: usize,
    /// Items in document order
    pub items: Vec<BatchItem>,
}

impl Batch {
    /// The text payload, in item order
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|item| item.source.clone()).collect()
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the batch carries no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split pending items into consecutive batches of at most `max_size` items
///
/// Chunking never reorders items. A `max_size` of zero is treated as one.
pub fn into_batches(pending: Vec<BatchItem>, max_size: usize) -> Vec<Batch> {
    let max_size = max_size.max(1);
    let mut batches = Vec::with_capacity(pending.len().div_ceil(max_size));
    let mut items = pending.into_iter().peekable();

    while items.peek().is_some() {
        let chunk: Vec<BatchItem> = items.by_ref().take(max_size).collect();
        batches.push(Batch {
            index: batches.len(),
            items: chunk,
        });
    }

    batches
}
