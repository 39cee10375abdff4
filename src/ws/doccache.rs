use chrono::{DateTime, Utc};
use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;
use tracing::{debug, info};

use crate::models::{Document, DocumentSummary, Participant};

/// What the session layer needs from document storage.
///
/// Documents are created and deleted elsewhere; the session layer only reads
/// them and overwrites fields of documents that already exist.
pub trait DocumentStore: Send + Sync {
    fn get(&self, document_id: &str) -> Option<Document>;

    fn contains(&self, document_id: &str) -> bool;

    /// Replace the content. Returns the new `lastEdited`, or `None` if the document is unknown.
    fn set_content(&self, document_id: &str, content: &str) -> Option<DateTime<Utc>>;

    /// Replace the title. Returns the new `lastEdited`, or `None` if the document is unknown.
    fn set_title(&self, document_id: &str, title: &str) -> Option<DateTime<Utc>>;

    /// Replace the denormalized participant list. `false` if the document is unknown.
    fn set_participants(&self, document_id: &str, participants: Vec<Participant>) -> bool;
}

/// In-memory authoritative copy of every open document
pub struct DocumentCache {
    cache: Cache<String, Document>,
}

impl DocumentCache {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }

    pub fn insert(&self, document: Document) {
        info!("Caching document {} ({})", document.id, document.title);
        self.cache.insert(document.id.clone(), document);
    }

    /// Summaries of all cached documents, most recently edited first
    pub fn list(&self) -> Vec<DocumentSummary> {
        let mut docs: Vec<DocumentSummary> = self
            .cache
            .iter()
            .map(|(_, doc)| DocumentSummary::from(doc))
            .collect();
        docs.sort_by(|a, b| b.last_edited.cmp(&a.last_edited).then_with(|| a.id.cmp(&b.id)));
        docs
    }

    pub fn len(&self) -> usize {
        self.cache.iter().count()
    }

    /// Atomically modify an existing document. Never inserts.
    fn modify<F>(&self, document_id: &str, f: F) -> Option<Document>
    where
        F: FnOnce(&mut Document),
    {
        let result = self.cache.entry_by_ref(document_id).and_compute_with(|entry| match entry {
            Some(entry) => {
                let mut doc = entry.into_value();
                f(&mut doc);
                Op::Put(doc)
            }
            None => Op::Nop,
        });

        match result {
            CompResult::ReplacedWith(entry) => Some(entry.into_value()),
            _ => {
                debug!("Document {} not in cache, nothing modified", document_id);
                None
            }
        }
    }
}

/// `lastEdited` never moves backwards, even if the wall clock does.
fn touch(doc: &mut Document) {
    doc.last_edited = Utc::now().max(doc.last_edited);
}

impl DocumentStore for DocumentCache {
    fn get(&self, document_id: &str) -> Option<Document> {
        self.cache.get(document_id)
    }

    fn contains(&self, document_id: &str) -> bool {
        self.cache.contains_key(document_id)
    }

    fn set_content(&self, document_id: &str, content: &str) -> Option<DateTime<Utc>> {
        self.modify(document_id, |doc| {
            doc.content = content.to_string();
            touch(doc);
        })
        .map(|doc| doc.last_edited)
    }

    fn set_title(&self, document_id: &str, title: &str) -> Option<DateTime<Utc>> {
        self.modify(document_id, |doc| {
            doc.title = title.to_string();
            touch(doc);
        })
        .map(|doc| doc.last_edited)
    }

    fn set_participants(&self, document_id: &str, participants: Vec<Participant>) -> bool {
        self.modify(document_id, |doc| doc.participants = participants)
            .is_some()
    }
}

/// The welcome document available right after startup
pub fn sample_document() -> Document {
    Document::new(
        "sample-doc-1",
        "Welcome to Collaborative Editor",
        r#"<h1>Welcome to Real-time Collaborative Document Editor</h1>
<p>This is a <strong>real-time collaborative document editor</strong>.</p>

<h2>Features:</h2>
<ul>
  <li>Real-time collaborative editing</li>
  <li>Multiple users can edit simultaneously</li>
  <li>User presence indicators</li>
  <li>Live cursors and typing indicators</li>
</ul>

<p>Open this document in multiple tabs to see the real-time collaboration in action!</p>"#,
    )
}

/// Store that runs a callback right before its next write, so tests can
/// interleave other events with a write in progress.
#[cfg(test)]
pub(crate) struct InterleavingStore {
    inner: DocumentCache,
    before_write: std::sync::Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

#[cfg(test)]
impl InterleavingStore {
    pub(crate) fn new(inner: DocumentCache) -> Self {
        Self {
            inner,
            before_write: std::sync::Mutex::new(None),
        }
    }

    pub(crate) fn before_next_write(&self, hook: impl FnOnce() + Send + 'static) {
        *self.before_write.lock().unwrap() = Some(Box::new(hook));
    }

    fn fire(&self) {
        let hook = self.before_write.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

#[cfg(test)]
impl DocumentStore for InterleavingStore {
    fn get(&self, document_id: &str) -> Option<Document> {
        self.inner.get(document_id)
    }

    fn contains(&self, document_id: &str) -> bool {
        self.inner.contains(document_id)
    }

    fn set_content(&self, document_id: &str, content: &str) -> Option<DateTime<Utc>> {
        self.fire();
        self.inner.set_content(document_id, content)
    }

    fn set_title(&self, document_id: &str, title: &str) -> Option<DateTime<Utc>> {
        self.fire();
        self.inner.set_title(document_id, title)
    }

    fn set_participants(&self, document_id: &str, participants: Vec<Participant>) -> bool {
        self.fire();
        self.inner.set_participants(document_id, participants)
    }
}
