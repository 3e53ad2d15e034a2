#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ai_explainer::blob::{BlobError, BlobMap, BlobStore, MemoryBlobStore, Scope};
use ai_explainer::history::{ContextType, HistoryStore, NewRecord};
use ai_explainer::llm::{ChatRequest, CompletionBackend, Endpoint};
use ai_explainer::{ExplainerError, Result};
use async_trait::async_trait;

/// A fresh in-memory blob store with the default quotas.
pub fn test_blobs() -> Arc<MemoryBlobStore> {
    Arc::new(MemoryBlobStore::new())
}

/// A history store over its own in-memory blob store.
pub fn test_history() -> (Arc<MemoryBlobStore>, HistoryStore) {
    let blobs = test_blobs();
    let history = HistoryStore::new(Arc::clone(&blobs) as Arc<dyn BlobStore>);
    (blobs, history)
}

/// A text record with a prompt name and an explicit display timestamp.
pub fn record_at(text: &str, explanation: &str, prompt: &str, display: &str) -> NewRecord {
    NewRecord::text(text, explanation)
        .with_prompt(prompt)
        .with_timestamp(display)
}

pub fn page_record(markdown: &str, title: &str, url: &str) -> NewRecord {
    NewRecord {
        text: markdown.into(),
        explanation: "summary".into(),
        prompt_name: Some("Summarize".into()),
        source_info: Some(title.into()),
        page_url: Some(url.into()),
        page_title: Some(title.into()),
        context_type: Some(ContextType::Page),
        ..NewRecord::default()
    }
}

/// Blob store whose writes can be made to fail on demand, either all of them
/// or only those touching one key.
pub struct FlakyBlobStore {
    inner: MemoryBlobStore,
    fail_writes: AtomicBool,
    failing_key: Mutex<Option<String>>,
}

impl FlakyBlobStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            fail_writes: AtomicBool::new(false),
            failing_key: Mutex::new(None),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Reject writes and removals that touch `key`; `None` lifts the block.
    pub fn fail_key(&self, key: Option<&str>) {
        *self.failing_key.lock().unwrap() = key.map(str::to_string);
    }

    fn check<'a>(&self, mut keys: impl Iterator<Item = &'a str>) -> std::result::Result<(), BlobError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BlobError::Io(std::io::Error::other("disk unplugged")));
        }
        if let Some(failing) = self.failing_key.lock().unwrap().as_deref() {
            if keys.any(|k| k == failing) {
                return Err(BlobError::Io(std::io::Error::other(format!("write to {failing} refused"))));
            }
        }
        Ok(())
    }
}

impl BlobStore for FlakyBlobStore {
    fn get(&self, scope: Scope, keys: &[&str]) -> std::result::Result<BlobMap, BlobError> {
        self.inner.get(scope, keys)
    }

    fn set(&self, scope: Scope, items: BlobMap) -> std::result::Result<(), BlobError> {
        self.check(items.keys().map(String::as_str))?;
        self.inner.set(scope, items)
    }

    fn remove(&self, scope: Scope, keys: &[&str]) -> std::result::Result<(), BlobError> {
        self.check(keys.iter().copied())?;
        self.inner.remove(scope, keys)
    }

    fn clear(&self, scope: Scope) -> std::result::Result<(), BlobError> {
        self.check(std::iter::empty())?;
        self.inner.clear(scope)
    }
}

/// Completion backend that records requests and replies with a canned answer.
pub struct FakeBackend {
    reply: Mutex<Result<String>>,
    pub calls: AtomicUsize,
    pub requests: Mutex<Vec<(Endpoint, ChatRequest)>>,
}

impl FakeBackend {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Ok(text.to_string())),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(status: u16, message: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Err(ExplainerError::Request {
                status: Some(status),
                message: message.to_string(),
            })),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn last_request(&self) -> (Endpoint, ChatRequest) {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl CompletionBackend for FakeBackend {
    async fn complete(&self, endpoint: &Endpoint, request: &ChatRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.clone(), request.clone()));
        match &*self.reply.lock().unwrap() {
            Ok(text) => Ok(text.clone()),
            Err(ExplainerError::Request { status, message }) => Err(ExplainerError::Request {
                status: *status,
                message: message.clone(),
            }),
            Err(other) => panic!("unsupported canned error: {other}"),
        }
    }
}
