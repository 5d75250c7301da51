//! The concurrency wrapper around [`Document`]: a single coarse mutex shared by every session
//! thread.
//!
//! The original actor-based daemon this crate is patterned on (`daemon.rs` in the upstream
//! editor-sync tool) serialises access through a tokio task reading a message channel. That
//! model doesn't fit here: sessions are plain OS threads, not async tasks, and the design calls
//! for straight-line, synchronous command handling per connection (see `DESIGN.md`). So instead
//! `Engine` is just `Arc<Mutex<Document>>` with the façade re-exposed on top; every command
//! locks, runs, and (if it was the one that crossed a commit boundary) unlocks, same as the
//! source's own single-writer-at-a-time discipline, just expressed with `std::sync::Mutex`
//! instead of a channel.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::document::Document;
use crate::error::DocError;

/// A cheaply-clonable handle to the shared document. Every session thread holds one.
#[derive(Clone)]
pub struct Engine {
    document: Arc<Mutex<Document>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self { document: Arc::new(Mutex::new(Document::new())) }
    }

    fn lock(&self) -> MutexGuard<'_, Document> {
        self.document.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.lock().version()
    }

    /// A snapshot of the flattened document alongside the version it was taken at, for the
    /// handshake's initial `VERSION`/`DOC`/`END` framing and for `DOC?` console replies.
    #[must_use]
    pub fn snapshot(&self) -> (u64, Vec<u8>) {
        let doc = self.lock();
        (doc.version(), doc.flatten())
    }

    pub fn print(&self, sink: &mut impl std::io::Write) -> std::io::Result<()> {
        self.lock().print(sink)
    }

    pub fn insert(&self, version: u64, pos: usize, text: &[u8]) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.insert(version, pos, text)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn delete(&self, version: u64, pos: usize, len: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.delete(version, pos, len)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn newline(&self, version: u64, pos: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.newline(version, pos)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn heading(&self, version: u64, level: u8, pos: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.heading(version, level, pos)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn bold(&self, version: u64, start: usize, end: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.bold(version, start, end)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn italic(&self, version: u64, start: usize, end: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.italic(version, start, end)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn code(&self, version: u64, start: usize, end: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.code(version, start, end)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn blockquote(&self, version: u64, pos: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.blockquote(version, pos)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn unordered_list(&self, version: u64, pos: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.unordered_list(version, pos)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn ordered_list(&self, version: u64, pos: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.ordered_list(version, pos)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn horizontal_rule(&self, version: u64, pos: usize) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.horizontal_rule(version, pos)?;
        doc.commit();
        Ok(doc.version())
    }

    pub fn link(&self, version: u64, start: usize, end: usize, url: &[u8]) -> Result<u64, DocError> {
        let mut doc = self.lock();
        doc.link(version, start, end, url)?;
        doc.commit();
        Ok(doc.version())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::thread;

    #[test]
    fn engine_serialises_concurrent_inserts() {
        let engine = Engine::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(thread::spawn(move || loop {
                let version = engine.version();
                if engine.insert(version, 0, b"x").is_ok() {
                    break;
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let (version, text) = engine.snapshot();
        assert_eq!(version, 8);
        assert_eq!(text.len(), 8);
    }

    #[test]
    fn stale_version_is_rejected() {
        let engine = Engine::new();
        engine.insert(0, 0, b"a").unwrap();
        assert_eq!(engine.insert(0, 0, b"b"), Err(DocError::OutdatedVersion));
    }
}
