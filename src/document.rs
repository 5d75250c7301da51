//! The document store: a doubly-linked sequence of [`Line`] records addressed by stable
//! [`Handle`]s, plus the aggregate counters and pending-edit queue the rest of the engine
//! operates on.
//!
//! `Document` itself holds no lock; callers share it behind `std::sync::Mutex<Document>` (see
//! [`crate::engine::Engine`]) so that every entry point runs under the single coarse lock §5 of
//! the design calls for.

use std::io::{self, Write};

use crate::arena::{Arena, Handle};
use crate::edit::EditOp;
use crate::line::{Line, LineKind};

/// Owns the line list and the bookkeeping the rest of the engine relies on.
pub struct Document {
    pub(crate) lines: Arena<Line>,
    pub(crate) head: Option<Handle>,
    pub(crate) tail: Option<Handle>,
    pub(crate) line_count: usize,
    pub(crate) total_length: usize,
    pub(crate) version: u64,
    pub(crate) queue: Vec<EditOp>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document at version 0, matching the source's "created empty, version
    /// 0" lifecycle rule.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lines: Arena::new(),
            head: None,
            tail: None,
            line_count: 0,
            total_length: 0,
            version: 0,
            queue: Vec::new(),
        }
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub const fn total_length(&self) -> usize {
        self.total_length
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.line_count
    }

    #[must_use]
    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub const fn head(&self) -> Option<Handle> {
        self.head
    }

    #[must_use]
    pub fn line(&self, handle: Handle) -> Option<&Line> {
        self.lines.get(handle)
    }

    /// Appends a brand-new line at the tail of the list. Used by `INSERT`-into-empty-document
    /// and by `SPLIT` when creating the successor line.
    pub(crate) fn push_line(&mut self, line: Line) -> Handle {
        let handle = self.lines.insert(line);
        match self.tail {
            None => {
                self.head = Some(handle);
                self.tail = Some(handle);
            }
            Some(old_tail) => {
                self.lines.get_mut(old_tail).expect("tail must be live").next = Some(handle);
                self.lines.get_mut(handle).expect("just inserted").prev = Some(old_tail);
                self.tail = Some(handle);
            }
        }
        self.line_count += 1;
        handle
    }

    /// Inserts `line` immediately after `after`.
    pub(crate) fn insert_after(&mut self, after: Handle, line: Line) -> Handle {
        let next = self.lines.get(after).and_then(|l| l.next);
        let handle = self.lines.insert(line);
        self.lines.get_mut(handle).expect("just inserted").prev = Some(after);
        self.lines.get_mut(handle).expect("just inserted").next = next;
        self.lines.get_mut(after).expect("caller-provided handle must be live").next =
            Some(handle);
        match next {
            Some(next) => self.lines.get_mut(next).expect("live").prev = Some(handle),
            None => self.tail = Some(handle),
        }
        self.line_count += 1;
        handle
    }

    /// Unlinks `handle` from the list and drops its storage. Does not touch `total_length`;
    /// callers are expected to have already zeroed the line's content.
    pub(crate) fn unlink(&mut self, handle: Handle) {
        let Some(line) = self.lines.get(handle) else { return };
        let (prev, next) = (line.prev, line.next);
        match prev {
            Some(prev) => self.lines.get_mut(prev).expect("live").next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.lines.get_mut(next).expect("live").prev = prev,
            None => self.tail = prev,
        }
        self.lines.remove(handle);
        self.line_count -= 1;
    }

    /// Queues one primitive operation. Does not apply it; see [`crate::edit::apply_queue`].
    pub(crate) fn enqueue(&mut self, op: EditOp) {
        self.queue.push(op);
    }

    /// Applies the pending queue and runs the post-sweep, without bumping the version. The
    /// internal primitive behind "flush" in the design notes; `commit` is `flush` plus a
    /// version bump.
    pub fn flush(&mut self) {
        crate::edit::apply_queue(self);
    }

    /// The commit barrier: flush, then advance the version. `increment_version` is an alias
    /// kept for readers coming from the source protocol's naming.
    pub fn commit(&mut self) {
        self.flush();
        self.version += 1;
    }

    /// Alias for [`Document::commit`].
    pub fn increment_version(&mut self) {
        self.commit();
    }

    /// The wire format: line contents joined by `\n`, no trailing newline.
    #[must_use]
    pub fn flatten(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_length + self.line_count.saturating_sub(1));
        let mut cursor = self.head;
        let mut first = true;
        while let Some(handle) = cursor {
            let line = self.lines.get(handle).expect("reachable line must be live");
            if !first {
                out.push(b'\n');
            }
            out.extend_from_slice(&line.content);
            first = false;
            cursor = line.next;
        }
        out
    }

    /// The human/operator format: every line's content followed by `\n`, including the last.
    pub fn print(&self, sink: &mut impl Write) -> io::Result<()> {
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let line = self.lines.get(handle).expect("reachable line must be live");
            sink.write_all(&line.content)?;
            sink.write_all(b"\n")?;
            cursor = line.next;
        }
        Ok(())
    }

    /// Traverses from `head`, counting reachable lines. Used by invariant checks and tests;
    /// not on any hot path.
    #[must_use]
    pub fn traverse_count(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            count += 1;
            cursor = self.lines.get(handle).expect("reachable line must be live").next;
        }
        count
    }

    #[must_use]
    pub fn sum_line_lengths(&self) -> usize {
        let mut sum = 0;
        let mut cursor = self.head;
        while let Some(handle) = cursor {
            let line = self.lines.get(handle).expect("reachable line must be live");
            sum += line.length();
            cursor = line.next;
        }
        sum
    }

    #[must_use]
    pub fn kind_at(&self, handle: Handle) -> Option<LineKind> {
        self.lines.get(handle).map(|l| l.kind)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_document_flattens_to_empty_string() {
        let doc = Document::new();
        assert_eq!(doc.flatten(), b"");
        assert_eq!(doc.version(), 0);
        assert_eq!(doc.line_count(), 0);
    }

    #[test]
    fn push_line_links_head_and_tail() {
        let mut doc = Document::new();
        let a = doc.push_line(Line::new(b"a".to_vec(), LineKind::Normal, 0));
        let b = doc.push_line(Line::new(b"b".to_vec(), LineKind::Normal, 0));
        assert_eq!(doc.head(), Some(a));
        assert_eq!(doc.line(a).unwrap().next, Some(b));
        assert_eq!(doc.line(b).unwrap().prev, Some(a));
        assert_eq!(doc.flatten(), b"a\nb");
    }

    #[test]
    fn print_always_trails_with_newline() {
        let mut doc = Document::new();
        doc.push_line(Line::new(b"only".to_vec(), LineKind::Normal, 0));
        let mut out = Vec::new();
        doc.print(&mut out).unwrap();
        assert_eq!(out, b"only\n");
    }

    #[test]
    fn unlink_removes_middle_line() {
        let mut doc = Document::new();
        let a = doc.push_line(Line::new(b"a".to_vec(), LineKind::Normal, 0));
        let b = doc.push_line(Line::new(b"b".to_vec(), LineKind::Normal, 0));
        let c = doc.push_line(Line::new(b"c".to_vec(), LineKind::Normal, 0));
        doc.unlink(b);
        assert_eq!(doc.line(a).unwrap().next, Some(c));
        assert_eq!(doc.line(c).unwrap().prev, Some(a));
        assert_eq!(doc.traverse_count(), 2);
    }
}
