//! The pending-edit queue and the applier that drains it at commit time.
//!
//! Every [`crate::commands`] entry point only ever *enqueues* [`EditOp`]s; nothing here runs
//! until [`Document::commit`] or [`Document::flush`] calls [`apply_queue`].

use crate::arena::Handle;
use crate::document::Document;
use crate::line::{Line, LineKind};

/// A primitive mutation against the line list. `target` is `None` only for `Insert`/`Split`
/// issued against a document that was empty at the time the command was admitted.
#[derive(Debug, Clone)]
pub enum EditOp {
    Insert { target: Option<Handle>, offset: usize, text: Vec<u8> },
    Delete { target: Handle, offset: usize, len: usize },
    Split { target: Option<Handle>, offset: usize, new_kind: LineKind, new_metadata: i32 },
    Merge { target: Handle },
    ChangeType { target: Handle, new_kind: LineKind, new_metadata: i32 },
}

/// A delete region recorded while applying the queue, used to rewrite insert positions that
/// land inside a hole a prior delete in the same commit just opened up.
struct DeleteRegion {
    line: Handle,
    offset: usize,
    len: usize,
}

/// Applies every queued operation in order, then runs the post-sweep. This is the sole place
/// pending edits become visible in the line list.
pub(crate) fn apply_queue(doc: &mut Document) {
    let ops = std::mem::take(&mut doc.queue);
    let mut recent_deletes: Vec<DeleteRegion> = Vec::new();

    for op in ops {
        match op {
            EditOp::Delete { target, offset, len } => {
                recent_deletes.push(DeleteRegion { line: target, offset, len });
                apply_delete(doc, target, offset, len);
            }
            EditOp::Insert { target, offset, text } => {
                let offset = rewrite_insert_offset(&recent_deletes, target, offset);
                apply_insert(doc, target, offset, text);
            }
            EditOp::Split { target, offset, new_kind, new_metadata } => {
                apply_split(doc, target, offset, new_kind, new_metadata);
            }
            EditOp::Merge { target } => apply_merge(doc, target),
            EditOp::ChangeType { target, new_kind, new_metadata } => {
                if let Some(line) = doc.lines.get_mut(target) {
                    line.kind = new_kind;
                    line.metadata = new_metadata;
                }
            }
        }
    }

    post_sweep(doc);
}

/// If `target`/`offset` fall strictly inside a previously recorded delete region on the same
/// line, rewrite the offset to the start of that region. This is the insert-into-just-deleted-
/// region conflict rule.
fn rewrite_insert_offset(
    recent_deletes: &[DeleteRegion],
    target: Option<Handle>,
    offset: usize,
) -> usize {
    let Some(target) = target else { return offset };
    for region in recent_deletes {
        if region.line == target && offset >= region.offset && offset < region.offset + region.len
        {
            return region.offset;
        }
    }
    offset
}

/// Resolves the "real" target for an `Insert`/`Split`, applying the retarget-to-head rule for
/// anchors that are no longer live (or were never set, because a prior op in this same commit
/// populated the document).
fn retarget(doc: &Document, target: Option<Handle>) -> (Option<Handle>, bool) {
    let stale = match target {
        Some(handle) => !doc.lines.contains(handle),
        None => doc.head().is_some(),
    };
    if stale {
        (doc.head(), true)
    } else {
        (target, false)
    }
}

fn apply_insert(doc: &mut Document, target: Option<Handle>, offset: usize, text: Vec<u8>) {
    let (target, retargeted) = retarget(doc, target);
    let offset = if retargeted { 0 } else { offset };

    let Some(target) = target else {
        if doc.head().is_none() && offset == 0 {
            let len = text.len();
            doc.push_line(Line::new(text, LineKind::Normal, 0));
            doc.total_length += len;
        }
        return;
    };

    let Some(line) = doc.lines.get_mut(target) else { return };
    if offset > line.length() {
        return;
    }
    let inserted_len = text.len();
    line.content.splice(offset..offset, text);
    doc.total_length += inserted_len;
}

fn apply_delete(doc: &mut Document, target: Handle, offset: usize, len: usize) {
    let Some(line) = doc.lines.get_mut(target) else { return };
    let line_len = line.length();
    if offset > line_len {
        return;
    }
    let actual_len = len.min(line_len - offset);
    if actual_len == 0 {
        return;
    }
    doc.total_length -= actual_len;

    if offset == 0 && actual_len == line_len {
        doc.lines.get_mut(target).expect("checked above").content.clear();
        return;
    }

    if offset + actual_len == line_len {
        if let Some(next) = doc.lines.get(target).expect("checked above").next {
            let next_content = doc.lines.get(next).expect("reachable").content.clone();
            let line = doc.lines.get_mut(target).expect("checked above");
            line.content.truncate(offset);
            line.content.extend_from_slice(&next_content);
            doc.unlink(next);
            return;
        }
    }

    let line = doc.lines.get_mut(target).expect("checked above");
    line.content.drain(offset..offset + actual_len);
}

fn apply_split(
    doc: &mut Document,
    target: Option<Handle>,
    offset: usize,
    new_kind: LineKind,
    new_metadata: i32,
) {
    let (target, retargeted) = retarget(doc, target);
    let offset = if retargeted { 0 } else { offset };

    let Some(target) = target else {
        if doc.head().is_none() && offset == 0 {
            doc.push_line(Line::empty());
            doc.push_line(Line::new(Vec::new(), new_kind, new_metadata));
        }
        return;
    };

    let Some(line) = doc.lines.get_mut(target) else { return };
    if offset > line.length() {
        return;
    }
    let tail = line.content.split_off(offset);
    doc.insert_after(target, Line::new(tail, new_kind, new_metadata));
}

fn apply_merge(doc: &mut Document, target: Handle) {
    let Some(next) = doc.lines.get(target).and_then(|l| l.next) else { return };
    let next_content = doc.lines.get(next).expect("reachable").content.clone();
    doc.lines.get_mut(target).expect("checked above").content.extend_from_slice(&next_content);
    doc.unlink(next);
}

/// Garbage-collects lines left empty-and-untagged by full-line deletes. Split-produced boundary
/// lines (`metadata != 0`, e.g. `newline`'s marker) are deliberately spared.
fn post_sweep(doc: &mut Document) {
    let mut cursor = doc.head();
    let mut phantoms = Vec::new();
    while let Some(handle) = cursor {
        let line = doc.line(handle).expect("reachable line must be live");
        if line.is_phantom() {
            phantoms.push(handle);
        }
        cursor = line.next;
    }
    for handle in phantoms {
        doc.unlink(handle);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::Document;

    #[test]
    fn insert_into_empty_document_creates_line() {
        let mut doc = Document::new();
        doc.enqueue(EditOp::Insert { target: None, offset: 0, text: b"hello".to_vec() });
        doc.commit();
        assert_eq!(doc.flatten(), b"hello");
        assert_eq!(doc.version(), 1);
        assert_eq!(doc.line_count(), 1);
    }

    #[test]
    fn split_creates_second_line() {
        let mut doc = Document::new();
        doc.enqueue(EditOp::Insert { target: None, offset: 0, text: b"hello".to_vec() });
        doc.commit();
        let head = doc.head().unwrap();
        doc.enqueue(EditOp::Split {
            target: Some(head),
            offset: 2,
            new_kind: LineKind::Normal,
            new_metadata: 1,
        });
        doc.commit();
        assert_eq!(doc.flatten(), b"he\nllo");
        assert_eq!(doc.line_count(), 2);
    }

    #[test]
    fn cross_line_delete_merges_lines() {
        let mut doc = Document::new();
        doc.enqueue(EditOp::Insert { target: None, offset: 0, text: b"hello".to_vec() });
        doc.commit();
        let head = doc.head().unwrap();
        doc.enqueue(EditOp::Split {
            target: Some(head),
            offset: 2,
            new_kind: LineKind::Normal,
            new_metadata: 0,
        });
        doc.commit();
        // "he\nllo" -> delete "e", which reaches the end of "he" and auto-merges with "llo".
        doc.enqueue(EditOp::Delete { target: head, offset: 1, len: 1 });
        doc.commit();
        assert_eq!(doc.flatten(), b"hllo");
        assert_eq!(doc.line_count(), 1);
    }

    #[test]
    fn insert_rewritten_into_just_deleted_region() {
        let mut doc = Document::new();
        doc.enqueue(EditOp::Insert { target: None, offset: 0, text: b"abcdef".to_vec() });
        doc.commit();
        let head = doc.head().unwrap();
        doc.enqueue(EditOp::Delete { target: head, offset: 2, len: 2 });
        doc.enqueue(EditOp::Insert { target: Some(head), offset: 3, text: b"X".to_vec() });
        doc.commit();
        assert_eq!(doc.flatten(), b"abXef");
    }

    #[test]
    fn full_line_delete_is_swept_away() {
        let mut doc = Document::new();
        doc.enqueue(EditOp::Insert { target: None, offset: 0, text: b"a".to_vec() });
        doc.commit();
        let head = doc.head().unwrap();
        // Tag the split boundary so the second line survives its own commit's sweep.
        doc.enqueue(EditOp::Split { target: Some(head), offset: 1, new_kind: LineKind::Normal, new_metadata: 1 });
        doc.commit();
        assert_eq!(doc.line_count(), 2);
        // Now empty out the first line; the sweep on this commit should collect it.
        doc.enqueue(EditOp::Delete { target: head, offset: 0, len: 1 });
        doc.commit();
        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.flatten(), b"");
    }

    #[test]
    fn untagged_split_boundary_is_swept_on_its_own_commit() {
        // SPLIT on an empty document manufactures a scratch "first normal" line; unless the
        // caller tags the requested line (`newline` uses metadata = 1), both are subject to
        // the sweep and only the tagged one survives.
        let mut doc = Document::new();
        doc.enqueue(EditOp::Split { target: None, offset: 0, new_kind: LineKind::Normal, new_metadata: 1 });
        doc.commit();
        assert_eq!(doc.line_count(), 1);
        assert_eq!(doc.flatten(), b"");
    }
}
