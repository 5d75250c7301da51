//! Maps a global character offset over the flattened (newline-joined) view of a document onto
//! a concrete line and an intra-line byte offset.

use crate::arena::Handle;
use crate::document::Document;
use crate::error::DocError;

/// The outcome of resolving a global offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    /// The document has no lines at all; only `G = 0` resolves this way.
    Empty,
    /// `G` addresses byte `offset` of `handle`'s content. `offset == handle`'s length is the
    /// boundary case: either the newline separating it from its successor, or (on the last
    /// line) the one-past-end append position. Both are valid insertion anchors; neither is a
    /// valid deletion start past the line's own content.
    At(Handle, usize),
}

/// Resolves `global_offset` against `doc`. Mirrors the source's `find_line_and_offset`, walking
/// lines and accumulating `length + 1` per intermediate line (`+1` for the implicit join
/// newline) and plain `length` for the trailing line.
pub fn resolve(doc: &Document, global_offset: usize) -> Result<Resolved, DocError> {
    let Some(head) = doc.head() else {
        return if global_offset == 0 { Ok(Resolved::Empty) } else { Err(DocError::InvalidPosition) };
    };

    let mut accumulated = 0usize;
    let mut cursor = Some(head);
    while let Some(handle) = cursor {
        let line = doc.line(handle).expect("reachable line must be live");
        let len = line.length();
        if global_offset <= accumulated + len {
            return Ok(Resolved::At(handle, global_offset - accumulated));
        }
        accumulated += len + 1;
        cursor = line.next;
    }
    Err(DocError::InvalidPosition)
}

/// True iff `pos` sits at the start of a line: either `pos == 0`, or the position immediately
/// before it resolves to a line-end boundary (interior newline or end-of-document).
pub fn is_start_of_line(doc: &Document, pos: usize) -> Result<bool, DocError> {
    if pos == 0 {
        return Ok(true);
    }
    match resolve(doc, pos - 1)? {
        Resolved::Empty => Ok(true),
        Resolved::At(handle, offset) => {
            let len = doc.line(handle).expect("live").length();
            Ok(offset == len)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::Document;
    use crate::edit::EditOp;
    use crate::line::LineKind;

    fn doc_with(text: &str) -> Document {
        let mut doc = Document::new();
        if !text.is_empty() {
            doc.enqueue(EditOp::Insert { target: None, offset: 0, text: text.as_bytes().to_vec() });
            doc.commit();
        }
        doc
    }

    #[test]
    fn empty_document_resolves_zero_only() {
        let doc = Document::new();
        assert_eq!(resolve(&doc, 0), Ok(Resolved::Empty));
        assert!(resolve(&doc, 1).is_err());
    }

    #[test]
    fn interior_offset_resolves_inside_line() {
        let doc = doc_with("hello");
        let head = doc.head().unwrap();
        assert_eq!(resolve(&doc, 2), Ok(Resolved::At(head, 2)));
    }

    #[test]
    fn one_past_end_resolves_to_tail_boundary() {
        let doc = doc_with("hello");
        let head = doc.head().unwrap();
        assert_eq!(resolve(&doc, 5), Ok(Resolved::At(head, 5)));
        assert!(resolve(&doc, 6).is_err());
    }

    #[test]
    fn newline_boundary_resolves_to_first_lines_end() {
        let mut doc = doc_with("hello");
        let head = doc.head().unwrap();
        doc.enqueue(EditOp::Split { target: Some(head), offset: 2, new_kind: LineKind::Normal, new_metadata: 0 });
        doc.commit();
        // "he\nllo": G=2 is the boundary between "he" and "llo".
        assert_eq!(resolve(&doc, 2), Ok(Resolved::At(head, 2)));
    }

    #[test]
    fn start_of_line_predicate() {
        let mut doc = doc_with("hello");
        let head = doc.head().unwrap();
        doc.enqueue(EditOp::Split { target: Some(head), offset: 2, new_kind: LineKind::Normal, new_metadata: 0 });
        doc.commit();
        assert!(is_start_of_line(&doc, 0).unwrap());
        assert!(!is_start_of_line(&doc, 1).unwrap());
        assert!(is_start_of_line(&doc, 3).unwrap()); // start of "llo"
    }
}
