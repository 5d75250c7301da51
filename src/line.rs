//! The unit of storage in a document: a single newline-free line of text plus a markdown
//! type tag and an integer annotation.

use crate::arena::Handle;

/// The markdown role a line currently plays. Desugaring in [`crate::commands`] sets this via
/// `SPLIT`/`CHANGE_TYPE` primitive operations; the line itself never interprets the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineKind {
    #[default]
    Normal,
    OrderedList,
    UnorderedList,
    Code,
    Heading,
    Blockquote,
    HorizontalRule,
}

/// A line record. `content` never contains a newline byte (invariant 4 of the document model).
#[derive(Debug, Clone)]
pub struct Line {
    pub content: Vec<u8>,
    pub kind: LineKind,
    /// Heading level, split-origin marker, ordered-list start, etc., depending on `kind`.
    pub metadata: i32,
    pub prev: Option<Handle>,
    pub next: Option<Handle>,
}

impl Line {
    #[must_use]
    pub fn new(content: Vec<u8>, kind: LineKind, metadata: i32) -> Self {
        debug_assert!(!content.contains(&b'\n'), "line content must not contain a newline");
        Self { content, kind, metadata, prev: None, next: None }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), LineKind::Normal, 0)
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.content.len()
    }

    /// True for the lines the commit-time sweep should garbage-collect: empty content and
    /// default metadata. Intentionally-empty lines (e.g. `newline`'s split boundary, tagged
    /// `metadata = 1`) survive the sweep. The line's markdown `kind` does not factor in here;
    /// only content and metadata do, matching the source sweep exactly.
    #[must_use]
    pub fn is_phantom(&self) -> bool {
        self.content.is_empty() && self.metadata == 0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fresh_line_is_phantom() {
        assert!(Line::empty().is_phantom());
    }

    #[test]
    fn tagged_empty_line_is_not_phantom() {
        let line = Line::new(Vec::new(), LineKind::Normal, 1);
        assert!(!line.is_phantom());
    }

    #[test]
    fn typed_but_untagged_empty_line_is_still_phantom() {
        // Only content and metadata decide phantom-ness; `kind` alone doesn't save a line.
        let line = Line::new(Vec::new(), LineKind::Heading, 0);
        assert!(line.is_phantom());
    }
}
