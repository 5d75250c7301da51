//! The version-gated command façade: every public entry point a session can call, desugaring
//! markdown formatting into queued primitive [`EditOp`]s.
//!
//! Every method takes a claimed `version` and immediately fails with
//! [`DocError::OutdatedVersion`] if it doesn't match the document's current version — this is
//! the sole admission gate (§4.4). Once admitted, a command always succeeds; its actual effect
//! only becomes visible on the next [`Document::commit`].
//!
//! A few helpers (`heading`, `blockquote`, `code`, `ordered_list`, `horizontal_rule`, and the
//! cross-line loop inside `delete`) call [`Document::flush`] partway through, to resolve later
//! positions against their own earlier, still-uncommitted edits. Doing so never changes
//! `version`, so a second call admitted at the same claimed version still passes its version
//! check — the "no commit between sub-edits" contract the design notes call out is preserved;
//! only the version-*bump* is deferred, not observability of intermediate structure.

use crate::arena::Handle;
use crate::document::Document;
use crate::edit::EditOp;
use crate::error::DocError;
use crate::line::LineKind;
use crate::resolver::{self, Resolved};

impl Document {
    fn check_version(&self, version: u64) -> Result<(), DocError> {
        if version == self.version {
            Ok(())
        } else {
            Err(DocError::OutdatedVersion)
        }
    }

    /// Resolves `pos` into an `(target, offset)` pair ready to embed in an `Insert`/`Split`.
    fn resolve_target(&self, pos: usize) -> Result<(Option<Handle>, usize), DocError> {
        match resolver::resolve(self, pos)? {
            Resolved::Empty => Ok((None, 0)),
            Resolved::At(handle, offset) => Ok((Some(handle), offset)),
        }
    }

    /// Resolves `pos` to the line it falls on, ignoring the intra-line offset. Used by the
    /// list/blockquote prefixing helpers, which always prefix at column 0 regardless of where
    /// in the line `pos` pointed.
    fn resolve_line_handle(&self, pos: usize) -> Result<Option<Handle>, DocError> {
        match resolver::resolve(self, pos)? {
            Resolved::Empty => Ok(None),
            Resolved::At(handle, _) => Ok(Some(handle)),
        }
    }

    /// `insert(v, pos, text)`. `text` may contain at most one `\n`; when it does, the insert is
    /// realised as a `SPLIT` (plus the surrounding content on either side of the break) rather
    /// than a literal embedded newline byte, since invariant 4 forbids a line ever storing one.
    pub fn insert(&mut self, version: u64, pos: usize, text: &[u8]) -> Result<(), DocError> {
        self.check_version(version)?;
        let newline_count = text.iter().filter(|&&b| b == b'\n').count();
        if newline_count > 1 {
            return Err(DocError::InvalidPosition);
        }

        if newline_count == 0 {
            let (target, offset) = self.resolve_target(pos)?;
            self.enqueue(EditOp::Insert { target, offset, text: text.to_vec() });
            return Ok(());
        }

        let split_at = text.iter().position(|&b| b == b'\n').expect("checked above");
        let (before, after) = (&text[..split_at], &text[split_at + 1..]);

        let (target, offset) = self.resolve_target(pos)?;
        self.enqueue(EditOp::Split { target, offset, new_kind: LineKind::Normal, new_metadata: 0 });

        if before.is_empty() && after.is_empty() {
            return Ok(());
        }
        self.flush();

        if !before.is_empty() {
            let (target, offset) = self.resolve_target(pos)?;
            self.enqueue(EditOp::Insert { target, offset, text: before.to_vec() });
        }
        if !after.is_empty() {
            let (target, offset) = self.resolve_target(pos + 1)?;
            self.enqueue(EditOp::Insert { target, offset, text: after.to_vec() });
        }
        Ok(())
    }

    /// `delete(v, pos, len)`. Loops across lines, letting each queued `DELETE` consume up to
    /// the end of its line; when a requested deletion needs to continue past a line boundary,
    /// an explicit `MERGE` (or a `DELETE` that itself reaches exactly to the line's end and
    /// triggers the applier's boundary-absorption rule, see [`crate::edit`]) is flushed before
    /// resolving the next segment, so the loop always measures remaining length against the
    /// document's real, current structure.
    pub fn delete(&mut self, version: u64, pos: usize, len: usize) -> Result<(), DocError> {
        self.check_version(version)?;
        if len == 0 {
            return Ok(());
        }

        let (mut target, mut offset) = match resolver::resolve(self, pos)? {
            Resolved::Empty => return Err(DocError::InvalidPosition),
            Resolved::At(handle, offset) => (handle, offset),
        };
        let mut remaining = len;

        loop {
            if remaining == 0 {
                break;
            }
            let Some(line) = self.line(target) else { break };
            let line_len = line.length();
            if offset > line_len {
                break;
            }
            let available = line_len - offset;

            if remaining <= available {
                self.enqueue(EditOp::Delete { target, offset, len: remaining });
                break;
            }

            let Some(_next) = line.next else {
                if available > 0 {
                    self.enqueue(EditOp::Delete { target, offset, len: available });
                }
                break;
            };

            let consumed = if available > 0 {
                self.enqueue(EditOp::Delete { target, offset, len: remaining });
                available + 1
            } else {
                self.enqueue(EditOp::Merge { target });
                1
            };
            self.flush();
            remaining -= consumed;
            if !self.lines.contains(target) {
                break;
            }
            // `target`/`offset` are unchanged: the merge (if any) appended the old successor's
            // bytes right after `offset`, so the next iteration continues from the same anchor.
            let _ = &mut offset;
        }
        Ok(())
    }

    /// `newline(v, pos)`. A `SPLIT` tagged `metadata = 1`, the marker that exempts an
    /// intentionally-empty line from the commit-time sweep.
    pub fn newline(&mut self, version: u64, pos: usize) -> Result<(), DocError> {
        self.check_version(version)?;
        let (target, offset) = self.resolve_target(pos)?;
        self.enqueue(EditOp::Split { target, offset, new_kind: LineKind::Normal, new_metadata: 1 });
        Ok(())
    }

    /// `heading(v, level, pos)`. If `pos` isn't at the start of a line, a break is inserted and
    /// flushed first so the `#`-prefix lands on the start of the new line rather than the end
    /// of the old one.
    pub fn heading(&mut self, version: u64, level: u8, pos: usize) -> Result<(), DocError> {
        self.check_version(version)?;
        if !(1..=6).contains(&level) {
            return Err(DocError::InvalidPosition);
        }
        let mut pos = pos;
        if !resolver::is_start_of_line(self, pos)? {
            self.insert(version, pos, b"\n")?;
            self.flush();
            pos += 1;
        }
        let prefix = format!("{} ", "#".repeat(level as usize));
        self.insert(version, pos, prefix.as_bytes())
    }

    /// `bold(v, s, e)`. Inserts the closing `**` before the opening one so that `s` is still
    /// valid once the insert at `e` has been queued (no flush needed: both positions resolve
    /// against the same, still-unflushed document).
    pub fn bold(&mut self, version: u64, start: usize, end: usize) -> Result<(), DocError> {
        self.wrap(version, start, end, b"**")
    }

    /// `italic(v, s, e)`. Same pattern as [`Document::bold`], with a single `*`.
    pub fn italic(&mut self, version: u64, start: usize, end: usize) -> Result<(), DocError> {
        self.wrap(version, start, end, b"*")
    }

    /// `code(v, s, e)`. Flushes first to observe edits queued by earlier commands at this same
    /// version, then wraps with backticks using the same end-then-start pattern as bold/italic.
    pub fn code(&mut self, version: u64, start: usize, end: usize) -> Result<(), DocError> {
        self.check_version(version)?;
        self.flush();
        self.wrap(version, start, end, b"`")
    }

    fn wrap(&mut self, version: u64, start: usize, end: usize, marker: &[u8]) -> Result<(), DocError> {
        self.check_version(version)?;
        if start > end {
            return Err(DocError::InvalidPosition);
        }
        self.insert(version, end, marker)?;
        self.insert(version, start, marker)
    }

    /// `blockquote(v, pos)`. Flush, ensure start-of-line (splitting and flushing again if
    /// needed so the prefix lands on the new line), insert `"> "`, flush again.
    pub fn blockquote(&mut self, version: u64, pos: usize) -> Result<(), DocError> {
        self.check_version(version)?;
        self.flush();
        let mut pos = pos;
        if !resolver::is_start_of_line(self, pos)? {
            self.insert(version, pos, b"\n")?;
            self.flush();
            pos += 1;
        }
        let target = self.resolve_line_handle(pos)?;
        self.enqueue(EditOp::Insert { target, offset: 0, text: b"> ".to_vec() });
        self.flush();
        Ok(())
    }

    /// `unordered_list(v, pos)`. Resolves `pos` to the line it's on and prefixes `"- "`.
    pub fn unordered_list(&mut self, version: u64, pos: usize) -> Result<(), DocError> {
        self.check_version(version)?;
        let target = self.resolve_line_handle(pos)?;
        self.enqueue(EditOp::Insert { target, offset: 0, text: b"- ".to_vec() });
        Ok(())
    }

    /// `ordered_list(v, pos)`. Flushes, resolves to line-start, counts contiguous preceding
    /// `"<digit>. "`-prefixed lines to compute the next counter value, and prefixes `"N. "`.
    /// Only single-digit counters are supported, matching the source's 4-byte buffer.
    pub fn ordered_list(&mut self, version: u64, pos: usize) -> Result<(), DocError> {
        self.check_version(version)?;
        self.flush();
        let target = self.resolve_line_handle(pos)?;

        let mut n: u32 = 1;
        if let Some(handle) = target {
            let mut cursor = self.line(handle).and_then(|l| l.prev);
            while let Some(h) = cursor {
                let line = self.line(h).expect("reachable line must be live");
                if is_ordered_list_marker(&line.content) {
                    n += 1;
                    cursor = line.prev;
                } else {
                    break;
                }
            }
        }
        if n > 9 {
            return Err(DocError::InvalidPosition);
        }

        let text = format!("{n}. ").into_bytes();
        self.enqueue(EditOp::Insert { target, offset: 0, text });
        Ok(())
    }

    /// `horizontal_rule(v, pos)`. Flush, then insert `\n`, `---`, `\n` at `pos` in that order.
    /// Each subsequent insert lands exactly at the end of whatever the previous step just
    /// appended to the truncated line, so the three literal-same-position inserts compose into
    /// a standalone `---` line without needing a flush between them.
    pub fn horizontal_rule(&mut self, version: u64, pos: usize) -> Result<(), DocError> {
        self.check_version(version)?;
        self.flush();
        self.insert(version, pos, b"\n")?;
        self.insert(version, pos, b"---")?;
        self.insert(version, pos, b"\n")
    }

    /// `link(v, s, e, url)`. Requires `s < e` and a non-empty `url`.
    pub fn link(&mut self, version: u64, start: usize, end: usize, url: &[u8]) -> Result<(), DocError> {
        self.check_version(version)?;
        if start >= end || url.is_empty() {
            return Err(DocError::InvalidPosition);
        }
        let mut closing = b"](".to_vec();
        closing.extend_from_slice(url);
        closing.push(b')');
        self.insert(version, end, &closing)?;
        self.insert(version, start, b"[")
    }
}

fn is_ordered_list_marker(content: &[u8]) -> bool {
    content.len() >= 3 && content[0].is_ascii_digit() && content[1] == b'.' && content[2] == b' '
}
