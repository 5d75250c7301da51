//! Parses a client's command line into a [`Command`] and formats the session's text replies.
//!
//! The wire format is plain whitespace-separated ASCII, one command per line: the command name
//! followed by its position/range/text arguments. There is no version field on the wire — each
//! session tracks its own last-known document version (seeded by the handshake snapshot, kept
//! current by commit results and broadcasts) and supplies it as the façade's claimed `version`.

use crate::error::DocError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert { pos: usize, text: Vec<u8> },
    Delete { pos: usize, len: usize },
    Newline { pos: usize },
    Heading { level: u8, pos: usize },
    Bold { start: usize, end: usize },
    Italic { start: usize, end: usize },
    Code { start: usize, end: usize },
    UnorderedList { pos: usize },
    OrderedList { pos: usize },
    Blockquote { pos: usize },
    HorizontalRule { pos: usize },
    Link { start: usize, end: usize, url: Vec<u8> },
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError(pub String);

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed command: {}", self.0)
    }
}

/// Splits off the first whitespace-delimited token, returning it and the remainder with any
/// leading spaces after it stripped. Unlike the filtered multi-space tokenizer used for the
/// fixed-arity commands, this preserves whatever's left verbatim, including internal spaces —
/// needed for `INSERT`, whose text argument is the rest of the line, not a single token.
fn split_token(input: &[u8]) -> (&[u8], &[u8]) {
    match input.iter().position(|&b| b == b' ') {
        Some(idx) => {
            let rest = &input[idx + 1..];
            let skip = rest.iter().take_while(|&&b| b == b' ').count();
            (&input[..idx], &rest[skip..])
        }
        None => (input, &[]),
    }
}

/// Parses one line (with no trailing `\n`) into a [`Command`].
pub fn parse(line: &[u8]) -> Result<Command, ParseError> {
    let (name, rest) = split_token(line);
    if name.is_empty() {
        return Err(ParseError("empty command".into()));
    }

    fn next_str(parts: &mut dyn Iterator<Item = &[u8]>, what: &str) -> Result<String, ParseError> {
        let bytes = parts.next().ok_or_else(|| ParseError(format!("missing {what}")))?;
        std::str::from_utf8(bytes).map(str::to_owned).map_err(|_| ParseError(format!("{what} is not utf-8")))
    }
    fn next_num(parts: &mut dyn Iterator<Item = &[u8]>, what: &str) -> Result<u64, ParseError> {
        next_str(parts, what)?.parse().map_err(|_| ParseError(format!("{what} is not a number")))
    }

    if name == b"INSERT" {
        let (pos_tok, text) = split_token(rest);
        if pos_tok.is_empty() {
            return Err(ParseError("missing pos".into()));
        }
        let pos = std::str::from_utf8(pos_tok)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| ParseError("pos is not a number".into()))? as usize;
        if text.is_empty() {
            return Err(ParseError("missing text".into()));
        }
        return Ok(Command::Insert { pos, text: text.to_vec() });
    }

    let mut parts = rest.split(|&b| b == b' ').filter(|s| !s.is_empty());

    match name {
        b"DELETE" => {
            let pos = next_num(&mut parts, "pos")? as usize;
            let len = next_num(&mut parts, "len")? as usize;
            Ok(Command::Delete { pos, len })
        }
        b"NEWLINE" => Ok(Command::Newline { pos: next_num(&mut parts, "pos")? as usize }),
        b"HEADING" => {
            let level = next_num(&mut parts, "level")?;
            let pos = next_num(&mut parts, "pos")? as usize;
            let level = u8::try_from(level).map_err(|_| ParseError("level out of range".into()))?;
            Ok(Command::Heading { level, pos })
        }
        b"BOLD" => {
            let start = next_num(&mut parts, "start")? as usize;
            let end = next_num(&mut parts, "end")? as usize;
            Ok(Command::Bold { start, end })
        }
        b"ITALIC" => {
            let start = next_num(&mut parts, "start")? as usize;
            let end = next_num(&mut parts, "end")? as usize;
            Ok(Command::Italic { start, end })
        }
        b"CODE" => {
            let start = next_num(&mut parts, "start")? as usize;
            let end = next_num(&mut parts, "end")? as usize;
            Ok(Command::Code { start, end })
        }
        b"UNORDERED_LIST" => Ok(Command::UnorderedList { pos: next_num(&mut parts, "pos")? as usize }),
        b"ORDERED_LIST" => Ok(Command::OrderedList { pos: next_num(&mut parts, "pos")? as usize }),
        b"BLOCKQUOTE" => Ok(Command::Blockquote { pos: next_num(&mut parts, "pos")? as usize }),
        b"HORIZONTAL_RULE" => Ok(Command::HorizontalRule { pos: next_num(&mut parts, "pos")? as usize }),
        b"LINK" => {
            let start = next_num(&mut parts, "start")? as usize;
            let end = next_num(&mut parts, "end")? as usize;
            let url = parts.next().ok_or_else(|| ParseError("missing url".into()))?.to_vec();
            Ok(Command::Link { start, end, url })
        }
        b"DISCONNECT" => Ok(Command::Disconnect),
        other => {
            Err(ParseError(format!("unknown command {:?}", String::from_utf8_lossy(other))))
        }
    }
}

#[must_use]
pub fn success() -> &'static str {
    "SUCCESS\n"
}

#[must_use]
pub fn reject(err: DocError) -> String {
    format!("Reject {}\n", err.reason())
}

#[must_use]
pub fn reject_malformed(err: &ParseError) -> String {
    format!("Reject MALFORMED {}\n", err.0)
}

#[must_use]
pub fn reject_unauthorised() -> &'static str {
    "Reject UNAUTHORISED\n"
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_insert() {
        let cmd = parse(b"INSERT 5 hello").unwrap();
        assert_eq!(cmd, Command::Insert { pos: 5, text: b"hello".to_vec() });
    }

    #[test]
    fn parses_insert_text_with_embedded_spaces() {
        let cmd = parse(b"INSERT 0 hello world").unwrap();
        assert_eq!(cmd, Command::Insert { pos: 0, text: b"hello world".to_vec() });
    }

    #[test]
    fn parses_delete() {
        assert_eq!(parse(b"DELETE 2 3").unwrap(), Command::Delete { pos: 2, len: 3 });
    }

    #[test]
    fn parses_link() {
        assert_eq!(
            parse(b"LINK 0 4 https://example.com").unwrap(),
            Command::Link { start: 0, end: 4, url: b"https://example.com".to_vec() }
        );
    }

    #[test]
    fn parses_disconnect() {
        assert_eq!(parse(b"DISCONNECT").unwrap(), Command::Disconnect);
    }

    #[test]
    fn rejects_unknown_command() {
        assert!(parse(b"FROB 1 2").is_err());
    }

    #[test]
    fn rejects_missing_arguments() {
        assert!(parse(b"INSERT 1").is_err());
    }

    #[test]
    fn rejects_non_numeric_position() {
        assert!(parse(b"INSERT x a").is_err());
    }

    #[test]
    fn success_reply_is_literal() {
        assert_eq!(success(), "SUCCESS\n");
    }

    #[test]
    fn reject_reply_includes_reason() {
        assert_eq!(reject(DocError::OutdatedVersion), "Reject OUTDATED_VERSION\n");
    }
}
