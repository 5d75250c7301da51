//! The operator console: reads commands from the server process's stdin.
//!
//! `DOC?` prints the current document, `LOG?` prints the command history, and `QUIT` shuts the
//! server down if and only if no clients are connected, snapshotting the flattened document to
//! `doc.md` first.

use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::engine::Engine;
use crate::history::History;

pub enum Outcome {
    Continue,
    Quit,
    Busy,
    Unknown,
}

pub fn handle_line(
    line: &str,
    engine: &Engine,
    history: &History,
    client_count: usize,
    out: &mut impl Write,
) -> Result<Outcome> {
    match line.trim() {
        "DOC?" => {
            engine.print(out)?;
            Ok(Outcome::Continue)
        }
        "LOG?" => {
            history.render(out)?;
            Ok(Outcome::Continue)
        }
        "QUIT" => {
            if client_count > 0 {
                writeln!(out, "Cannot quit: {client_count} client(s) still connected")?;
                return Ok(Outcome::Busy);
            }
            Ok(Outcome::Quit)
        }
        "" => Ok(Outcome::Continue),
        _ => {
            writeln!(out, "unknown console command")?;
            Ok(Outcome::Unknown)
        }
    }
}

/// Writes the flattened document to `path`, the shutdown snapshot `QUIT` takes before exiting.
pub fn snapshot_to_file(engine: &Engine, path: &Path) -> Result<()> {
    let (_version, doc) = engine.snapshot();
    fs::write(path, doc).with_context(|| format!("failed to write snapshot to {}", path.display()))
}

/// Drives the console loop reading from `input` until `QUIT` is accepted or the stream closes.
pub fn run(
    mut input: impl BufRead,
    engine: &Engine,
    history: &History,
    client_count: impl Fn() -> usize,
    mut out: impl Write,
) -> Result<()> {
    let mut line = String::new();
    loop {
        line.clear();
        let bytes_read = input.read_line(&mut line).context("reading console input")?;
        if bytes_read == 0 {
            break;
        }
        match handle_line(&line, engine, history, client_count(), &mut out)? {
            Outcome::Quit => {
                snapshot_to_file(engine, Path::new("doc.md"))?;
                break;
            }
            Outcome::Continue | Outcome::Busy | Outcome::Unknown => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn doc_query_prints_current_document() {
        let engine = Engine::new();
        engine.insert(0, 0, b"hi").unwrap();
        let history = History::default();
        let mut out = Vec::new();
        handle_line("DOC?", &engine, &history, 0, &mut out).unwrap();
        assert_eq!(out, b"hi\n");
    }

    #[test]
    fn quit_is_refused_while_clients_connected() {
        let engine = Engine::new();
        let history = History::default();
        let mut out = Vec::new();
        let outcome = handle_line("QUIT", &engine, &history, 2, &mut out).unwrap();
        assert!(matches!(outcome, Outcome::Busy));
    }

    #[test]
    fn quit_succeeds_with_no_clients() {
        let engine = Engine::new();
        let history = History::default();
        let mut out = Vec::new();
        let outcome = handle_line("QUIT", &engine, &history, 0, &mut out).unwrap();
        assert!(matches!(outcome, Outcome::Quit));
    }

    #[test]
    fn snapshot_writes_flattened_document() {
        let engine = Engine::new();
        engine.insert(0, 0, b"saved").unwrap();
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("doc.md");
        snapshot_to_file(&engine, &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"saved");
    }
}
