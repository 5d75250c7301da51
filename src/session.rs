//! Per-client session: handshake, command loop, and teardown. Each session runs on its own
//! OS thread; a session's failure (a broken pipe, a malformed handshake) never affects any
//! other session or the broadcaster.

use std::io::{BufRead, BufReader, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::auth::Roster;
use crate::engine::Engine;
use crate::history::History;
use crate::transport::FifoPair;
use crate::wire::{self, Command};

pub struct Session {
    pub pid: u32,
    pub engine: Engine,
    pub roster: Roster,
    pub history: Arc<History>,
}

impl Session {
    pub fn run(self, fifo: &FifoPair) -> Result<()> {
        let (read_end, mut write_end) = fifo.open_server_ends().context("opening session FIFOs")?;
        let mut reader = BufReader::new(read_end);

        let mut username = String::new();
        reader.read_line(&mut username).context("reading username")?;
        let username = username.trim().to_string();

        let role = self.roster.lookup(&username).context("looking up role")?;
        let Some(role) = role else {
            warn!(pid = self.pid, %username, "rejected: unknown user");
            let _ = write_end.write_all(wire::reject_unauthorised().as_bytes());
            return Ok(());
        };
        writeln!(write_end, "{role}").context("writing role")?;
        info!(pid = self.pid, %username, %role, "session started");

        let (version, snapshot) = self.engine.snapshot();
        write_initial_snapshot(&mut write_end, version, &snapshot)?;
        let mut known_version = version;

        let mut line = Vec::new();
        loop {
            line.clear();
            let bytes_read = read_line(&mut reader, &mut line)?;
            if bytes_read == 0 {
                info!(pid = self.pid, %username, "connection closed");
                break;
            }
            let trimmed = trim_newline(&line);

            match wire::parse(trimmed) {
                Ok(Command::Disconnect) => {
                    write_end.write_all(wire::success().as_bytes())?;
                    self.history.record(&username, "DISCONNECT", Some(known_version));
                    break;
                }
                Ok(command) => {
                    let outcome = if role.can_write() {
                        self.dispatch(command, known_version)
                    } else {
                        Err(self.reject_reader(&command))
                    };
                    let line_text = String::from_utf8_lossy(trimmed).to_string();
                    match outcome {
                        Ok(new_version) => {
                            known_version = new_version;
                            write_end.write_all(wire::success().as_bytes())?;
                            self.history.record(&username, &line_text, Some(new_version));
                        }
                        Err(reply) => {
                            write_end.write_all(reply.as_bytes())?;
                            self.history.record(&username, &line_text, None);
                        }
                    }
                }
                Err(parse_err) => {
                    write_end.write_all(wire::reject_malformed(&parse_err).as_bytes())?;
                    self.history.record(&username, &String::from_utf8_lossy(trimmed), None);
                }
            }
        }
        Ok(())
    }

    fn reject_reader(&self, _command: &Command) -> String {
        wire::reject_unauthorised().to_string()
    }

    fn dispatch(&self, command: Command, v: u64) -> Result<u64, String> {
        let engine = &self.engine;
        let result = match command {
            Command::Insert { pos, text } => engine.insert(v, pos, &text),
            Command::Delete { pos, len } => engine.delete(v, pos, len),
            Command::Newline { pos } => engine.newline(v, pos),
            Command::Heading { level, pos } => engine.heading(v, level, pos),
            Command::Bold { start, end } => engine.bold(v, start, end),
            Command::Italic { start, end } => engine.italic(v, start, end),
            Command::Code { start, end } => engine.code(v, start, end),
            Command::UnorderedList { pos } => engine.unordered_list(v, pos),
            Command::OrderedList { pos } => engine.ordered_list(v, pos),
            Command::Blockquote { pos } => engine.blockquote(v, pos),
            Command::HorizontalRule { pos } => engine.horizontal_rule(v, pos),
            Command::Link { start, end, url } => engine.link(v, start, end, &url),
            Command::Disconnect => unreachable!("handled by the caller"),
        };
        result.map_err(wire::reject)
    }
}

fn write_initial_snapshot(sink: &mut impl Write, version: u64, doc: &[u8]) -> Result<()> {
    writeln!(sink, "VERSION")?;
    writeln!(sink, "{version}")?;
    writeln!(sink, "DOC")?;
    writeln!(sink, "{}", doc.len())?;
    sink.write_all(doc)?;
    writeln!(sink)?;
    writeln!(sink, "END")?;
    Ok(())
}

fn read_line(reader: &mut impl BufRead, buf: &mut Vec<u8>) -> Result<usize> {
    reader.read_until(b'\n', buf).context("reading command line")
}

fn trim_newline(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\n").unwrap_or(line)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn initial_snapshot_has_expected_framing() {
        let mut out = Vec::new();
        write_initial_snapshot(&mut out, 3, b"hello").unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "VERSION\n3\nDOC\n5\nhello\nEND\n");
    }

    #[test]
    fn trim_newline_strips_trailing_byte() {
        assert_eq!(trim_newline(b"INSERT 0 x\n"), b"INSERT 0 x");
        assert_eq!(trim_newline(b"INSERT 0 x"), b"INSERT 0 x");
    }
}
