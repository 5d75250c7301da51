//! A bounded, mutex-protected log of admitted commands, independent of the document's own
//! lock so inspecting history never contends with editing.

use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct Entry {
    pub username: String,
    pub line: String,
    pub result_version: Option<u64>,
}

pub struct History {
    capacity: usize,
    entries: Mutex<Vec<Entry>>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl History {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { capacity, entries: Mutex::new(Vec::new()) }
    }

    pub fn record(&self, username: &str, line: &str, result_version: Option<u64>) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.push(Entry { username: username.to_string(), line: line.to_string(), result_version });
        if entries.len() > self.capacity {
            let overflow = entries.len() - self.capacity;
            entries.drain(0..overflow);
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Entry> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    pub fn render(&self, sink: &mut impl std::io::Write) -> std::io::Result<()> {
        for entry in self.snapshot() {
            match entry.result_version {
                Some(v) => writeln!(sink, "{} {} -> v{}", entry.username, entry.line, v)?,
                None => writeln!(sink, "{} {} -> rejected", entry.username, entry.line)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_and_snapshots_in_order() {
        let history = History::new(10);
        history.record("alice", "INSERT 0 0 hi", Some(1));
        history.record("bob", "DELETE 1 0 1", None);
        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].username, "alice");
        assert_eq!(snapshot[1].result_version, None);
    }

    #[test]
    fn drops_oldest_entries_past_capacity() {
        let history = History::new(2);
        history.record("a", "1", Some(1));
        history.record("b", "2", Some(2));
        history.record("c", "3", Some(3));
        let snapshot = history.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].username, "b");
        assert_eq!(snapshot[1].username, "c");
    }
}
