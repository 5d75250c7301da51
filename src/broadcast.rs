//! The periodic broadcaster: every `interval` seconds, flattens the document under the lock,
//! releases it, then writes the snapshot frame to every connected client's transport.
//!
//! Per the design notes, the document lock is never held across client I/O — only across the
//! brief flatten that produces the snapshot to send.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::engine::Engine;

/// A registry of the write-halves sessions hand in once their handshake completes, so the
/// broadcaster can reach them without coordinating with `session`'s own per-connection state.
#[derive(Clone, Default)]
pub struct Subscribers {
    writers: Arc<Mutex<Vec<Box<dyn Write + Send>>>>,
}

impl Subscribers {
    pub fn register(&self, writer: Box<dyn Write + Send>) {
        self.writers.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(writer);
    }

    /// Writes `frame` to every subscriber, dropping any that error (their connection is gone).
    fn broadcast(&self, frame: &[u8]) {
        let mut writers = self.writers.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        writers.retain_mut(|w| w.write_all(frame).is_ok());
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.writers.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }
}

#[must_use]
pub fn frame(version: u64, doc: &[u8]) -> Vec<u8> {
    let mut out = format!("{version}\n{}\n", doc.len()).into_bytes();
    out.extend_from_slice(doc);
    out
}

/// Runs the broadcast loop until `interval` is zero (in which case it returns immediately,
/// disabling broadcasting) or `should_stop` reports true.
pub fn run(engine: &Engine, subscribers: &Subscribers, interval: Duration, should_stop: impl Fn() -> bool) {
    if interval.is_zero() {
        return;
    }
    while !should_stop() {
        std::thread::sleep(interval);
        let (version, doc) = engine.snapshot();
        debug!(version, clients = subscribers.count(), "broadcasting snapshot");
        subscribers.broadcast(&frame(version, &doc));
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn frame_has_no_delimiters() {
        let f = frame(3, b"hi");
        assert_eq!(f, b"3\n2\nhi");
    }

    #[test]
    fn broadcast_drops_failed_writers() {
        struct AlwaysFails;
        impl Write for AlwaysFails {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("broken pipe"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let subs = Subscribers::default();
        subs.register(Box::new(AlwaysFails));
        subs.register(Box::new(Vec::new()));
        assert_eq!(subs.count(), 2);
        subs.broadcast(b"frame");
        assert_eq!(subs.count(), 1);
    }
}
