//! Wires transport, sessions, the broadcaster, and the operator console together.

use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};

use crate::auth::Roster;
use crate::broadcast::{self, Subscribers};
use crate::console;
use crate::engine::Engine;
use crate::history::History;
use crate::session::Session;
use crate::transport::{self, FifoPair};

pub struct Server {
    pub listen_dir: PathBuf,
    pub roster: Roster,
    pub broadcast_interval: Duration,
}

impl Server {
    pub fn run(self) -> Result<()> {
        let engine = Engine::new();
        let history = Arc::new(History::default());
        let subscribers = Subscribers::default();
        let client_count = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        {
            let engine = engine.clone();
            let subscribers = subscribers.clone();
            let stop = Arc::clone(&stop);
            let interval = self.broadcast_interval;
            thread::spawn(move || {
                broadcast::run(&engine, &subscribers, interval, || stop.load(Ordering::Relaxed));
            });
        }

        {
            let engine = engine.clone();
            let roster = self.roster.clone();
            let listen_dir = self.listen_dir.clone();
            let history = Arc::clone(&history);
            let client_count = Arc::clone(&client_count);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                accept_loop(engine, roster, listen_dir, history, client_count, stop);
            });
        }

        let stdin = BufReader::new(std::io::stdin());
        let client_count_for_console = Arc::clone(&client_count);
        console::run(
            stdin,
            &engine,
            &history,
            move || client_count_for_console.load(Ordering::Relaxed),
            std::io::stdout(),
        )?;

        stop.store(true, Ordering::Relaxed);
        info!("server shutting down");
        Ok(())
    }
}

/// Polls the listen directory for clients that have started a handshake and haven't yet been
/// assigned a session thread. There's no inotify watch here, matching the original daemon's own
/// poll-based FIFO discovery rather than pulling in a file-watching dependency for one directory.
fn accept_loop(
    engine: Engine,
    roster: Roster,
    listen_dir: PathBuf,
    history: Arc<History>,
    client_count: Arc<AtomicUsize>,
    stop: Arc<AtomicBool>,
) {
    let mut handled = Vec::new();
    while !stop.load(Ordering::Relaxed) {
        match transport::pending_client_pids(&listen_dir, &handled) {
            Ok(pids) => {
                for pid in pids {
                    handled.push(pid);
                    spawn_session(pid, &listen_dir, &engine, &roster, &history, &client_count);
                }
            }
            Err(err) => error!(?err, "failed to scan for pending clients"),
        }
        thread::sleep(Duration::from_millis(100));
    }
}

fn spawn_session(
    pid: u32,
    listen_dir: &std::path::Path,
    engine: &Engine,
    roster: &Roster,
    history: &Arc<History>,
    client_count: &Arc<AtomicUsize>,
) {
    let fifo = FifoPair::for_pid(listen_dir, pid);
    if let Err(err) = fifo.create() {
        warn!(pid, ?err, "failed to create session FIFOs");
        return;
    }

    let session =
        Session { pid, engine: engine.clone(), roster: roster.clone(), history: Arc::clone(history) };
    let client_count = Arc::clone(client_count);

    thread::spawn(move || {
        client_count.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = session.run(&fifo) {
            warn!(pid, ?err, "session ended with an error");
        }
        fifo.cleanup();
        client_count.fetch_sub(1, Ordering::Relaxed);
    });
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accept_loop_never_rehandles_same_pid() {
        let dir = temp_dir::TempDir::new().unwrap();
        FifoPair::for_pid(dir.path(), 5).create().unwrap();
        let first = transport::pending_client_pids(dir.path(), &[]).unwrap();
        assert_eq!(first, vec![5]);
        let second = transport::pending_client_pids(dir.path(), &first).unwrap();
        assert!(second.is_empty());
    }
}
