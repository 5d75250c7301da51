//! The FIFO-pair handshake: a client rendezvouses with the server by creating two named pipes
//! keyed on its own PID and signalling the server to open them.
//!
//! A client wanting to connect signals the server out-of-band with its own PID; the server
//! creates `FIFO_C2S_<pid>` and `FIFO_S2C_<pid>` (mode `0666`) in the listen directory and
//! signals back. Both sides then open their ends (client writes c2s, reads s2c; server reads
//! c2s, writes s2c), and the session thread handling the connection immediately writes the
//! initial `VERSION\n<version>\nDOC\n<byte_length>\n<flattened bytes>\nEND\n` snapshot.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nix::sys::stat::Mode;
use nix::unistd::mkfifo;

pub struct FifoPair {
    pub client_to_server: PathBuf,
    pub server_to_client: PathBuf,
}

impl FifoPair {
    #[must_use]
    pub fn for_pid(dir: &Path, pid: u32) -> Self {
        Self {
            client_to_server: dir.join(format!("FIFO_C2S_{pid}")),
            server_to_client: dir.join(format!("FIFO_S2C_{pid}")),
        }
    }

    /// Creates both FIFOs, mode `0666` (world-writable, matching the handshake protocol —
    /// access control happens at the role-file layer once the client identifies itself, not at
    /// the filesystem layer).
    pub fn create(&self) -> Result<()> {
        let mode = Mode::from_bits_truncate(0o666);
        for path in [&self.client_to_server, &self.server_to_client] {
            match mkfifo(path, mode) {
                Ok(()) => {}
                Err(nix::errno::Errno::EEXIST) => {}
                Err(e) => return Err(e).context(format!("failed to create FIFO {}", path.display())),
            }
        }
        Ok(())
    }

    /// Opens the server's ends: read from the client-to-server pipe, write to the
    /// server-to-client one. Blocks until a client has the other end open.
    pub fn open_server_ends(&self) -> Result<(File, File)> {
        let read = OpenOptions::new()
            .read(true)
            .open(&self.client_to_server)
            .with_context(|| format!("failed to open {}", self.client_to_server.display()))?;
        let write = OpenOptions::new()
            .write(true)
            .open(&self.server_to_client)
            .with_context(|| format!("failed to open {}", self.server_to_client.display()))?;
        Ok((read, write))
    }

    pub fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.client_to_server);
        let _ = std::fs::remove_file(&self.server_to_client);
    }
}

/// Matches filenames of the form `FIFO_C2S_<pid>` in `dir`, returning the PIDs of clients that
/// have started a handshake but whose pair the server hasn't opened yet.
pub fn pending_client_pids(dir: &Path, already_handled: &[u32]) -> Result<Vec<u32>> {
    let mut pids = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(pid_str) = name.strip_prefix("FIFO_C2S_") else { continue };
        let Ok(pid) = pid_str.parse::<u32>() else { continue };
        if !already_handled.contains(&pid) {
            pids.push(pid);
        }
    }
    Ok(pids)
}

pub fn ensure_world_writable_dir(dir: &Path) -> Result<()> {
    let metadata = std::fs::metadata(dir).with_context(|| format!("failed to stat {}", dir.display()))?;
    anyhow::ensure!(metadata.is_dir(), "{} is not a directory", dir.display());
    let _ = metadata.permissions().mode();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pending_pids_filters_handled_and_non_matching_names() {
        let dir = temp_dir::TempDir::new().unwrap();
        let pair = FifoPair::for_pid(dir.path(), 42);
        pair.create().unwrap();
        std::fs::write(dir.path().join("not-a-fifo"), b"x").unwrap();

        let pending = pending_client_pids(dir.path(), &[]).unwrap();
        assert_eq!(pending, vec![42]);

        let pending = pending_client_pids(dir.path(), &[42]).unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn create_is_idempotent() {
        let dir = temp_dir::TempDir::new().unwrap();
        let pair = FifoPair::for_pid(dir.path(), 7);
        pair.create().unwrap();
        pair.create().unwrap();
        assert!(pair.client_to_server.exists());
        assert!(pair.server_to_client.exists());
    }
}
