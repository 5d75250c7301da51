//! Role file loading: `<username> <role>` pairs, re-read for every incoming connection so an
//! operator can edit the file live without restarting the server.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Role {
    #[display("reader")]
    Reader,
    #[display("writer")]
    Writer,
}

impl Role {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "reader" => Some(Self::Reader),
            "writer" => Some(Self::Writer),
            _ => None,
        }
    }

    #[must_use]
    pub const fn can_write(self) -> bool {
        matches!(self, Self::Writer)
    }
}

#[derive(Clone)]
pub struct Roster {
    path: PathBuf,
}

impl Roster {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Looks up `username`'s role, re-reading the file from disk. Blank lines and lines
    /// starting with `#` are skipped; malformed lines are skipped rather than rejected outright,
    /// so one bad line in the roster doesn't lock everyone else out.
    pub fn lookup(&self, username: &str) -> Result<Option<Role>> {
        let roles = self.load()?;
        Ok(roles.get(username).copied())
    }

    fn load(&self) -> Result<HashMap<String, Role>> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read role file {}", self.path.display()))?;
        Ok(parse_roster(&contents))
    }
}

fn parse_roster(contents: &str) -> HashMap<String, Role> {
    let mut roles = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(username), Some(role_str)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Some(role) = Role::parse(role_str) else { continue };
        roles.insert(username.to_string(), role);
    }
    roles
}

pub fn is_user_readable_only(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(path)
            .with_context(|| format!("failed to stat {}", path.display()))?
            .permissions()
            .mode();
        let allowed = 0o7700;
        anyhow::ensure!(
            mode & !allowed == 0,
            "for security reasons, {} must not be group- or world-readable",
            path.display()
        );
    }
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_roles_and_skips_comments() {
        let roles = parse_roster("alice writer\n# a comment\n\nbob reader\n");
        assert_eq!(roles.get("alice"), Some(&Role::Writer));
        assert_eq!(roles.get("bob"), Some(&Role::Reader));
        assert_eq!(roles.len(), 2);
    }

    #[test]
    fn skips_malformed_lines() {
        let roles = parse_roster("alice\ncarol unknown-role\ndave writer\n");
        assert_eq!(roles.len(), 1);
        assert_eq!(roles.get("dave"), Some(&Role::Writer));
    }

    #[test]
    fn lookup_returns_none_for_unknown_user() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("roles.txt");
        fs::write(&path, "alice writer\n").unwrap();
        let roster = Roster::new(path);
        assert_eq!(roster.lookup("alice").unwrap(), Some(Role::Writer));
        assert_eq!(roster.lookup("mallory").unwrap(), None);
    }

    #[test]
    fn lookup_reflects_live_edits() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.path().join("roles.txt");
        fs::write(&path, "alice reader\n").unwrap();
        let roster = Roster::new(path.clone());
        assert_eq!(roster.lookup("alice").unwrap(), Some(Role::Reader));
        fs::write(&path, "alice writer\n").unwrap();
        assert_eq!(roster.lookup("alice").unwrap(), Some(Role::Writer));
    }
}
