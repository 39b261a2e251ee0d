use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::{debug, warn};

/// File name the sandboxed run command reads its stdin from.
pub const STDIN_FILE: &str = "input.txt";

/// Ephemeral directory backing exactly one execution.
///
/// Owned exclusively by that execution and removed on every exit path:
/// `release` on the normal paths, `Drop` as a backstop for panics and early
/// returns. Removal failures are logged and swallowed; a leaked directory
/// never changes an execution's result.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    created_at: SystemTime,
    released: bool,
}

impl Workspace {
    /// Create a uniquely named directory and materialize the source file
    /// (named per the language profile) and the stdin file into it.
    pub fn acquire(source_file: &str, source_code: &str, stdin: &str) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("judge-")
            .tempdir()
            .context("failed to create workspace directory")?;
        let path = dir.keep();

        std::fs::write(path.join(source_file), source_code)
            .context("failed to write source file")?;
        std::fs::write(path.join(STDIN_FILE), stdin).context("failed to write stdin file")?;

        debug!(path = %path.display(), "workspace acquired");
        Ok(Self {
            path,
            created_at: SystemTime::now(),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Remove the directory recursively. Best-effort: a failure is logged
    /// and accepted (no retry), never surfaced to the caller.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "workspace released"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to remove workspace");
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_materializes_source_and_stdin() {
        let ws = Workspace::acquire("main.py", "print(1)", "3 4\n").unwrap();
        let source = std::fs::read_to_string(ws.path().join("main.py")).unwrap();
        let stdin = std::fs::read_to_string(ws.path().join(STDIN_FILE)).unwrap();
        assert_eq!(source, "print(1)");
        assert_eq!(stdin, "3 4\n");
        ws.release();
    }

    #[test]
    fn release_removes_the_directory() {
        let ws = Workspace::acquire("main.py", "", "").unwrap();
        let path = ws.path().to_path_buf();
        assert!(path.is_dir());
        ws.release();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_the_directory() {
        let path = {
            let ws = Workspace::acquire("main.cpp", "int main(){}", "").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn workspaces_never_collide() {
        let a = Workspace::acquire("main.py", "", "").unwrap();
        let b = Workspace::acquire("main.py", "", "").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn release_tolerates_already_removed_directory() {
        let ws = Workspace::acquire("main.py", "", "").unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();
        ws.release();
    }
}
