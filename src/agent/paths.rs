//! Typed paths into the agent state directory.
//!
//! Centralizing path construction keeps file access consistent between the
//! dispatch loop and the read-only commands.
use std::path::{Path, PathBuf};

/// Convenience wrapper for locating agent-owned artifacts.
#[derive(Debug, Clone)]
pub struct StatePaths {
    root: PathBuf,
}

impl StatePaths {
    /// Create a new path helper rooted at the state directory.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Return the state directory used for path derivation.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the `config.json` path.
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// Return the `state.json` path.
    pub fn state_path(&self) -> PathBuf {
        self.root.join("state.json")
    }

    /// Return the `history.jsonl` path.
    pub fn history_path(&self) -> PathBuf {
        self.root.join("history.jsonl")
    }
}
