//! Test fixtures: constants, song JSON, and override files.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use songsmith_backend::{generate_song, SongRequest};
use songsmith_spec::Constants;

/// The built-in constants tables.
pub fn builtin_constants() -> Constants {
    Constants::builtin().expect("built-in constants must load")
}

/// Generates a song and returns its pretty JSON as bytes.
pub fn song_json(constants: &Constants, request: &SongRequest) -> Vec<u8> {
    generate_song(constants, request, 0)
        .expect("generation failed")
        .to_json_pretty()
        .expect("song serialization failed")
        .into_bytes()
}

/// A temporary directory holding constants override files.
pub struct OverrideFixture {
    pub root: TempDir,
}

impl OverrideFixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Writes `content` to `name` and returns its path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).expect("Failed to write override file");
        path
    }
}

impl Default for OverrideFixture {
    fn default() -> Self {
        Self::new()
    }
}
