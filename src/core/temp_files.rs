// src/core/temp_files.rs
//
// Relation streams live in TMPDIR (or the working directory) as
// <base>.<token>.<pid>, so concurrent factorisations never collide.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use rand::Rng;

/// All seven stream base names, in cleanup order.
pub const STREAM_NAMES: [&str; 7] = ["comb", "frels", "flprels", "lpnew", "rels", "fnew", "lprels"];

pub struct TempFiles {
    dir: PathBuf,
    token: u32,
    pid: u32,
}

impl TempFiles {
    /// Scratch directory from TMPDIR, falling back to the working directory.
    pub fn new() -> TempFiles {
        let dir = std::env::var("TMPDIR").unwrap_or_else(|_| "./".to_string());
        Self::in_dir(dir)
    }

    pub fn in_dir<P: AsRef<Path>>(dir: P) -> TempFiles {
        TempFiles {
            dir: dir.as_ref().to_path_buf(),
            token: rand::thread_rng().gen(),
            pid: std::process::id(),
        }
    }

    pub fn path(&self, base: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}.{}", base, self.token, self.pid))
    }

    /// Open a stream for writing, truncating any previous contents.
    pub fn create(&self, base: &str) -> io::Result<File> {
        File::create(self.path(base))
    }

    /// Open an existing stream for reading.
    pub fn open(&self, base: &str) -> io::Result<File> {
        File::open(self.path(base))
    }

    /// Open a stream for appending, creating it if absent.
    pub fn append(&self, base: &str) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(base))
    }

    /// Atomically replace `to` with `from`.
    pub fn rename(&self, from: &str, to: &str) -> io::Result<()> {
        fs::rename(self.path(from), self.path(to))
    }

    /// Remove every stream; missing files are not an error.
    pub fn remove_all(&self) {
        for base in STREAM_NAMES {
            let _ = fs::remove_file(self.path(base));
        }
    }
}

impl Default for TempFiles {
    fn default() -> Self {
        Self::new()
    }
}
