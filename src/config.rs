//! Storage root and tunable resolution.
//!
//! Grounded on the teacher's `SimpleFileStorage::new(filename)` explicit-path
//! constructor pattern; `BINDB_STORAGE_PATH` env resolution follows the
//! `std::env::var` idiom the teacher itself uses in `src/test.rs`
//! (`test_amount`, reading env var `TA`).

use crate::write_buffer::WriteBufferConfig;
use std::path::PathBuf;

/// Environment variable selecting the base storage directory when this
/// engine is embedded in a server (Section 6, "Environment").
pub const STORAGE_PATH_ENV: &str = "BINDB_STORAGE_PATH";

const DEFAULT_BASE_DIR: &str = "./data";
const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Resolved configuration for a `Database`: where it lives on disk, and the
/// per-table cache/write-buffer tunables new tables are opened with.
#[derive(Clone, Debug)]
pub struct Config {
    pub base_dir: PathBuf,
    pub cache_capacity: usize,
    pub write_buffer: WriteBufferConfig,
    /// Disables Text/Buffer truncation in favour of `Error::BufferOverflow`
    /// for every table this `Database` creates or opens (Section 4.2 "Edge
    /// cases", opt-in strict mode). Off by default.
    pub strict: bool,
}

impl Config {
    /// Explicit construction, e.g. for an embedding caller that already
    /// knows its storage path (Section 6: "otherwise a caller-supplied
    /// path is used").
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Config {
            base_dir: base_dir.into(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            write_buffer: WriteBufferConfig::default(),
            strict: false,
        }
    }

    /// Resolve `base_dir` from `BINDB_STORAGE_PATH`, falling back to
    /// `./data` if unset. `cache_capacity`/`write_buffer` take documented
    /// defaults since the distilled spec names no env vars for them.
    pub fn from_env() -> Self {
        let base_dir = std::env::var(STORAGE_PATH_ENV).unwrap_or_else(|_| DEFAULT_BASE_DIR.to_string());
        Config::new(base_dir)
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_write_buffer(mut self, config: WriteBufferConfig) -> Self {
        self.write_buffer = config;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_overrides_defaults() {
        let cfg = Config::new("/tmp/somewhere");
        assert_eq!(cfg.base_dir, PathBuf::from("/tmp/somewhere"));
        assert_eq!(cfg.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert!(!cfg.strict);
    }

    #[test]
    fn builders_override_tunables() {
        let cfg = Config::new("/tmp/x")
            .with_cache_capacity(10)
            .with_write_buffer(WriteBufferConfig {
                max_records: 1,
                max_bytes: 8,
            })
            .with_strict(true);
        assert_eq!(cfg.cache_capacity, 10);
        assert_eq!(cfg.write_buffer.max_records, 1);
        assert!(cfg.strict);
    }
}
