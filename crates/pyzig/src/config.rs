//! Orchestrator configuration: where the cache lives, which `zig` binary
//! to invoke, and which mode to run in (spec.md §4.6, §6).
//!
//! No config-file crate is introduced, matching the teacher: a plain
//! struct built from CLI flags and two environment variables
//! (`PYZIG_CACHE_DIR`, `PYZIG_ZIG`).

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Compile only.
    Build,
    /// Compile (reusing a warm cache) and spawn the resulting binary.
    Run,
}

#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub source_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub mode: Mode,
    pub cache_dir: PathBuf,
    pub zig_path: PathBuf,
}

impl BuildConfig {
    /// Resolves the output path per spec.md §4.6 step 1: the explicit
    /// `output_path` if given, else `<cache_dir>/<basename_without_ext>`.
    #[must_use]
    pub fn resolved_output_path(&self) -> PathBuf {
        if let Some(explicit) = &self.output_path {
            return explicit.clone();
        }
        let stem = self.source_path.file_stem().unwrap_or_default();
        self.cache_dir.join(stem)
    }

    #[must_use]
    pub fn default_cache_dir() -> PathBuf {
        PathBuf::from(std::env::var("PYZIG_CACHE_DIR").unwrap_or_else(|_| ".pyzig-cache".to_owned()))
    }

    #[must_use]
    pub fn default_zig_path() -> PathBuf {
        PathBuf::from(std::env::var("PYZIG_ZIG").unwrap_or_else(|_| "zig".to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_output_path_wins() {
        let config = BuildConfig {
            source_path: Path::new("prog.py").to_owned(),
            output_path: Some(Path::new("/tmp/out").to_owned()),
            mode: Mode::Build,
            cache_dir: Path::new(".cache").to_owned(),
            zig_path: Path::new("zig").to_owned(),
        };
        assert_eq!(config.resolved_output_path(), Path::new("/tmp/out"));
    }

    #[test]
    fn default_output_path_uses_cache_dir_and_stem() {
        let config = BuildConfig {
            source_path: Path::new("dir/prog.py").to_owned(),
            output_path: None,
            mode: Mode::Build,
            cache_dir: Path::new(".cache").to_owned(),
            zig_path: Path::new("zig").to_owned(),
        };
        assert_eq!(config.resolved_output_path(), Path::new(".cache/prog"));
    }
}
