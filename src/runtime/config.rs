use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Limits and locations the evaluator works with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Iterations an `until` loop may run before it is aborted
    pub max_until_iterations: usize,
    /// Deepest nesting of zones, aliases and reactive bodies
    pub max_block_depth: usize,
    /// Directory holding `remember` files
    pub memory_dir: PathBuf,
    /// Extra directories searched by `use` after the built-in candidates
    pub library_dirs: Vec<PathBuf>,
    /// When false, `wait` and `after` return immediately
    pub allow_sleep: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            max_until_iterations: 10_000,
            max_block_depth: 64,
            memory_dir: PathBuf::from("."),
            library_dirs: Vec::new(),
            allow_sleep: true,
        }
    }
}

impl EvaluatorConfig {
    /// Defaults overlaid with `FIGLANG_MEMORY_DIR`, `FIGLANG_MAX_DEPTH` and
    /// `FIGLANG_LIB_PATH` (colon separated)
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("FIGLANG_MEMORY_DIR").filter(|d| !d.is_empty()) {
            self.memory_dir = PathBuf::from(dir);
        }
        if let Some(depth) = lookup("FIGLANG_MAX_DEPTH") {
            match depth.trim().parse::<usize>() {
                Ok(depth) if depth > 0 => self.max_block_depth = depth,
                _ => tracing::warn!(value = %depth, "ignoring invalid FIGLANG_MAX_DEPTH"),
            }
        }
        if let Some(paths) = lookup("FIGLANG_LIB_PATH") {
            self.library_dirs.extend(
                paths
                    .split(':')
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from),
            );
        }
        self
    }

    /// Same limits with sleeping disabled
    pub fn without_sleep(mut self) -> Self {
        self.allow_sleep = false;
        self
    }
}
