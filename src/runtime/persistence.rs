//! Everything that touches the filesystem: remembered values, plain file
//! access, log export and library lookup.

use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::runtime::Value;

/// Extension appended to library names given without one
pub const LIBRARY_EXTENSION: &str = ".fig";

/// On-disk shape of a remembered value
#[derive(Debug, Serialize, Deserialize)]
struct MemoryRecord {
    value: Value,
}

/// File holding the value remembered under `key`
///
/// Keys name a file inside `dir`, so path separators and `..` are rejected.
pub fn memory_path(dir: &Path, key: &str) -> Result<PathBuf> {
    if key.contains(|c: char| c == '/' || c == '\\') || key.contains("..") {
        return Err(Error::value(format!(
            "'{}' is not a valid memory name",
            key
        )));
    }
    Ok(dir.join(format!(".figlang_{}.json", key)))
}

/// Stores `value` under `key`, replacing any earlier one
pub fn save_memory(dir: &Path, key: &str, value: &Value) -> Result<()> {
    let path = memory_path(dir, key)?;
    let json = serde_json::to_string(&MemoryRecord {
        value: value.clone(),
    })
    .map_err(|e| Error::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    fs::write(&path, json).map_err(|e| Error::io(path.display().to_string(), &e))
}

/// Loads the value remembered under `key`, if there is one
pub fn load_memory(dir: &Path, key: &str) -> Result<Option<Value>> {
    let path = memory_path(dir, key)?;
    if !path.exists() {
        return Ok(None);
    }
    let json = read_text(&path)?;
    let record: MemoryRecord = serde_json::from_str(&json).map_err(|e| Error::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(record.value))
}

/// Deletes the value remembered under `key`; false when there was none
pub fn forget_memory(dir: &Path, key: &str) -> Result<bool> {
    let path = memory_path(dir, key)?;
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path).map_err(|e| Error::io(path.display().to_string(), &e))?;
    Ok(true)
}

/// Reads a whole file as text
pub fn read_text(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), &e))
}

/// Creates or truncates a file with `content`
pub fn write_text(path: impl AsRef<Path>, content: &str) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, content).map_err(|e| Error::io(path.display().to_string(), &e))
}

/// Appends `content` and a newline, creating the file if needed
pub fn append_line(path: impl AsRef<Path>, content: &str) -> Result<()> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path.display().to_string(), &e))?;
    writeln!(file, "{}", content).map_err(|e| Error::io(path.display().to_string(), &e))
}

/// File content with surrounding whitespace removed, split on newlines
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let text = read_text(path)?;
    Ok(text.trim().split('\n').map(str::to_string).collect())
}

/// Finds the file a `use "name"` statement refers to
///
/// Candidates, in order: the name itself, `libs/name` under the working
/// directory, `libs/name` next to the including file, then each extra
/// library directory.
pub fn resolve_library(
    name: &str,
    including_dir: Option<&Path>,
    library_dirs: &[PathBuf],
) -> Result<PathBuf> {
    let file = if name.ends_with(LIBRARY_EXTENSION) {
        name.to_string()
    } else {
        format!("{}{}", name, LIBRARY_EXTENSION)
    };

    let mut candidates = vec![PathBuf::from(&file), Path::new("libs").join(&file)];
    if let Some(dir) = including_dir {
        candidates.push(dir.join("libs").join(&file));
    }
    candidates.extend(library_dirs.iter().map(|dir| dir.join(&file)));

    candidates
        .into_iter()
        .find(|candidate| {
            tracing::trace!(candidate = %candidate.display(), "trying library path");
            candidate.is_file()
        })
        .ok_or(Error::FileNotFound { path: file })
}
