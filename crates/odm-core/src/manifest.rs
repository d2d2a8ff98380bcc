//! Line-delimited path lists.
//!
//! The manifest is the only hand-off between stage 1 and stage 2: stage 1
//! writes the accepted paths, stage 2 reads them back as its caselist. The
//! good/bad outputs of stage 2 use the same format. Every entry is followed by
//! a newline, and files are written through a temporary sibling that is
//! renamed into place, so a failed write never leaves a partial artifact.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{OdmError, Result};

/// Atomically write `lines`, one per line.
///
/// Fails without touching `path` if any entry contains a newline.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    for line in lines {
        if line.as_ref().contains('\n') {
            return Err(OdmError::manifest(
                path,
                format!("entry contains a newline: {:?}", line.as_ref()),
            ));
        }
    }

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.exists() {
        fs::create_dir_all(&parent)
            .map_err(|e| OdmError::manifest(path, format!("failed to create directory: {}", e)))?;
    }

    let tmp = NamedTempFile::new_in(&parent)
        .map_err(|e| OdmError::manifest(path, format!("failed to create temp file: {}", e)))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        for line in lines {
            writeln!(writer, "{}", line.as_ref())
                .map_err(|e| OdmError::manifest(path, format!("failed to write: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| OdmError::manifest(path, format!("failed to flush: {}", e)))?;
    }
    tmp.persist(path)
        .map_err(|e| OdmError::manifest(path, format!("failed to persist: {}", e.error)))?;
    Ok(())
}

/// Read every line back, in file order.
///
/// Inverse of [`write_lines`]: a trailing newline does not produce an extra
/// empty entry, and no other whitespace is stripped.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| OdmError::manifest(path, format!("failed to read: {}", e)))?;

    let mut lines: Vec<String> = contents.split('\n').map(str::to_string).collect();
    if lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    Ok(lines)
}

/// Write a list of file paths as a manifest.
pub fn write_manifest<P: AsRef<Path>>(path: &Path, entries: &[P]) -> Result<()> {
    let lines = entries
        .iter()
        .map(|entry| {
            entry.as_ref().to_str().map(str::to_string).ok_or_else(|| {
                OdmError::manifest(
                    path,
                    format!("path is not valid UTF-8: {}", entry.as_ref().display()),
                )
            })
        })
        .collect::<Result<Vec<String>>>()?;
    write_lines(path, &lines)
}

/// Read a manifest back as paths.
pub fn read_manifest(path: &Path) -> Result<Vec<PathBuf>> {
    Ok(read_lines(path)?.into_iter().map(PathBuf::from).collect())
}

/// Read a stage 2 caselist, reporting a missing or empty manifest as an error.
pub fn load_caselist(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_file() {
        return Err(OdmError::manifest(path, "manifest not found"));
    }
    let entries = read_manifest(path)?;
    if entries.is_empty() {
        return Err(OdmError::manifest(path, "manifest is empty"));
    }
    Ok(entries)
}
