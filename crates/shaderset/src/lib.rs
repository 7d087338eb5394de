//! Discovers fragment shader sources on disk and tracks which one is
//! selected. The binary resolves the CLI path into a [`ShaderCycle`] and the
//! renderer drives it: cycling with the bracket keys, re-reading sources on
//! reload, and polling modification times once per frame to detect edits.
//!
//! Types:
//!
//! - `ShaderSource` carries the loaded text together with its path and the
//!   modification time observed at load.
//! - `ShaderCycle` owns the ordered candidate list, the cyclic selection
//!   index, and the last-seen modification time of the selected file.
//! - `SourceError` classifies load failures for diagnostics.
//!
//! Functions:
//!
//! - `collect_shader_files` expands a file-or-directory input into the
//!   ordered candidate list.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::debug;

/// Extensions recognized when scanning a directory for fragment shaders.
pub const SHADER_EXTENSIONS: &[&str] = &["frag", "glsl", "fs"];

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("shader source is not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("failed to read shader source at {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A shader source snapshot: text, origin, and the modification time seen
/// when it was read. Reloads produce a fresh value; nothing mutates in place.
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub path: PathBuf,
    pub text: String,
    pub modified: Option<SystemTime>,
}

impl ShaderSource {
    /// Reads the complete file as text. Fails if the path is missing,
    /// unreadable, or not a regular file. No caching; callers decide when to
    /// re-read.
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let metadata = fs::metadata(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(SourceError::NotAFile(path.to_path_buf()));
        }

        let text = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            text,
            modified: metadata.modified().ok(),
        })
    }
}

/// Expands the startup input into an ordered candidate list.
///
/// A regular file becomes a one-element list regardless of its extension. A
/// directory contributes its immediate regular files with a recognized
/// extension, sorted lexicographically by path. Anything else yields an
/// empty list; the caller decides whether that is fatal.
pub fn collect_shader_files(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    if !input.is_dir() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(input)
        .with_context(|| format!("failed to scan shader directory {}", input.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry
            .with_context(|| format!("failed to scan shader directory {}", input.display()))?;
        let file_type = entry.file_type().with_context(|| {
            format!("failed to inspect directory entry {}", entry.path().display())
        })?;
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        if has_shader_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    files.dedup();
    debug!(
        directory = %input.display(),
        count = files.len(),
        "collected shader candidates"
    );
    Ok(files)
}

fn has_shader_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SHADER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Ordered shader candidates plus the cyclic selection state.
///
/// The list is computed once at startup and never rescanned. Selection moves
/// with [`select_next`](Self::select_next) /
/// [`select_previous`](Self::select_previous); the stored modification time
/// belongs to the currently selected file and feeds
/// [`poll_modified`](Self::poll_modified).
#[derive(Debug)]
pub struct ShaderCycle {
    files: Vec<PathBuf>,
    index: usize,
    modified: Option<SystemTime>,
}

impl ShaderCycle {
    /// Resolves the input path and selects the first candidate. An empty
    /// result is the fatal no-shader-to-show startup condition.
    pub fn new(input: &Path) -> Result<Self> {
        let files = collect_shader_files(input)?;
        Self::from_files(files)
            .with_context(|| format!("no shader sources found under {}", input.display()))
    }

    /// Builds a cycle from an already-resolved candidate list.
    pub fn from_files(files: Vec<PathBuf>) -> Result<Self> {
        anyhow::ensure!(!files.is_empty(), "shader candidate list is empty");
        let mut cycle = Self {
            files,
            index: 0,
            modified: None,
        };
        cycle.refresh_modified();
        Ok(cycle)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path of the currently selected shader.
    pub fn selected(&self) -> &Path {
        &self.files[self.index]
    }

    /// Advances to the next candidate, wrapping at the end. Returns whether
    /// the selection actually changed (a one-element cycle never moves).
    pub fn select_next(&mut self) -> bool {
        self.select_index((self.index + 1) % self.files.len())
    }

    /// Steps back to the previous candidate, wrapping at the start.
    pub fn select_previous(&mut self) -> bool {
        self.select_index((self.index + self.files.len() - 1) % self.files.len())
    }

    fn select_index(&mut self, next: usize) -> bool {
        if next == self.index {
            return false;
        }
        self.index = next;
        self.refresh_modified();
        true
    }

    /// Re-snapshots the selected file's modification time, so a switch does
    /// not immediately re-trigger the change poll.
    pub fn refresh_modified(&mut self) {
        self.modified = stat_modified(self.selected());
    }

    /// Compares the selected file's on-disk modification time against the
    /// stored snapshot. On a change the snapshot is updated and `true` is
    /// returned, so each edit is reported exactly once. Stat failures are
    /// treated as no-change; the next successful stat reports the edit.
    pub fn poll_modified(&mut self) -> bool {
        let Some(current) = stat_modified(self.selected()) else {
            return false;
        };
        if self.modified == Some(current) {
            return false;
        }
        self.modified = Some(current);
        true
    }
}

fn stat_modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "void mainImage(out vec4 c, in vec2 p) {}").unwrap();
        path
    }

    #[test]
    fn single_file_resolves_to_itself_regardless_of_extension() {
        let temp = tempfile::tempdir().unwrap();
        let path = touch(temp.path(), "scene.txt");
        let files = collect_shader_files(&path).unwrap();
        assert_eq!(files, vec![path]);
    }

    #[test]
    fn directory_scan_filters_and_orders() {
        let temp = tempfile::tempdir().unwrap();
        let b = touch(temp.path(), "b.frag");
        let a = touch(temp.path(), "a.glsl");
        touch(temp.path(), "c.txt");
        fs::create_dir(temp.path().join("nested.frag")).unwrap();

        let files = collect_shader_files(temp.path()).unwrap();
        assert_eq!(files, vec![a, b]);
    }

    #[test]
    fn missing_input_yields_empty_list() {
        let temp = tempfile::tempdir().unwrap();
        let files = collect_shader_files(&temp.path().join("absent")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn empty_directory_is_a_fatal_cycle() {
        let temp = tempfile::tempdir().unwrap();
        assert!(ShaderCycle::new(temp.path()).is_err());
    }

    #[test]
    fn cycle_wraps_in_both_directions() {
        let temp = tempfile::tempdir().unwrap();
        let a = touch(temp.path(), "a.frag");
        let b = touch(temp.path(), "b.frag");
        let c = touch(temp.path(), "c.frag");
        let mut cycle = ShaderCycle::from_files(vec![a.clone(), b, c.clone()]).unwrap();

        assert_eq!(cycle.selected(), a);
        assert!(cycle.select_previous());
        assert_eq!(cycle.selected(), c);
        assert!(cycle.select_next());
        assert_eq!(cycle.selected(), a);
    }

    #[test]
    fn single_candidate_never_moves() {
        let temp = tempfile::tempdir().unwrap();
        let a = touch(temp.path(), "only.frag");
        let mut cycle = ShaderCycle::from_files(vec![a.clone()]).unwrap();
        assert!(!cycle.select_next());
        assert!(!cycle.select_previous());
        assert_eq!(cycle.selected(), a);
    }

    #[test]
    fn poll_reports_each_edit_exactly_once() {
        let temp = tempfile::tempdir().unwrap();
        let path = touch(temp.path(), "live.frag");
        let mut cycle = ShaderCycle::from_files(vec![path.clone()]).unwrap();
        assert!(!cycle.poll_modified());

        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
            .unwrap();

        assert!(cycle.poll_modified());
        assert!(!cycle.poll_modified());
    }

    #[test]
    fn switching_resnapshots_the_new_selection() {
        let temp = tempfile::tempdir().unwrap();
        let a = touch(temp.path(), "a.frag");
        let b = touch(temp.path(), "b.frag");

        let file = File::options().write(true).open(&b).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
            .unwrap();

        let mut cycle = ShaderCycle::from_files(vec![a, b]).unwrap();
        assert!(cycle.select_next());
        // The switch observed b's current mtime; no stale change fires.
        assert!(!cycle.poll_modified());
    }

    #[test]
    fn load_rejects_directories() {
        let temp = tempfile::tempdir().unwrap();
        let err = ShaderSource::load(temp.path()).unwrap_err();
        assert!(matches!(err, SourceError::NotAFile(_)));
    }

    #[test]
    fn load_snapshots_text_and_mtime() {
        let temp = tempfile::tempdir().unwrap();
        let path = touch(temp.path(), "demo.frag");
        let source = ShaderSource::load(&path).unwrap();
        assert_eq!(source.path, path);
        assert!(source.text.contains("mainImage"));
        assert!(source.modified.is_some());
    }
}
