//! Recursive enumeration of the music library.
//!
//! Every file and directory under the root is reported as a `(path, category)`
//! pair; categories come from the file extension.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regex::{Regex, RegexBuilder};

/// Extensions treated as audio, lowercase, without the dot.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "wma", "flac", "aac", "ogg", "opus"];
const PLAYLIST_EXTENSIONS: &[&str] = &["m3u", "m3u8", "pls", "asx", "wpl"];
const LYRICS_EXTENSIONS: &[&str] = &["lrc"];

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Audio,
    Playlist,
    Lyrics,
    File,
    Dir,
}

impl Category {
    /// Category of a file, from the text after its last `.`.
    pub fn of_file(name: &str) -> Self {
        let ext = name.rsplit('.').next().unwrap_or_default().to_lowercase();
        let ext = ext.as_str();
        if AUDIO_EXTENSIONS.contains(&ext) {
            Self::Audio
        } else if PLAYLIST_EXTENSIONS.contains(&ext) {
            Self::Playlist
        } else if LYRICS_EXTENSIONS.contains(&ext) {
            Self::Lyrics
        } else {
            Self::File
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Audio => "Audio",
            Self::Playlist => "Playlist",
            Self::Lyrics => "Lyrics",
            Self::File => "File",
            Self::Dir => "DIR",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `true` when the path's extension names an audio format.
pub fn is_audio_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| AUDIO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryEntry {
    pub path: PathBuf,
    pub category: Category,
}

impl fmt::Display for LibraryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.category, self.path.display())
    }
}

/// A subdirectory found during a walk.
#[derive(Debug)]
struct SubDir {
    path: PathBuf,
    /// Reached through a symlink: reported, never descended into.
    linked: bool,
}

/// Subdirectories and files of `dir`, each sorted by name.
fn read_sorted(dir: &Path) -> io::Result<(Vec<SubDir>, Vec<PathBuf>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            dirs.push(SubDir {
                path,
                linked: false,
            });
        } else if file_type.is_symlink() && path.is_dir() {
            dirs.push(SubDir { path, linked: true });
        } else {
            files.push(path);
        }
    }
    dirs.sort_by(|a, b| a.path.cmp(&b.path));
    files.sort();
    Ok((dirs, files))
}

/// Subdirectories to walk next, first one on top of the stack.
fn descend_into(pending: &mut Vec<PathBuf>, dirs: Vec<SubDir>) {
    pending.extend(
        dirs.into_iter()
            .rev()
            .filter(|dir| !dir.linked)
            .map(|dir| dir.path),
    );
}

fn file_category(path: &Path) -> Category {
    path.file_name()
        .map(|n| Category::of_file(&n.to_string_lossy()))
        .unwrap_or(Category::File)
}

/// Top-down walk: for each directory, its subdirectories, then its files,
/// then the same for each subdirectory in turn. Paths are absolute.
/// Symlinked directories are listed but not followed.
pub fn enumerate(root: &Path) -> Result<Vec<LibraryEntry>, LibraryError> {
    let root = std::path::absolute(root).map_err(|source| LibraryError::ReadDir {
        path: root.to_path_buf(),
        source,
    })?;
    let mut records = Vec::new();
    let mut pending = vec![root];

    while let Some(dir) = pending.pop() {
        let (dirs, files) = read_sorted(&dir).map_err(|source| LibraryError::ReadDir {
            path: dir.clone(),
            source,
        })?;
        records.extend(dirs.iter().map(|sub| LibraryEntry {
            path: sub.path.clone(),
            category: Category::Dir,
        }));
        records.extend(files.into_iter().map(|path| LibraryEntry {
            category: file_category(&path),
            path,
        }));
        descend_into(&mut pending, dirs);
    }
    Ok(records)
}

/// One page of `enumerate`, as display lines. `page` is 1-based.
///
/// Returns `None` when the page lies past the end.
pub fn list_page(
    root: &Path,
    page: usize,
    page_size: usize,
) -> Result<Option<Vec<String>>, LibraryError> {
    let records = enumerate(root)?;
    let start = page.saturating_sub(1).saturating_mul(page_size);
    let lines: Vec<String> = records
        .iter()
        .skip(start)
        .take(page_size)
        .map(ToString::to_string)
        .collect();
    Ok((!lines.is_empty()).then_some(lines))
}

pub fn last_page_notice(page: usize) -> String {
    format!("Previous page was the last page.\nNo results found for page {page}.")
}

/// Case-insensitive regex; patterns that do not compile match literally.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .or_else(|e| {
            tracing::debug!(pattern, error = %e, "not a valid regex, matching literally");
            RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()
        })
}

/// Files under `root` whose names match `pattern`. Directories are walked
/// but never reported; unreadable ones and symlinked ones are skipped.
pub fn search(root: &Path, pattern: &str) -> Vec<LibraryEntry> {
    let matcher = match compile_pattern(pattern) {
        Ok(matcher) => matcher,
        Err(e) => {
            tracing::warn!(pattern, error = %e, "unusable search pattern");
            return Vec::new();
        }
    };
    let mut matches = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let (dirs, files) = match read_sorted(&dir) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                continue;
            }
        };
        for path in files {
            let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if matcher.is_match(&name) {
                matches.push(LibraryEntry {
                    category: Category::of_file(&name),
                    path,
                });
            }
        }
        descend_into(&mut pending, dirs);
    }
    matches
}
