//! Extended M3U playlist files.
//!
//! Pure synchronous functions with NO MCP dependency; async callers use
//! `spawn_blocking`. Every mutation is a full read-modify-write of one file,
//! serialized per path and persisted through a temp file + rename so readers
//! never observe a half-written playlist.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::Config;
use crate::types::TrackMetadata;

pub const HEADER: &str = "#EXTM3U";
pub const EXTINF: &str = "#EXTINF:";
/// Subdirectory of the library root that holds generated playlists.
pub const PLAYLIST_DIR: &str = "Playlist";

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("Playlist store root is not a directory: {0}")]
    RootMissing(PathBuf),
    #[error("Invalid playlist name: {0:?}")]
    InvalidName(String),
    #[error("Playlist is not valid UTF-8: {0}")]
    NotUtf8(PathBuf),
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PlaylistError {
    fn io<'a>(action: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> Self + 'a {
        move |source| Self::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result of a removal pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Path lines that matched a target and were dropped.
    pub removed: usize,
    /// Whether the file was rewritten.
    pub written: bool,
}

// ---------------------------------------------------------------------------
// Format
// ---------------------------------------------------------------------------

/// A `#EXTINF` directive paired with the path line that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub duration: String,
    pub title: String,
    pub path: String,
}

/// Structural view of a playlist's text.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Playlist {
    pub has_header: bool,
    pub entries: Vec<PlaylistEntry>,
    /// Path lines with no directive directly above them.
    pub orphans: usize,
}

impl Playlist {
    pub fn parse(text: &str) -> Self {
        let mut playlist = Playlist::default();
        let mut pending: Option<(String, String)> = None;
        let mut seen_content = false;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                // A blank line breaks the directive/path adjacency.
                pending = None;
                continue;
            }
            if !seen_content && line.starts_with(HEADER) {
                playlist.has_header = true;
                seen_content = true;
                continue;
            }
            seen_content = true;

            if let Some(info) = line.strip_prefix(EXTINF) {
                let (duration, title) = info.split_once(',').unwrap_or((info, ""));
                pending = Some((duration.trim().to_string(), title.trim().to_string()));
            } else if line.starts_with('#') {
                pending = None;
            } else if let Some((duration, title)) = pending.take() {
                playlist.entries.push(PlaylistEntry {
                    duration,
                    title,
                    path: line.to_string(),
                });
            } else {
                playlist.orphans += 1;
            }
        }
        playlist
    }
}

fn has_header(text: &str) -> bool {
    text.lines().any(|line| line.trim().starts_with(HEADER))
}

/// Blank separator, directive, path.
fn render_entry(out: &mut String, entry: &TrackMetadata) {
    out.push('\n');
    out.push_str(EXTINF);
    out.push_str(&format!("{}, {}\n", entry.duration, entry.title));
    out.push_str(&entry.file_path);
    out.push('\n');
}

/// Append `entries` to `existing` (or to a fresh playlist when `None`).
///
/// A header missing from an existing file is inserted as its first line.
pub fn render_upsert(existing: Option<&str>, entries: &[TrackMetadata]) -> String {
    let mut out = String::new();
    match existing {
        Some(text) => {
            if !has_header(text) {
                out.push_str(HEADER);
                out.push('\n');
            }
            out.push_str(text);
            if !text.is_empty() && !text.ends_with('\n') {
                out.push('\n');
            }
        }
        None => {
            out.push_str(HEADER);
            out.push('\n');
        }
    }
    for entry in entries {
        render_entry(&mut out, entry);
    }
    out
}

/// Drop every path line found in `targets` together with the line kept
/// immediately before it. Line terminators are preserved.
pub fn strip_entries<'a>(text: &'a str, targets: &HashSet<String>) -> (Vec<&'a str>, usize) {
    let mut kept: Vec<&str> = Vec::new();
    let mut removed = 0;
    for line in text.split_inclusive('\n') {
        if targets.contains(line.trim()) {
            kept.pop();
            removed += 1;
            continue;
        }
        kept.push(line);
    }
    (kept, removed)
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Absolute, symlink-free form of a song path. For files that no longer
/// exist, `.` and `..` are folded lexically and the longest existing
/// ancestor is canonicalized.
fn canonical_target(song: &str) -> Option<String> {
    let path = Path::new(song);
    let resolved = fs::canonicalize(path)
        .or_else(|_| resolve_missing(path))
        .ok()?;
    Some(resolved.to_string_lossy().into_owned())
}

fn resolve_missing(path: &Path) -> io::Result<PathBuf> {
    let mut normalized = PathBuf::new();
    for component in std::path::absolute(path)?.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }

    let mut tail = Vec::new();
    let mut cursor = normalized.as_path();
    loop {
        if let Ok(base) = fs::canonicalize(cursor) {
            return Ok(tail.iter().rev().fold(base, |acc, name| acc.join(name)));
        }
        match (cursor.parent(), cursor.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                cursor = parent;
            }
            _ => break,
        }
    }
    Ok(normalized)
}

fn validate_name(name: &str) -> Result<(), PlaylistError> {
    let invalid = name.trim().is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0'])
        || Path::new(name).is_absolute();
    if invalid {
        return Err(PlaylistError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Stable key for the lock registry: the canonical path, or canonical
/// parent + file name for a file not yet created.
fn lock_key(path: &Path) -> PathBuf {
    if let Ok(canonical) = fs::canonicalize(path) {
        return canonical;
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    fs::canonicalize(parent)
        .map(|dir| dir.join(name))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Hidden sibling used for atomic replacement.
/// Format: `.{stem}.plst-{pid}-{nanos}.{ext}`
fn atomic_temp_path(original: &Path) -> PathBuf {
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("playlist");
    let ext = original
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("tmp");
    let pid = std::process::id();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    original.with_file_name(format!(".{stem}.plst-{pid}-{nanos}.{ext}"))
}

/// Replace `path` with `contents`. A symlinked playlist is written through
/// to its target, and an existing file keeps its permissions.
fn write_atomic(path: &Path, contents: &str) -> Result<(), PlaylistError> {
    let target = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let permissions = fs::metadata(&target).ok().map(|meta| meta.permissions());
    let temp_path = atomic_temp_path(&target);
    let result = (|| -> io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(contents.as_bytes())?;
        if let Some(permissions) = permissions {
            file.set_permissions(permissions)?;
        }
        file.sync_all()?;
        fs::rename(&temp_path, &target)
    })();
    if let Err(source) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(PlaylistError::Io {
            action: "write",
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

fn read_text(path: &Path) -> Result<String, PlaylistError> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        io::ErrorKind::InvalidData => PlaylistError::NotUtf8(path.to_path_buf()),
        _ => PlaylistError::Io {
            action: "read",
            path: path.to_path_buf(),
            source,
        },
    })
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| {
        tracing::warn!("playlist lock poisoned, recovering");
        e.into_inner()
    })
}

pub struct PlaylistStore {
    root: PathBuf,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PlaylistStore {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.root().to_path_buf(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// `<root>/Playlist`, where generated playlists live.
    pub fn playlist_dir(&self) -> PathBuf {
        self.root.join(PLAYLIST_DIR)
    }

    /// Lock for one playlist path. Entries nobody else holds are dropped
    /// first, so the registry only grows with concurrently edited paths.
    fn path_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = lock_or_recover(&self.locks);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(lock_key(path)).or_default().clone()
    }

    /// Whole file as text.
    pub fn read(&self, path: &Path) -> Result<String, PlaylistError> {
        read_text(path)
    }

    /// Append `entries` to `<root>/Playlist/<playlist_name>`, creating the
    /// directory and file as needed. Returns the playlist path.
    ///
    /// The `Playlist` directory is left in place if a later step fails.
    pub fn upsert(
        &self,
        entries: &[TrackMetadata],
        playlist_name: &str,
    ) -> Result<PathBuf, PlaylistError> {
        validate_name(playlist_name)?;
        if !self.root.is_dir() {
            return Err(PlaylistError::RootMissing(self.root.clone()));
        }

        let dir = self.playlist_dir();
        if !dir.is_dir() {
            fs::create_dir(&dir).map_err(PlaylistError::io("create directory", &dir))?;
            tracing::info!(dir = %dir.display(), "created playlist directory");
        }

        let target = dir.join(playlist_name);
        let lock = self.path_lock(&target);
        let _held = lock_or_recover(&*lock);

        let existing = match fs::read_to_string(&target) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(PlaylistError::NotUtf8(target));
            }
            Err(source) => {
                return Err(PlaylistError::Io {
                    action: "read",
                    path: target,
                    source,
                });
            }
        };
        let created = existing.is_none();
        let contents = render_upsert(existing.as_deref(), entries);
        write_atomic(&target, &contents)?;

        let parsed = Playlist::parse(&contents);
        tracing::info!(
            playlist = %target.display(),
            appended = entries.len(),
            total = parsed.entries.len(),
            orphans = parsed.orphans,
            created,
            "playlist updated"
        );
        Ok(target)
    }

    /// Remove every entry whose path line matches one of `songs`.
    ///
    /// Targets are canonicalized before comparison. The file is left alone
    /// when nothing matched or when removal would leave no lines at all.
    pub fn remove(&self, path: &Path, songs: &[String]) -> Result<RemoveOutcome, PlaylistError> {
        let targets: HashSet<String> = songs
            .iter()
            .filter_map(|song| canonical_target(song))
            .collect();

        let lock = self.path_lock(path);
        let _held = lock_or_recover(&*lock);

        let text = read_text(path)?;
        let (kept, removed) = strip_entries(&text, &targets);

        let written = removed > 0 && !kept.is_empty();
        if written {
            write_atomic(path, &kept.concat())?;
        }

        tracing::info!(
            playlist = %path.display(),
            requested = songs.len(),
            removed,
            written,
            "playlist entries removed"
        );
        Ok(RemoveOutcome { removed, written })
    }
}
