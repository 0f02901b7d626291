//! Audio metadata reading using `lofty`.
//!
//! Pure functions with NO MCP dependency. All functions are synchronous —
//! callers use `spawn_blocking` for async contexts.

use std::fs;
use std::path::{Path, PathBuf};

use lofty::config::{ParseOptions, ParsingMode};
use lofty::prelude::*;
use lofty::probe::Probe;

use crate::library::{AUDIO_EXTENSIONS, is_audio_path};
use crate::types::{TrackDuration, TrackMetadata, UNKNOWN_TITLE};

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    /// lofty open/read failures.
    #[error("Failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },
    /// Filesystem failures while walking or resolving.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unusable duration for {0}")]
    Duration(PathBuf),
}

fn parse_options() -> ParseOptions {
    ParseOptions::new().parsing_mode(ParsingMode::BestAttempt)
}

/// Read title and duration for a single audio file.
///
/// `file_path` in the result is canonical; a missing title becomes
/// `"Unknown"`; duration is seconds rounded to two decimals.
pub fn read_track(path: &Path) -> Result<TrackMetadata, TagError> {
    let canonical = fs::canonicalize(path).map_err(|source| TagError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let tagged_file = Probe::open(&canonical)
        .map_err(|e| TagError::Read {
            path: canonical.clone(),
            message: format!("open: {e}"),
        })?
        .options(parse_options())
        .read()
        .map_err(|e| TagError::Read {
            path: canonical.clone(),
            message: e.to_string(),
        })?;

    let title = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .and_then(|tag| tag.title().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    let secs = tagged_file.properties().duration().as_secs_f64();
    let duration =
        TrackDuration::from_secs_f64(secs).ok_or_else(|| TagError::Duration(canonical.clone()))?;

    Ok(TrackMetadata {
        file_path: canonical.to_string_lossy().into_owned(),
        title,
        duration,
    })
}

/// Every audio file below `dir`, depth-first, sorted within each directory.
/// Symlinked directories are not followed.
fn collect_audio_files(dir: &Path) -> Result<Vec<PathBuf>, TagError> {
    let mut files = Vec::new();
    let mut dirs_to_scan = vec![dir.to_path_buf()];

    while let Some(current_dir) = dirs_to_scan.pop() {
        let entries = fs::read_dir(&current_dir).map_err(|source| TagError::Io {
            path: current_dir.clone(),
            source,
        })?;
        let mut subdirs = Vec::new();
        let mut found = Vec::new();
        for entry in entries {
            let io_err = |source: std::io::Error| TagError::Io {
                path: current_dir.clone(),
                source,
            };
            let entry = entry.map_err(io_err)?;
            let file_type = entry.file_type().map_err(io_err)?;
            let path = entry.path();
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_symlink() && path.is_dir() {
                tracing::debug!(path = %path.display(), "not following symlinked directory");
            } else if is_audio_path(&path) {
                found.push(path);
            }
        }
        found.sort();
        subdirs.sort();
        files.extend(found);
        dirs_to_scan.extend(subdirs.into_iter().rev());
    }
    Ok(files)
}

/// Metadata for `path`: the file itself when its name ends in an audio
/// extension, otherwise every audio file found beneath it.
///
/// Any unreadable file fails the whole call. A path that is neither an audio
/// file nor a directory yields an empty list.
pub fn read_metadata(path: &Path) -> Result<Vec<TrackMetadata>, TagError> {
    let lower = path.to_string_lossy().to_lowercase();
    let names_audio = AUDIO_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{ext}")));

    if names_audio {
        return Ok(vec![read_track(path)?]);
    }
    if !path.is_dir() {
        return Ok(Vec::new());
    }
    collect_audio_files(path)?
        .iter()
        .map(|file| read_track(file))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    /// Write a silent 16-bit mono PCM WAV lasting `millis` milliseconds.
    pub fn write_silent_wav(path: &Path, millis: u32) {
        let sample_rate: u32 = 8000;
        let block_align: u16 = 2;
        let data_len = sample_rate * millis / 1000 * u32::from(block_align);

        let mut bytes = Vec::with_capacity(44 + data_len as usize);
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&sample_rate.to_le_bytes());
        bytes.extend_from_slice(&(sample_rate * u32::from(block_align)).to_le_bytes());
        bytes.extend_from_slice(&block_align.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());
        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::write_silent_wav;
    use super::*;

    #[test]
    fn untagged_wav_reports_unknown_title() {
        let dir = tempfile::tempdir().unwrap();
        let wav = dir.path().join("tone.wav");
        write_silent_wav(&wav, 1500);

        let meta = read_track(&wav).unwrap();
        assert_eq!(meta.title, UNKNOWN_TITLE);
        assert_eq!(meta.duration.to_string(), "1.5");
        assert_eq!(
            PathBuf::from(&meta.file_path),
            fs::canonicalize(&wav).unwrap()
        );
    }

    #[test]
    fn directory_is_walked_recursively() {
        let dir = tempfile::tempdir().unwrap();
        write_silent_wav(&dir.path().join("b.wav"), 1000);
        write_silent_wav(&dir.path().join("Sub/a.WAV"), 2000);
        fs::write(dir.path().join("Sub/notes.txt"), b"liner notes").unwrap();

        let all = read_metadata(dir.path()).unwrap();
        let names: Vec<String> = all
            .iter()
            .map(|m| {
                Path::new(&m.file_path)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        assert_eq!(names, ["b.wav", "a.WAV"]);
        assert_eq!(all[1].duration.to_string(), "2.0");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        let outside = tempfile::tempdir().unwrap();
        write_silent_wav(&outside.path().join("elsewhere.wav"), 1000);
        let dir = tempfile::tempdir().unwrap();
        write_silent_wav(&dir.path().join("here.wav"), 1000);
        std::os::unix::fs::symlink(outside.path(), dir.path().join("out")).unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("loop")).unwrap();

        let all = read_metadata(dir.path()).unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].file_path.ends_with("here.wav"));
    }

    #[test]
    fn corrupt_audio_fails_whole_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_silent_wav(&dir.path().join("good.wav"), 1000);
        fs::write(dir.path().join("bad.mp3"), b"definitely not audio").unwrap();
        assert!(read_metadata(dir.path()).is_err());
    }

    #[test]
    fn missing_audio_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(&dir.path().join("missing.flac")).unwrap_err();
        assert!(matches!(err, TagError::Io { .. }));
    }

    #[test]
    fn non_audio_file_yields_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("readme.txt");
        fs::write(&text, b"hi").unwrap();
        assert!(read_metadata(&text).unwrap().is_empty());
    }
}
