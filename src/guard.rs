//! Containment checks against the configured library root.
//!
//! Both the root and the candidate are canonicalized (absolute, symlinks
//! resolved) and compared component-wise, so `/music2` is never mistaken for
//! a child of `/music`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Library root is not accessible: {path}: {source}")]
    Root {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Path is not accessible: {path}: {source}")]
    Unresolvable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Path is outside the library root: {0}")]
    Outside(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    pub fn new(config: &Config) -> Self {
        Self {
            root: config.root().to_path_buf(),
        }
    }

    /// The configured root, unmodified.
    pub fn allowed_root(&self) -> &Path {
        &self.root
    }

    /// Pure predicate: any resolution failure is `false`.
    pub fn is_allowed(&self, candidate: impl AsRef<Path>) -> bool {
        self.check(candidate).is_ok()
    }

    /// Resolve `candidate` and confirm it lives under the root.
    ///
    /// Returns the canonical path on success so callers act on exactly what
    /// was checked.
    pub fn check(&self, candidate: impl AsRef<Path>) -> Result<PathBuf, GuardError> {
        let candidate = candidate.as_ref();
        let root = fs::canonicalize(&self.root).map_err(|source| GuardError::Root {
            path: self.root.clone(),
            source,
        })?;
        let resolved = fs::canonicalize(candidate).map_err(|source| GuardError::Unresolvable {
            path: candidate.to_path_buf(),
            source,
        })?;
        if resolved.starts_with(&root) {
            Ok(resolved)
        } else {
            Err(GuardError::Outside(resolved))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard_for(root: &Path) -> PathGuard {
        PathGuard::new(&Config::new(root))
    }

    #[test]
    fn root_itself_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(guard_for(dir.path()).is_allowed(dir.path()));
    }

    #[test]
    fn nested_file_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let album = dir.path().join("Artist").join("Album");
        fs::create_dir_all(&album).unwrap();
        let song = album.join("01 Intro.mp3");
        fs::write(&song, b"").unwrap();
        assert!(guard_for(dir.path()).is_allowed(&song));
    }

    #[test]
    fn sibling_sharing_string_prefix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        let music2 = dir.path().join("music2");
        fs::create_dir_all(&music).unwrap();
        fs::create_dir_all(&music2).unwrap();
        let song = music2.join("song.mp3");
        fs::write(&song, b"").unwrap();

        let guard = guard_for(&music);
        assert!(!guard.is_allowed(&song));
        assert!(matches!(guard.check(&song), Err(GuardError::Outside(_))));
    }

    #[test]
    fn dot_dot_escape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        fs::create_dir_all(&music).unwrap();
        fs::write(dir.path().join("secret.txt"), b"x").unwrap();
        assert!(!guard_for(&music).is_allowed(music.join("..").join("secret.txt")));
    }

    #[test]
    fn missing_candidate_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard_for(dir.path());
        assert!(!guard.is_allowed(dir.path().join("nope.mp3")));
        assert!(matches!(
            guard.check(dir.path().join("nope.mp3")),
            Err(GuardError::Unresolvable { .. })
        ));
    }

    #[test]
    fn missing_root_rejects_everything() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard_for(&dir.path().join("gone"));
        assert!(!guard.is_allowed(dir.path()));
        assert!(matches!(guard.check(dir.path()), Err(GuardError::Root { .. })));
    }

    #[test]
    fn allowed_root_is_returned_verbatim() {
        let guard = guard_for(Path::new("relative/../music"));
        assert_eq!(guard.allowed_root(), Path::new("relative/../music"));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_pointing_outside_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let music = dir.path().join("music");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&music).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("a.mp3"), b"").unwrap();
        std::os::unix::fs::symlink(&outside, music.join("link")).unwrap();

        assert!(!guard_for(&music).is_allowed(music.join("link").join("a.mp3")));
    }
}
