use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::warn;
use tempfile::TempDir;

use crate::tracks::TRACK_EXTENSION;

/// Remove `path`, treating "already gone" as success.
pub fn silent_remove(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

/// A file that is removed when the guard goes out of scope.
///
/// [`ScratchFile::remove`] surfaces removal errors; dropping the guard
/// swallows them after logging.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(mut self) -> io::Result<()> {
        self.armed = false;
        silent_remove(&self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(err) = silent_remove(&self.path) {
                warn!("failed to remove '{}': {err}", self.path.display());
            }
        }
    }
}

/// Private directory holding the intermediate files of one run.
///
/// Clips are recorded in processing order. [`Workspace::close`] removes each
/// of them and then the directory; dropping an unclosed workspace still
/// removes the directory with everything in it.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    clips: Vec<PathBuf>,
}

impl Workspace {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("previewmix-").tempdir()?;
        Ok(Self {
            dir,
            clips: Vec::new(),
        })
    }

    /// Guard for the trim output shared by every iteration.
    pub fn scratch(&self) -> ScratchFile {
        ScratchFile::new(self.dir.path().join(format!("trim.{TRACK_EXTENSION}")))
    }

    /// Record the clip for the `index`-th track (1-based) and return its path.
    pub fn next_clip(&mut self, index: usize) -> &Path {
        let path = self
            .dir
            .path()
            .join(format!("clip-{index:03}.{TRACK_EXTENSION}"));
        self.clips.push(path);
        &self.clips[self.clips.len() - 1]
    }

    pub fn clips(&self) -> &[PathBuf] {
        &self.clips
    }

    pub fn close(self) -> io::Result<()> {
        silent_remove(&self.dir.path().join(format!("trim.{TRACK_EXTENSION}")))?;
        for clip in &self.clips {
            silent_remove(clip)?;
        }
        self.dir.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    #[test]
    fn silent_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.mp3");
        File::create(&path).unwrap();

        silent_remove(&path).unwrap();
        assert!(!path.exists());
        silent_remove(&path).unwrap();
        silent_remove(&dir.path().join("never-existed.mp3")).unwrap();
    }

    #[test]
    fn silent_remove_reports_other_failures() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("folder");
        fs::create_dir(&sub).unwrap();
        assert!(silent_remove(&sub).is_err());
    }

    #[test]
    fn scratch_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trim.mp3");
        {
            let scratch = ScratchFile::new(path.clone());
            File::create(scratch.path()).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn removed_scratch_file_is_gone() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::new(dir.path().join("trim.mp3"));
        let path = scratch.path().to_path_buf();
        File::create(&path).unwrap();
        scratch.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn close_removes_clips_and_directory() {
        let mut workspace = Workspace::new().unwrap();
        let first = workspace.next_clip(1).to_path_buf();
        let root = first.parent().unwrap().to_path_buf();
        File::create(&first).unwrap();
        // A recorded clip the engine never produced.
        let second = workspace.next_clip(2).to_path_buf();

        assert_eq!(workspace.clips(), &[first.clone(), second.clone()]);
        assert!(first.ends_with("clip-001.mp3"));

        workspace.close().unwrap();
        assert!(!first.exists());
        assert!(!root.exists());
    }

    #[test]
    fn dropped_workspace_cleans_up() {
        let root;
        {
            let mut workspace = Workspace::new().unwrap();
            let clip = workspace.next_clip(1).to_path_buf();
            root = clip.parent().unwrap().to_path_buf();
            File::create(&clip).unwrap();
        }
        assert!(!root.exists());
    }
}
