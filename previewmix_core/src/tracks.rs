use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::params::TrackLimit;

/// Extension of the files picked up as tracks.
pub const TRACK_EXTENSION: &str = "mp3";

/// Tracks discovered in the source folder, in directory-listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackList {
    tracks: Vec<PathBuf>,
    available: usize,
}

impl TrackList {
    /// Number of matching files found before truncation.
    pub fn available(&self) -> usize {
        self.available
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.tracks.iter()
    }

}

impl<'a> IntoIterator for &'a TrackList {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

fn is_track(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(TRACK_EXTENSION))
        .unwrap_or(false)
}

/// List the tracks directly inside `dir` and keep the first ones allowed by
/// `limit`.
///
/// No sorting is applied: the order is whatever the filesystem reports.
/// `exclude` is skipped so that an earlier preview written into the same
/// folder never becomes a track of the next one.
pub fn discover(dir: &Path, limit: TrackLimit, exclude: Option<&Path>) -> io::Result<TrackList> {
    let mut tracks = Vec::new();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        if !path.is_file() || !is_track(path) {
            continue;
        }
        if exclude.is_some_and(|excluded| excluded == path) {
            debug!("skipping previous preview '{}'", path.display());
            continue;
        }
        tracks.push(path.to_path_buf());
    }

    let available = tracks.len();
    tracks.truncate(limit.resolve(available));

    Ok(TrackList { tracks, available })
}
