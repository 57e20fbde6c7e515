//! Build a short preview mix from a folder of tracks.
//!
//! A fixed-length window is cut from every selected track, given a fade-in
//! and fade-out, and the clips are joined into a single file. All audio work
//! is done by an external [`Engine`]; this crate only resolves parameters,
//! picks the tracks, sequences the engine calls and cleans up after them.

pub mod engine;
pub mod params;
pub mod tracks;
pub mod workspace;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

pub use engine::{Engine, FadeSpec, Ffmpeg, Step, DEFAULT_ENGINE};
pub use params::{parse_or_default, parse_segment_secs, TrackLimit, DEFAULT_SEGMENT_SECS};
pub use tracks::{discover, TrackList};
pub use workspace::{silent_remove, ScratchFile, Workspace};

/// File name of the mix when no destination is given.
pub const DEFAULT_OUTPUT_NAME: &str = "100-preview.mp3";
/// Offset into each track at which its clip starts.
pub const DEFAULT_START_SECS: u32 = 60;
/// Length of the fade-in and of the fade-out.
pub const DEFAULT_FADE_SECS: u32 = 2;
/// Bitrate of the re-encoded clips.
pub const DEFAULT_BITRATE: &str = "320k";

/// Errors that can occur while building a preview mix.
#[derive(Debug, Error)]
pub enum PreviewMixError {
    /// The source folder does not exist.
    #[error("source folder does not exist: {}", .0.display())]
    MissingSource(PathBuf),

    /// The source path exists but is not a folder.
    #[error("source is not a folder: {}", .0.display())]
    SourceNotDirectory(PathBuf),

    /// Error returned when the segment length is zero.
    #[error("segment length must be at least one second")]
    InvalidSegmentLength,

    /// The destination path does not name a file.
    #[error("destination does not name a file: {}", .0.display())]
    InvalidDestination(PathBuf),

    /// The engine executable could not be started at all.
    #[error(
        "could not run '{}'; add it to the system path or point --engine at it",
        .program.display()
    )]
    EngineUnavailable {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The engine could not be started for a pipeline step.
    #[error("failed to launch the audio engine for the {step} step")]
    EngineInvocation {
        step: Step,
        #[source]
        source: io::Error,
    },

    /// The engine ran but reported failure.
    #[error("audio engine failed during the {step} step ({})", exit_label(.code))]
    EngineFailed { step: Step, code: Option<i32> },

    /// Nothing to mix: the folder has no tracks or the count was zero.
    #[error("no tracks to mix in '{}' ({available} available)", .dir.display())]
    NoTracks { dir: PathBuf, available: usize },

    /// Wrapper around IO errors encountered while preparing or cleaning up files.
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_owned(),
    }
}

/// Resolved parameters of one run. Immutable once built.
#[derive(Clone, Debug)]
pub struct Config {
    /// Canonicalized folder the tracks are read from.
    pub source_dir: PathBuf,
    /// Absolute path of the mix to write.
    pub destination: PathBuf,
    /// How many tracks to use.
    pub track_limit: TrackLimit,
    /// Length of every clip in seconds.
    pub segment_secs: u32,
    /// Offset into each track where its clip starts.
    pub start_secs: u32,
    /// Length of the fade-in and fade-out in seconds.
    pub fade_secs: u32,
    /// Bitrate the faded clips are encoded at, e.g. `320k`.
    pub bitrate: String,
    /// Whether per-track progress should be shown to the user.
    pub show_progress: bool,
    /// Engine executable.
    pub engine: PathBuf,
}

impl Config {
    /// Start building a configuration for `source_dir`.
    pub fn builder<P: AsRef<Path>>(source_dir: P) -> ConfigBuilder {
        ConfigBuilder::new(source_dir)
    }

    /// Fade envelope applied to every clip.
    pub fn fade(&self) -> FadeSpec {
        FadeSpec::new(self.fade_secs, self.segment_secs)
    }
}

/// Builder for [`Config`] with the documented defaults pre-filled.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    source_dir: PathBuf,
    destination: Option<PathBuf>,
    track_limit: TrackLimit,
    segment_secs: u32,
    start_secs: u32,
    fade_secs: u32,
    bitrate: String,
    show_progress: bool,
    engine: PathBuf,
}

impl ConfigBuilder {
    pub fn new<P: AsRef<Path>>(source_dir: P) -> Self {
        Self {
            source_dir: source_dir.as_ref().to_path_buf(),
            destination: None,
            track_limit: TrackLimit::All,
            segment_secs: DEFAULT_SEGMENT_SECS,
            start_secs: DEFAULT_START_SECS,
            fade_secs: DEFAULT_FADE_SECS,
            bitrate: DEFAULT_BITRATE.to_owned(),
            show_progress: false,
            engine: PathBuf::from(DEFAULT_ENGINE),
        }
    }

    /// Where to write the mix; defaults to [`DEFAULT_OUTPUT_NAME`] inside the source folder.
    pub fn destination<P: Into<PathBuf>>(mut self, destination: Option<P>) -> Self {
        self.destination = destination.map(Into::into);
        self
    }

    pub fn track_limit(mut self, limit: TrackLimit) -> Self {
        self.track_limit = limit;
        self
    }

    pub fn segment_secs(mut self, secs: u32) -> Self {
        self.segment_secs = secs;
        self
    }

    pub fn start_secs(mut self, secs: u32) -> Self {
        self.start_secs = secs;
        self
    }

    pub fn fade_secs(mut self, secs: u32) -> Self {
        self.fade_secs = secs;
        self
    }

    pub fn bitrate<S: Into<String>>(mut self, bitrate: S) -> Self {
        self.bitrate = bitrate.into();
        self
    }

    pub fn show_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn engine<P: Into<PathBuf>>(mut self, program: P) -> Self {
        self.engine = program.into();
        self
    }

    /// Validate the inputs and produce a [`Config`].
    ///
    /// Creates the parent folder of an explicit destination if it is missing.
    pub fn build(self) -> Result<Config, PreviewMixError> {
        if !self.source_dir.exists() {
            return Err(PreviewMixError::MissingSource(self.source_dir));
        }
        if !self.source_dir.is_dir() {
            return Err(PreviewMixError::SourceNotDirectory(self.source_dir));
        }
        if self.segment_secs == 0 {
            return Err(PreviewMixError::InvalidSegmentLength);
        }

        let source_dir = fs::canonicalize(&self.source_dir)?;

        let destination = match self.destination {
            None => {
                let destination = source_dir.join(DEFAULT_OUTPUT_NAME);
                info!("the preview mix will be written to {}", destination.display());
                destination
            }
            Some(destination) => {
                if destination.file_name().is_none() {
                    return Err(PreviewMixError::InvalidDestination(destination));
                }
                if let Some(parent) = destination.parent() {
                    if !parent.as_os_str().is_empty() {
                        fs::create_dir_all(parent)?;
                    }
                }
                std::path::absolute(&destination)?
            }
        };

        Ok(Config {
            source_dir,
            destination,
            track_limit: self.track_limit,
            segment_secs: self.segment_secs,
            start_secs: self.start_secs,
            fade_secs: self.fade_secs,
            bitrate: self.bitrate,
            show_progress: self.show_progress,
            engine: self.engine,
        })
    }
}

/// Progress notifications emitted while a mix is being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent<'a> {
    /// Tracks have been selected; `tracks` clips will be produced.
    Start { tracks: usize },
    /// The `index`-th track (1-based) of `total` is about to be processed.
    Track {
        index: usize,
        total: usize,
        path: &'a Path,
    },
    /// All clips exist and are being joined.
    Concatenating { clips: usize },
    /// The mix has been written to `destination`.
    Finish { destination: &'a Path },
}

/// Receiver for [`ProgressEvent`]s. Every method has a no-op default.
pub trait ProgressReporter {
    fn on_event(&mut self, _event: ProgressEvent<'_>) {}
}

/// Reporter that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Matching tracks found in the source folder.
    pub tracks_available: usize,
    /// Clips extracted and joined into the mix.
    pub clips_written: usize,
    /// Path of the written mix.
    pub destination: PathBuf,
}

/// Tracks a run would use, without touching the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewPlan {
    pub tracks: TrackList,
    pub destination: PathBuf,
}

/// Work out which tracks would be mixed and where the result would go.
pub fn plan_preview(config: &Config) -> Result<PreviewPlan, PreviewMixError> {
    let tracks = discover(
        &config.source_dir,
        config.track_limit,
        Some(config.destination.as_path()),
    )?;

    Ok(PreviewPlan {
        tracks,
        destination: config.destination.clone(),
    })
}

/// Build the mix described by `config` with `ffmpeg`, without progress reporting.
pub fn run(config: &Config) -> Result<RunSummary, PreviewMixError> {
    run_with_progress(config, &Ffmpeg::new(&config.engine), &mut NoProgress)
}

/// Build the mix described by `config` using `engine`, reporting to `progress`.
///
/// Intermediate files are removed on every exit path. The destination is
/// replaced only once the new mix has been written in full, so a failed run
/// leaves any earlier mix in place.
pub fn run_with_progress<E, R>(
    config: &Config,
    engine: &E,
    progress: &mut R,
) -> Result<RunSummary, PreviewMixError>
where
    E: Engine + ?Sized,
    R: ProgressReporter + ?Sized,
{
    engine.probe()?;

    let tracks = discover(
        &config.source_dir,
        config.track_limit,
        Some(config.destination.as_path()),
    )?;
    if tracks.is_empty() {
        return Err(PreviewMixError::NoTracks {
            dir: config.source_dir.clone(),
            available: tracks.available(),
        });
    }

    let fade = config.fade();
    if fade.overlaps() {
        warn!(
            "segment of {} sec is shorter than two {} sec fades; fades will overlap",
            config.segment_secs, config.fade_secs
        );
    }

    let mut workspace = Workspace::new()?;
    let outcome = mix(config, engine, progress, &tracks, &fade, &mut workspace);
    let clips_written = settle(outcome, workspace.close())?;

    progress.on_event(ProgressEvent::Finish {
        destination: &config.destination,
    });

    Ok(RunSummary {
        tracks_available: tracks.available(),
        clips_written,
        destination: config.destination.clone(),
    })
}

/// Combine the pipeline outcome with the workspace cleanup result. A pipeline
/// error wins; a cleanup failure behind it is only logged.
fn settle(
    outcome: Result<usize, PreviewMixError>,
    cleanup: io::Result<()>,
) -> Result<usize, PreviewMixError> {
    match (outcome, cleanup) {
        (Ok(clips), cleanup) => {
            cleanup?;
            Ok(clips)
        }
        (Err(err), Err(cleanup_err)) => {
            warn!("failed to remove intermediate files: {cleanup_err}");
            Err(err)
        }
        (Err(err), Ok(())) => Err(err),
    }
}

fn mix<E, R>(
    config: &Config,
    engine: &E,
    progress: &mut R,
    tracks: &TrackList,
    fade: &FadeSpec,
    workspace: &mut Workspace,
) -> Result<usize, PreviewMixError>
where
    E: Engine + ?Sized,
    R: ProgressReporter + ?Sized,
{
    let total = tracks.len();
    progress.on_event(ProgressEvent::Start { tracks: total });

    for (offset, track) in tracks.iter().enumerate() {
        let index = offset + 1;
        progress.on_event(ProgressEvent::Track {
            index,
            total,
            path: track,
        });
        info!("processing track {index}/{total}: {}", track.display());

        let scratch = workspace.scratch();
        engine.trim(track, config.start_secs, config.segment_secs, scratch.path())?;

        let clip = workspace.next_clip(index);
        engine.fade(scratch.path(), fade, &config.bitrate, clip)?;
        scratch.remove()?;
    }

    let clips = workspace.clips();
    progress.on_event(ProgressEvent::Concatenating { clips: clips.len() });

    let staging = ScratchFile::new(staging_path(&config.destination)?);
    silent_remove(staging.path())?;
    engine.concat(clips, staging.path())?;
    fs::rename(staging.path(), &config.destination)?;
    info!("preview mix written to {}", config.destination.display());

    Ok(clips.len())
}

/// Sibling of `destination` the engine writes to before the mix is moved into place.
fn staging_path(destination: &Path) -> Result<PathBuf, PreviewMixError> {
    let stem = destination
        .file_stem()
        .ok_or_else(|| PreviewMixError::InvalidDestination(destination.to_path_buf()))?;

    let mut name = std::ffi::OsString::from(".");
    name.push(stem);
    name.push(".partial");
    if let Some(extension) = destination.extension() {
        name.push(".");
        name.push(extension);
    }

    Ok(destination.with_file_name(name))
}
