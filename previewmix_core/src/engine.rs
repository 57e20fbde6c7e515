use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;

use crate::PreviewMixError;

/// Executable looked up on `PATH` when no engine is configured.
pub const DEFAULT_ENGINE: &str = "ffmpeg";

/// Pipeline stage an engine invocation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Trim,
    Fade,
    Concat,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Trim => f.write_str("trim"),
            Step::Fade => f.write_str("fade"),
            Step::Concat => f.write_str("concatenate"),
        }
    }
}

/// Linear fade-in at the start of a clip and a fade-out that ends with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeSpec {
    /// Length of both ramps in seconds.
    pub fade_secs: u32,
    /// Length of the clip in seconds; the fade-out ends here.
    pub clip_secs: u32,
}

impl FadeSpec {
    pub fn new(fade_secs: u32, clip_secs: u32) -> Self {
        Self {
            fade_secs,
            clip_secs,
        }
    }

    /// Offset at which the fade-out begins, never negative.
    pub fn fade_out_start(&self) -> u32 {
        self.clip_secs.saturating_sub(self.fade_secs)
    }

    /// True when the two ramps would meet or cross inside the clip.
    pub fn overlaps(&self) -> bool {
        u64::from(self.clip_secs) < 2 * u64::from(self.fade_secs)
    }

    /// Audio filter expression understood by ffmpeg's `-af`.
    pub fn filter(&self) -> String {
        format!(
            "afade=t=in:ss=0:d={fade},afade=t=out:st={start}:d={fade}",
            fade = self.fade_secs,
            start = self.fade_out_start()
        )
    }
}

/// The external audio engine.
///
/// All decoding, encoding and timing is delegated to the implementation; the
/// pipeline only sequences the calls. Every method blocks until the engine
/// has finished.
pub trait Engine {
    /// Confirm the engine can be launched at all.
    fn probe(&self) -> Result<(), PreviewMixError>;

    /// Stream-copy `[start, start + duration)` seconds of `input` to `output`.
    fn trim(
        &self,
        input: &Path,
        start_secs: u32,
        duration_secs: u32,
        output: &Path,
    ) -> Result<(), PreviewMixError>;

    /// Re-encode `input` at `bitrate` with `fade` applied.
    fn fade(
        &self,
        input: &Path,
        fade: &FadeSpec,
        bitrate: &str,
        output: &Path,
    ) -> Result<(), PreviewMixError>;

    /// Stream-copy `clips`, in order, into a single `output`.
    fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<(), PreviewMixError>;
}

/// [`Engine`] backed by an `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    program: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE)
    }
}

impl Ffmpeg {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn invoke(&self, step: Step, args: Vec<OsString>) -> Result<(), PreviewMixError> {
        debug!(
            "{step}: {} {}",
            self.program.display(),
            args.iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(&self.program)
            .args(["-hide_banner", "-nostdin", "-loglevel", "error"])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| PreviewMixError::EngineInvocation { step, source })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("{step} stderr: {}", stderr.trim_end());
        }

        Err(PreviewMixError::EngineFailed {
            step,
            code: output.status.code(),
        })
    }
}

impl Engine for Ffmpeg {
    fn probe(&self) -> Result<(), PreviewMixError> {
        let mut child = Command::new(&self.program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PreviewMixError::EngineUnavailable {
                program: self.program.clone(),
                source,
            })?;

        match child.wait() {
            Ok(status) => debug!("engine probe exited with {status}"),
            Err(err) => debug!("engine probe did not finish cleanly: {err}"),
        }
        Ok(())
    }

    fn trim(
        &self,
        input: &Path,
        start_secs: u32,
        duration_secs: u32,
        output: &Path,
    ) -> Result<(), PreviewMixError> {
        self.invoke(Step::Trim, trim_args(input, start_secs, duration_secs, output))
    }

    fn fade(
        &self,
        input: &Path,
        fade: &FadeSpec,
        bitrate: &str,
        output: &Path,
    ) -> Result<(), PreviewMixError> {
        self.invoke(Step::Fade, fade_args(input, fade, bitrate, output))
    }

    fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<(), PreviewMixError> {
        self.invoke(Step::Concat, concat_args(clips, output))
    }
}

fn os(value: impl AsRef<OsStr>) -> OsString {
    value.as_ref().to_os_string()
}

fn trim_args(input: &Path, start_secs: u32, duration_secs: u32, output: &Path) -> Vec<OsString> {
    vec![
        os("-ss"),
        os(start_secs.to_string()),
        os("-t"),
        os(duration_secs.to_string()),
        os("-i"),
        os(input),
        os("-acodec"),
        os("copy"),
        os(output),
    ]
}

fn fade_args(input: &Path, fade: &FadeSpec, bitrate: &str, output: &Path) -> Vec<OsString> {
    vec![
        os("-i"),
        os(input),
        os("-af"),
        os(fade.filter()),
        os("-ab"),
        os(bitrate),
        os(output),
    ]
}

fn concat_args(clips: &[PathBuf], output: &Path) -> Vec<OsString> {
    let mut directive = OsString::from("concat:");
    for (index, clip) in clips.iter().enumerate() {
        if index > 0 {
            directive.push("|");
        }
        directive.push(clip);
    }

    vec![os("-i"), directive, os("-acodec"), os("copy"), os(output)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn fade_filter_ends_with_the_clip() {
        let fade = FadeSpec::new(2, 25);
        assert_eq!(fade.fade_out_start(), 23);
        assert_eq!(fade.filter(), "afade=t=in:ss=0:d=2,afade=t=out:st=23:d=2");
        assert!(!fade.overlaps());
    }

    #[test]
    fn short_clips_clamp_the_fade_out_start() {
        let fade = FadeSpec::new(2, 1);
        assert!(fade.overlaps());
        assert_eq!(fade.fade_out_start(), 0);
        assert!(FadeSpec::new(2, 3).overlaps());
        assert!(!FadeSpec::new(2, 4).overlaps());
    }

    #[test]
    fn trim_copies_the_requested_window() {
        let args = strings(trim_args(
            Path::new("/music/a.mp3"),
            60,
            25,
            Path::new("/tmp/trim.mp3"),
        ));
        assert_eq!(
            args,
            [
                "-ss",
                "60",
                "-t",
                "25",
                "-i",
                "/music/a.mp3",
                "-acodec",
                "copy",
                "/tmp/trim.mp3"
            ]
        );
    }

    #[test]
    fn fade_reencodes_at_bitrate() {
        let args = strings(fade_args(
            Path::new("trim.mp3"),
            &FadeSpec::new(2, 10),
            "320k",
            Path::new("clip-001.mp3"),
        ));
        assert_eq!(
            args,
            [
                "-i",
                "trim.mp3",
                "-af",
                "afade=t=in:ss=0:d=2,afade=t=out:st=8:d=2",
                "-ab",
                "320k",
                "clip-001.mp3"
            ]
        );
    }

    #[test]
    fn concat_joins_clips_in_order() {
        let clips = vec![PathBuf::from("b.mp3"), PathBuf::from("a.mp3")];
        let args = strings(concat_args(&clips, Path::new("mix.mp3")));
        assert_eq!(
            args,
            ["-i", "concat:b.mp3|a.mp3", "-acodec", "copy", "mix.mp3"]
        );
    }

    #[test]
    fn probe_reports_missing_executable() {
        let engine = Ffmpeg::new("/definitely/not/here/ffmpeg");
        let err = engine.probe().unwrap_err();
        assert!(matches!(err, PreviewMixError::EngineUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn launchable_engine_is_available_whatever_its_exit_status() {
        assert!(Ffmpeg::new("false").probe().is_ok());
    }
}
