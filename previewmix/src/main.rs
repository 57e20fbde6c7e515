mod cli;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use env_logger::Env;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use previewmix_core::{
    parse_segment_secs, plan_preview, run_with_progress, Config, Ffmpeg, ProgressEvent,
    ProgressReporter, TrackLimit,
};

use crate::cli::build_cli;

/// Renders pipeline progress: one stdout line per track plus a bar on stderr.
struct ConsoleProgress {
    bar: ProgressBar,
    verbose: bool,
}

impl ConsoleProgress {
    fn new(verbose: bool) -> Self {
        let bar = if verbose {
            let bar = ProgressBar::new(0);
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar
        } else {
            ProgressBar::hidden()
        };

        Self { bar, verbose }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for ConsoleProgress {
    fn on_event(&mut self, event: ProgressEvent<'_>) {
        match event {
            ProgressEvent::Start { tracks } => {
                let style = ProgressStyle::with_template(
                    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar());
                self.bar.set_style(style);
                self.bar.set_length(tracks as u64);
                self.bar.enable_steady_tick(Duration::from_millis(100));
            }
            ProgressEvent::Track { index, path, .. } => {
                if self.verbose {
                    self.bar
                        .suspend(|| println!(" --- processing file: {}", path.display()));
                }
                self.bar.set_position(index.saturating_sub(1) as u64);
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.bar.set_message(name);
            }
            ProgressEvent::Concatenating { clips } => {
                self.bar.set_position(clips as u64);
                self.bar.set_message(format!("joining {clips} clip(s)"));
            }
            ProgressEvent::Finish { destination } => {
                self.bar.finish_and_clear();
                if self.verbose {
                    println!(" === done! {}", destination.display());
                }
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let matches = build_cli().get_matches();

    let source = matches
        .get_one::<PathBuf>("source")
        .expect("required argument");
    let destination = matches.get_one::<PathBuf>("destination").cloned();
    let track_limit = TrackLimit::parse_lenient(
        matches
            .get_one::<String>("count")
            .expect("defaulted argument"),
    );
    let segment_secs = parse_segment_secs(
        matches
            .get_one::<String>("framesize")
            .expect("defaulted argument"),
    );
    let engine = matches
        .get_one::<PathBuf>("engine")
        .expect("defaulted argument");
    let start_secs = *matches.get_one::<u32>("start").expect("defaulted argument");
    let fade_secs = *matches.get_one::<u32>("fade").expect("defaulted argument");
    let bitrate = matches
        .get_one::<String>("bitrate")
        .expect("defaulted argument");
    let verbose = matches.get_flag("log");
    let dry_run = matches.get_flag("dry-run");

    let config = Config::builder(source)
        .destination(destination)
        .track_limit(track_limit)
        .segment_secs(segment_secs)
        .start_secs(start_secs)
        .fade_secs(fade_secs)
        .bitrate(bitrate.as_str())
        .show_progress(verbose)
        .engine(engine)
        .build()
        .with_context(|| {
            format!(
                "failed to create configuration for '{}'",
                source.display()
            )
        })?;

    if dry_run {
        let plan = plan_preview(&config)
            .with_context(|| format!("failed to list tracks in '{}'", source.display()))?;

        if plan.tracks.is_empty() {
            println!("Dry run: no tracks would be mixed.");
        } else {
            println!(
                "Dry run: would mix {} of {} track(s) (count: {}) into {}:",
                plan.tracks.len(),
                plan.tracks.available(),
                config.track_limit,
                plan.destination.display()
            );
            for path in &plan.tracks {
                println!("  {}", path.display());
            }
        }

        return Ok(());
    }

    if config.show_progress {
        println!(
            "The preview mix will be written to {}",
            config.destination.display()
        );
    }

    let mut progress = ConsoleProgress::new(config.show_progress);
    let result = run_with_progress(&config, &Ffmpeg::new(&config.engine), &mut progress)
        .with_context(|| {
            format!(
                "could not create a preview mix for '{}'",
                source.display()
            )
        });

    progress.finish();

    let summary = result?;
    info!(
        "mixed {} of {} track(s) into {}",
        summary.clips_written,
        summary.tracks_available,
        summary.destination.display()
    );

    Ok(())
}
