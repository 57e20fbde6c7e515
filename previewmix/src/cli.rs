use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};
use previewmix_core::{DEFAULT_BITRATE, DEFAULT_ENGINE};

// Text forms of the library defaults. Count and framesize are parsed
// leniently by `previewmix_core::params`, so clap only sees strings.
pub const DEFAULT_COUNT: &str = "all";
pub const DEFAULT_FRAMESIZE: &str = "25";
pub const DEFAULT_START: &str = "60";
pub const DEFAULT_FADE: &str = "2";

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Make a preview mix from the tracks of an album folder")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("FOLDER")
                .help("Folder containing the album tracks")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("destination")
                .short('d')
                .long("destination")
                .value_name("FILE")
                .help("Mix to write (default: 100-preview.mp3 in the source folder)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("count")
                .short('c')
                .long("count")
                .value_name("COUNT")
                .help("Number of tracks to include, or 'all'")
                .default_value(DEFAULT_COUNT)
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("framesize")
                .short('f')
                .long("framesize")
                .value_name("SECONDS")
                .help("Length of the segment cut from each track")
                .default_value(DEFAULT_FRAMESIZE)
                .allow_hyphen_values(true),
        )
        .arg(
            Arg::new("log")
                .short('l')
                .long("log")
                .help("Show progress")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("engine")
                .long("engine")
                .value_name("PATH")
                .help("ffmpeg executable to run")
                .env("PREVIEWMIX_ENGINE")
                .default_value(DEFAULT_ENGINE)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .value_name("SECONDS")
                .help("Offset into each track where its segment starts")
                .default_value(DEFAULT_START)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("fade")
                .long("fade")
                .value_name("SECONDS")
                .help("Length of the fade-in and fade-out")
                .default_value(DEFAULT_FADE)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            Arg::new("bitrate")
                .long("bitrate")
                .value_name("RATE")
                .help("Bitrate of the faded segments (e.g. 192k)")
                .default_value(DEFAULT_BITRATE),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("List the tracks that would be mixed without running the engine")
                .action(ArgAction::SetTrue),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use previewmix_core::{DEFAULT_FADE_SECS, DEFAULT_SEGMENT_SECS, DEFAULT_START_SECS};

    #[test]
    fn text_defaults_match_library_defaults() {
        assert_eq!(DEFAULT_FRAMESIZE, DEFAULT_SEGMENT_SECS.to_string());
        assert_eq!(DEFAULT_START, DEFAULT_START_SECS.to_string());
        assert_eq!(DEFAULT_FADE, DEFAULT_FADE_SECS.to_string());
    }

    #[test]
    fn source_is_required() {
        assert!(build_cli().try_get_matches_from(["previewmix"]).is_err());
    }

    #[test]
    fn short_flags_are_accepted() {
        let matches = build_cli()
            .try_get_matches_from([
                "previewmix", "-s", "album", "-d", "out/mix.mp3", "-c", "5", "-f", "15", "-l",
            ])
            .unwrap();

        assert_eq!(
            matches.get_one::<PathBuf>("source").unwrap(),
            &PathBuf::from("album")
        );
        assert_eq!(
            matches.get_one::<PathBuf>("destination").unwrap(),
            &PathBuf::from("out/mix.mp3")
        );
        assert_eq!(matches.get_one::<String>("count").unwrap(), "5");
        assert_eq!(matches.get_one::<String>("framesize").unwrap(), "15");
        assert!(matches.get_flag("log"));
    }

    #[test]
    fn lenient_options_keep_raw_text() {
        let matches = build_cli()
            .try_get_matches_from(["previewmix", "--source", "album", "--count", "-3", "--framesize", "abc"])
            .unwrap();

        assert_eq!(matches.get_one::<String>("count").unwrap(), "-3");
        assert_eq!(matches.get_one::<String>("framesize").unwrap(), "abc");
        assert!(matches.get_one::<PathBuf>("destination").is_none());
    }

    #[test]
    fn defaults_are_applied() {
        let matches = build_cli()
            .try_get_matches_from(["previewmix", "--source", "album"])
            .unwrap();

        assert_eq!(matches.get_one::<String>("count").unwrap(), "all");
        assert_eq!(*matches.get_one::<u32>("start").unwrap(), 60);
        assert_eq!(*matches.get_one::<u32>("fade").unwrap(), 2);
        assert_eq!(matches.get_one::<String>("bitrate").unwrap(), "320k");
        assert!(!matches.get_flag("log"));
        assert!(!matches.get_flag("dry-run"));
    }
}
