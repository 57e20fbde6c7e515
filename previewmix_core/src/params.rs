use std::fmt;
use std::str::FromStr;

use log::warn;

/// Segment length used when none is given or the given one is unusable.
pub const DEFAULT_SEGMENT_SECS: u32 = 25;

/// Keyword accepted by [`TrackLimit::parse_lenient`] for "every track".
pub const ALL_TRACKS: &str = "all";

/// How many of the discovered tracks should go into the mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackLimit {
    /// Use every discovered track.
    #[default]
    All,
    /// Use at most this many tracks, in discovery order.
    AtMost(usize),
}

impl TrackLimit {
    /// Resolve a user-supplied track count.
    ///
    /// `"all"` (any case) selects every track. A negative count is clamped
    /// to zero; anything that is not an integer is reported as a warning
    /// and treated as `"all"`.
    pub fn parse_lenient(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case(ALL_TRACKS) {
            return TrackLimit::All;
        }

        match trimmed.parse::<i64>() {
            Ok(count) if count < 0 => {
                warn!("negative track count {count}, using no tracks");
                TrackLimit::AtMost(0)
            }
            Ok(count) => TrackLimit::AtMost(usize::try_from(count).unwrap_or(usize::MAX)),
            Err(_) => {
                warn!("wrong track count format '{raw}', using all tracks");
                TrackLimit::All
            }
        }
    }

    /// Number of tracks to use when `available` were discovered.
    pub fn resolve(self, available: usize) -> usize {
        match self {
            TrackLimit::All => available,
            TrackLimit::AtMost(count) if count > available => {
                warn!("too many tracks requested ({count}), using {available}");
                available
            }
            TrackLimit::AtMost(count) => count,
        }
    }
}

impl fmt::Display for TrackLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackLimit::All => f.write_str(ALL_TRACKS),
            TrackLimit::AtMost(count) => write!(f, "{count}"),
        }
    }
}

/// Parse `raw`, or fall back to `default` with a warning naming `what`.
pub fn parse_or_default<T>(raw: &str, default: T, what: &str) -> T
where
    T: FromStr + fmt::Display,
{
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!("wrong {what} format '{raw}', set to default: {default}");
            default
        }
    }
}

/// Resolve the segment length in whole seconds. Zero is treated like any
/// other malformed value.
pub fn parse_segment_secs(raw: &str) -> u32 {
    match parse_or_default(raw, DEFAULT_SEGMENT_SECS, "framesize") {
        0 => {
            warn!("framesize must be positive, set to default: {DEFAULT_SEGMENT_SECS} sec");
            DEFAULT_SEGMENT_SECS
        }
        secs => secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_limit_accepts_keyword_and_numbers() {
        assert_eq!(TrackLimit::parse_lenient("all"), TrackLimit::All);
        assert_eq!(TrackLimit::parse_lenient(" ALL "), TrackLimit::All);
        assert_eq!(TrackLimit::parse_lenient("3"), TrackLimit::AtMost(3));
        assert_eq!(TrackLimit::parse_lenient("0"), TrackLimit::AtMost(0));
    }

    #[test]
    fn track_limit_falls_back_to_all_on_garbage() {
        assert_eq!(TrackLimit::parse_lenient("five"), TrackLimit::All);
        assert_eq!(TrackLimit::parse_lenient(""), TrackLimit::All);
    }

    #[test]
    fn negative_track_limit_selects_nothing() {
        let limit = TrackLimit::parse_lenient("-2");
        assert_eq!(limit, TrackLimit::AtMost(0));
        assert_eq!(limit.resolve(5), 0);
    }

    #[test]
    fn track_limit_displays_as_given() {
        assert_eq!(TrackLimit::All.to_string(), "all");
        assert_eq!(TrackLimit::AtMost(4).to_string(), "4");
    }

    #[test]
    fn track_limit_is_clamped_to_available() {
        assert_eq!(TrackLimit::All.resolve(7), 7);
        assert_eq!(TrackLimit::AtMost(2).resolve(5), 2);
        assert_eq!(TrackLimit::AtMost(9).resolve(5), 5);
        assert_eq!(TrackLimit::AtMost(0).resolve(5), 0);
    }

    #[test]
    fn segment_length_falls_back_to_default() {
        assert_eq!(parse_segment_secs("10"), 10);
        assert_eq!(parse_segment_secs("ten"), DEFAULT_SEGMENT_SECS);
        assert_eq!(parse_segment_secs("2.5"), DEFAULT_SEGMENT_SECS);
        assert_eq!(parse_segment_secs("0"), DEFAULT_SEGMENT_SECS);
        assert_eq!(parse_segment_secs("-4"), DEFAULT_SEGMENT_SECS);
    }

    #[test]
    fn parse_or_default_is_generic() {
        assert_eq!(parse_or_default::<u64>("42", 1, "value"), 42);
        assert_eq!(parse_or_default::<u64>("x", 1, "value"), 1);
    }
}
