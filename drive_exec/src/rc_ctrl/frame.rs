//! Telemetry line parsing for the RC receiver
//!
//! The receiver streams one ASCII line per sample: the literal `I` followed
//! by eight whitespace-separated signed decimal channel readings (pulse
//! widths in microseconds). Anything else on the link (boot banners,
//! partial lines, corrupted bytes) is noise to be ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::Regex;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of channels reported on each telemetry line.
pub const NUM_CHANNELS: usize = 8;

/// Channel carrying the steering stick position.
pub const STEER_CHANNEL: usize = 0;

/// Channel carrying the throttle stick position.
pub const THROTTLE_CHANNEL: usize = 2;

/// Channel carrying the override-enable switch position.
pub const OVERRIDE_CHANNEL: usize = 4;

/// Pattern matched against each line: `I` then eight signed decimals.
const LINE_PATTERN: &str = r"^I ([-\d.]+) +([-\d.]+) +([-\d.]+) +([-\d.]+) +([-\d.]+) +([-\d.]+) +([-\d.]+) +([-\d.]+)";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One parsed telemetry frame: the eight raw channel readings.
///
/// Frames are ephemeral: recomputed on every accepted line and never
/// retained beyond the sample that produced them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RcFrame {
    channels: [f64; NUM_CHANNELS],
}

/// Compiled matcher for the telemetry line format.
pub struct LineParser {
    regex: Regex,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RcFrame {
    /// Get the raw reading of the given channel.
    ///
    /// # Panics
    /// - Panics if `channel` is not less than [`NUM_CHANNELS`].
    pub fn channel(&self, channel: usize) -> f64 {
        self.channels[channel]
    }
}

impl LineParser {
    /// Compile the line matcher.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(LINE_PATTERN)?,
        })
    }

    /// Parse one line from the telemetry stream.
    ///
    /// Returns `None` for any line which does not match the expected format,
    /// including a matching line whose numbers fail to parse. This is the
    /// link's noise-tolerance policy, not an error path.
    pub fn parse(&self, line: &str) -> Option<RcFrame> {
        let captures = self.regex.captures(line)?;

        let mut channels = [0f64; NUM_CHANNELS];

        for (i, channel) in channels.iter_mut().enumerate() {
            *channel = captures.get(i + 1)?.as_str().parse().ok()?;
        }

        Some(RcFrame { channels })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_valid_line() {
        let parser = LineParser::new().unwrap();

        let frame = parser
            .parse("I 1500 1500 1600 1500 1900 1500 1500 1500\n")
            .unwrap();

        assert_eq!(frame.channel(STEER_CHANNEL), 1500.0);
        assert_eq!(frame.channel(THROTTLE_CHANNEL), 1600.0);
        assert_eq!(frame.channel(OVERRIDE_CHANNEL), 1900.0);
    }

    #[test]
    fn test_noise_lines_rejected() {
        let parser = LineParser::new().unwrap();

        // Boot banner, partial line, wrong prefix, too few channels
        assert!(parser.parse("RC receiver v1.2 ready\n").is_none());
        assert!(parser.parse("I 1500 15").is_none());
        assert!(parser.parse("Q 1 2 3 4 5 6 7 8\n").is_none());
        assert!(parser.parse("").is_none());
    }

    #[test]
    fn test_negative_and_decimal_values() {
        let parser = LineParser::new().unwrap();

        let frame = parser
            .parse("I -12 1500.5 1500 1500 1500 1500 1500 1500\n")
            .unwrap();

        assert_eq!(frame.channel(0), -12.0);
        assert_eq!(frame.channel(1), 1500.5);
    }
}
