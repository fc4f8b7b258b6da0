//! Human-readable playback start times
//!
//! Parses the `t` routing parameter and formats seconds for log output.
//!
//! Accepted input forms:
//! - Plain seconds: `90`, `12.5`
//! - Unit form: any ordered combination of `h`, `m`, `s` parts (`1h2m3s`, `5m`, `40s`)

use crate::{Error, Result};

/// Below this many seconds the format is `M:SS`
const SHORT_FORMAT_MAX: u64 = 3600;

/// Parse a start time into seconds
///
/// # Examples
///
/// ```
/// use recplay_common::human_time::parse_start_time;
///
/// assert_eq!(parse_start_time("90").unwrap(), 90.0);
/// assert_eq!(parse_start_time("1h2m3s").unwrap(), 3723.0);
/// assert_eq!(parse_start_time("5m").unwrap(), 300.0);
/// assert!(parse_start_time("abc").is_err());
/// ```
pub fn parse_start_time(input: &str) -> Result<f64> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::InvalidInput("Empty start time".to_string()));
    }

    if let Ok(seconds) = input.parse::<f64>() {
        return validate(seconds, input);
    }

    let mut total = 0.0;
    let mut number = String::new();
    // Units must appear in h, m, s order, each at most once
    let mut last_rank = 0;

    for c in input.chars() {
        if c.is_ascii_digit() || c == '.' {
            number.push(c);
            continue;
        }

        let (rank, factor) = match c.to_ascii_lowercase() {
            'h' => (1, 3600.0),
            'm' => (2, 60.0),
            's' => (3, 1.0),
            _ => return Err(invalid(input)),
        };
        if rank <= last_rank || number.is_empty() {
            return Err(invalid(input));
        }
        let value: f64 = number.parse().map_err(|_| invalid(input))?;
        total += value * factor;
        number.clear();
        last_rank = rank;
    }

    // Trailing digits without a unit
    if !number.is_empty() {
        return Err(invalid(input));
    }

    validate(total, input)
}

fn validate(seconds: f64, input: &str) -> Result<f64> {
    if seconds.is_finite() && seconds >= 0.0 {
        Ok(seconds)
    } else {
        Err(invalid(input))
    }
}

fn invalid(input: &str) -> Error {
    Error::InvalidInput(format!("Invalid start time: {}", input))
}

/// Format seconds as `M:SS` (under an hour) or `H:MM:SS`
///
/// Fractional seconds are truncated.
///
/// # Examples
///
/// ```
/// use recplay_common::human_time::format_start_time;
///
/// assert_eq!(format_start_time(45.9), "0:45");
/// assert_eq!(format_start_time(330.0), "5:30");
/// assert_eq!(format_start_time(3723.0), "1:02:03");
/// ```
pub fn format_start_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };

    if total < SHORT_FORMAT_MAX {
        format!("{}:{:02}", total / 60, total % 60)
    } else {
        let hours = total / 3600;
        let mins = (total % 3600) / 60;
        let secs = total % 60;
        format!("{}:{:02}:{:02}", hours, mins, secs)
    }
}
