// Copyright The Rigstream Authors
// SPDX-License-Identifier: Apache-2.0

//! Date and time-of-day parsing for the upload formats.
//!
//! Samples and alarms carry times of day only; the absolute instant is
//! reconstructed against the experiment start date. The trailing token of a
//! time of day is taken as nanoseconds verbatim, a convention of the
//! acquisition format. Sinks storing coarser precision scale it themselves.

use crate::error::Error;
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};

/// Pattern of the two header dates.
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Parses a strict `YYYY-MM-DDTHH:MM:SS.mmm` date, interpreted as UTC.
pub fn parse_date(value: &str) -> Result<DateTime<Utc>, Error> {
    let naive =
        NaiveDateTime::parse_from_str(value, DATE_FORMAT).map_err(|e| Error::InvalidDate {
            value: value.to_owned(),
            details: e.to_string(),
        })?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Formats an instant back into the header date pattern.
#[must_use]
pub fn format_date(instant: DateTime<Utc>) -> String {
    instant.format(DATE_FORMAT).to_string()
}

/// Resolves a time of day against an anchor date.
///
/// The string splits on any of `:`, `.` or `,`. Three tokens are
/// `(minute, second, nanosecond)` with the hour taken from `anchor`; four
/// tokens are `(hour, minute, second, nanosecond)`. The calendar date always
/// comes from `anchor` and the result is UTC.
pub fn parse_time_of_day(value: &str, anchor: DateTime<Utc>) -> Result<DateTime<Utc>, Error> {
    let tokens: Vec<&str> = value
        .split([':', '.', ','])
        .filter(|t| !t.is_empty())
        .collect();

    let field = |token: &str| -> Result<u32, Error> {
        token.parse::<u32>().map_err(|_| Error::InvalidTimeOfDay {
            value: value.to_owned(),
            details: format!("token '{token}' is not a non-negative integer"),
        })
    };

    let (hour, minute, second, nano) = match tokens.as_slice() {
        &[minute, second, nano] => (anchor.hour(), field(minute)?, field(second)?, field(nano)?),
        &[hour, minute, second, nano] => {
            (field(hour)?, field(minute)?, field(second)?, field(nano)?)
        }
        _ => {
            return Err(Error::InvalidTimeOfDay {
                value: value.to_owned(),
                details: format!("expected 3 or 4 tokens, found {}", tokens.len()),
            });
        }
    };

    anchor
        .date_naive()
        .and_hms_nano_opt(hour, minute, second, nano)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| Error::InvalidTimeOfDay {
            value: value.to_owned(),
            details: "time fields out of range".to_owned(),
        })
}
