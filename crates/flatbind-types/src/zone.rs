//! Time zones: fixed offsets or IANA zones

use crate::{ConfigError, ConfigResult};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use std::fmt;

/// A configured time zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeZoneId {
    /// Constant offset from UTC
    Fixed(FixedOffset),
    /// Named zone with its daylight-saving rules
    Named(Tz),
}

impl TimeZoneId {
    /// The UTC zone
    pub fn utc() -> Self {
        TimeZoneId::Fixed(utc_offset())
    }

    /// Parse `UTC`, `Z`, `GMT`, an offset like `+09:00`/`-0530`, or an
    /// IANA name like `Asia/Tokyo`
    pub fn parse(id: &str) -> ConfigResult<Self> {
        let trimmed = id.trim();
        match trimmed {
            "Z" | "UTC" | "GMT" => return Ok(Self::utc()),
            _ => {}
        }

        let offset_text = trimmed
            .strip_prefix("UTC")
            .or_else(|| trimmed.strip_prefix("GMT"))
            .unwrap_or(trimmed);
        if offset_text.starts_with(['+', '-']) {
            return parse_offset(offset_text)
                .map(TimeZoneId::Fixed)
                .ok_or_else(|| ConfigError::UnknownTimeZone(id.to_string()));
        }

        trimmed
            .parse::<Tz>()
            .map(TimeZoneId::Named)
            .map_err(|_| ConfigError::UnknownTimeZone(id.to_string()))
    }

    /// Offset in effect at the given UTC instant
    pub fn offset_at(&self, utc: &NaiveDateTime) -> FixedOffset {
        match self {
            TimeZoneId::Fixed(offset) => *offset,
            TimeZoneId::Named(tz) => tz.offset_from_utc_datetime(utc).fix(),
        }
    }

    /// Interpret a local date-time in this zone
    ///
    /// Ambiguous local times resolve to the earlier instant; times that
    /// fall into a gap have no instant and yield `None`.
    pub fn from_local(&self, local: &NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            TimeZoneId::Fixed(offset) => offset.from_local_datetime(local).single(),
            TimeZoneId::Named(tz) => tz
                .from_local_datetime(local)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix())),
        }
    }

    /// Express an instant in this zone
    pub fn convert(&self, instant: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
        let offset = self.offset_at(&instant.naive_utc());
        instant.with_timezone(&offset)
    }
}

impl fmt::Display for TimeZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneId::Fixed(offset) if offset.local_minus_utc() == 0 => f.write_str("UTC"),
            TimeZoneId::Fixed(offset) => write!(f, "{offset}"),
            TimeZoneId::Named(tz) => f.write_str(tz.name()),
        }
    }
}

fn utc_offset() -> FixedOffset {
    Offset::fix(&chrono::Utc)
}

/// Parse `+hh`, `+hh:mm` or `+hhmm`
pub(crate) fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, rest) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    if hours > 18 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
