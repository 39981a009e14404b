//! XML Schema `date`, `time` and `dateTime` handlers
//!
//! Values are read and written in the canonical lexical forms
//! (`2024-01-15`, `10:30:00.5`, `2024-01-15T10:30:00Z`). An explicit
//! pattern replaces the canonical form entirely.

use crate::handler::{HandlerConfig, HandlerContext, TypeHandler};
use crate::temporal::{DateTypeHandler, TemporalKind};
use crate::zone::{TimeZoneId, parse_offset};
use crate::{ConfigResult, ConversionResult, TypeConversionError};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use flatbind_ir::{Value, ValueType};
use std::sync::Arc;

/// Lexical subtype carried by a piece of XML temporal text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lexical {
    Date,
    Time,
    DateTime,
}

impl Lexical {
    fn name(self) -> &'static str {
        match self {
            Lexical::Date => "date",
            Lexical::Time => "time",
            Lexical::DateTime => "dateTime",
        }
    }
}

/// Fields recovered from canonical text
#[derive(Debug)]
struct XmlCalendar {
    kind: Lexical,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    offset: Option<FixedOffset>,
}

/// Handler for one XML Schema temporal type
#[derive(Debug, Clone)]
pub struct XmlTemporalTypeHandler {
    kind: Lexical,
    time_zone: Option<TimeZoneId>,
    lenient_datatype: bool,
    time_zone_allowed: bool,
    patterned: Option<DateTypeHandler>,
}

impl XmlTemporalTypeHandler {
    /// `xsd:date` handler
    pub fn date() -> Self {
        Self::new(Lexical::Date)
    }

    /// `xsd:time` handler
    pub fn time() -> Self {
        Self::new(Lexical::Time)
    }

    /// `xsd:dateTime` handler
    pub fn date_time() -> Self {
        Self::new(Lexical::DateTime)
    }

    fn new(kind: Lexical) -> Self {
        Self {
            kind,
            time_zone: None,
            lenient_datatype: false,
            time_zone_allowed: true,
            patterned: None,
        }
    }

    fn temporal_kind(&self) -> TemporalKind {
        match self.kind {
            Lexical::Date => TemporalKind::Date,
            Lexical::Time => TemporalKind::Time,
            Lexical::DateTime => TemporalKind::DateTime,
        }
    }

    fn invalid(&self) -> TypeConversionError {
        TypeConversionError::new(format!("Invalid XML {}", self.kind.name()))
    }

    fn to_value(&self, calendar: XmlCalendar) -> Option<Value> {
        let date = calendar.date.or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1));
        let time = calendar.time.or_else(|| NaiveTime::from_hms_opt(0, 0, 0));
        match self.kind {
            Lexical::Date => date.map(Value::Date),
            Lexical::Time => time.map(Value::Time),
            Lexical::DateTime => {
                let local = NaiveDateTime::new(date?, time?);
                match (calendar.offset, &self.time_zone) {
                    (Some(offset), zone) => {
                        let instant = offset.from_local_datetime(&local).single()?;
                        Some(Value::Timestamp(zone.map_or(instant, |z| z.convert(&instant))))
                    }
                    (None, Some(zone)) => zone.from_local(&local).map(Value::Timestamp),
                    (None, None) => Some(Value::DateTime(local)),
                }
            }
        }
    }

    fn canonical(&self, value: &Value) -> Option<String> {
        let zone = self.time_zone;
        match (self.kind, value) {
            (Lexical::Date, Value::Date(d)) => {
                let midnight = d.and_hms_opt(0, 0, 0)?;
                let offset = zone.map(|z| z.offset_at(&midnight));
                Some(format!("{}{}", format_date(d), format_zone(offset)))
            }
            (Lexical::Date, Value::DateTime(dt)) => self.canonical(&Value::Date(dt.date())),
            (Lexical::Date, Value::Timestamp(ts)) => {
                let ts = zone.map_or(*ts, |z| z.convert(ts));
                Some(format!("{}{}", format_date(&ts.date_naive()), format_zone(zone.map(|_| *ts.offset()))))
            }
            (Lexical::Time, Value::Time(t)) => {
                // a time has no date; named zones use their offset on 1970-01-01
                let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?.and_hms_opt(0, 0, 0)?;
                let offset = zone.map(|z| z.offset_at(&epoch));
                Some(format!("{}{}", format_time(t), format_zone(offset)))
            }
            (Lexical::Time, Value::DateTime(dt)) => self.canonical(&Value::Time(dt.time())),
            (Lexical::Time, Value::Timestamp(ts)) => {
                let ts = zone.map_or(*ts, |z| z.convert(ts));
                Some(format!("{}{}", format_time(&ts.time()), format_zone(zone.map(|_| *ts.offset()))))
            }
            (Lexical::DateTime, Value::DateTime(dt)) => match zone {
                Some(z) => self.canonical(&Value::Timestamp(z.from_local(dt)?)),
                None => Some(format!("{}T{}", format_date(&dt.date()), format_time(&dt.time()))),
            },
            (Lexical::DateTime, Value::Timestamp(ts)) => {
                let ts: DateTime<FixedOffset> = zone.map_or(*ts, |z| z.convert(ts));
                let local = ts.naive_local();
                Some(format!(
                    "{}T{}{}",
                    format_date(&local.date()),
                    format_time(&local.time()),
                    format_zone(zone.map(|_| *ts.offset()))
                ))
            }
            (Lexical::DateTime, Value::Date(d)) => {
                self.canonical(&Value::DateTime(d.and_hms_opt(0, 0, 0)?))
            }
            _ => None,
        }
    }
}

impl TypeHandler for XmlTemporalTypeHandler {
    fn target_type(&self) -> ValueType {
        match self.kind {
            Lexical::Date => ValueType::Date,
            Lexical::Time => ValueType::Time,
            Lexical::DateTime if self.time_zone.is_some() => ValueType::Timestamp,
            Lexical::DateTime => ValueType::DateTime,
        }
    }

    fn parse(&self, text: &str, cx: &mut HandlerContext) -> ConversionResult<Value> {
        if let Some(patterned) = &self.patterned {
            return patterned.parse(text, cx);
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }

        let calendar = parse_calendar(text).ok_or_else(|| self.invalid())?;
        if calendar.kind != self.kind && !self.lenient_datatype {
            return Err(self.invalid());
        }
        if calendar.offset.is_some() && !self.time_zone_allowed {
            return Err(TypeConversionError::new(format!(
                "Invalid XML {}, time zone not allowed",
                self.kind.name()
            )));
        }
        self.to_value(calendar).ok_or_else(|| self.invalid())
    }

    fn format(&self, value: &Value, cx: &mut HandlerContext) -> ConversionResult<String> {
        if let Some(patterned) = &self.patterned {
            return patterned.format(value, cx);
        }
        if value.is_null() {
            return Ok(String::new());
        }
        self.canonical(value).ok_or_else(|| {
            TypeConversionError::new(format!(
                "Cannot format {} value as XML {}",
                value.type_name(),
                self.kind.name()
            ))
        })
    }

    fn configure(&self, config: &HandlerConfig) -> ConfigResult<Option<Arc<dyn TypeHandler>>> {
        let time_zone = config.time_zone.or(self.time_zone);
        let lenient_datatype = config.lenient_datatype.unwrap_or(self.lenient_datatype);
        let time_zone_allowed = config.time_zone_allowed.unwrap_or(self.time_zone_allowed);
        let current_pattern = self.patterned.as_ref().map(DateTypeHandler::pattern);
        let pattern = config.pattern().or(current_pattern);

        if time_zone == self.time_zone
            && lenient_datatype == self.lenient_datatype
            && time_zone_allowed == self.time_zone_allowed
            && pattern == current_pattern
            && config.lenient.is_none()
        {
            return Ok(None);
        }

        let patterned = match pattern {
            None => None,
            Some(pattern) => {
                let mut delegate_config = HandlerConfig::new().format(pattern);
                delegate_config.lenient = config.lenient;
                delegate_config.time_zone = time_zone;
                let base = DateTypeHandler::new(self.temporal_kind());
                Some(base.with_config(&delegate_config)?.unwrap_or(base))
            }
        };

        Ok(Some(Arc::new(Self {
            kind: self.kind,
            time_zone,
            lenient_datatype,
            time_zone_allowed,
            patterned,
        })))
    }
}

fn format_date(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn format_time(time: &NaiveTime) -> String {
    let base = time.format("%H:%M:%S").to_string();
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos == 0 {
        return base;
    }
    let fraction = format!("{nanos:09}");
    format!("{base}.{}", fraction.trim_end_matches('0'))
}

fn format_zone(offset: Option<FixedOffset>) -> String {
    match offset {
        None => String::new(),
        Some(offset) if offset.local_minus_utc() == 0 => "Z".to_string(),
        Some(offset) => {
            let seconds = offset.local_minus_utc();
            let sign = if seconds < 0 { '-' } else { '+' };
            let minutes = seconds.abs() / 60;
            format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
        }
    }
}

/// Parse canonical XML date, time or dateTime text
fn parse_calendar(text: &str) -> Option<XmlCalendar> {
    let (body, offset) = split_zone(text)?;

    if let Some((date, time)) = body.split_once('T') {
        return Some(XmlCalendar {
            kind: Lexical::DateTime,
            date: Some(parse_date(date)?),
            time: Some(parse_time(time)?),
            offset,
        });
    }
    if body.contains(':') {
        return Some(XmlCalendar {
            kind: Lexical::Time,
            date: None,
            time: Some(parse_time(body)?),
            offset,
        });
    }
    Some(XmlCalendar {
        kind: Lexical::Date,
        date: Some(parse_date(body)?),
        time: None,
        offset,
    })
}

fn split_zone(text: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(body) = text.strip_suffix('Z') {
        return Some((body, Some(FixedOffset::east_opt(0)?)));
    }
    // a trailing `+hh:mm` or `-hh:mm`; a date's own `-mm-dd` has no colon
    let split = text.len().checked_sub(6)?;
    if let (Some(body), Some(tail)) = (text.get(..split), text.get(split..)) {
        let bytes = tail.as_bytes();
        if matches!(bytes[0], b'+' | b'-') && bytes[3] == b':' {
            return Some((body, Some(parse_offset(tail)?)));
        }
    }
    Some((text, None))
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut parts = digits.split('-');
    let year = parts.next()?;
    let month = parts.next()?;
    let day = parts.next()?;
    if parts.next().is_some() || year.len() < 4 || month.len() != 2 || day.len() != 2 {
        return None;
    }
    if !(year.bytes().chain(month.bytes()).chain(day.bytes())).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let year = if negative { -year } else { year };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    let (clock, fraction) = match text.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (text, None),
    };
    let mut parts = clock.split(':');
    let (h, m, s) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || [h, m, s].iter().any(|p| p.len() != 2 || !p.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    let nanos = match fraction {
        None => 0,
        Some(f) if f.is_empty() || f.len() > 9 || !f.bytes().all(|b| b.is_ascii_digit()) => return None,
        Some(f) => format!("{f:0<9}").parse().ok()?,
    };
    NaiveTime::from_hms_nano_opt(h.parse().ok()?, m.parse().ok()?, s.parse().ok()?, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configure(handler: &XmlTemporalTypeHandler, config: HandlerConfig) -> Arc<dyn TypeHandler> {
        handler.configure(&config).unwrap().unwrap()
    }

    #[test]
    fn test_parse_date() {
        let mut cx = HandlerContext::new();
        let handler = XmlTemporalTypeHandler::date();
        assert_eq!(
            handler.parse("2024-01-15", &mut cx).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert_eq!(handler.parse("", &mut cx).unwrap(), Value::Null);
        assert_eq!(handler.parse("2024-1-15", &mut cx).unwrap_err().message(), "Invalid XML date");
    }

    #[test]
    fn test_subtype_mismatch() {
        let mut cx = HandlerContext::new();
        let handler = XmlTemporalTypeHandler::date();
        assert_eq!(
            handler.parse("2024-01-15T10:00:00", &mut cx).unwrap_err().message(),
            "Invalid XML date"
        );

        let lenient = configure(&handler, HandlerConfig::new().lenient_datatype(true));
        assert_eq!(
            lenient.parse("2024-01-15T10:00:00", &mut cx).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
    }

    #[test]
    fn test_time_zone_not_allowed() {
        let mut cx = HandlerContext::new();
        let handler = configure(
            &XmlTemporalTypeHandler::date_time(),
            HandlerConfig::new().time_zone_allowed(false),
        );
        assert_eq!(
            handler.parse("2024-01-15T10:00:00Z", &mut cx).unwrap_err().message(),
            "Invalid XML dateTime, time zone not allowed"
        );
        assert!(handler.parse("2024-01-15T10:00:00", &mut cx).is_ok());
    }

    #[test]
    fn test_date_time_with_offset() {
        let mut cx = HandlerContext::new();
        let handler = XmlTemporalTypeHandler::date_time();
        let value = handler.parse("2024-01-15T10:30:00.250+02:00", &mut cx).unwrap();
        let Value::Timestamp(ts) = value else {
            panic!("expected a timestamp");
        };
        assert_eq!(ts.offset().local_minus_utc(), 7200);
        assert_eq!(ts.naive_local().time().nanosecond(), 250_000_000);
    }

    #[test]
    fn test_format_emits_offset_only_with_zone() {
        let mut cx = HandlerContext::new();
        let date = Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        let plain = XmlTemporalTypeHandler::date();
        assert_eq!(plain.format(&date, &mut cx).unwrap(), "2024-01-15");

        let utc = configure(&plain, HandlerConfig::new().time_zone(TimeZoneId::utc()));
        assert_eq!(utc.format(&date, &mut cx).unwrap(), "2024-01-15Z");

        let plus = configure(&plain, HandlerConfig::new().time_zone(TimeZoneId::parse("+05:30").unwrap()));
        assert_eq!(plus.format(&date, &mut cx).unwrap(), "2024-01-15+05:30");
    }

    #[test]
    fn test_date_time_round_trip_in_zone() {
        let mut cx = HandlerContext::new();
        let handler = configure(
            &XmlTemporalTypeHandler::date_time(),
            HandlerConfig::new().time_zone(TimeZoneId::parse("Europe/Paris").unwrap()),
        );
        let value = handler.parse("2024-07-01T12:00:00+02:00", &mut cx).unwrap();
        let text = handler.format(&value, &mut cx).unwrap();
        assert_eq!(text, "2024-07-01T12:00:00+02:00");
        assert_eq!(handler.parse(&text, &mut cx).unwrap(), value);
    }

    #[test]
    fn test_time_offset_is_fixed_for_named_zone() {
        let mut cx = HandlerContext::new();
        let handler = configure(
            &XmlTemporalTypeHandler::time(),
            HandlerConfig::new().time_zone(TimeZoneId::parse("America/New_York").unwrap()),
        );
        let noon = Value::Time(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(handler.format(&noon, &mut cx).unwrap(), "12:00:00-05:00");
    }

    #[test]
    fn test_time_fraction() {
        let mut cx = HandlerContext::new();
        let handler = XmlTemporalTypeHandler::time();
        let value = handler.parse("08:15:30.5", &mut cx).unwrap();
        assert_eq!(handler.format(&value, &mut cx).unwrap(), "08:15:30.5");
        assert!(handler.parse("8:15:30", &mut cx).is_err());
    }

    #[test]
    fn test_explicit_pattern_overrides_canonical_form() {
        let mut cx = HandlerContext::new();
        let handler = configure(&XmlTemporalTypeHandler::date(), HandlerConfig::new().format("%d/%m/%Y"));
        let value = handler.parse("15/01/2024", &mut cx).unwrap();
        assert_eq!(value, Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
        assert_eq!(handler.format(&value, &mut cx).unwrap(), "15/01/2024");
    }

    #[test]
    fn test_negative_offset_split() {
        let (body, offset) = split_zone("2024-01-15T10:00:00-05:00").unwrap();
        assert_eq!(body, "2024-01-15T10:00:00");
        assert_eq!(offset.unwrap().local_minus_utc(), -5 * 3600);

        let (body, offset) = split_zone("2024-01-15").unwrap();
        assert_eq!(body, "2024-01-15");
        assert!(offset.is_none());

        let (body, offset) = split_zone("2024-01-15-05:00").unwrap();
        assert_eq!(body, "2024-01-15");
        assert!(offset.is_some());
    }
}
