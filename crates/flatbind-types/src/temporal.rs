//! Date, time and date-time handlers using strftime-style patterns

use crate::handler::{HandlerConfig, HandlerContext, HandlerId, TypeHandler};
use crate::zone::TimeZoneId;
use crate::{ConfigError, ConfigResult, ConversionResult, TypeConversionError};
use chrono::format::{Item, Parsed, StrftimeItems};
use chrono::{Days, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use flatbind_ir::{Value, ValueType};
use std::fmt::Write as _;
use std::sync::Arc;

/// Which temporal value a handler produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalKind {
    Date,
    Time,
    DateTime,
}

impl TemporalKind {
    /// Pattern used when none is configured
    pub fn default_pattern(self) -> &'static str {
        match self {
            TemporalKind::Date => "%Y-%m-%d",
            TemporalKind::Time => "%H:%M:%S",
            TemporalKind::DateTime => "%Y-%m-%dT%H:%M:%S",
        }
    }

    fn invalid(self) -> TypeConversionError {
        match self {
            TemporalKind::Time => TypeConversionError::new("Invalid time"),
            TemporalKind::Date | TemporalKind::DateTime => TypeConversionError::new("Invalid date"),
        }
    }
}

/// A compiled strftime pattern
#[derive(Debug, Clone)]
pub(crate) struct DatePattern {
    source: String,
    items: Arc<[Item<'static>]>,
}

impl DatePattern {
    pub(crate) fn compile(pattern: &str) -> ConfigResult<Self> {
        if pattern.is_empty() {
            return Err(ConfigError::date_pattern(pattern, "empty pattern"));
        }

        let mut items = Vec::new();
        for item in StrftimeItems::new(pattern) {
            let owned = match item {
                Item::Literal(s) => Item::OwnedLiteral(s.into()),
                Item::Space(s) => Item::OwnedSpace(s.into()),
                Item::OwnedLiteral(s) => Item::OwnedLiteral(s),
                Item::OwnedSpace(s) => Item::OwnedSpace(s),
                Item::Numeric(numeric, pad) => Item::Numeric(numeric, pad),
                Item::Fixed(fixed) => Item::Fixed(fixed),
                #[allow(unreachable_patterns)]
                _ => return Err(ConfigError::date_pattern(pattern, "unrecognised specifier")),
            };
            items.push(owned);
        }

        Ok(Self {
            source: pattern.to_string(),
            items: items.into(),
        })
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.source
    }
}

/// Per-context formatter: the compiled items plus a reusable output buffer
#[derive(Debug)]
pub(crate) struct DateFormatter {
    items: Arc<[Item<'static>]>,
    buffer: String,
}

impl DateFormatter {
    pub(crate) fn new(pattern: &DatePattern) -> Self {
        Self {
            items: Arc::clone(&pattern.items),
            buffer: String::new(),
        }
    }

    /// Parse the whole text into calendar fields
    pub(crate) fn parse(&self, text: &str) -> Option<Parsed> {
        let mut parsed = Parsed::new();
        chrono::format::parse(&mut parsed, text, self.items.iter()).ok()?;
        Some(parsed)
    }

    pub(crate) fn format(&mut self, value: &Formattable) -> Option<String> {
        self.buffer.clear();
        let items = self.items.iter();
        let written = match value {
            Formattable::Date(d) => write!(self.buffer, "{}", d.format_with_items(items)),
            Formattable::Time(t) => write!(self.buffer, "{}", t.format_with_items(items)),
            Formattable::Local(dt) => write!(self.buffer, "{}", dt.format_with_items(items)),
            Formattable::Instant(ts) => write!(self.buffer, "{}", ts.format_with_items(items)),
        };
        written.ok()?;
        Some(self.buffer.clone())
    }
}

/// A value narrowed to what a temporal pattern can render
pub(crate) enum Formattable {
    Date(NaiveDate),
    Time(NaiveTime),
    Local(NaiveDateTime),
    Instant(chrono::DateTime<FixedOffset>),
}

/// Date, time or date-time values read and written with a pattern
#[derive(Debug, Clone)]
pub struct DateTypeHandler {
    id: HandlerId,
    kind: TemporalKind,
    pattern: DatePattern,
    lenient: bool,
    time_zone: Option<TimeZoneId>,
}

impl DateTypeHandler {
    /// Handler using the kind's default pattern
    pub fn new(kind: TemporalKind) -> Self {
        Self {
            id: HandlerId::next(),
            kind,
            pattern: DatePattern {
                source: kind.default_pattern().to_string(),
                items: StrftimeItems::new(kind.default_pattern()).collect::<Vec<_>>().into(),
            },
            lenient: false,
            time_zone: None,
        }
    }

    /// Configured pattern text
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Configured time zone
    pub fn time_zone(&self) -> Option<TimeZoneId> {
        self.time_zone
    }

    /// Typed variant for `config`, `None` when nothing changes
    pub(crate) fn with_config(&self, config: &HandlerConfig) -> ConfigResult<Option<Self>> {
        let pattern = config.pattern().unwrap_or(self.pattern.as_str());
        let lenient = config.lenient.unwrap_or(self.lenient);
        let time_zone = config.time_zone.or(self.time_zone);

        if pattern == self.pattern.as_str() && lenient == self.lenient && time_zone == self.time_zone {
            return Ok(None);
        }

        let pattern = if pattern == self.pattern.as_str() {
            self.pattern.clone()
        } else {
            DatePattern::compile(pattern)?
        };
        Ok(Some(Self {
            id: HandlerId::next(),
            kind: self.kind,
            pattern,
            lenient,
            time_zone,
        }))
    }

    fn formatter<'c>(&self, cx: &'c mut HandlerContext) -> ConversionResult<&'c mut DateFormatter> {
        cx.formatter(self.id, || DateFormatter::new(&self.pattern))
            .ok_or_else(|| TypeConversionError::new("Date formatter unavailable"))
    }

    fn date_of(&self, parsed: &Parsed) -> Option<NaiveDate> {
        match parsed.to_naive_date() {
            Ok(date) => Some(date),
            Err(_) if self.lenient => roll_date(parsed),
            Err(_) => None,
        }
    }

    fn read(&self, parsed: &Parsed) -> Option<Value> {
        match self.kind {
            TemporalKind::Date => self.date_of(parsed).map(Value::Date),
            TemporalKind::Time => parsed.to_naive_time().ok().map(Value::Time),
            TemporalKind::DateTime => {
                let local = self.date_of(parsed)?.and_time(parsed.to_naive_time().ok()?);
                if let Some(offset) = parsed.offset {
                    let instant = FixedOffset::east_opt(offset)?.from_local_datetime(&local).single()?;
                    let instant = self.time_zone.map_or(instant, |zone| zone.convert(&instant));
                    return Some(Value::Timestamp(instant));
                }
                match &self.time_zone {
                    Some(zone) => zone.from_local(&local).map(Value::Timestamp),
                    None => Some(Value::DateTime(local)),
                }
            }
        }
    }

    fn narrow(&self, value: &Value) -> Option<Formattable> {
        let zoned = |ts: &chrono::DateTime<FixedOffset>| {
            self.time_zone.map_or(*ts, |zone| zone.convert(ts))
        };
        let narrowed = match (self.kind, value) {
            (TemporalKind::Date, Value::Date(d)) => Formattable::Date(*d),
            (TemporalKind::Date, Value::DateTime(dt)) => Formattable::Date(dt.date()),
            (TemporalKind::Date, Value::Timestamp(ts)) => Formattable::Date(zoned(ts).date_naive()),
            (TemporalKind::Time, Value::Time(t)) => Formattable::Time(*t),
            (TemporalKind::Time, Value::DateTime(dt)) => Formattable::Time(dt.time()),
            (TemporalKind::Time, Value::Timestamp(ts)) => Formattable::Time(zoned(ts).time()),
            (TemporalKind::DateTime, Value::Date(d)) => Formattable::Local(d.and_hms_opt(0, 0, 0)?),
            (TemporalKind::DateTime, Value::DateTime(dt)) => match &self.time_zone {
                Some(zone) => Formattable::Instant(zone.from_local(dt)?),
                None => Formattable::Local(*dt),
            },
            (TemporalKind::DateTime, Value::Timestamp(ts)) => Formattable::Instant(zoned(ts)),
            _ => return None,
        };
        Some(narrowed)
    }
}

/// Roll an out-of-range day of month forward, as a lenient calendar would
fn roll_date(parsed: &Parsed) -> Option<NaiveDate> {
    let year = parsed.year?;
    let month = parsed.month?;
    let day = parsed.day?;
    NaiveDate::from_ymd_opt(year, 1, 1)?
        .checked_add_months(Months::new(month.checked_sub(1)?))?
        .checked_add_days(Days::new(u64::from(day.checked_sub(1)?)))
}

impl TypeHandler for DateTypeHandler {
    fn target_type(&self) -> ValueType {
        match self.kind {
            TemporalKind::Date => ValueType::Date,
            TemporalKind::Time => ValueType::Time,
            TemporalKind::DateTime if self.time_zone.is_some() => ValueType::Timestamp,
            TemporalKind::DateTime => ValueType::DateTime,
        }
    }

    fn parse(&self, text: &str, cx: &mut HandlerContext) -> ConversionResult<Value> {
        if text.is_empty() {
            return Ok(Value::Null);
        }
        let parsed = self.formatter(cx)?.parse(text).ok_or_else(|| self.kind.invalid())?;
        self.read(&parsed).ok_or_else(|| self.kind.invalid())
    }

    fn format(&self, value: &Value, cx: &mut HandlerContext) -> ConversionResult<String> {
        if value.is_null() {
            return Ok(String::new());
        }
        let narrowed = self.narrow(value).ok_or_else(|| {
            TypeConversionError::new(format!(
                "Cannot format {} value with date pattern '{}'",
                value.type_name(),
                self.pattern.as_str()
            ))
        })?;
        self.formatter(cx)?.format(&narrowed).ok_or_else(|| {
            TypeConversionError::new(format!(
                "Value cannot be rendered with date pattern '{}'",
                self.pattern.as_str()
            ))
        })
    }

    fn configure(&self, config: &HandlerConfig) -> ConfigResult<Option<Arc<dyn TypeHandler>>> {
        Ok(self
            .with_config(config)?
            .map(|handler| Arc::new(handler) as Arc<dyn TypeHandler>))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(kind: TemporalKind, config: HandlerConfig) -> Arc<dyn TypeHandler> {
        DateTypeHandler::new(kind).configure(&config).unwrap().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_date_pattern() {
        let mut cx = HandlerContext::new();
        let handler = DateTypeHandler::new(TemporalKind::Date);
        let value = handler.parse("2024-02-29", &mut cx).unwrap();
        assert_eq!(value, Value::Date(date(2024, 2, 29)));
        assert_eq!(handler.format(&value, &mut cx).unwrap(), "2024-02-29");
        assert_eq!(handler.parse("", &mut cx).unwrap(), Value::Null);
    }

    #[test]
    fn test_custom_pattern_round_trip() {
        let mut cx = HandlerContext::new();
        let handler = configured(TemporalKind::Date, HandlerConfig::new().format("%d%m%Y"));
        let value = handler.parse("05012024", &mut cx).unwrap();
        assert_eq!(value, Value::Date(date(2024, 1, 5)));
        assert_eq!(handler.format(&value, &mut cx).unwrap(), "05012024");
    }

    #[test]
    fn test_whole_text_must_parse() {
        let mut cx = HandlerContext::new();
        let handler = DateTypeHandler::new(TemporalKind::Date);
        assert_eq!(handler.parse("2024-01-05x", &mut cx).unwrap_err().message(), "Invalid date");
        assert_eq!(handler.parse("2024-02-30", &mut cx).unwrap_err().message(), "Invalid date");
    }

    #[test]
    fn test_lenient_rolls_day_over() {
        let mut cx = HandlerContext::new();
        let handler = configured(TemporalKind::Date, HandlerConfig::new().lenient(true));
        assert_eq!(
            handler.parse("2013-02-30", &mut cx).unwrap(),
            Value::Date(date(2013, 3, 2))
        );
    }

    #[test]
    fn test_invalid_pattern_rejected_eagerly() {
        let err = DateTypeHandler::new(TemporalKind::Date)
            .configure(&HandlerConfig::new().format("%Y-%Q"))
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid date format pattern '%Y-%Q'"));
    }

    #[test]
    fn test_configure_reuses_same_settings() {
        let handler = DateTypeHandler::new(TemporalKind::Date);
        assert!(handler.configure(&HandlerConfig::new()).unwrap().is_none());
        assert!(handler.configure(&HandlerConfig::new().format("%Y-%m-%d")).unwrap().is_none());
        assert!(handler.configure(&HandlerConfig::new().lenient(true)).unwrap().is_some());
    }

    #[test]
    fn test_datetime_with_zone_produces_timestamp() {
        let mut cx = HandlerContext::new();
        let zone = TimeZoneId::parse("Asia/Tokyo").unwrap();
        let handler = configured(TemporalKind::DateTime, HandlerConfig::new().time_zone(zone));

        let value = handler.parse("2024-03-01T09:00:00", &mut cx).unwrap();
        let Value::Timestamp(ts) = &value else {
            panic!("expected a timestamp, got {value:?}");
        };
        assert_eq!(ts.offset().local_minus_utc(), 9 * 3600);
        assert_eq!(handler.format(&value, &mut cx).unwrap(), "2024-03-01T09:00:00");
    }

    #[test]
    fn test_datetime_with_offset_in_text() {
        let mut cx = HandlerContext::new();
        let handler = configured(
            TemporalKind::DateTime,
            HandlerConfig::new().format("%Y-%m-%d %H:%M:%S %z"),
        );
        let value = handler.parse("2024-03-01 09:00:00 +0200", &mut cx).unwrap();
        assert!(matches!(value, Value::Timestamp(_)));
        assert_eq!(handler.format(&value, &mut cx).unwrap(), "2024-03-01 09:00:00 +0200");
    }

    #[test]
    fn test_time_handler() {
        let mut cx = HandlerContext::new();
        let handler = DateTypeHandler::new(TemporalKind::Time);
        let value = handler.parse("23:59:01", &mut cx).unwrap();
        assert_eq!(value, Value::Time(NaiveTime::from_hms_opt(23, 59, 1).unwrap()));
        assert_eq!(handler.parse("25:00:00", &mut cx).unwrap_err().message(), "Invalid time");
    }

    #[test]
    fn test_format_mismatched_value() {
        let mut cx = HandlerContext::new();
        let handler = DateTypeHandler::new(TemporalKind::Date);
        assert!(handler.format(&Value::Integer(1), &mut cx).is_err());
    }
}
