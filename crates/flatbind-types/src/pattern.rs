//! Decimal number patterns such as `#,##0.00` or `'$'0.00`
//!
//! Supported: literal prefix and suffix (quote with `'` to include pattern
//! characters), `0` for required digits, `#` for optional digits, `,` for
//! grouping in the integer part and `.` as the decimal point. Negative
//! sub-patterns, exponents and percent/permille scaling are rejected.

use crate::locale::Locale;
use crate::{ConfigError, ConfigResult};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

/// A validated number pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberPattern {
    source: String,
    prefix: String,
    suffix: String,
    min_integer: usize,
    grouping: usize,
    min_fraction: usize,
    max_fraction: usize,
    decimal_always: bool,
}

impl NumberPattern {
    /// Compile and validate a pattern
    pub fn compile(pattern: &str) -> ConfigResult<Self> {
        let invalid = |reason: &str| ConfigError::number_pattern(pattern, reason);

        let mut prefix = String::new();
        let mut body = String::new();
        let mut suffix = String::new();
        let mut quoted = false;
        let mut section = 0;
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    push_literal(section, &mut prefix, &mut suffix, '\'');
                } else {
                    quoted = !quoted;
                }
                continue;
            }
            if quoted {
                if section == 1 {
                    section = 2;
                }
                push_literal(section, &mut prefix, &mut suffix, c);
                continue;
            }
            match c {
                ';' => return Err(invalid("negative sub-patterns are not supported")),
                'E' => return Err(invalid("exponent notation is not supported")),
                '%' | '\u{2030}' | '\u{a4}' => {
                    return Err(invalid(&format!("unsupported pattern character '{c}'")));
                }
                '#' | '0' | ',' | '.' => {
                    if section == 2 {
                        return Err(invalid("digits after the suffix"));
                    }
                    section = 1;
                    body.push(c);
                }
                other => {
                    if section == 1 {
                        section = 2;
                    }
                    push_literal(section, &mut prefix, &mut suffix, other);
                }
            }
        }

        if quoted {
            return Err(invalid("unterminated quote"));
        }
        if body.is_empty() {
            return Err(invalid("no digit placeholders"));
        }

        let (integer, fraction, decimal_always) = match body.split_once('.') {
            Some((_, fraction)) if fraction.contains('.') => {
                return Err(invalid("multiple decimal separators"));
            }
            Some((integer, fraction)) => (integer, fraction, fraction.is_empty()),
            None => (body.as_str(), "", false),
        };

        if fraction.contains(',') {
            return Err(invalid("grouping separator in fraction"));
        }
        if integer.ends_with(',') {
            return Err(invalid("grouping separator at end of integer part"));
        }

        let mut seen_zero = false;
        for c in integer.chars() {
            match c {
                '0' => seen_zero = true,
                '#' if seen_zero => return Err(invalid("unexpected '#' after '0'")),
                _ => {}
            }
        }
        let mut seen_hash = false;
        for c in fraction.chars() {
            match c {
                '#' => seen_hash = true,
                '0' if seen_hash => return Err(invalid("unexpected '0' after '#'")),
                _ => {}
            }
        }

        let grouping = integer
            .rfind(',')
            .map_or(0, |i| integer.len() - i - 1);

        Ok(Self {
            source: pattern.to_string(),
            prefix,
            suffix,
            min_integer: integer.chars().filter(|c| *c == '0').count(),
            grouping,
            min_fraction: fraction.chars().filter(|c| *c == '0').count(),
            max_fraction: fraction.len(),
            decimal_always,
        })
    }

    /// Pattern text as given
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Maximum number of fraction digits written
    pub fn max_fraction(&self) -> usize {
        self.max_fraction
    }
}

fn push_literal(section: u8, prefix: &mut String, suffix: &mut String, c: char) {
    if section == 0 {
        prefix.push(c);
    } else {
        suffix.push(c);
    }
}

/// Sign and digits read from text by a [`NumberFormatter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNumber {
    pub negative: bool,
    pub integer: String,
    pub fraction: String,
}

impl ParsedNumber {
    /// Exact integral value, `None` for non-zero fractions or overflow
    pub fn to_i64(&self) -> Option<i64> {
        if self.fraction.chars().any(|c| c != '0') {
            return None;
        }
        let digits = if self.integer.is_empty() { "0" } else { &self.integer };
        let magnitude: i128 = digits.parse().ok()?;
        let value = if self.negative { -magnitude } else { magnitude };
        i64::try_from(value).ok()
    }

    /// Nearest float value
    pub fn to_f64(&self) -> Option<f64> {
        let integer = if self.integer.is_empty() { "0" } else { &self.integer };
        let fraction = if self.fraction.is_empty() { "0" } else { &self.fraction };
        let sign = if self.negative { "-" } else { "" };
        format!("{sign}{integer}.{fraction}").parse().ok()
    }

    /// Exact value with the fraction digits as written, `None` past 28 digits
    pub fn to_decimal(&self) -> Option<Decimal> {
        let integer = if self.integer.is_empty() { "0" } else { &self.integer };
        let sign = if self.negative { "-" } else { "" };
        if self.fraction.is_empty() {
            Decimal::from_str_exact(&format!("{sign}{integer}")).ok()
        } else {
            Decimal::from_str_exact(&format!("{sign}{integer}.{}", self.fraction)).ok()
        }
    }
}

/// Per-context formatter for one compiled pattern and locale
#[derive(Debug)]
pub struct NumberFormatter {
    pattern: Arc<NumberPattern>,
    decimal: char,
    grouping: char,
    buffer: String,
}

impl NumberFormatter {
    pub fn new(pattern: Arc<NumberPattern>, locale: &Locale) -> Self {
        Self {
            pattern,
            decimal: locale.decimal_separator(),
            grouping: locale.grouping_separator(),
            buffer: String::new(),
        }
    }

    /// Format an integer
    pub fn format_integer(&mut self, value: i64) -> String {
        let digits = value.unsigned_abs().to_string();
        let fraction = "0".repeat(self.pattern.min_fraction);
        self.assemble(value < 0, &digits, &fraction)
    }

    /// Format a float, `None` for NaN and infinities
    pub fn format_decimal(&mut self, value: f64) -> Option<String> {
        if !value.is_finite() {
            return None;
        }
        let rounded = format!("{:.*}", self.pattern.max_fraction, value.abs());
        let (integer, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));

        let mut fraction = fraction.to_string();
        while fraction.len() > self.pattern.min_fraction && fraction.ends_with('0') {
            fraction.pop();
        }

        let nonzero = integer.chars().chain(fraction.chars()).any(|c| c != '0');
        Some(self.assemble(value < 0.0 && nonzero, integer, &fraction))
    }

    /// Format an exact decimal, rounding ties to even at the last kept digit
    pub fn format_exact(&mut self, value: &Decimal) -> String {
        let places = u32::try_from(self.pattern.max_fraction).unwrap_or(u32::MAX);
        let rounded = value
            .round_dp_with_strategy(places, RoundingStrategy::MidpointNearestEven)
            .abs()
            .to_string();
        let (integer, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));

        let mut fraction = fraction.to_string();
        while fraction.len() > self.pattern.min_fraction && fraction.ends_with('0') {
            fraction.pop();
        }
        while fraction.len() < self.pattern.min_fraction {
            fraction.push('0');
        }

        let nonzero = integer.chars().chain(fraction.chars()).any(|c| c != '0');
        self.assemble(value.is_sign_negative() && nonzero, integer, &fraction)
    }

    fn assemble(&mut self, negative: bool, integer: &str, fraction: &str) -> String {
        let pattern = &self.pattern;
        let trimmed = integer.trim_start_matches('0');
        let mut digits = String::with_capacity(pattern.min_integer.max(trimmed.len()));
        for _ in trimmed.len()..pattern.min_integer {
            digits.push('0');
        }
        digits.push_str(trimmed);
        if digits.is_empty() && fraction.is_empty() {
            digits.push('0');
        }

        self.buffer.clear();
        if negative {
            self.buffer.push('-');
        }
        self.buffer.push_str(&pattern.prefix);
        let len = digits.len();
        for (i, c) in digits.chars().enumerate() {
            if pattern.grouping > 0 && i > 0 && (len - i) % pattern.grouping == 0 {
                self.buffer.push(self.grouping);
            }
            self.buffer.push(c);
        }
        if !fraction.is_empty() || pattern.decimal_always {
            self.buffer.push(self.decimal);
            self.buffer.push_str(fraction);
        }
        self.buffer.push_str(&pattern.suffix);
        self.buffer.clone()
    }

    /// Read a number; the whole text must match the pattern
    pub fn parse(&self, text: &str) -> Option<ParsedNumber> {
        let (negative, rest) = match text.strip_prefix('-') {
            Some(rest) if !self.pattern.prefix.starts_with('-') => (true, rest),
            _ => (false, text),
        };
        let rest = rest.strip_prefix(self.pattern.prefix.as_str())?;
        let rest = rest.strip_suffix(self.pattern.suffix.as_str())?;

        let mut integer = String::new();
        let mut fraction = String::new();
        let mut in_fraction = false;
        for c in rest.chars() {
            if c.is_ascii_digit() {
                if in_fraction {
                    fraction.push(c);
                } else {
                    integer.push(c);
                }
            } else if c == self.decimal && !in_fraction {
                in_fraction = true;
            } else if c == self.grouping && !in_fraction && self.pattern.grouping > 0 && !integer.is_empty() {
                continue;
            } else {
                return None;
            }
        }

        if integer.is_empty() && fraction.is_empty() {
            return None;
        }
        Some(ParsedNumber {
            negative,
            integer,
            fraction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatter(pattern: &str) -> NumberFormatter {
        NumberFormatter::new(Arc::new(NumberPattern::compile(pattern).unwrap()), &Locale::root())
    }

    #[test]
    fn test_compile_valid_patterns() {
        let p = NumberPattern::compile("#,##0.00").unwrap();
        assert_eq!(p.min_integer, 1);
        assert_eq!(p.grouping, 3);
        assert_eq!(p.min_fraction, 2);
        assert_eq!(p.max_fraction, 2);

        let p = NumberPattern::compile("'#'000 units").unwrap();
        assert_eq!(p.prefix, "#");
        assert_eq!(p.suffix, " units");
        assert_eq!(p.min_integer, 3);
    }

    #[test]
    fn test_compile_invalid_patterns() {
        for bad in ["", "abc", "#;(#)", "0.0E0", "#%", "0#", "#.#0", "0.0.0", "#,", "'0"] {
            assert!(
                NumberPattern::compile(bad).is_err(),
                "pattern {bad:?} should be rejected"
            );
        }
        let err = NumberPattern::compile("#;(#)").unwrap_err();
        assert!(err.to_string().starts_with("Invalid decimal format '#;(#)'"));
    }

    #[test]
    fn test_format_grouping_and_fraction() {
        let mut f = formatter("#,##0.00");
        assert_eq!(f.format_integer(1234567), "1,234,567.00");
        assert_eq!(f.format_decimal(1234.5).unwrap(), "1,234.50");
        assert_eq!(f.format_decimal(-0.126).unwrap(), "-0.13");
        assert_eq!(f.format_integer(0), "0.00");
    }

    #[test]
    fn test_format_optional_digits() {
        let mut f = formatter("#.##");
        assert_eq!(f.format_decimal(0.5).unwrap(), ".5");
        assert_eq!(f.format_decimal(2.0).unwrap(), "2");
        assert_eq!(f.format_decimal(0.0).unwrap(), "0");
        assert!(f.format_decimal(f64::NAN).is_none());
    }

    #[test]
    fn test_format_zero_padding_and_affixes() {
        let mut f = formatter("'$'000");
        assert_eq!(f.format_integer(7), "$007");
        assert_eq!(f.format_integer(-7), "-$007");
    }

    #[test]
    fn test_parse_requires_full_match() {
        let f = formatter("#,##0.00");
        let n = f.parse("1,234.50").unwrap();
        assert_eq!(n.to_f64(), Some(1234.5));
        assert!(f.parse("1,234.50x").is_none());
        assert!(f.parse("abc").is_none());
        assert!(f.parse("").is_none());

        let n = f.parse("-12").unwrap();
        assert_eq!(n.to_i64(), Some(-12));
    }

    #[test]
    fn test_parse_with_affixes() {
        let f = formatter("'$'0.00");
        assert_eq!(f.parse("$3.25").unwrap().to_f64(), Some(3.25));
        assert!(f.parse("3.25").is_none());
    }

    #[test]
    fn test_parsed_integer_rejects_fraction() {
        let f = formatter("0.##");
        assert_eq!(f.parse("10.00").unwrap().to_i64(), Some(10));
        assert_eq!(f.parse("10.5").unwrap().to_i64(), None);
    }

    #[test]
    fn test_exact_rounding_ties_to_even() {
        let mut f = formatter("#,##0.00");
        assert_eq!(f.format_exact(&Decimal::new(12345, 3)), "12.34");
        assert_eq!(f.format_exact(&Decimal::new(12355, 3)), "12.36");
        assert_eq!(f.format_exact(&Decimal::new(5, 0)), "5.00");
        assert_eq!(f.format_exact(&Decimal::new(-1, 3)), "0.00");
        assert_eq!(f.format_exact(&"1234567890123456.785".parse().unwrap()), "1,234,567,890,123,456.78");
    }

    #[test]
    fn test_parsed_decimal_keeps_scale() {
        let f = formatter("#,##0.00");
        let n = f.parse("-1,234.50").unwrap();
        assert_eq!(n.to_decimal().unwrap().to_string(), "-1234.50");
        assert_eq!(f.parse("7").unwrap().to_decimal(), Some(Decimal::from(7)));
    }

    #[test]
    fn test_locale_symbols() {
        let pattern = Arc::new(NumberPattern::compile("#,##0.00").unwrap());
        let mut f = NumberFormatter::new(pattern, &Locale::parse("de-DE").unwrap());
        assert_eq!(f.format_decimal(1234.5).unwrap(), "1.234,50");
        assert_eq!(f.parse("1.234,50").unwrap().to_f64(), Some(1234.5));
    }
}
