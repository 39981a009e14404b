//! Locales, reduced to the number symbols handlers need

use crate::{ConfigError, ConfigResult};
use std::fmt;

/// A language tag and its decimal and grouping symbols
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale {
    tag: String,
    decimal_separator: char,
    grouping_separator: char,
}

impl Locale {
    /// Locale-neutral symbols: `.` decimal, `,` grouping
    pub fn root() -> Self {
        Self {
            tag: String::new(),
            decimal_separator: '.',
            grouping_separator: ',',
        }
    }

    /// Parse a tag such as `en`, `de-DE` or `fr_CA`
    ///
    /// Unrecognised languages fall back to the root symbols; only a
    /// malformed tag is an error.
    pub fn parse(tag: &str) -> ConfigResult<Self> {
        let mut parts = tag.split(['-', '_']);
        let language = parts.next().unwrap_or_default();
        if !(2..=3).contains(&language.len()) || !language.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidLocale(tag.to_string()));
        }
        let region = parts.next();
        if let Some(region) = region {
            if region.is_empty() || !region.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::InvalidLocale(tag.to_string()));
            }
        }
        if parts.next().is_some() {
            return Err(ConfigError::InvalidLocale(tag.to_string()));
        }

        let language = language.to_ascii_lowercase();
        let region = region.map(str::to_ascii_uppercase);
        let (decimal_separator, grouping_separator) = symbols(&language, region.as_deref());

        let tag = match region {
            Some(region) => format!("{language}-{region}"),
            None => language,
        };
        Ok(Self {
            tag,
            decimal_separator,
            grouping_separator,
        })
    }

    /// Normalised tag, empty for the root locale
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Decimal separator symbol
    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    /// Grouping separator symbol
    pub fn grouping_separator(&self) -> char {
        self.grouping_separator
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

fn symbols(language: &str, region: Option<&str>) -> (char, char) {
    match (language, region) {
        ("de", Some("CH" | "LI")) | ("it", Some("CH")) => ('.', '\''),
        ("de" | "es" | "it" | "nl" | "pt" | "da" | "id" | "tr" | "el" | "ro" | "hr" | "sl", _) => {
            (',', '.')
        }
        ("fr" | "ru" | "pl" | "cs" | "sk" | "sv" | "fi" | "nb" | "no" | "uk" | "hu" | "bg", _) => {
            (',', '\u{a0}')
        }
        _ => ('.', ','),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_locales() {
        let de = Locale::parse("de-DE").unwrap();
        assert_eq!(de.tag(), "de-DE");
        assert_eq!(de.decimal_separator(), ',');
        assert_eq!(de.grouping_separator(), '.');

        let fr = Locale::parse("fr_ca").unwrap();
        assert_eq!(fr.tag(), "fr-CA");
        assert_eq!(fr.grouping_separator(), '\u{a0}');

        let ch = Locale::parse("de-CH").unwrap();
        assert_eq!(ch.decimal_separator(), '.');
        assert_eq!(ch.grouping_separator(), '\'');
    }

    #[test]
    fn test_unknown_language_uses_root_symbols() {
        let xx = Locale::parse("xx").unwrap();
        assert_eq!(xx.decimal_separator(), '.');
        assert_eq!(xx.grouping_separator(), ',');
    }

    #[test]
    fn test_malformed_tags() {
        assert!(Locale::parse("").is_err());
        assert!(Locale::parse("english").is_err());
        assert!(Locale::parse("en-").is_err());
        assert!(Locale::parse("en-US-x-y").is_err());
    }
}
