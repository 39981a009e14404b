//! Width measurement in characters or encoded bytes

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use flatbind_schema::{FieldDefinition, Justify, LengthUnit};
use std::borrow::Cow;

/// Encode `text`, returning the bytes and whether a character was unmappable
///
/// Unlike [`Encoding::encode`], UTF-16 is encoded as UTF-16.
pub fn encode<'a>(text: &'a str, encoding: &'static Encoding) -> (Cow<'a, [u8]>, bool) {
    if encoding == UTF_8 {
        return (Cow::Borrowed(text.as_bytes()), false);
    }
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let little = encoding == UTF_16LE;
        let bytes = text
            .encode_utf16()
            .flat_map(|unit| if little { unit.to_le_bytes() } else { unit.to_be_bytes() })
            .collect();
        return (Cow::Owned(bytes), false);
    }
    let (bytes, _, unmappable) = encoding.encode(text);
    (bytes, unmappable)
}

/// Decode bytes sliced from an encoded record; `None` if they split a character
pub fn decode<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

/// Width of `text` in `unit`
pub fn measure(text: &str, unit: LengthUnit, encoding: &'static Encoding) -> usize {
    match unit {
        LengthUnit::Characters => text.chars().count(),
        LengthUnit::Bytes => encode(text, encoding).0.len(),
    }
}

fn char_width(c: char, unit: LengthUnit, encoding: &'static Encoding) -> usize {
    let mut buf = [0u8; 4];
    measure(c.encode_utf8(&mut buf), unit, encoding)
}

/// Longest prefix of `text` no wider than `width`
pub fn truncate<'a>(text: &'a str, width: usize, unit: LengthUnit, encoding: &'static Encoding) -> &'a str {
    let mut used = 0;
    for (index, c) in text.char_indices() {
        used += char_width(c, unit, encoding);
        if used > width {
            return &text[..index];
        }
    }
    text
}

/// Fit formatted text to a field's width
///
/// Overflowing text is cut when the field truncates, otherwise the
/// overflow is reported as a message.
pub fn fit(text: &str, field: &FieldDefinition, encoding: &'static Encoding) -> Result<String, String> {
    let Some(width) = field.length else {
        return Ok(text.to_string());
    };
    let unit = field.length_unit();
    let mut content = text;
    let mut size = measure(content, unit, encoding);
    if size > width {
        if !field.truncate {
            return Err(format!("Value exceeds maximum field length of {width} {unit}"));
        }
        content = truncate(content, width, unit, encoding);
        size = measure(content, unit, encoding);
    }
    let padding = width.saturating_sub(size) / char_width(field.padding, unit, encoding).max(1);
    let pad: String = std::iter::repeat_n(field.padding, padding).collect();
    Ok(match field.justify {
        Justify::Left => format!("{content}{pad}"),
        Justify::Right => format!("{pad}{content}"),
    })
}
