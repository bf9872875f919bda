//! ASCII payload scanner.
//!
//! Some sensor firmware revisions push human-readable text such as
//! `"220V WARNING"`.  The scanner finds the leftmost `\d+(\.\d+)?(V|KV)`
//! token anywhere in the payload and maps it through a fixed table.
//! Only the first token counts; if it is not in the table the payload
//! is not text-encoded.

use super::VoltageLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Volt,
    Kilovolt,
}

/// A `number + unit` token as it appeared in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub number: &'a str,
    pub unit: Unit,
}

/// Literal spellings.  `22.9` and `229` are both the 22.9 kV class.
const TABLE: &[(&str, Unit, VoltageLevel)] = &[
    ("220", Unit::Volt, VoltageLevel::V220),
    ("380", Unit::Volt, VoltageLevel::V380),
    ("22.9", Unit::Kilovolt, VoltageLevel::Kv22_9),
    ("229", Unit::Kilovolt, VoltageLevel::Kv22_9),
    ("154", Unit::Kilovolt, VoltageLevel::Kv154),
    ("345", Unit::Kilovolt, VoltageLevel::Kv345),
    ("500", Unit::Kilovolt, VoltageLevel::Kv500),
    ("765", Unit::Kilovolt, VoltageLevel::Kv765),
];

/// Map the first token of `bytes` to a level.
pub fn decode_text(bytes: &[u8]) -> Option<VoltageLevel> {
    let token = first_token(bytes)?;
    TABLE
        .iter()
        .find(|(number, unit, _)| *number == token.number && *unit == token.unit)
        .map(|&(_, _, level)| level)
}

/// Leftmost token in `bytes`, if any.
pub fn first_token(bytes: &[u8]) -> Option<Token<'_>> {
    (0..bytes.len()).find_map(|start| token_at(bytes, start))
}

fn token_at(bytes: &[u8], start: usize) -> Option<Token<'_>> {
    let digits = |from: usize| {
        bytes
            .get(from..)
            .map_or(0, |rest| rest.iter().take_while(|b| b.is_ascii_digit()).count())
    };

    let int_len = digits(start);
    if int_len == 0 {
        return None;
    }
    let mut end = start + int_len;

    // Fraction is only taken when at least one digit follows the dot.
    if bytes.get(end) == Some(&b'.') {
        let frac_len = digits(end + 1);
        if frac_len > 0 {
            end += 1 + frac_len;
        }
    }

    let unit = match &bytes[end..] {
        [b'V', ..] => Unit::Volt,
        [b'K', b'V', ..] => Unit::Kilovolt,
        _ => return None,
    };

    let number = core::str::from_utf8(&bytes[start..end]).ok()?;
    Some(Token { number, unit })
}
