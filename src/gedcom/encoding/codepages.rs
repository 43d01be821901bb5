//! Single-byte codepage tables: windows-1252 and MacRoman
//!
//! Decode maps the high half through a fixed table; encode inverts it
//! through a lazily built reverse map. ASCII passes through unchanged.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::gedcom::encoding::{REPLACEMENT, SUBSTITUTE};

/// windows-1252, bytes 0x80..=0x9F. The rest of the high half is
/// identical to Latin-1. Unassigned positions decode to U+FFFD.
const WINDOWS1252_80_9F: [char; 32] = [
    '€', '\u{FFFD}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{FFFD}', 'Ž',
    '\u{FFFD}', '\u{FFFD}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ',
    '\u{FFFD}', 'ž', 'Ÿ',
];

/// MacRoman, bytes 0x80..=0xFF. 0xF0 is the Apple logo (private use).
const MACROMAN_80_FF: [char; 128] = [
    'Ä', 'Å', 'Ç', 'É', 'Ñ', 'Ö', 'Ü', 'á', 'à', 'â', 'ä', 'ã', 'å', 'ç', 'é', 'è', //
    'ê', 'ë', 'í', 'ì', 'î', 'ï', 'ñ', 'ó', 'ò', 'ô', 'ö', 'õ', 'ú', 'ù', 'û', 'ü', //
    '†', '°', '¢', '£', '§', '•', '¶', 'ß', '®', '©', '™', '´', '¨', '≠', 'Æ', 'Ø', //
    '∞', '±', '≤', '≥', '¥', 'µ', '∂', '∑', '∏', 'π', '∫', 'ª', 'º', 'Ω', 'æ', 'ø', //
    '¿', '¡', '¬', '√', 'ƒ', '≈', '∆', '«', '»', '…', '\u{A0}', 'À', 'Ã', 'Õ', 'Œ', 'œ', //
    '–', '—', '“', '”', '‘', '’', '÷', '◊', 'ÿ', 'Ÿ', '⁄', '€', '‹', '›', 'ﬁ', 'ﬂ', //
    '‡', '·', '‚', '„', '‰', 'Â', 'Ê', 'Á', 'Ë', 'È', 'Í', 'Î', 'Ï', 'Ì', 'Ó', 'Ô', //
    '\u{F8FF}', 'Ò', 'Ú', 'Û', 'Ù', 'ı', 'ˆ', '˜', '¯', '˘', '˙', '˚', '¸', '˝', '˛', 'ˇ', //
];

static WINDOWS1252_REVERSE: Lazy<HashMap<char, u8>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (offset, &c) in WINDOWS1252_80_9F.iter().enumerate() {
        if c != REPLACEMENT {
            map.insert(c, 0x80 + offset as u8);
        }
    }
    map
});

static MACROMAN_REVERSE: Lazy<HashMap<char, u8>> = Lazy::new(|| {
    let mut map = HashMap::new();
    for (offset, &c) in MACROMAN_80_FF.iter().enumerate() {
        map.insert(c, 0x80 + offset as u8);
    }
    map
});

pub fn decode_windows1252(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x00..=0x7F => b as char,
            0x80..=0x9F => WINDOWS1252_80_9F[(b - 0x80) as usize],
            _ => char::from_u32(b as u32).unwrap_or(REPLACEMENT),
        })
        .collect()
}

pub fn encode_windows1252(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            if c.is_ascii() {
                c as u8
            } else if let Some(&b) = WINDOWS1252_REVERSE.get(&c) {
                b
            } else if (0xA0..=0xFF).contains(&(c as u32)) {
                c as u8
            } else {
                SUBSTITUTE
            }
        })
        .collect()
}

pub fn decode_macroman(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            0x00..=0x7F => b as char,
            _ => MACROMAN_80_FF[(b - 0x80) as usize],
        })
        .collect()
}

pub fn encode_macroman(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            if c.is_ascii() {
                c as u8
            } else {
                MACROMAN_REVERSE.get(&c).copied().unwrap_or(SUBSTITUTE)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows1252_roundtrip() {
        let text = "déjà vu — “quoted” €100";
        let encoded = encode_windows1252(text);
        assert_eq!(decode_windows1252(&encoded), text);
    }

    #[test]
    fn test_windows1252_latin1_range() {
        assert_eq!(decode_windows1252(&[0xE9]), "é");
        assert_eq!(encode_windows1252("é"), vec![0xE9]);
    }

    #[test]
    fn test_windows1252_unassigned_byte() {
        assert_eq!(decode_windows1252(&[0x81]), "\u{FFFD}");
    }

    #[test]
    fn test_macroman_roundtrip() {
        let text = "Père Noël — π ≈ 3.14";
        let encoded = encode_macroman(text);
        assert_eq!(decode_macroman(&encoded), text);
    }

    #[test]
    fn test_unmappable_becomes_substitute() {
        assert_eq!(encode_macroman("Ω人"), vec![0xBD, SUBSTITUTE]);
    }
}
