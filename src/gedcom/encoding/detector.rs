//! Declared-charset sniffing
//!
//! The charset of a GEDCOM file is declared inside the file itself, on a
//! level-1 `CHAR` (or `CHARACTER`) line under the header — declared in
//! whatever encoding the file happens to use, and frequently mislabeled
//! by the producing program. Detection scans the first lines of the raw
//! bytes (NUL bytes dropped so UTF-16 content is scannable), collects the
//! producer (`SOUR`), the declared charset and its `VERS`, then runs the
//! declared name through a table of vendor corrections.

use tracing::debug;

use crate::gedcom::encoding::{Charset, EncodingError};

/// How many leading lines are inspected for the declaration.
const SNIFF_LINES: usize = 100;

/// How many leading bytes are inspected at most.
const SNIFF_BYTES: usize = 8 * 1024;

/// What the sniffing pass found in the header.
#[derive(Debug, Default, PartialEq)]
struct Declaration {
    source: Option<String>,
    charset: Option<String>,
    charset_version: Option<String>,
}

/// Detect the charset of a raw GEDCOM byte stream.
///
/// An undeclared charset falls back to ANSEL; a declared but unknown
/// name is an error.
pub fn detect(bytes: &[u8]) -> Result<Charset, EncodingError> {
    let declaration = sniff(bytes);
    let Some(declared) = declaration.charset.as_deref() else {
        return Ok(Charset::Ansel);
    };
    let corrected = correct(
        declared,
        declaration.source.as_deref(),
        Some(bytes),
    )?;
    if corrected.label() != declared {
        debug!(
            declared,
            version = declaration.charset_version.as_deref().unwrap_or(""),
            corrected = corrected.label(),
            "corrected declared charset"
        );
    }
    Ok(corrected)
}

/// Map a declared charset name (plus the producing program) to a
/// concrete charset, applying vendor corrections. `probe` supplies raw
/// bytes for the UTF-16 byte-order probe; without it `UNICODE` resolves
/// to UTF-16LE.
pub fn correct(
    declared: &str,
    source: Option<&str>,
    probe: Option<&[u8]>,
) -> Result<Charset, EncodingError> {
    let name = declared.trim().to_uppercase();
    let charset = match name.as_str() {
        "ANSEL" => Charset::Ansel,
        // Family Tree Maker writes windows-1252 bytes under an ASCII label
        "ASCII" => match source {
            Some("FTW") => Charset::Windows1252,
            _ => Charset::Ascii,
        },
        "ANSI" | "IBM WINDOWS" | "IBM_WINDOWS" | "WINDOWS" | "WINDOWS-1252" | "CP1252" => {
            Charset::Windows1252
        }
        "MACINTOSH" | "MACROMAN" | "X-MACROMAN" => Charset::MacRoman,
        "UTF-8" | "UTF8" => Charset::Utf8,
        "UNICODE" | "UTF-16" | "UTF16" => match probe {
            Some(bytes) => probe_utf16(bytes).unwrap_or(Charset::Utf8),
            None => Charset::Utf16Le,
        },
        _ => return Err(EncodingError::Unsupported(declared.to_owned())),
    };
    Ok(charset)
}

/// Byte-order probe for files declared `UNICODE`: a BOM decides, else
/// the NUL-byte side of the leading level digit; `None` when the stream
/// does not look like UTF-16 at all.
fn probe_utf16(bytes: &[u8]) -> Option<Charset> {
    match bytes {
        [0xFE, 0xFF, ..] => Some(Charset::Utf16Be),
        [0xFF, 0xFE, ..] => Some(Charset::Utf16Le),
        [first, 0x00, ..] if *first != 0x00 => Some(Charset::Utf16Le),
        [0x00, second, ..] if *second != 0x00 => Some(Charset::Utf16Be),
        _ => None,
    }
}

/// Collect SOUR / CHAR / VERS from the first lines. NUL bytes are
/// dropped so a UTF-16 header is scannable, and non-digit junk before
/// each line's level is ignored.
fn sniff(bytes: &[u8]) -> Declaration {
    let window = &bytes[..bytes.len().min(SNIFF_BYTES)];
    let ascii: String = window
        .iter()
        .filter(|&&b| b != 0x00)
        .map(|&b| if b < 0x80 { b as char } else { ' ' })
        .collect();

    let mut declaration = Declaration::default();
    let mut after_charset_line = false;
    for line in ascii.split(['\r', '\n']).filter(|l| !l.is_empty()).take(SNIFF_LINES) {
        let line = line.trim_start_matches(|c: char| !c.is_ascii_digit());
        if let Some(rest) = line.strip_prefix("2 VERS ") {
            if after_charset_line {
                declaration.charset_version = Some(rest.trim().to_owned());
            }
            continue;
        }
        if line.starts_with('1') || line.starts_with('0') {
            after_charset_line = false;
        }
        if let Some(rest) = line.strip_prefix("1 SOUR ") {
            declaration.source = Some(rest.trim().to_owned());
        } else if let Some(rest) = line
            .strip_prefix("1 CHAR ")
            .or_else(|| line.strip_prefix("1 CHARACTER "))
        {
            declaration.charset = Some(rest.trim().to_owned());
            after_charset_line = true;
        }
    }
    declaration
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undeclared_falls_back_to_ansel() {
        let bytes = b"0 HEAD\r\n1 GEDC\r\n0 TRLR\r\n";
        assert_eq!(detect(bytes).unwrap(), Charset::Ansel);
    }

    #[test]
    fn test_declared_ansel() {
        let bytes = b"0 HEAD\r\n1 CHAR ANSEL\r\n0 TRLR\r\n";
        assert_eq!(detect(bytes).unwrap(), Charset::Ansel);
    }

    #[test]
    fn test_declared_utf8() {
        let bytes = b"0 HEAD\r\n1 CHAR UTF-8\r\n0 TRLR\r\n";
        assert_eq!(detect(bytes).unwrap(), Charset::Utf8);
    }

    #[test]
    fn test_ansi_means_windows1252() {
        let bytes = b"0 HEAD\r\n1 CHAR ANSI\r\n";
        assert_eq!(detect(bytes).unwrap(), Charset::Windows1252);
    }

    #[test]
    fn test_ftw_ascii_means_windows1252() {
        let bytes = b"0 HEAD\r\n1 SOUR FTW\r\n1 CHAR ASCII\r\n";
        assert_eq!(detect(bytes).unwrap(), Charset::Windows1252);
    }

    #[test]
    fn test_plain_ascii_stays_ascii() {
        let bytes = b"0 HEAD\r\n1 SOUR GRAMPS\r\n1 CHAR ASCII\r\n";
        assert_eq!(detect(bytes).unwrap(), Charset::Ascii);
    }

    #[test]
    fn test_macintosh_maps_to_macroman() {
        let bytes = b"0 HEAD\r1 CHAR MACINTOSH\r";
        assert_eq!(detect(bytes).unwrap(), Charset::MacRoman);
    }

    #[test]
    fn test_unicode_with_le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for b in b"0 HEAD\r\n1 CHAR UNICODE\r\n" {
            bytes.push(*b);
            bytes.push(0x00);
        }
        assert_eq!(detect(&bytes).unwrap(), Charset::Utf16Le);
    }

    #[test]
    fn test_unicode_without_bom_probes_nul_pattern() {
        let mut bytes = Vec::new();
        for b in b"0 HEAD\r\n1 CHAR UNICODE\r\n" {
            bytes.push(0x00);
            bytes.push(*b);
        }
        assert_eq!(detect(&bytes).unwrap(), Charset::Utf16Be);
    }

    #[test]
    fn test_unicode_failing_probe_means_utf8() {
        let bytes = b"0 HEAD\r\n1 CHAR UNICODE\r\n";
        assert_eq!(detect(bytes).unwrap(), Charset::Utf8);
    }

    #[test]
    fn test_unknown_declared_charset_is_error() {
        let bytes = b"0 HEAD\r\n1 CHAR EBCDIC\r\n";
        assert!(matches!(
            detect(bytes),
            Err(EncodingError::Unsupported(name)) if name == "EBCDIC"
        ));
    }

    #[test]
    fn test_character_long_form() {
        let bytes = b"0 HEAD\r\n1 CHARACTER ANSI\r\n";
        assert_eq!(detect(bytes).unwrap(), Charset::Windows1252);
    }

    #[test]
    fn test_vers_is_associated_with_charset() {
        let bytes = b"0 HEAD\r\n1 SOUR FTW\r\n2 VERS 5\r\n1 CHAR ANSEL\r\n2 VERS 2.1\r\n";
        let declaration = sniff(bytes);
        assert_eq!(declaration.charset_version.as_deref(), Some("2.1"));
        assert_eq!(declaration.source.as_deref(), Some("FTW"));
    }
}
