//! Character encodings of GEDCOM byte streams
//!
//! GEDCOM predates Unicode: files arrive in ANSEL, ASCII, windows-1252,
//! MacRoman, UTF-8 or UTF-16, declared (often wrongly) by the in-file
//! `CHAR` tag. This module owns the charset enum and the byte-level
//! decode/encode dispatch; sniffing lives in [`detector`], the ANSEL
//! codec in [`ansel`] and the single-byte codepage tables in
//! [`codepages`].

pub mod ansel;
pub mod codepages;
pub mod detector;

use std::fmt;

/// Replacement for undecodable input bytes.
pub(crate) const REPLACEMENT: char = '\u{FFFD}';

/// Replacement for unencodable output characters.
pub(crate) const SUBSTITUTE: u8 = b'?';

/// Errors surfaced while sniffing or transcoding a byte stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The file declares a charset this crate does not support.
    Unsupported(String),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::Unsupported(name) => {
                write!(f, "unsupported declared character set '{name}'")
            }
        }
    }
}

impl std::error::Error for EncodingError {}

/// A concrete character set of a GEDCOM byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Ansel,
    Ascii,
    Utf8,
    Utf16Be,
    Utf16Le,
    Windows1252,
    MacRoman,
}

impl Charset {
    /// End-of-line convention for this charset: classic MacRoman files
    /// use a bare CR, everything else CRLF.
    pub fn eol(&self) -> &'static str {
        match self {
            Charset::MacRoman => "\r",
            _ => "\r\n",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Charset::Ansel => "ANSEL",
            Charset::Ascii => "ASCII",
            Charset::Utf8 => "UTF-8",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Windows1252 => "windows-1252",
            Charset::MacRoman => "x-MacRoman",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decode a whole byte stream. Undecodable bytes become U+FFFD; a UTF-8
/// preamble (byte-order mark or vendor junk before the first level
/// digit) is skipped.
pub fn decode(bytes: &[u8], charset: Charset) -> String {
    match charset {
        Charset::Ansel => ansel::decode(bytes),
        Charset::Ascii => bytes
            .iter()
            .map(|&b| if b < 0x80 { b as char } else { REPLACEMENT })
            .collect(),
        Charset::Utf8 => String::from_utf8_lossy(skip_preamble(bytes)).into_owned(),
        Charset::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
        Charset::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
        Charset::Windows1252 => codepages::decode_windows1252(bytes),
        Charset::MacRoman => codepages::decode_macroman(bytes),
    }
}

/// Encode text into the charset's byte form. Unencodable characters
/// become `?`; UTF-16 output carries a byte-order mark.
pub fn encode(text: &str, charset: Charset) -> Vec<u8> {
    match charset {
        Charset::Ansel => ansel::encode(text),
        Charset::Ascii => text
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { SUBSTITUTE })
            .collect(),
        Charset::Utf8 => text.as_bytes().to_vec(),
        Charset::Utf16Be => encode_utf16(text, u16::to_be_bytes, [0xFE, 0xFF]),
        Charset::Utf16Le => encode_utf16(text, u16::to_le_bytes, [0xFF, 0xFE]),
        Charset::Windows1252 => codepages::encode_windows1252(text),
        Charset::MacRoman => codepages::encode_macroman(text),
    }
}

/// Skip a BOM or junk bytes before the first level digit. Only the first
/// few bytes are considered junk; a missing level digit is left for the
/// parser to report.
fn skip_preamble(bytes: &[u8]) -> &[u8] {
    let rest = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    for (index, &b) in rest.iter().take(8).enumerate() {
        if b.is_ascii_digit() {
            return &rest[index..];
        }
    }
    rest
}

fn decode_utf16(bytes: &[u8], read: fn([u8; 2]) -> u16) -> String {
    let bytes = bytes
        .strip_prefix(&[0xFE, 0xFF])
        .or_else(|| bytes.strip_prefix(&[0xFF, 0xFE]))
        .unwrap_or(bytes);
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| read([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn encode_utf16(text: &str, write: fn(u16) -> [u8; 2], bom: [u8; 2]) -> Vec<u8> {
    let mut out = bom.to_vec();
    for unit in text.encode_utf16() {
        out.extend_from_slice(&write(unit));
    }
    out
}
