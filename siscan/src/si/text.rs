//! DVB text decoding (EN 300 468 Annex A).
//!
//! The first byte of a string may select a character table. Without a
//! selector the default Latin table (an ISO/IEC 6937 variant) applies.

use encoding_rs::Encoding;
use log::debug;

/// Decode a DVB string to UTF-8. Undecodable bytes become U+FFFD.
pub fn decode(bytes: &[u8]) -> String {
    let Some(&first) = bytes.first() else {
        return String::new();
    };

    match first {
        0x20..=0xff => decode_latin(bytes),
        0x01..=0x0b => match iso8859(u16::from(first) + 4) {
            Some(encoding) => decode_single_byte(encoding, &bytes[1..]),
            None => decode_latin(&bytes[1..]),
        },
        0x10 => {
            if bytes.len() < 3 {
                return String::new();
            }
            let table = u16::from_be_bytes([bytes[1], bytes[2]]);
            match iso8859(table) {
                Some(encoding) => decode_single_byte(encoding, &bytes[3..]),
                None => decode_latin(&bytes[3..]),
            }
        }
        0x11 => decode_unicode(encoding_rs::UTF_16BE, &bytes[1..]),
        0x13 => decode_unicode(encoding_rs::GBK, &bytes[1..]),
        0x14 => decode_unicode(encoding_rs::BIG5, &bytes[1..]),
        0x15 => decode_unicode(encoding_rs::UTF_8, &bytes[1..]),
        // compressed payload, returned undecoded
        0x1f => {
            debug!(
                "Text: compressed string (encoding id 0x{:02x}) not decoded",
                bytes.get(1).copied().unwrap_or(0)
            );
            String::from_utf8_lossy(bytes.get(2..).unwrap_or_default()).into_owned()
        }
        _ => decode_latin(&bytes[1..]),
    }
}

fn iso8859(part: u16) -> Option<&'static Encoding> {
    let encoding = match part {
        1 => encoding_rs::WINDOWS_1252,
        2 => encoding_rs::ISO_8859_2,
        3 => encoding_rs::ISO_8859_3,
        4 => encoding_rs::ISO_8859_4,
        5 => encoding_rs::ISO_8859_5,
        6 => encoding_rs::ISO_8859_6,
        7 => encoding_rs::ISO_8859_7,
        8 => encoding_rs::ISO_8859_8,
        9 => encoding_rs::WINDOWS_1254,
        10 => encoding_rs::ISO_8859_10,
        11 => encoding_rs::WINDOWS_874,
        13 => encoding_rs::ISO_8859_13,
        14 => encoding_rs::ISO_8859_14,
        15 => encoding_rs::ISO_8859_15,
        16 => encoding_rs::ISO_8859_16,
        _ => return None,
    };
    Some(encoding)
}

/// Single-byte tables share the 0x80-0x9F control range.
fn decode_single_byte(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let filtered: Vec<u8> = bytes
        .iter()
        .filter_map(|&b| match b {
            0x8a => Some(b'\n'),
            0x80..=0x9f => None,
            _ => Some(b),
        })
        .collect();
    let (text, _) = encoding.decode_without_bom_handling(&filtered);
    text.into_owned()
}

/// Multi-byte tables carry control codes at U+E080-U+E09F.
fn decode_unicode(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let (text, _) = encoding.decode_without_bom_handling(bytes);
    text.chars()
        .filter_map(|c| match c {
            '\u{e08a}' => Some('\n'),
            '\u{e080}'..='\u{e09f}' => None,
            _ => Some(c),
        })
        .collect()
}

fn decode_latin(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut pending_mark: Option<char> = None;

    for &b in bytes {
        if let Some(mark) = combining_mark(b) {
            pending_mark = Some(mark);
            continue;
        }
        let c = match b {
            0x00..=0x7f => Some(b as char),
            0x8a => Some('\n'),
            0x80..=0x9f => None,
            _ => latin_high(b),
        };
        if let Some(c) = c {
            out.push(c);
            if let Some(mark) = pending_mark.take() {
                out.push(mark);
            }
        }
    }
    out
}

/// Non-spacing diacritics precede the letter they modify.
fn combining_mark(b: u8) -> Option<char> {
    let mark = match b {
        0xc1 => '\u{0300}',
        0xc2 => '\u{0301}',
        0xc3 => '\u{0302}',
        0xc4 => '\u{0303}',
        0xc5 => '\u{0304}',
        0xc6 => '\u{0306}',
        0xc7 => '\u{0307}',
        0xc8 => '\u{0308}',
        0xca => '\u{030a}',
        0xcb => '\u{0327}',
        0xcd => '\u{030b}',
        0xce => '\u{0328}',
        0xcf => '\u{030c}',
        _ => return None,
    };
    Some(mark)
}

fn latin_high(b: u8) -> Option<char> {
    const TABLE: [char; 96] = [
        // 0xA0
        '\u{a0}', '¡', '¢', '£', '$', '¥', '#', '§', '¤', '‘', '“', '«', '←', '↑', '→', '↓',
        // 0xB0
        '°', '±', '²', '³', '×', 'µ', '¶', '·', '÷', '’', '”', '»', '¼', '½', '¾', '¿',
        // 0xC0 (diacritics handled separately)
        '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0', '\0',
        // 0xD0
        '―', '¹', '®', '©', '™', '♪', '¬', '¦', '\0', '\0', '\0', '\0', '⅛', '⅜', '⅝', '⅞',
        // 0xE0
        'Ω', 'Æ', 'Đ', 'ª', 'Ħ', '\0', 'Ĳ', 'Ŀ', 'Ł', 'Ø', 'Œ', 'º', 'Þ', 'Ŧ', 'Ŋ', 'ŉ',
        // 0xF0
        'ĸ', 'æ', 'đ', 'ð', 'ħ', 'ı', 'ĳ', 'ŀ', 'ł', 'ø', 'œ', 'ß', 'þ', 'ŧ', 'ŋ', '\u{ad}',
    ];
    let c = TABLE[usize::from(b) - 0xa0];
    (c != '\0').then_some(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_ascii() {
        assert_eq!(decode(b"BBC ONE Lon"), "BBC ONE Lon");
        assert_eq!(decode(b""), "");
    }

    #[test]
    fn test_default_table_controls_and_symbols() {
        assert_eq!(decode(&[b'A', 0x86, b'B', 0x87, 0x8a, b'C']), "AB\nC");
        assert_eq!(decode(&[b'5', 0xb0, b'C']), "5°C");
    }

    #[test]
    fn test_default_table_diacritic_follows_letter() {
        assert_eq!(decode(&[b'C', b'a', b'f', 0xc2, b'e']), "Cafe\u{0301}");
    }

    #[test]
    fn test_iso8859_selector() {
        // 0x05 selects ISO-8859-9
        assert_eq!(decode(&[0x05, b'T', 0xfc, b'r', b'k']), "Türk");
        // 0x10 0x00 0x02 selects ISO-8859-2
        assert_eq!(decode(&[0x10, 0x00, 0x02, 0xb1]), "ą");
        assert_eq!(decode(&[0x10, 0x00]), "");
    }

    #[test]
    fn test_unicode_selectors() {
        assert_eq!(decode(&[0x11, 0x00, b'H', 0x00, b'i']), "Hi");
        assert_eq!(decode(&[0x15, 0xc3, 0xa9, b't', 0xc3, 0xa9]), "été");
        assert_eq!(decode(&[0x15, 0xee, 0x82, 0x8a]), "\n");
    }

    #[test]
    fn test_compressed_string_is_kept_raw() {
        assert_eq!(decode(&[0x1f, 0x01, 0x55, 0xaa]), "U\u{fffd}");
        assert!(!decode(&[0x1f, 0x02, 0x8c, 0x21]).is_empty());
        assert_eq!(decode(&[0x1f]), "");
    }
}
