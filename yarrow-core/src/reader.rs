//! Input layer: decodes raw bytes, rejects non-printable characters, and
//! hands the scanner a peekable character stream with position tracking.

use yarrow_common::{Marker, YamlError, YamlResult, YamlVersion};

/// Characters YAML allows in a stream. Everything else is reported with
/// its position before scanning starts.
fn is_printable(c: char) -> bool {
    matches!(c,
        '\x09' | '\x0a' | '\x0d'
        | '\x20'..='\x7e'
        | '\u{85}'
        | '\u{a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
}

/// A fully decoded character buffer terminated by a `'\0'` sentinel.
/// `peek` past the end keeps returning the sentinel, so the scanner never
/// bounds-checks.
#[derive(Debug)]
pub struct Reader {
    buffer: Vec<char>,
    pointer: usize,
    index: usize,
    line: u32,
    col: u32,
    breaks_1_1: bool,
}

impl Reader {
    /// Decodes `input`, detecting UTF-16 by its byte order mark and
    /// falling back to UTF-8.
    pub fn new(input: &[u8]) -> YamlResult<Reader> {
        let chars = decode(input)?;
        Reader::from_chars(chars)
    }

    pub fn from_str(input: &str) -> YamlResult<Reader> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        Reader::from_chars(input.chars().collect())
    }

    fn from_chars(mut buffer: Vec<char>) -> YamlResult<Reader> {
        for (position, c) in buffer.iter().enumerate() {
            if !is_printable(*c) {
                return Err(YamlError::NonPrintable {
                    code: *c as u32,
                    position,
                });
            }
        }
        buffer.push('\0');
        Ok(Reader {
            buffer,
            pointer: 0,
            index: 0,
            line: 0,
            col: 0,
            breaks_1_1: false,
        })
    }

    /// Switches break handling to the 1.1 dialect after a `%YAML 1.1`
    /// directive.
    pub fn set_version(&mut self, version: YamlVersion) {
        self.breaks_1_1 = version < (1, 2);
    }

    #[must_use]
    pub fn peek(&self) -> char {
        self.buffer[self.pointer]
    }

    #[must_use]
    pub fn peek_nth(&self, n: usize) -> char {
        match self.buffer.get(self.pointer + n) {
            Some(c) => *c,
            None => '\0',
        }
    }

    /// The next `n` characters without advancing, sentinel included when
    /// the stream runs out.
    #[must_use]
    pub fn prefix(&self, n: usize) -> String {
        let end = (self.pointer + n).min(self.buffer.len());
        self.buffer[self.pointer..end].iter().collect()
    }

    pub fn forward(&mut self, mut length: usize) {
        while length > 0 {
            if self.pointer + 1 >= self.buffer.len() {
                break;
            }
            let ch = self.buffer[self.pointer];
            self.pointer += 1;
            self.index += 1;
            let solo_break = ch == '\n'
                || (ch == '\r' && self.buffer[self.pointer] != '\n')
                || (self.breaks_1_1 && (ch == '\u{85}' || ch == '\u{2028}' || ch == '\u{2029}'));
            if solo_break {
                self.line += 1;
                self.col = 0;
            } else if ch != '\u{feff}' {
                self.col += 1;
            }
            length -= 1;
        }
    }

    #[must_use]
    pub fn get_mark(&self) -> Marker {
        Marker::new(self.index, self.line, self.col)
    }

    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[must_use]
    pub fn col(&self) -> u32 {
        self.col
    }

    #[must_use]
    pub fn is_version_1_1(&self) -> bool {
        self.breaks_1_1
    }
}

fn decode(input: &[u8]) -> YamlResult<Vec<char>> {
    if input.starts_with(&[0xff, 0xfe]) {
        decode_utf16(&input[2..], 2, u16::from_le_bytes, "utf-16-le")
    } else if input.starts_with(&[0xfe, 0xff]) {
        decode_utf16(&input[2..], 2, u16::from_be_bytes, "utf-16-be")
    } else {
        let input = input.strip_prefix(&[0xef, 0xbb, 0xbf][..]).unwrap_or(input);
        match std::str::from_utf8(input) {
            Ok(s) => Ok(s.chars().collect()),
            Err(e) => Err(YamlError::Decode {
                encoding: "utf-8",
                position: e.valid_up_to(),
            }),
        }
    }
}

fn decode_utf16(
    body: &[u8],
    bom_len: usize,
    from_bytes: fn([u8; 2]) -> u16,
    encoding: &'static str,
) -> YamlResult<Vec<char>> {
    if body.len() % 2 != 0 {
        return Err(YamlError::Decode {
            encoding,
            position: bom_len + body.len() - 1,
        });
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| from_bytes([pair[0], pair[1]]))
        .collect();
    let mut chars = Vec::with_capacity(units.len());
    for (i, decoded) in char::decode_utf16(units.iter().copied()).enumerate() {
        match decoded {
            Ok(c) => chars.push(c),
            Err(_) => {
                return Err(YamlError::Decode {
                    encoding,
                    position: bom_len + i * 2,
                })
            }
        }
    }
    if chars.first() == Some(&'\u{feff}') {
        chars.remove(0);
    }
    Ok(chars)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn tracks_line_and_col_through_breaks() {
        let mut r = Reader::from_str("ab\r\ncd\re").unwrap();
        r.forward(3);
        assert_eq!((r.line(), r.col()), (0, 3));
        r.forward(1);
        assert_eq!((r.line(), r.col()), (1, 0));
        r.forward(3);
        assert_eq!((r.line(), r.col()), (2, 0));
        assert_eq!(r.peek(), 'e');
    }

    #[test]
    fn sentinel_survives_overruns() {
        let mut r = Reader::from_str("x").unwrap();
        assert_eq!(r.peek_nth(5), '\0');
        r.forward(10);
        assert_eq!(r.peek(), '\0');
        assert_eq!(r.prefix(3), "x\0");
    }

    #[test]
    fn rejects_non_printable_input() {
        let err = Reader::from_str("a\u{7}b").unwrap_err();
        assert_eq!(
            err,
            YamlError::NonPrintable {
                code: 7,
                position: 1
            }
        );
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let bytes = [0xff, 0xfe, b'h', 0x00, b'i', 0x00];
        let r = Reader::new(&bytes).unwrap();
        assert_eq!(r.prefix(2), "hi");

        let odd = [0xfe, 0xff, 0x00];
        assert!(matches!(
            Reader::new(&odd),
            Err(YamlError::Decode {
                encoding: "utf-16-be",
                ..
            })
        ));
    }

    #[test]
    fn version_1_1_breaks_on_nel() {
        let mut r = Reader::from_str("a\u{85}b").unwrap();
        r.set_version((1, 1));
        r.forward(2);
        assert_eq!((r.line(), r.col()), (1, 0));
    }

    #[test]
    fn bom_inside_stream_keeps_column() {
        let mut r = Reader::from_str("a\u{feff}b").unwrap();
        r.forward(2);
        assert_eq!((r.line(), r.col()), (0, 1));
    }
}
