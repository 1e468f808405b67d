//! Character classes used by the scanner.

pub(crate) fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

pub(crate) fn is_flow(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

/// Printable non-space characters, byte order mark excluded.
pub(crate) fn is_namespace_char(c: char) -> bool {
    matches!(c,
        '\x21'..='\x7e'
        | '\u{a0}'..='\u{d7ff}'
        | '\u{e000}'..='\u{fffd}'
        | '\u{10000}'..='\u{10ffff}')
        && c != '\u{feff}'
}

pub(crate) fn is_anchor_char(c: char) -> bool {
    !is_flow(c) && is_namespace_char(c)
}

/// Line ends the scanner recognises in any dialect, plus the sentinel.
pub(crate) fn is_the_end(c: char) -> bool {
    matches!(c, '\0' | '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

pub(crate) fn is_end_space_tab(c: char) -> bool {
    c == ' ' || c == '\t' || is_the_end(c)
}

pub(crate) fn is_any_break(c: char) -> bool {
    matches!(c, '\r' | '\n' | '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[inline]
#[must_use]
pub(crate) fn as_hex(c: char) -> Option<u32> {
    c.to_digit(16)
}
