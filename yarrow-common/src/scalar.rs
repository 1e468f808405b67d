//! Scalar values that remember how they were written.
//!
//! Loading captures enough formatting metadata (radix, width, underscore
//! grouping, mantissa/exponent shape, quoting style) that an unmodified
//! value renders back to its original text, while a mutated value still
//! renders in the original's style.

use crate::comment::Comment;
use crate::{ScalarStyle, YamlVersion};

/// `null` in any of its spellings, including the empty one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NullScalar {
    pub text: String,
}

impl NullScalar {
    #[must_use]
    pub fn new(text: impl Into<String>) -> NullScalar {
        NullScalar { text: text.into() }
    }

    /// The spelling used when a null is created rather than loaded.
    #[must_use]
    pub fn canonical() -> NullScalar {
        NullScalar::new("null")
    }
}

/// A boolean keeping its source spelling (`true`, `True`, `yes`, `off`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoolScalar {
    pub value: bool,
    pub text: String,
}

impl BoolScalar {
    #[must_use]
    pub fn new(value: bool, text: impl Into<String>) -> BoolScalar {
        BoolScalar {
            value,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn from_value(value: bool) -> BoolScalar {
        BoolScalar::new(value, if value { "true" } else { "false" })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntRadix {
    Decimal,
    Binary,
    Octal,
    Hex {
        /// Upper case digits (`0xFF`); decided by the first letter seen.
        caps: bool,
    },
}

/// Underscore grouping of an integer: an underscore every `every` digits
/// counted from the right, plus optional leading/trailing underscores
/// directly inside the radix prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Underscore {
    pub every: usize,
    pub leading: bool,
    pub trailing: bool,
}

/// An integer with its original radix, zero-padded width and underscore
/// grouping.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntScalar {
    pub value: i64,
    pub radix: IntRadix,
    /// Rendered digit width when the source had leading zeros.
    pub width: Option<usize>,
    pub underscore: Option<Underscore>,
}

impl IntScalar {
    #[must_use]
    pub fn plain(value: i64) -> IntScalar {
        IntScalar {
            value,
            radix: IntRadix::Decimal,
            width: None,
            underscore: None,
        }
    }

    /// Renders the integer back to text. The octal prefix depends on the
    /// YAML version in effect when dumping (`0` under 1.1, `0o` under 1.2).
    #[must_use]
    pub fn render(&self, version: YamlVersion) -> String {
        let width = self.width.unwrap_or(0);
        let (prefix, digits) = match self.radix {
            IntRadix::Decimal => ("", format!("{:0width$}", self.value)),
            IntRadix::Binary => ("0b", radix_digits(self.value, width, |m| format!("{m:b}"))),
            IntRadix::Octal => (
                if version == (1, 1) { "0" } else { "0o" },
                radix_digits(self.value, width, |m| format!("{m:o}")),
            ),
            IntRadix::Hex { caps: false } => {
                ("0x", radix_digits(self.value, width, |m| format!("{m:x}")))
            }
            IntRadix::Hex { caps: true } => {
                ("0x", radix_digits(self.value, width, |m| format!("{m:X}")))
            }
        };
        insert_underscore(prefix, digits, self.underscore.as_ref())
    }
}

/// Non-decimal formatting is done on the magnitude; the sign is prepended
/// and counts against the zero-padding width, as in decimal.
fn radix_digits(value: i64, width: usize, render: impl Fn(u64) -> String) -> String {
    let mag = render(value.unsigned_abs());
    let digit_width = if value < 0 {
        width.saturating_sub(1)
    } else {
        width
    };
    let padded = format!("{:0>digit_width$}", mag);
    if value < 0 {
        format!("-{padded}")
    } else {
        padded
    }
}

fn insert_underscore(prefix: &str, digits: String, underscore: Option<&Underscore>) -> String {
    let Some(u) = underscore else {
        return format!("{prefix}{digits}");
    };
    let mut chars: Vec<char> = digits.chars().collect();
    if u.every > 0 {
        let mut pos = chars.len() as i64 - u.every as i64;
        while pos > 0 {
            chars.insert(pos as usize, '_');
            pos -= u.every as i64;
        }
    }
    let mut out = String::from(prefix);
    if u.leading {
        out.push('_');
    }
    out.extend(chars);
    if u.trailing {
        out.push('_');
    }
    out
}

/// Exponent part of a float: the letter used (`e`/`E`), the digit width of
/// the exponent and whether a `+` was written out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FloatExponent {
    pub letter: char,
    pub width: usize,
    pub sign: bool,
}

/// A float with the shape of its source text.
///
/// `width` is the mantissa length (sign excluded in exponent form, full
/// text length otherwise); `prec` is the index of the decimal dot, -1 when
/// the mantissa had none; `m_lead0` counts leading zeros of the mantissa.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatScalar {
    pub value: f64,
    pub width: usize,
    pub prec: i32,
    pub m_sign: Option<char>,
    pub m_lead0: usize,
    pub exponent: Option<FloatExponent>,
}

impl FloatScalar {
    /// A float without captured formatting; renders in default style.
    #[must_use]
    pub fn plain(value: f64) -> FloatScalar {
        FloatScalar {
            value,
            width: 0,
            prec: -1,
            m_sign: None,
            m_lead0: 0,
            exponent: None,
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        if self.value.is_nan() {
            return ".nan".to_string();
        }
        if self.value.is_infinite() {
            return if self.value < 0.0 { "-.inf" } else { ".inf" }.to_string();
        }
        if self.width == 0 {
            return render_default(self.value);
        }
        match self.exponent {
            None => self.render_dotted(),
            Some(exp) => self.render_exponent(exp),
        }
    }

    fn render_dotted(&self) -> String {
        let sign = match self.m_sign {
            Some(c) => c.to_string(),
            None if self.value < 0.0 => "-".to_string(),
            None => String::new(),
        };
        let prec = self.prec.max(0) as usize;
        if prec + 1 == self.width {
            // trailing dot, no fraction digits
            let int_width = self.width - 1;
            return format!("{:0int_width$}.", self.value.trunc() as i64);
        }
        let digits_after = self.width - prec - 1;
        let field = self.width - sign.len();
        let mut value = format!("{sign}{:0field$.digits_after$}", self.value.abs());
        if prec == 0 || (prec == 1 && !sign.is_empty()) {
            value = value.replacen("0.", ".", 1);
        }
        while value.len() < self.width {
            value.push('0');
        }
        value
    }

    fn render_exponent(&self, exp: FloatExponent) -> String {
        let has_sign = self.m_sign.is_some() || self.value < 0.0;
        let digits = self.width + usize::from(has_sign);
        let formatted = format!("{:.digits$e}", self.value);
        let (m, es) = match formatted.split_once('e') {
            Some(parts) => parts,
            None => return render_default(self.value),
        };
        let mut e: i64 = es.parse().unwrap_or(0);
        let mut w = if self.prec > 0 {
            self.width
        } else {
            self.width + 1
        };
        if self.value < 0.0 {
            w += 1;
        }
        let m: String = m.chars().take(w).collect();
        let (mut m1, mut m2) = match m.split_once('.') {
            Some((a, b)) => (a.to_string(), b.to_string()),
            None => (m, String::new()),
        };
        let dot = usize::from(self.prec >= 0);
        while m1.len() + m2.len() < self.width - dot {
            m2.push('0');
        }
        if self.m_sign == Some('+') && self.value > 0.0 {
            m1.insert(0, '+');
        }
        let signed = usize::from(has_sign);
        if self.prec < 0 {
            // mantissa written without a dot
            if m2 != "0" {
                e -= m2.len() as i64;
            } else {
                m2.clear();
            }
            while m1.len() + m2.len() - signed < self.width {
                m2.push('0');
                e -= 1;
            }
            format!("{m1}{m2}{}{}", exp.letter, render_exp(e, exp))
        } else if self.prec == 0 {
            e -= m2.len() as i64;
            format!("{m1}{m2}.{}{}", exp.letter, render_exp(e, exp))
        } else {
            if self.m_lead0 > 0 {
                let mut shifted = "0".repeat(self.m_lead0 - 1);
                shifted.push_str(&m1);
                shifted.push_str(&m2);
                shifted.truncate(shifted.len().saturating_sub(self.m_lead0));
                m1 = "0".to_string();
                m2 = shifted;
                e += self.m_lead0 as i64;
            }
            while m1.len() < self.prec as usize && !m2.is_empty() {
                m1.push(m2.remove(0));
                e -= 1;
            }
            format!("{m1}.{m2}{}{}", exp.letter, render_exp(e, exp))
        }
    }
}

fn render_exp(e: i64, exp: FloatExponent) -> String {
    let width = exp.width;
    if exp.sign {
        format!("{e:+0width$}")
    } else {
        format!("{e:0width$}")
    }
}

/// Default rendering for floats with no captured shape; keeps the text a
/// float for the resolver (a dot or exponent is always present).
fn render_default(value: f64) -> String {
    let mut s = format!("{value}");
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        s.push_str(".0");
    }
    s
}

/// A string scalar with its style and, for folded scalars, the positions
/// where the source folded a line (so refolding is byte exact).
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct StrScalar {
    pub value: String,
    pub style: ScalarStyle,
    pub fold_pos: Vec<usize>,
    /// The comment sitting after `|` or `>` on the header line.
    pub header_comment: Option<Comment>,
}

impl StrScalar {
    #[must_use]
    pub fn new(value: impl Into<String>) -> StrScalar {
        StrScalar {
            value: value.into(),
            ..StrScalar::default()
        }
    }

    #[must_use]
    pub fn styled(value: impl Into<String>, style: ScalarStyle) -> StrScalar {
        StrScalar {
            value: value.into(),
            style,
            ..StrScalar::default()
        }
    }
}

/// A `!!timestamp` value; the text is validated at construction and kept
/// verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimestampScalar {
    pub text: String,
}

impl TimestampScalar {
    #[must_use]
    pub fn new(text: impl Into<String>) -> TimestampScalar {
        TimestampScalar { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_keeps_width_and_radix() {
        let hex = IntScalar {
            value: 0x00FF,
            radix: IntRadix::Hex { caps: true },
            width: Some(4),
            underscore: None,
        };
        assert_eq!(hex.render((1, 2)), "0x00FF");

        let oct = IntScalar {
            value: 0o755,
            radix: IntRadix::Octal,
            width: None,
            underscore: None,
        };
        assert_eq!(oct.render((1, 1)), "0755");
        assert_eq!(oct.render((1, 2)), "0o755");
    }

    #[test]
    fn int_regroups_underscores_from_the_right() {
        let grouped = IntScalar {
            value: 1_000_000,
            radix: IntRadix::Decimal,
            width: None,
            underscore: Some(Underscore {
                every: 3,
                leading: false,
                trailing: false,
            }),
        };
        assert_eq!(grouped.render((1, 2)), "1_000_000");

        let hex = IntScalar {
            value: 0xFFEE,
            radix: IntRadix::Hex { caps: true },
            width: None,
            underscore: Some(Underscore {
                every: 2,
                leading: true,
                trailing: false,
            }),
        };
        assert_eq!(hex.render((1, 2)), "0x_FF_EE");
    }

    #[test]
    fn int_negative_width_counts_sign() {
        let padded = IntScalar {
            value: -42,
            radix: IntRadix::Decimal,
            width: Some(5),
            underscore: None,
        };
        assert_eq!(padded.render((1, 2)), "-0042");
    }

    #[test]
    fn float_dotted_forms() {
        let simple = FloatScalar {
            value: 3.14,
            width: 4,
            prec: 1,
            m_sign: None,
            m_lead0: 0,
            exponent: None,
        };
        assert_eq!(simple.render(), "3.14");

        let leading_dot = FloatScalar {
            value: 0.25,
            width: 3,
            prec: 0,
            m_sign: None,
            m_lead0: 0,
            exponent: None,
        };
        assert_eq!(leading_dot.render(), ".25");

        let trailing_dot = FloatScalar {
            value: 5.0,
            width: 2,
            prec: 1,
            m_sign: None,
            m_lead0: 0,
            exponent: None,
        };
        assert_eq!(trailing_dot.render(), "5.");

        let padded = FloatScalar {
            value: 0.5,
            width: 4,
            prec: 2,
            m_sign: None,
            m_lead0: 1,
            exponent: None,
        };
        assert_eq!(padded.render(), "00.5");
    }

    #[test]
    fn float_exponent_forms() {
        let plain = FloatScalar {
            value: 1.5e10,
            width: 3,
            prec: 1,
            m_sign: None,
            m_lead0: 0,
            exponent: Some(FloatExponent {
                letter: 'e',
                width: 2,
                sign: false,
            }),
        };
        assert_eq!(plain.render(), "1.5e10");

        let lead_zero = FloatScalar {
            value: 500.0,
            width: 3,
            prec: 1,
            m_sign: None,
            m_lead0: 1,
            exponent: Some(FloatExponent {
                letter: 'e',
                width: 1,
                sign: false,
            }),
        };
        assert_eq!(lead_zero.render(), "0.5e3");

        let negative = FloatScalar {
            value: -2.47e-12,
            width: 4,
            prec: 2,
            m_sign: Some('-'),
            m_lead0: 0,
            exponent: Some(FloatExponent {
                letter: 'e',
                width: 3,
                sign: true,
            }),
        };
        assert_eq!(negative.render(), "-2.47e-12");
    }

    #[test]
    fn float_specials() {
        assert_eq!(FloatScalar::plain(f64::NAN).render(), ".nan");
        assert_eq!(FloatScalar::plain(f64::INFINITY).render(), ".inf");
        assert_eq!(FloatScalar::plain(f64::NEG_INFINITY).render(), "-.inf");
        assert_eq!(FloatScalar::plain(2.0).render(), "2.0");
    }
}
