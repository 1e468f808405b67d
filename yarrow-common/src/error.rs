use crate::Marker;
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// A specialized `Result` type where the error is hard-wired to [`YamlError`].
pub type YamlResult<T> = Result<T, YamlError>;

/// Position-carrying payload shared by every pipeline-stage error.
///
/// Renders as up to five lines: context, context position, problem,
/// problem position, note. The context position is suppressed when it
/// coincides with the problem position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Marked {
    pub context: Option<String>,
    pub context_mark: Option<Marker>,
    pub problem: String,
    pub problem_mark: Option<Marker>,
    pub note: Option<String>,
}

impl Marked {
    #[must_use]
    pub fn problem(problem: impl Into<String>, mark: Marker) -> Marked {
        Marked {
            problem: problem.into(),
            problem_mark: Some(mark),
            ..Marked::default()
        }
    }

    #[must_use]
    pub fn contextual(
        context: impl Into<String>,
        context_mark: Marker,
        problem: impl Into<String>,
        problem_mark: Marker,
    ) -> Marked {
        Marked {
            context: Some(context.into()),
            context_mark: Some(context_mark),
            problem: problem.into(),
            problem_mark: Some(problem_mark),
            note: None,
        }
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Marked {
        self.note = Some(note.into());
        self
    }
}

impl Display for Marked {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        let mut put = |f: &mut Formatter<'_>, line: &dyn Display| {
            let sep = if first { "" } else { "\n" };
            first = false;
            write!(f, "{sep}{line}")
        };
        if let Some(context) = &self.context {
            put(f, context)?;
        }
        if let Some(mark) = self.context_mark {
            if self.problem_mark != Some(mark) {
                put(f, &format_args!("  in {mark}"))?;
            }
        }
        put(f, &self.problem)?;
        if let Some(mark) = self.problem_mark {
            put(f, &format_args!("  in {mark}"))?;
        }
        if let Some(note) = &self.note {
            put(f, note)?;
        }
        Ok(())
    }
}

/// Every failure the engine can produce. Fatal to the current load or
/// dump call; stages never catch and retry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum YamlError {
    #[error("'{encoding}' codec can't decode input\n  in position {position}")]
    Decode {
        encoding: &'static str,
        position: usize,
    },
    #[error(
        "unacceptable character #x{code:04x}: special characters are not allowed\n  in position {position}"
    )]
    NonPrintable { code: u32, position: usize },
    #[error("{0}")]
    Scanner(Marked),
    #[error("{0}")]
    Parser(Marked),
    #[error("{0}")]
    Composer(Marked),
    #[error("{0}")]
    Constructor(Marked),
    #[error("{0}")]
    DuplicateKey(Marked),
    #[error("{0}")]
    Emitter(String),
    #[error("{0}")]
    Serializer(String),
    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for YamlError {
    fn from(error: std::io::Error) -> YamlError {
        YamlError::Io(error.to_string())
    }
}

impl From<std::fmt::Error> for YamlError {
    fn from(error: std::fmt::Error) -> YamlError {
        YamlError::Io(error.to_string())
    }
}

/// Non-fatal advisories. Surfaced through the load/dump context, never
/// raised as control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    ReusedAnchor {
        anchor: String,
        first: Marker,
        second: Marker,
    },
    /// YAML 1.1 loads an exponent without a mantissa dot as an integer;
    /// this engine keeps it a float but flags the spelling.
    MantissaNoDot {
        value: String,
        mark: Marker,
    },
    /// A duplicate mapping or set key seen while duplicate keys are
    /// allowed by options; the first value wins.
    DuplicateKeyAllowed {
        key: String,
        first: Marker,
        second: Marker,
    },
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::ReusedAnchor {
                anchor,
                first,
                second,
            } => write!(
                f,
                "found duplicate anchor {anchor:?}\nfirst occurrence {first}\nsecond occurrence {second}"
            ),
            Warning::MantissaNoDot { value, mark } => write!(
                f,
                "float {value} has no dot in its mantissa; under YAML 1.1 rules it would load as an integer\n  in {mark}"
            ),
            Warning::DuplicateKeyAllowed { key, first, second } => write!(
                f,
                "found duplicate key {key:?}\nfirst occurrence {first}\nsecond occurrence {second}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marked_renders_context_and_problem() {
        let marked = Marked::contextual(
            "while parsing a block mapping",
            Marker::new(0, 0, 0),
            "did not find expected key",
            Marker::new(12, 2, 4),
        );
        assert_eq!(
            marked.to_string(),
            "while parsing a block mapping\n  in line 1, column 1\n\
             did not find expected key\n  in line 3, column 5"
        );
    }

    #[test]
    fn marked_suppresses_redundant_context_mark() {
        let mark = Marker::new(3, 1, 1);
        let mut marked = Marked::problem("found character that cannot start any token", mark);
        marked.context = Some("while scanning".to_string());
        marked.context_mark = Some(mark);
        assert_eq!(
            marked.to_string(),
            "while scanning\nfound character that cannot start any token\n  in line 2, column 2"
        );
    }
}
