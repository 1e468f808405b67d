use crate::Marker;

/// What kind of line the comment occupied in the source.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum CommentKind {
    /// Trails other content on its line: `key: value  # note`.
    Eol,
    /// Occupies a whole line of its own.
    Line,
    /// An empty line, recorded so vertical layout survives a round trip.
    Blank,
}

/// One comment (or blank line) captured by the scanner.
///
/// `value` keeps the leading `#` and the line break; a run that absorbed
/// following lines keeps their breaks and indentation too, so re-emission
/// is a plain write. A blank line stores `"\n"`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Comment {
    pub kind: CommentKind,
    pub value: String,
    pub start: Marker,
}

impl Comment {
    #[must_use]
    pub fn new(kind: CommentKind, value: String, start: Marker) -> Comment {
        Comment { kind, value, start }
    }

    #[must_use]
    pub fn blank(start: Marker) -> Comment {
        Comment {
            kind: CommentKind::Blank,
            value: "\n".to_string(),
            start,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.kind == CommentKind::Blank
    }
}

/// Comment attachment slots carried by tokens and events.
///
/// `pre` holds the run of whole-line comments and blanks gathered before
/// the item; `eol` the comment trailing it on the same line; `post` is only
/// populated on end-of-container and end-of-document items, for runs that
/// belong inside the thing that just closed.
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct CommentSlots {
    pub pre: Vec<Comment>,
    pub eol: Option<Comment>,
    pub post: Vec<Comment>,
}

impl CommentSlots {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.eol.is_none() && self.post.is_empty()
    }

    /// Moves every attached comment out of `self`, appending pre/post runs
    /// and giving up the eol slot only if `other` has none.
    pub fn drain_into(&mut self, other: &mut CommentSlots) {
        other.pre.append(&mut self.pre);
        if other.eol.is_none() {
            other.eol = self.eol.take();
        }
        self.eol = None;
        other.post.append(&mut self.post);
    }

    /// Splits a pre run at its first blank line: everything before the
    /// blank is returned (it belongs to the construct that just ended),
    /// the blank and the rest stay. Returns `None` when there is no blank
    /// or the run starts with one.
    pub fn split_pre_on_first_blank(&mut self) -> Option<Vec<Comment>> {
        let idx = self.pre.iter().position(Comment::is_blank)?;
        if idx == 0 {
            return None;
        }
        let rest = self.pre.split_off(idx);
        Some(std::mem::replace(&mut self.pre, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str) -> Comment {
        Comment::new(CommentKind::Line, text.to_string(), Marker::default())
    }

    #[test]
    fn split_takes_lines_before_first_blank() {
        let mut slots = CommentSlots {
            pre: vec![line("# a"), Comment::blank(Marker::default()), line("# b")],
            ..CommentSlots::default()
        };
        let taken = slots.split_pre_on_first_blank().unwrap();
        assert_eq!(taken.len(), 1);
        assert_eq!(taken[0].value, "# a");
        assert_eq!(slots.pre.len(), 2);
        assert!(slots.pre[0].is_blank());
    }

    #[test]
    fn split_refuses_leading_blank_and_blankless_runs() {
        let mut leading = CommentSlots {
            pre: vec![Comment::blank(Marker::default()), line("# a")],
            ..CommentSlots::default()
        };
        assert!(leading.split_pre_on_first_blank().is_none());
        assert_eq!(leading.pre.len(), 2);

        let mut solid = CommentSlots {
            pre: vec![line("# a"), line("# b")],
            ..CommentSlots::default()
        };
        assert!(solid.split_pre_on_first_blank().is_none());
    }
}
