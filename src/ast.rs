//! Regex syntax tree consumed by the compiler.
//!
//! One variant per construct the compiler understands, plus [`RegexNode::Unsupported`]
//! for constructs it must reject. Leaves carry their own case-insensitivity flag.

use crate::class::CharClass;

/// Upper bound of an unbounded repetition.
pub const INFINITE: u32 = u32::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexNode {
    Char {
        c: char,
        ignore_case: bool,
    },
    /// Any character but `c`.
    NotChar {
        c: char,
        ignore_case: bool,
    },
    Set {
        class: CharClass,
        ignore_case: bool,
    },
    /// A run of characters matched one after another.
    Literal {
        chars: Vec<char>,
        ignore_case: bool,
    },
    CharLoop {
        c: char,
        ignore_case: bool,
        min: u32,
        max: u32,
    },
    NotCharLoop {
        c: char,
        ignore_case: bool,
        min: u32,
        max: u32,
    },
    SetLoop {
        class: CharClass,
        ignore_case: bool,
        min: u32,
        max: u32,
    },
    Loop {
        body: Box<RegexNode>,
        min: u32,
        max: u32,
    },
    Concatenate(Vec<RegexNode>),
    Alternate(Vec<RegexNode>),
    Capture(Box<RegexNode>),
    /// `\A`, or `^` outside multiline mode.
    Beginning,
    /// `\z`.
    End,
    /// `$` outside multiline mode: end, or before a final newline.
    EndZ,
    /// Multiline `^`.
    Bol,
    /// Multiline `$`.
    Eol,
    /// Matches the empty string.
    Empty,
    /// Matches nothing.
    Nothing,
    /// A construct that has no automaton counterpart, by name.
    Unsupported(String),
}

impl RegexNode {
    pub fn char(c: char, ignore_case: bool) -> Self {
        RegexNode::Char { c, ignore_case }
    }

    pub fn not_char(c: char, ignore_case: bool) -> Self {
        RegexNode::NotChar { c, ignore_case }
    }

    pub fn set(class: CharClass, ignore_case: bool) -> Self {
        RegexNode::Set { class, ignore_case }
    }

    pub fn literal(s: &str, ignore_case: bool) -> Self {
        RegexNode::Literal {
            chars: s.chars().collect(),
            ignore_case,
        }
    }

    pub fn concat(nodes: Vec<RegexNode>) -> Self {
        RegexNode::Concatenate(nodes)
    }

    pub fn alternate(nodes: Vec<RegexNode>) -> Self {
        RegexNode::Alternate(nodes)
    }

    pub fn capture(node: RegexNode) -> Self {
        RegexNode::Capture(Box::new(node))
    }

    pub fn unsupported(name: impl Into<String>) -> Self {
        RegexNode::Unsupported(name.into())
    }

    /// Repeat `body` between `min` and `max` times.
    ///
    /// Single-character bodies become the dedicated loop variants.
    pub fn repeat(body: RegexNode, min: u32, max: u32) -> Self {
        match body {
            RegexNode::Char { c, ignore_case } => RegexNode::CharLoop {
                c,
                ignore_case,
                min,
                max,
            },
            RegexNode::NotChar { c, ignore_case } => RegexNode::NotCharLoop {
                c,
                ignore_case,
                min,
                max,
            },
            RegexNode::Set { class, ignore_case } => RegexNode::SetLoop {
                class,
                ignore_case,
                min,
                max,
            },
            body => RegexNode::Loop {
                body: Box::new(body),
                min,
                max,
            },
        }
    }

    /// Short name of the node kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RegexNode::Char { .. } => "char",
            RegexNode::NotChar { .. } => "not-char",
            RegexNode::Set { .. } => "set",
            RegexNode::Literal { .. } => "literal",
            RegexNode::CharLoop { .. } => "char-loop",
            RegexNode::NotCharLoop { .. } => "not-char-loop",
            RegexNode::SetLoop { .. } => "set-loop",
            RegexNode::Loop { .. } => "loop",
            RegexNode::Concatenate(_) => "concatenate",
            RegexNode::Alternate(_) => "alternate",
            RegexNode::Capture(_) => "capture",
            RegexNode::Beginning => "beginning",
            RegexNode::End => "end",
            RegexNode::EndZ => "end-z",
            RegexNode::Bol => "bol",
            RegexNode::Eol => "eol",
            RegexNode::Empty => "empty",
            RegexNode::Nothing => "nothing",
            RegexNode::Unsupported(_) => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_specializes() {
        assert_eq!(
            RegexNode::repeat(RegexNode::char('a', false), 1, INFINITE),
            RegexNode::CharLoop {
                c: 'a',
                ignore_case: false,
                min: 1,
                max: INFINITE
            }
        );
        assert!(matches!(
            RegexNode::repeat(RegexNode::not_char('\n', false), 0, 3),
            RegexNode::NotCharLoop { min: 0, max: 3, .. }
        ));
        assert!(matches!(
            RegexNode::repeat(RegexNode::set(CharClass::any(), false), 2, 2),
            RegexNode::SetLoop { min: 2, max: 2, .. }
        ));
        assert!(matches!(
            RegexNode::repeat(RegexNode::literal("ab", false), 0, 1),
            RegexNode::Loop { min: 0, max: 1, .. }
        ));
    }

    #[test]
    fn test_kind() {
        assert_eq!(RegexNode::Bol.kind(), "bol");
        assert_eq!(RegexNode::unsupported("lookahead").kind(), "unsupported");
    }
}
