//! Lowering `regex-syntax` ASTs into [`RegexNode`] trees.
//!
//! The parser does the lexing and reports lookaround and backreferences as errors; this
//! module tracks inline flags, folds literal runs, specializes single-character loops and
//! flattens bracket classes into [`CharClass`] payloads.

use regex_syntax::ast::parse::ParserBuilder;
use regex_syntax::ast::{
    self, Ast, AssertionKind, ClassAsciiKind, ClassPerlKind, ClassSet, ClassSetBinaryOpKind, ClassSetItem,
    ClassUnicodeKind, ClassUnicodeOpKind, ErrorKind, GroupKind, RepetitionKind, RepetitionRange,
};

use crate::ast::{RegexNode, INFINITE};
use crate::class::{CategoryEntry, CharClass, ClassCategory};
use crate::error::{Result, RexError};
use crate::options::RegexOptions;

/// Parse `pattern` under `options`.
pub fn parse(pattern: &str, options: RegexOptions) -> Result<RegexNode> {
    let ast = ParserBuilder::new()
        .ignore_whitespace(options.contains(RegexOptions::IGNORE_PATTERN_WHITESPACE))
        .build()
        .parse(pattern)
        .map_err(|err| parse_error(pattern, &err))?;
    Lowering::new(options).node(&ast)
}

fn parse_error(pattern: &str, err: &ast::Error) -> RexError {
    match err.kind() {
        ErrorKind::UnsupportedBackreference => RexError::UnsupportedConstruct("backreference".to_string()),
        ErrorKind::UnsupportedLookAround => RexError::UnsupportedConstruct("lookaround".to_string()),
        _ if pattern.contains("(?(") => RexError::UnsupportedConstruct("conditional alternation".to_string()),
        _ if pattern.contains("\\G") => RexError::UnsupportedConstruct("boundary anchor \\G".to_string()),
        kind => RexError::Parse {
            pattern: pattern.to_string(),
            message: kind.to_string(),
        },
    }
}

#[derive(Debug, Copy, Clone)]
struct Flags {
    ignore_case: bool,
    multi_line: bool,
    dot_all: bool,
    swap_greed: bool,
    unicode: bool,
}

impl Flags {
    fn from_options(options: RegexOptions) -> Self {
        Self {
            ignore_case: options.contains(RegexOptions::IGNORE_CASE),
            multi_line: options.contains(RegexOptions::MULTILINE),
            dot_all: options.contains(RegexOptions::SINGLELINE),
            swap_greed: false,
            unicode: true,
        }
    }

    fn apply(&mut self, flags: &ast::Flags) {
        let mut enable = true;
        for item in &flags.items {
            match &item.kind {
                ast::FlagsItemKind::Negation => enable = false,
                ast::FlagsItemKind::Flag(flag) => match flag {
                    ast::Flag::CaseInsensitive => self.ignore_case = enable,
                    ast::Flag::MultiLine => self.multi_line = enable,
                    ast::Flag::DotMatchesNewLine => self.dot_all = enable,
                    ast::Flag::SwapGreed => self.swap_greed = enable,
                    ast::Flag::Unicode => self.unicode = enable,
                    // Whitespace mode is the parser's business; CRLF changes nothing here.
                    _ => {}
                },
            }
        }
    }
}

struct Lowering {
    flags: Flags,
}

impl Lowering {
    fn new(options: RegexOptions) -> Self {
        Self {
            flags: Flags::from_options(options),
        }
    }

    fn node(&mut self, ast: &Ast) -> Result<RegexNode> {
        let ignore_case = self.flags.ignore_case;
        match ast {
            Ast::Empty(_) => Ok(RegexNode::Empty),
            Ast::Flags(set) => {
                self.flags.apply(&set.flags);
                Ok(RegexNode::Empty)
            }
            Ast::Literal(lit) => Ok(RegexNode::char(lit.c, ignore_case)),
            Ast::Dot(_) => Ok(if self.flags.dot_all {
                RegexNode::set(CharClass::any(), false)
            } else {
                RegexNode::not_char('\n', false)
            }),
            Ast::Assertion(assertion) => Ok(self.assertion(&assertion.kind)),
            Ast::ClassUnicode(class) => Ok(RegexNode::set(unicode_class(class), ignore_case)),
            Ast::ClassPerl(class) => Ok(RegexNode::set(self.perl_class(class), ignore_case)),
            Ast::ClassBracketed(class) => Ok(RegexNode::set(self.bracketed(class)?, ignore_case)),
            Ast::Repetition(rep) => self.repetition(rep),
            Ast::Group(group) => self.group(group),
            Ast::Alternation(alt) => alt
                .asts
                .iter()
                .map(|ast| self.node(ast))
                .collect::<Result<Vec<_>>>()
                .map(RegexNode::alternate),
            Ast::Concat(concat) => self.concat(&concat.asts),
        }
    }

    fn concat(&mut self, asts: &[Ast]) -> Result<RegexNode> {
        let mut nodes: Vec<RegexNode> = Vec::with_capacity(asts.len());
        for ast in asts {
            // Flag changes take effect for the rest of the group and occupy no position.
            if let Ast::Flags(set) = ast {
                self.flags.apply(&set.flags);
                continue;
            }

            let node = self.node(ast)?;
            if let RegexNode::Char { c, ignore_case } = node {
                match nodes.last_mut() {
                    Some(RegexNode::Literal {
                        chars,
                        ignore_case: ic,
                    }) if *ic == ignore_case => {
                        chars.push(c);
                        continue;
                    }
                    Some(last) => {
                        if let RegexNode::Char { c: prev, ignore_case: ic } = *last {
                            if ic == ignore_case {
                                *last = RegexNode::Literal {
                                    chars: vec![prev, c],
                                    ignore_case,
                                };
                                continue;
                            }
                        }
                    }
                    None => {}
                }
            }
            nodes.push(node);
        }

        Ok(match nodes.len() {
            0 => RegexNode::Empty,
            1 => nodes.remove(0),
            _ => RegexNode::concat(nodes),
        })
    }

    fn assertion(&self, kind: &AssertionKind) -> RegexNode {
        match kind {
            AssertionKind::StartLine if self.flags.multi_line => RegexNode::Bol,
            AssertionKind::StartLine => RegexNode::Beginning,
            AssertionKind::EndLine if self.flags.multi_line => RegexNode::Eol,
            AssertionKind::EndLine => RegexNode::EndZ,
            AssertionKind::StartText => RegexNode::Beginning,
            AssertionKind::EndText => RegexNode::End,
            other => RegexNode::unsupported(format!("boundary anchor ({:?})", other)),
        }
    }

    fn repetition(&mut self, rep: &ast::Repetition) -> Result<RegexNode> {
        if rep.greedy == self.flags.swap_greed {
            return Ok(RegexNode::unsupported("lazy quantifier"));
        }
        let (min, max) = match &rep.op.kind {
            RepetitionKind::ZeroOrOne => (0, 1),
            RepetitionKind::ZeroOrMore => (0, INFINITE),
            RepetitionKind::OneOrMore => (1, INFINITE),
            RepetitionKind::Range(RepetitionRange::Exactly(n)) => (*n, *n),
            RepetitionKind::Range(RepetitionRange::AtLeast(n)) => (*n, INFINITE),
            RepetitionKind::Range(RepetitionRange::Bounded(m, n)) => (*m, *n),
        };
        if let RepetitionKind::Range(range) = &rep.op.kind {
            let explicit = match range {
                RepetitionRange::Exactly(n) | RepetitionRange::AtLeast(n) => *n,
                RepetitionRange::Bounded(_, n) => *n,
            };
            // `INFINITE` is reserved for a missing upper bound.
            if explicit == INFINITE {
                return Err(RexError::InvalidArgument(format!(
                    "repetition count {} is too large",
                    explicit
                )));
            }
        }
        let body = self.node(&rep.ast)?;
        Ok(RegexNode::repeat(body, min, max))
    }

    fn group(&mut self, group: &ast::Group) -> Result<RegexNode> {
        let saved = self.flags;
        let res = match &group.kind {
            GroupKind::CaptureIndex(_) | GroupKind::CaptureName { .. } => {
                self.node(&group.ast).map(RegexNode::capture)
            }
            GroupKind::NonCapturing(flags) => {
                self.flags.apply(flags);
                self.node(&group.ast)
            }
        };
        self.flags = saved;
        res
    }

    fn perl_class(&self, class: &ast::ClassPerl) -> CharClass {
        let res = match (&class.kind, self.flags.unicode) {
            (ClassPerlKind::Digit, true) => CharClass::from_category(ClassCategory::named("Nd"), true),
            (ClassPerlKind::Space, true) => CharClass::from_category(ClassCategory::Whitespace, true),
            (ClassPerlKind::Word, true) => CharClass::from_category(ClassCategory::word(), true),
            (ClassPerlKind::Digit, false) => CharClass::from_ranges(ascii_ranges(&ClassAsciiKind::Digit)),
            (ClassPerlKind::Space, false) => CharClass::from_ranges(ascii_ranges(&ClassAsciiKind::Space)),
            (ClassPerlKind::Word, false) => CharClass::from_ranges(ascii_ranges(&ClassAsciiKind::Word)),
        };
        if class.negated {
            res.negate()
        } else {
            res
        }
    }

    fn bracketed(&self, class: &ast::ClassBracketed) -> Result<CharClass> {
        let res = self.class_set(&class.kind)?;
        if !class.negated {
            return Ok(res);
        }
        // The negation covers the whole set, subtraction included.
        Ok(if res.is_plain() {
            res.negate()
        } else {
            CharClass::complement_of(res)
        })
    }

    fn class_set(&self, set: &ClassSet) -> Result<CharClass> {
        match set {
            ClassSet::Item(item) => self.class_item(item),
            ClassSet::BinaryOp(op) => {
                let lhs = self.class_set(&op.lhs)?;
                let rhs = self.class_set(&op.rhs)?;
                match &op.kind {
                    ClassSetBinaryOpKind::Difference => subtract(lhs, rhs),
                    // A && B is A -- !B.
                    ClassSetBinaryOpKind::Intersection => subtract(lhs, complement(rhs)?),
                    ClassSetBinaryOpKind::SymmetricDifference => Err(RexError::UnsupportedConstruct(
                        "class symmetric difference".to_string(),
                    )),
                }
            }
        }
    }

    fn class_item(&self, item: &ClassSetItem) -> Result<CharClass> {
        match item {
            ClassSetItem::Empty(_) => Ok(CharClass::default()),
            ClassSetItem::Literal(lit) => Ok(CharClass::from_ranges([(lit.c as u32, lit.c as u32)])),
            ClassSetItem::Range(range) => Ok(CharClass::from_ranges([(
                range.start.c as u32,
                range.end.c as u32,
            )])),
            ClassSetItem::Ascii(ascii) => {
                let ranges = ascii_ranges(&ascii.kind);
                Ok(CharClass::from_ranges(if ascii.negated {
                    complement_ranges(&ranges)
                } else {
                    ranges
                }))
            }
            ClassSetItem::Unicode(class) => Ok(unicode_class(class)),
            ClassSetItem::Perl(class) => Ok(self.perl_class(class)),
            ClassSetItem::Bracketed(class) => self.bracketed(class),
            ClassSetItem::Union(union) => {
                let mut res = CharClass::default();
                for item in &union.items {
                    res.extend(into_plain(self.class_item(item)?)?);
                }
                Ok(res)
            }
        }
    }
}

fn unicode_class(class: &ast::ClassUnicode) -> CharClass {
    let (name, negated) = match &class.kind {
        ClassUnicodeKind::OneLetter(c) => (c.to_string(), class.negated),
        ClassUnicodeKind::Named(name) => (name.clone(), class.negated),
        ClassUnicodeKind::NamedValue { op, name, value } => {
            let negated = class.negated != matches!(op, ClassUnicodeOpKind::NotEqual);
            let key: String = name
                .chars()
                .filter(|c| !matches!(c, '_' | ' ' | '-'))
                .map(|c| c.to_ascii_lowercase())
                .collect();
            if key == "gc" || key == "generalcategory" {
                (value.clone(), negated)
            } else {
                // Scripts and other properties are not categories; decoding rejects them.
                (format!("{}={}", name, value), negated)
            }
        }
    };
    CharClass::from_category(ClassCategory::Named(name), !negated)
}

/// Rewrite a class as an equivalent plain one, so it can join a union.
fn into_plain(class: CharClass) -> Result<CharClass> {
    if class.is_plain() {
        return Ok(class);
    }
    if class.subtraction.is_none() {
        if class.categories.is_empty() {
            return Ok(CharClass::from_ranges(complement_ranges(&class.ranges)));
        }
        if class.ranges.is_empty() && class.categories.len() == 1 {
            let entry = &class.categories[0];
            return Ok(CharClass {
                categories: vec![CategoryEntry {
                    category: entry.category.clone(),
                    include: !entry.include,
                }],
                ..Default::default()
            });
        }
    }
    Err(RexError::UnsupportedConstruct(
        "negated or subtracted class nested in a union".to_string(),
    ))
}

fn subtract(mut lhs: CharClass, rhs: CharClass) -> Result<CharClass> {
    match lhs.subtraction.take() {
        None => {
            lhs.subtraction = Some(Box::new(rhs));
            Ok(lhs)
        }
        // (A -- S) -- R is A -- (S | R).
        Some(mut sub) if sub.is_plain() => {
            sub.extend(into_plain(rhs)?);
            lhs.subtraction = Some(sub);
            Ok(lhs)
        }
        Some(_) => Err(RexError::UnsupportedConstruct("chained class subtraction".to_string())),
    }
}

fn complement(class: CharClass) -> Result<CharClass> {
    if class.subtraction.is_some() {
        return Err(RexError::UnsupportedConstruct(
            "intersection with a subtracted class".to_string(),
        ));
    }
    Ok(class.negate())
}

/// Inclusive ranges of a POSIX class.
fn ascii_ranges(kind: &ClassAsciiKind) -> Vec<(u32, u32)> {
    let ranges: &[(u8, u8)] = match kind {
        ClassAsciiKind::Alnum => &[(b'0', b'9'), (b'A', b'Z'), (b'a', b'z')],
        ClassAsciiKind::Alpha => &[(b'A', b'Z'), (b'a', b'z')],
        ClassAsciiKind::Ascii => &[(0x00, 0x7F)],
        ClassAsciiKind::Blank => &[(b'\t', b'\t'), (b' ', b' ')],
        ClassAsciiKind::Cntrl => &[(0x00, 0x1F), (0x7F, 0x7F)],
        ClassAsciiKind::Digit => &[(b'0', b'9')],
        ClassAsciiKind::Graph => &[(b'!', b'~')],
        ClassAsciiKind::Lower => &[(b'a', b'z')],
        ClassAsciiKind::Print => &[(b' ', b'~')],
        ClassAsciiKind::Punct => &[(b'!', b'/'), (b':', b'@'), (b'[', b'`'), (b'{', b'~')],
        ClassAsciiKind::Space => &[(b'\t', b'\r'), (b' ', b' ')],
        ClassAsciiKind::Upper => &[(b'A', b'Z')],
        ClassAsciiKind::Word => &[(b'0', b'9'), (b'A', b'Z'), (b'_', b'_'), (b'a', b'z')],
        ClassAsciiKind::Xdigit => &[(b'0', b'9'), (b'A', b'F'), (b'a', b'f')],
    };
    ranges.iter().map(|&(lo, hi)| (lo as u32, hi as u32)).collect()
}

/// Code points not covered by `ranges`.
fn complement_ranges(ranges: &[(u32, u32)]) -> Vec<(u32, u32)> {
    let mut sorted = ranges.to_vec();
    sorted.sort_unstable();

    let mut res = Vec::new();
    let mut next = 0u32;
    for (lo, hi) in sorted {
        if lo > next {
            res.push((next, lo - 1));
        }
        next = next.max(hi.saturating_add(1));
    }
    let max = char::MAX as u32;
    if next <= max {
        res.push((next, max));
    }
    res
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn lower(pattern: &str) -> RegexNode {
        parse(pattern, RegexOptions::empty()).unwrap()
    }

    #[test]
    fn test_literal_run() {
        assert_eq!(lower("abc"), RegexNode::literal("abc", false));
        assert_eq!(lower("x"), RegexNode::char('x', false));
        assert_eq!(
            lower("a(?i)bc"),
            RegexNode::concat(vec![RegexNode::char('a', false), RegexNode::literal("bc", true)])
        );
    }

    #[test]
    fn test_anchors() {
        assert_eq!(
            lower("^a$"),
            RegexNode::concat(vec![RegexNode::Beginning, RegexNode::char('a', false), RegexNode::EndZ])
        );
        assert_eq!(
            lower(r"\Aa\z"),
            RegexNode::concat(vec![RegexNode::Beginning, RegexNode::char('a', false), RegexNode::End])
        );
        let multi = parse("^a$", RegexOptions::MULTILINE).unwrap();
        assert_eq!(
            multi,
            RegexNode::concat(vec![RegexNode::Bol, RegexNode::char('a', false), RegexNode::Eol])
        );
        assert!(matches!(
            lower(r"\bfoo"),
            RegexNode::Concatenate(nodes) if matches!(nodes[0], RegexNode::Unsupported(_))
        ));
    }

    #[test]
    fn test_flags_group_do_not_leak() {
        assert_eq!(
            lower("(?i:a)b"),
            RegexNode::concat(vec![RegexNode::char('a', true), RegexNode::char('b', false)])
        );
        assert_eq!(lower("(?i)^a"), RegexNode::concat(vec![RegexNode::Beginning, RegexNode::char('a', true)]));
    }

    #[test]
    fn test_repetition() {
        assert_eq!(
            lower("a{2,5}"),
            RegexNode::CharLoop {
                c: 'a',
                ignore_case: false,
                min: 2,
                max: 5
            }
        );
        assert!(matches!(lower("(ab)+"), RegexNode::Loop { min: 1, max: INFINITE, .. }));
        assert!(matches!(lower("[0-9]*"), RegexNode::SetLoop { min: 0, max: INFINITE, .. }));
        assert!(matches!(lower(".?"), RegexNode::NotCharLoop { c: '\n', min: 0, max: 1, .. }));
        assert_eq!(lower("a*?"), RegexNode::unsupported("lazy quantifier"));
        assert!(matches!(lower("(?U)a*"), RegexNode::Unsupported(_)));
        assert!(matches!(lower("(?U)a*?"), RegexNode::CharLoop { .. }));
    }

    #[test]
    fn test_repetition_count_limit() {
        let max = u32::MAX;
        for pattern in [format!("a{{{}}}", max), format!("a{{{},}}", max), format!("(ab){{0,{}}}", max)] {
            assert!(
                matches!(parse(&pattern, RegexOptions::empty()), Err(RexError::InvalidArgument(_))),
                "{:?}",
                pattern
            );
        }
        assert!(matches!(
            lower(&format!("a{{{},}}", max - 1)),
            RegexNode::CharLoop { max: INFINITE, .. }
        ));
        assert!(matches!(
            lower(&format!("a{{{}}}", max - 1)),
            RegexNode::CharLoop { min, max, .. } if min == u32::MAX - 1 && max == u32::MAX - 1
        ));
    }

    #[test]
    fn test_dot() {
        assert_eq!(lower("."), RegexNode::not_char('\n', false));
        assert_eq!(
            parse(".", RegexOptions::SINGLELINE).unwrap(),
            RegexNode::set(CharClass::any(), false)
        );
    }

    #[test]
    fn test_perl_classes() {
        assert_eq!(
            lower(r"\d"),
            RegexNode::set(CharClass::from_category(ClassCategory::named("Nd"), true), false)
        );
        assert_eq!(
            lower(r"\S"),
            RegexNode::set(CharClass::from_category(ClassCategory::Whitespace, true).negate(), false)
        );
        assert_eq!(
            lower(r"(?-u)\w"),
            RegexNode::set(
                CharClass::from_ranges([(0x30, 0x39), (0x41, 0x5A), (0x5F, 0x5F), (0x61, 0x7A)]),
                false
            )
        );
    }

    #[test]
    fn test_brackets() {
        assert_eq!(
            lower("[a-cx]"),
            RegexNode::set(CharClass::from_ranges([(0x61, 0x63), (0x78, 0x78)]), false)
        );
        assert_eq!(
            lower("[^a]"),
            RegexNode::set(CharClass::from_ranges([(0x61, 0x61)]).negate(), false)
        );
        let RegexNode::Set { class, .. } = lower(r"[a-z--[aeiou]]") else {
            panic!("expected a set");
        };
        assert_eq!(class.ranges, vec![(0x61, 0x7A)]);
        assert!(class.subtraction.is_some());

        let RegexNode::Set { class, .. } = lower(r"[\w&&\d]") else {
            panic!("expected a set");
        };
        assert!(class.subtraction.is_some_and(|sub| sub.negated));

        assert!(matches!(
            parse(r"[a~~b]", RegexOptions::empty()),
            Err(RexError::UnsupportedConstruct(_))
        ));
        assert_eq!(
            lower(r"[\p{Lu}\D]"),
            RegexNode::set(
                CharClass {
                    categories: vec![
                        CategoryEntry {
                            category: ClassCategory::named("Lu"),
                            include: true
                        },
                        CategoryEntry {
                            category: ClassCategory::named("Nd"),
                            include: false
                        },
                    ],
                    ..Default::default()
                },
                false
            )
        );
    }

    #[test]
    fn test_unicode_names() {
        assert_eq!(
            lower(r"\pL"),
            RegexNode::set(CharClass::from_category(ClassCategory::named("L"), true), false)
        );
        assert_eq!(
            lower(r"\P{gc=Nd}"),
            RegexNode::set(CharClass::from_category(ClassCategory::named("Nd"), false), false)
        );
        assert_eq!(
            lower(r"\p{Greek}"),
            RegexNode::set(CharClass::from_category(ClassCategory::named("Greek"), true), false)
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse("(?<=x)y", RegexOptions::empty()),
            Err(RexError::UnsupportedConstruct("lookaround".to_string()))
        );
        assert_eq!(
            parse("(?!x)y", RegexOptions::empty()),
            Err(RexError::UnsupportedConstruct("lookaround".to_string()))
        );
        assert_eq!(
            parse(r"(a)\1", RegexOptions::empty()),
            Err(RexError::UnsupportedConstruct("backreference".to_string()))
        );
        assert!(matches!(
            parse("a(b", RegexOptions::empty()),
            Err(RexError::Parse { .. })
        ));
    }

    #[test]
    fn test_ignore_whitespace() {
        let node = parse("a b  c", RegexOptions::IGNORE_PATTERN_WHITESPACE).unwrap();
        assert_eq!(node, RegexNode::literal("abc", false));
    }

    #[test]
    fn test_complement_ranges() {
        assert_eq!(
            complement_ranges(&[(0x61, 0x61)]),
            vec![(0, 0x60), (0x62, char::MAX as u32)]
        );
        assert_eq!(complement_ranges(&[(0, char::MAX as u32)]), vec![]);
    }
}
