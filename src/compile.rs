//! Compiling [`RegexNode`] trees into [`Sfa`]s.
//!
//! [`Compiler::compile`] works on one node at a time. `min` is the smallest state id the
//! fragment may use, and `is_start`/`is_end` say whether the fragment touches the start or
//! the end of the whole pattern. A fragment at an unanchored boundary gets a self-loop
//! accepting any character there, so generated strings may carry arbitrary padding.
//! Start and end anchors are only legal at their boundary, where they remove that padding.

use std::collections::BTreeSet;

use log::debug;

use crate::ast::{RegexNode, INFINITE};
use crate::bdd::Bdd;
use crate::class::ClassDecoder;
use crate::error::{Result, RexError};
use crate::reference::Ref;
use crate::sfa::{Move, Sfa, State};
use crate::types::CharEncoding;

const SURROGATES: (u32, u32) = (0xD800, 0xDFFF);

pub struct Compiler<'a> {
    bdd: &'a Bdd,
    decoder: &'a mut ClassDecoder,
}

impl<'a> Compiler<'a> {
    pub fn new(bdd: &'a Bdd, decoder: &'a mut ClassDecoder) -> Self {
        assert_eq!(
            bdd.bit_width(),
            decoder.encoding().bit_width(),
            "Decoder encoding does not match the BDD bit width"
        );
        Self { bdd, decoder }
    }

    /// Compile a whole pattern.
    pub fn compile_root(&mut self, node: &RegexNode) -> Result<Sfa> {
        self.compile(node, 0, true, true)
    }

    pub fn compile(&mut self, node: &RegexNode, min: State, is_start: bool, is_end: bool) -> Result<Sfa> {
        debug!(
            "compile({}, min = {}, is_start = {}, is_end = {})",
            node.kind(),
            min,
            is_start,
            is_end
        );

        match node {
            RegexNode::Char { c, ignore_case } => {
                let cond = self.bdd.char_constraint(*ignore_case, *c);
                Ok(self.chain(&[cond], min, is_start, is_end))
            }
            RegexNode::NotChar { c, ignore_case } => {
                let cond = self.not_char(*c, *ignore_case);
                Ok(self.chain(&[cond], min, is_start, is_end))
            }
            RegexNode::Set { class, ignore_case } => {
                let cond = self.decoder.decode(self.bdd, class, *ignore_case)?;
                Ok(self.chain(&[cond], min, is_start, is_end))
            }
            RegexNode::Literal { chars, ignore_case } => {
                let conds: Vec<Ref> = chars
                    .iter()
                    .map(|&c| self.bdd.char_constraint(*ignore_case, c))
                    .collect();
                Ok(self.chain(&conds, min, is_start, is_end))
            }
            RegexNode::CharLoop {
                c,
                ignore_case,
                min: m,
                max: n,
            } => {
                let cond = self.bdd.char_constraint(*ignore_case, *c);
                self.cond_loop(cond, *m, *n, min, is_start, is_end)
            }
            RegexNode::NotCharLoop {
                c,
                ignore_case,
                min: m,
                max: n,
            } => {
                let cond = self.not_char(*c, *ignore_case);
                self.cond_loop(cond, *m, *n, min, is_start, is_end)
            }
            RegexNode::SetLoop {
                class,
                ignore_case,
                min: m,
                max: n,
            } => {
                let cond = self.decoder.decode(self.bdd, class, *ignore_case)?;
                self.cond_loop(cond, *m, *n, min, is_start, is_end)
            }
            RegexNode::Loop { body, min: m, max: n } => {
                let body = self.compile(body, min, false, false)?;
                let res = self.repeat(body, *m, *n)?;
                Ok(self.extend_loop(res, min, is_start, is_end))
            }
            RegexNode::Concatenate(nodes) => self.concatenate(nodes, min, is_start, is_end),
            RegexNode::Alternate(nodes) => self.alternate(nodes, min, is_start, is_end),
            RegexNode::Capture(node) => self.compile(node, min, is_start, is_end),
            RegexNode::Beginning => self.anchor(is_start, is_end, "^", min),
            RegexNode::End => self.anchor(is_end, is_start, "\\z", min),
            RegexNode::EndZ => self.anchor(is_end, is_start, "$", min),
            RegexNode::Bol => self.line_anchor(true, min, is_start, is_end),
            RegexNode::Eol => self.line_anchor(false, min, is_start, is_end),
            RegexNode::Empty => Ok(if is_start || is_end {
                self.any_loop(min)
            } else {
                epsilon_at(min)
            }),
            RegexNode::Nothing => Ok(Sfa::empty()),
            RegexNode::Unsupported(name) => Err(RexError::UnsupportedConstruct(name.clone())),
        }
    }

    /// Restrict `cond` to codes that stand for a character on their own.
    fn guard(&self, cond: Ref) -> Ref {
        if self.decoder.encoding() != CharEncoding::Utf16 {
            return cond;
        }
        let surrogates = self.bdd.range_constraint(false, SURROGATES.0, SURROGATES.1);
        self.bdd.apply_and(cond, self.bdd.apply_not(surrogates))
    }

    fn any(&self) -> Ref {
        self.guard(self.bdd.one())
    }

    fn not_char(&self, c: char, ignore_case: bool) -> Ref {
        self.bdd.apply_not(self.bdd.char_constraint(ignore_case, c))
    }

    /// The single final state `min` looping on any character.
    fn any_loop(&self, min: State) -> Sfa {
        Sfa::build(min, [min].into(), vec![Move::guarded(min, min, self.any())])
    }

    /// A linear run of states, one move per condition, padded at unanchored boundaries.
    fn chain(&self, conds: &[Ref], min: State, is_start: bool, is_end: bool) -> Sfa {
        let conds: Vec<Ref> = conds.iter().map(|&c| self.guard(c)).collect();
        if conds.iter().any(|&c| self.bdd.is_zero(c)) {
            return Sfa::empty();
        }

        let last = min + conds.len() as State;
        let mut moves: Vec<Move> = conds
            .iter()
            .zip(min..)
            .map(|(&cond, s)| Move::guarded(s, s + 1, cond))
            .collect();
        if is_start {
            moves.push(Move::guarded(min, min, self.any()));
        }
        if is_end && (!is_start || last != min) {
            moves.push(Move::guarded(last, last, self.any()));
        }
        Sfa::build(min, [last].into(), moves)
    }

    fn anchor(&self, at_boundary: bool, at_opposite: bool, name: &str, min: State) -> Result<Sfa> {
        if !at_boundary {
            return Err(RexError::MisplacedAnchor {
                anchor: name.to_string(),
            });
        }
        Ok(if at_opposite {
            self.any_loop(min)
        } else {
            epsilon_at(min)
        })
    }

    /// Multiline `^` (`bol`) or `$`: the input boundary itself, or a newline next to it.
    fn line_anchor(&self, bol: bool, min: State, is_start: bool, is_end: bool) -> Result<Sfa> {
        let (at_boundary, at_opposite, name) = if bol {
            (is_start, is_end, "^ (multiline)")
        } else {
            (is_end, is_start, "$ (multiline)")
        };
        if !at_boundary {
            return Err(RexError::MisplacedAnchor {
                anchor: name.to_string(),
            });
        }
        if at_opposite {
            return Ok(self.any_loop(min));
        }

        let (middle, last) = (min + 1, min + 2);
        let newline = self.bdd.char_constraint(false, '\n');
        let moves = if bol {
            // "" or anything ending in a newline.
            vec![
                Move::epsilon(min, last),
                Move::epsilon(min, middle),
                Move::guarded(middle, middle, self.any()),
                Move::guarded(middle, last, newline),
            ]
        } else {
            // "" or a newline followed by anything.
            vec![
                Move::epsilon(min, last),
                Move::guarded(min, middle, newline),
                Move::guarded(middle, middle, self.any()),
                Move::epsilon(middle, last),
            ]
        };
        Ok(Sfa::build(min, [last].into(), moves))
    }

    fn concatenate(&mut self, nodes: &[RegexNode], min: State, is_start: bool, is_end: bool) -> Result<Sfa> {
        let mut next = min;
        let mut parts: Vec<Sfa> = Vec::with_capacity(nodes.len());
        let mut is_empty = false;

        for (i, node) in nodes.iter().enumerate() {
            let first = is_start && i == 0;
            let last = is_end && i + 1 == nodes.len();
            let sfa = self.compile(node, next, first, last)?;
            next = next.max(sfa.max_state() + 1);

            if sfa.is_empty() {
                is_empty = true;
            } else if !sfa.is_epsilon() {
                parts.push(sfa);
            }
        }

        if is_empty {
            return Ok(Sfa::empty());
        }
        let mut parts = parts.into_iter();
        let Some(mut res) = parts.next() else {
            return Ok(epsilon_at(min));
        };
        for part in parts {
            res.concat(part);
        }
        Ok(res)
    }

    fn alternate(&mut self, nodes: &[RegexNode], min: State, is_start: bool, is_end: bool) -> Result<Sfa> {
        let start = min;
        let mut next = min + 1;
        let mut branches: Vec<Sfa> = Vec::with_capacity(nodes.len());
        let mut accepts_empty = false;

        for node in nodes {
            let sfa = self.compile(node, next, is_start, is_end)?;
            next = next.max(sfa.max_state() + 1);

            if sfa.is_empty() {
                continue;
            }
            if sfa.is_final(sfa.initial_state()) {
                accepts_empty = true;
            }
            if !sfa.is_epsilon() {
                branches.push(sfa);
            }
        }

        match branches.len() {
            0 if accepts_empty => return Ok(epsilon_at(min)),
            0 => return Ok(Sfa::empty()),
            1 if !accepts_empty => return Ok(branches.remove(0)),
            _ => {}
        }

        let end = next;
        let unify_start = branches.iter().all(|b| !b.initial_has_incoming());
        let sinks: Option<Vec<State>> = branches.iter().map(Sfa::single_final_sink).collect();

        let mut finals = BTreeSet::new();
        let mut moves = Vec::new();
        for b in &branches {
            let initial = b.initial_state();
            let sink = sinks.as_ref().and_then(|_| b.single_final_sink());
            for m in b.moves() {
                let source = if unify_start && m.source == initial { start } else { m.source };
                let target = if Some(m.target) == sink { end } else { m.target };
                moves.push(Move { source, target, ..*m });
            }
            if !unify_start {
                moves.push(Move::epsilon(start, initial));
            }
            if sink.is_none() {
                finals.extend(b.final_states().iter().filter(|&&f| !(unify_start && f == initial)));
            }
        }
        if sinks.is_some() {
            finals.insert(end);
        }
        if accepts_empty {
            finals.insert(start);
        }

        let mut res = Sfa::build(start, finals, moves);
        res.set_deterministic(unify_start && self.mutually_exclusive(&branches));
        Ok(res)
    }

    /// Every branch is deterministic and no two branches share a first character.
    fn mutually_exclusive(&self, branches: &[Sfa]) -> bool {
        if !branches.iter().all(Sfa::is_deterministic) {
            return false;
        }
        let firsts: Vec<Vec<Option<Ref>>> = branches
            .iter()
            .map(|b| b.moves_from(b.initial_state()).iter().map(|m| m.condition).collect())
            .collect();
        for (i, a) in firsts.iter().enumerate() {
            for b in &firsts[i + 1..] {
                for &x in a {
                    for &y in b {
                        let (Some(x), Some(y)) = (x, y) else {
                            return false;
                        };
                        if !self.bdd.is_zero(self.bdd.apply_and(x, y)) {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }

    fn cond_loop(&mut self, cond: Ref, m: u32, n: u32, min: State, is_start: bool, is_end: bool) -> Result<Sfa> {
        let body = self.chain(&[cond], min, false, false);
        let res = self.repeat(body, m, n)?;
        Ok(self.extend_loop(res, min, is_start, is_end))
    }

    /// Between `m` and `n` repetitions of `body`.
    fn repeat(&self, mut body: Sfa, m: u32, n: u32) -> Result<Sfa> {
        if m > n {
            return Err(RexError::InvalidArgument(format!(
                "repetition lower bound {} exceeds upper bound {}",
                m, n
            )));
        }
        if n == 0 || body.is_epsilon() {
            return Ok(Sfa::epsilon());
        }
        if body.is_empty() {
            return Ok(if m == 0 { Sfa::epsilon() } else { Sfa::empty() });
        }

        let bdd = self.bdd;
        let or = |a, b| bdd.apply_or(a, b);
        Ok(match (m, n) {
            (0, INFINITE) => body.make_kleene_closure(or),
            (0, 1) => {
                body.make_initial_state_final();
                body
            }
            (1, 1) => body,
            (_, INFINITE) if body.is_final(body.initial_state()) => body.make_kleene_closure(or),
            (m, INFINITE) => {
                let mut res = body.clone();
                for _ in 1..m {
                    res.concat(body.make_copy(res.max_state() + 1));
                }
                let tail = body.make_copy(res.max_state() + 1).make_kleene_closure(or);
                res.concat(tail);
                res
            }
            (m, n) => {
                let mut res = body.clone();
                if m == 0 {
                    res.make_initial_state_final();
                }
                for i in 1..n {
                    let mut copy = body.make_copy(res.max_state() + 1);
                    if i >= m {
                        copy.make_initial_state_final();
                    }
                    res.concat(copy);
                }
                res
            }
        })
    }

    /// Pad a repetition at unanchored boundaries.
    fn extend_loop(&self, mut sfa: Sfa, min: State, is_start: bool, is_end: bool) -> Sfa {
        if sfa.is_empty() || !(is_start || is_end) {
            return sfa;
        }
        if sfa.is_epsilon() {
            return self.any_loop(min);
        }

        let any = self.any();
        if is_start {
            let initial = sfa.initial_state();
            sfa.add_move(Move::guarded(initial, initial, any));
        }
        if is_end {
            let finals: Vec<State> = sfa.final_states().iter().copied().collect();
            for f in finals {
                if !(is_start && f == sfa.initial_state()) {
                    sfa.add_move(Move::guarded(f, f, any));
                }
            }
        }
        sfa
    }
}

fn epsilon_at(state: State) -> Sfa {
    Sfa::build(state, [state].into(), Vec::new())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use test_log::test;

    use super::*;
    use crate::options::RegexOptions;
    use crate::parse::parse;
    use crate::unicode::StdCategoryProvider;

    fn compile_with(bdd: &Bdd, encoding: CharEncoding, pattern: &str) -> Result<Sfa> {
        let mut decoder = ClassDecoder::new(Arc::new(StdCategoryProvider), encoding);
        let node = parse(pattern, RegexOptions::empty())?;
        Compiler::new(bdd, &mut decoder).compile_root(&node)
    }

    fn compile(bdd: &Bdd, pattern: &str) -> Result<Sfa> {
        compile_with(bdd, CharEncoding::Ascii, pattern)
    }

    fn check(pattern: &str, accepted: &[&str], rejected: &[&str]) {
        let bdd = Bdd::new(7);
        let sfa = compile(&bdd, pattern).unwrap();
        for s in accepted {
            assert!(sfa.accepts(&bdd, s), "{:?} should accept {:?}", pattern, s);
        }
        for s in rejected {
            assert!(!sfa.accepts(&bdd, s), "{:?} should reject {:?}", pattern, s);
        }
    }

    #[test]
    fn test_anchored_literal() {
        let bdd = Bdd::new(7);
        let sfa = compile(&bdd, "^abc$").unwrap();
        assert_eq!(sfa.num_states(), 4);
        assert_eq!(sfa.num_moves(), 3);
        assert!(sfa.is_deterministic());
        check("^abc$", &["abc"], &["", "ab", "abcd", "xabc"]);
    }

    #[test]
    fn test_unanchored_padding() {
        check("abc", &["abc", "xxabc", "abcyy", "-abc-"], &["ab", "acb"]);
        check("^abc", &["abc", "abcde"], &["xabc"]);
        check("abc$", &["abc", "xabc"], &["abcx"]);
    }

    #[test]
    fn test_classes() {
        check("^[0-9]{3}$", &["000", "123", "999"], &["12", "1234", "12a"]);
        check("^\\d{5}-\\d\\d\\d\\d$", &["12345-6789"], &["1234-56789", "12345 6789"]);
        check("^[^a-y]$", &["z", "A", "\n"], &["a", "m", ""]);
        check("^.$", &["a", " "], &["\n", ""]);
        check("(?s)^.$", &["\n"], &[""]);
        check("^\\w\\s$", &["a ", "_\t", "9\n"], &["  ", "a"]);
    }

    #[test]
    fn test_ignore_case() {
        check("^(?i)ab$", &["ab", "AB", "aB"], &["abc", "ac"]);
        check("^a(?i:b)c$", &["abc", "aBc"], &["Abc", "abC"]);
    }

    #[test]
    fn test_alternation() {
        check("^(a|b|c)$", &["a", "b", "c"], &["", "d", "ab"]);
        check("^(ab|cd|)$", &["", "ab", "cd"], &["a", "abcd"]);
        check("^(a|bc)d$", &["ad", "bcd"], &["d", "abcd"]);

        let bdd = Bdd::new(7);
        let sfa = compile(&bdd, "^(ab|cd)$").unwrap();
        // Start and end states are shared by both branches.
        assert_eq!(sfa.num_states(), 4);
        assert_eq!(sfa.final_states().len(), 1);
        assert!(sfa.is_deterministic());
        assert!(sfa.is_epsilon_free());

        let sfa = compile(&bdd, "^(ab|ac)$").unwrap();
        assert!(!sfa.is_deterministic());
    }

    #[test]
    fn test_loops() {
        check("^a*$", &["", "a", "aaaa"], &["b", "ab"]);
        check("^a+$", &["a", "aaa"], &[""]);
        check("^a?$", &["", "a"], &["aa"]);
        check("^(ab)*$", &["", "ab", "abab"], &["a", "aba"]);
        check("^(ab){2,}$", &["abab", "ababab"], &["", "ab"]);
        check("^(ab){1,3}$", &["ab", "abab", "ababab"], &["", "abababab"]);
        check("^(ab){0,2}$", &["", "ab", "abab"], &["ababab"]);
        check("^a{2,4}$", &["aa", "aaa", "aaaa"], &["a", "aaaaa"]);
        check("^a{3}$", &["aaa"], &["aa", "aaaa"]);
        check("^(a*b)*$", &["", "b", "aab", "babab"], &["a", "aba"]);
        check("^(a|b?)+$", &["", "a", "bab"], &["c"]);
        check("^a{0}$", &[""], &["a"]);
    }

    #[test]
    fn test_loop_padding() {
        check("a+", &["a", "xa", "ax", "xax"], &["", "x"]);
        check("a*", &["", "b"], &[]);
    }

    #[test]
    fn test_concatenation_of_parts() {
        check("^(a|b)c*(d|ef)$", &["ad", "bccef", "aef"], &["a", "abd", "cd"]);
    }

    #[test]
    fn test_anchor_placement() {
        let bdd = Bdd::new(7);
        assert!(matches!(compile(&bdd, "a^b"), Err(RexError::MisplacedAnchor { .. })));
        assert!(matches!(compile(&bdd, "a$b"), Err(RexError::MisplacedAnchor { .. })));
        assert!(matches!(compile(&bdd, "(^a)*"), Err(RexError::MisplacedAnchor { .. })));
        assert!(matches!(compile(&bdd, "a\\Ab"), Err(RexError::MisplacedAnchor { .. })));
        assert!(compile(&bdd, "^$").unwrap().is_epsilon());
        assert!(compile(&bdd, "^").unwrap().accepts(&bdd, "anything"));
    }

    #[test]
    fn test_multiline_anchors() {
        check("(?m)^a$", &["a"], &["ab"]);
        check("(?m)^a", &["a", "x\na", "ab"], &["xa"]);
        check("(?m)a$", &["a", "a\nx"], &["ax"]);
    }

    #[test]
    fn test_unsupported() {
        let bdd = Bdd::new(7);
        assert!(matches!(compile(&bdd, "a+?"), Err(RexError::UnsupportedConstruct(_))));
        assert!(matches!(compile(&bdd, "\\bfoo"), Err(RexError::UnsupportedConstruct(_))));
    }

    #[test]
    fn test_unsatisfiable() {
        let bdd = Bdd::new(7);
        assert!(compile(&bdd, "^[^\\x00-\\x7F]$").unwrap().is_empty());
        assert!(compile(&bdd, "^a[^\\x00-\\x7F]b$").unwrap().is_empty());
        assert!(compile(&bdd, "^([^\\x00-\\x7F])*$").unwrap().is_epsilon());
        assert!(compile(&bdd, "^(a|[^\\x00-\\x7F])$").unwrap().accepts(&bdd, "a"));
    }

    #[test]
    fn test_utf16_excludes_surrogates() {
        let bdd = Bdd::new(16);
        let sfa = compile_with(&bdd, CharEncoding::Utf16, "^.$").unwrap();
        let cond = sfa.moves().find_map(|m| m.condition).unwrap();
        assert!(!bdd.eval(cond, 0xD800));
        assert!(!bdd.eval(cond, 0xDFFF));
        assert!(bdd.eval(cond, 0xE000));
        assert!(bdd.eval(cond, 'a' as u32));
        assert!(!bdd.eval(cond, '\n' as u32));
    }
}
