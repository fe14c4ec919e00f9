//! The BDD engine over fixed-width character codes.
//!
//! A [`Bdd`] manager owns an arena of reduced, ordered decision nodes. Variable `k`
//! (the node's *ordinal*) is bit `k` of a character code counted from the most
//! significant bit, so ordinal 0 is tested first. The two terminals carry
//! [`TERMINAL_ORDINAL`], which sorts after every real bit.
//!
//! All construction goes through [`Bdd::mk_node`], which applies the reduction rule
//! and hash-conses through the unique table. Together they make the representation
//! canonical: two [`Ref`]s are equal iff they denote the same set of codes.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::node::{Node, TERMINAL_ORDINAL};
use crate::reference::Ref;
use crate::table::Table;

type Storage = Table<Node>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum BoolOp {
    And,
    Or,
}

pub struct Bdd {
    bit_width: u32,
    storage: RefCell<Storage>,
    or_cache: RefCell<Cache<(Ref, Ref), Ref>>,
    and_cache: RefCell<Cache<(Ref, Ref), Ref>>,
    not_cache: RefCell<Cache<Ref, Ref>>,
    restrict_cache: RefCell<Cache<(Ref, u32, bool), Ref>>,
    int_cache: RefCell<Cache<u32, Ref>>,
    range_cache: RefCell<Cache<(u32, u32), Ref>>,
}

impl Bdd {
    /// Create a manager for character codes of `bit_width` bits.
    pub fn new(bit_width: u32) -> Self {
        assert!(
            (1..=16).contains(&bit_width),
            "Bit width should be in the range 1..=16"
        );

        let mut storage = Storage::new(16);

        // Terminals occupy the first two cells.
        let zero = storage.add(Node::terminal());
        assert_eq!(zero, Ref::FALSE.index());
        let one = storage.add(Node::terminal());
        assert_eq!(one, Ref::TRUE.index());

        Self {
            bit_width,
            storage: RefCell::new(storage),
            or_cache: RefCell::new(Cache::new(12)),
            and_cache: RefCell::new(Cache::new(12)),
            not_cache: RefCell::new(Cache::new(10)),
            restrict_cache: RefCell::new(Cache::new(12)),
            int_cache: RefCell::new(Cache::new(8)),
            range_cache: RefCell::new(Cache::new(8)),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(16)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let storage = self.storage.borrow();
        f.debug_struct("Bdd")
            .field("bit_width", &self.bit_width)
            .field("nodes", &storage.len())
            .field("buckets", &storage.num_buckets())
            .finish()
    }
}

impl Bdd {
    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Largest representable character code, `2^bit_width - 1`.
    pub fn max_code(&self) -> u32 {
        (1u32 << self.bit_width) - 1
    }

    /// Number of nodes in the arena, terminals included.
    pub fn num_nodes(&self) -> usize {
        self.storage.borrow().len()
    }

    /// The constant `True` function.
    pub fn one(&self) -> Ref {
        Ref::TRUE
    }

    /// The constant `False` function.
    pub fn zero(&self) -> Ref {
        Ref::FALSE
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::FALSE
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::TRUE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.is_terminal()
    }

    pub fn node(&self, node: Ref) -> Node {
        *self.storage.borrow().value(node.index())
    }
    pub fn ordinal(&self, node: Ref) -> u32 {
        self.storage.borrow().value(node.index()).ordinal
    }
    pub fn true_case(&self, node: Ref) -> Ref {
        self.storage.borrow().value(node.index()).true_case
    }
    pub fn false_case(&self, node: Ref) -> Ref {
        self.storage.borrow().value(node.index()).false_case
    }

    /// Build (or reuse) the node testing `ordinal`.
    ///
    /// Applies the reduction rule: a test whose branches coincide is the shared branch.
    pub fn mk_node(&self, ordinal: u32, true_case: Ref, false_case: Ref) -> Ref {
        assert!(
            ordinal < self.bit_width,
            "Ordinal {} is out of range for {} bits",
            ordinal,
            self.bit_width
        );

        if true_case == false_case {
            return true_case;
        }

        let i = self.storage.borrow_mut().put(Node {
            ordinal,
            true_case,
            false_case,
        });
        Ref::new(i as u32)
    }

    /// Fix bit `bit` of `f` to `value`.
    pub fn restrict(&self, f: Ref, bit: u32, value: bool) -> Ref {
        let node = self.node(f);

        if bit < node.ordinal {
            // `f` does not test `bit` (terminals never do).
            return f;
        }
        if bit == node.ordinal {
            return if value { node.true_case } else { node.false_case };
        }

        let key = (f, bit, value);
        if let Some(res) = self.restrict_cache.borrow_mut().get(&key) {
            return res;
        }

        let t = self.restrict(node.true_case, bit, value);
        let e = self.restrict(node.false_case, bit, value);
        let res = if t == node.true_case && e == node.false_case {
            f
        } else {
            self.mk_node(node.ordinal, t, e)
        };
        self.restrict_cache.borrow_mut().insert(key, res);
        res
    }

    fn op_cache(&self, op: BoolOp) -> &RefCell<Cache<(Ref, Ref), Ref>> {
        match op {
            BoolOp::And => &self.and_cache,
            BoolOp::Or => &self.or_cache,
        }
    }

    fn apply(&self, op: BoolOp, a: Ref, b: Ref) -> Ref {
        // Terminal shortcuts:
        //   or(1,B) => 1, or(0,B) => B
        //   and(0,B) => 0, and(1,B) => B
        match op {
            BoolOp::Or => {
                if self.is_one(a) || self.is_one(b) {
                    return Ref::TRUE;
                }
                if self.is_zero(a) {
                    return b;
                }
                if self.is_zero(b) {
                    return a;
                }
            }
            BoolOp::And => {
                if self.is_zero(a) || self.is_zero(b) {
                    return Ref::FALSE;
                }
                if self.is_one(a) {
                    return b;
                }
                if self.is_one(b) {
                    return a;
                }
            }
        }
        if a == b {
            return a;
        }

        let key = (a, b);
        if let Some(res) = self.op_cache(op).borrow_mut().get(&key) {
            debug!("cache: {:?}({}, {}) -> {}", op, a, b, res);
            return res;
        }

        let i = self.ordinal(a);
        let j = self.ordinal(b);
        let res = match i.cmp(&j) {
            Ordering::Less => {
                let t = self.apply(op, self.restrict(a, i, true), b);
                let e = self.apply(op, self.restrict(a, i, false), b);
                self.mk_node(i, t, e)
            }
            Ordering::Greater => {
                let t = self.apply(op, a, self.restrict(b, j, true));
                let e = self.apply(op, a, self.restrict(b, j, false));
                self.mk_node(j, t, e)
            }
            Ordering::Equal => {
                let t = self.apply(op, self.restrict(a, i, true), self.restrict(b, i, true));
                let e = self.apply(op, self.restrict(a, i, false), self.restrict(b, i, false));
                self.mk_node(i, t, e)
            }
        };

        self.op_cache(op).borrow_mut().insert(key, res);
        res
    }

    pub fn apply_or(&self, a: Ref, b: Ref) -> Ref {
        debug!("apply_or(a = {}, b = {})", a, b);
        self.apply(BoolOp::Or, a, b)
    }

    pub fn apply_and(&self, a: Ref, b: Ref) -> Ref {
        debug!("apply_and(a = {}, b = {})", a, b);
        self.apply(BoolOp::And, a, b)
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        if self.is_zero(f) {
            return Ref::TRUE;
        }
        if self.is_one(f) {
            return Ref::FALSE;
        }

        if let Some(res) = self.not_cache.borrow_mut().get(&f) {
            return res;
        }

        let node = self.node(f);
        let t = self.apply_not(node.true_case);
        let e = self.apply_not(node.false_case);
        let res = self.mk_node(node.ordinal, t, e);
        self.not_cache.borrow_mut().insert(f, res);
        res
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::TRUE;
        for node in nodes {
            res = self.apply_and(res, node);
            if self.is_zero(res) {
                break;
            }
        }
        res
    }

    pub fn apply_or_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        let mut res = Ref::FALSE;
        for node in nodes {
            res = self.apply_or(res, node);
            if self.is_one(res) {
                break;
            }
        }
        res
    }

    /// Exact-value constraint: the set `{n}`.
    pub fn from_int(&self, n: u32) -> Ref {
        debug!("from_int(n = {})", n);

        if let Some(res) = self.int_cache.borrow_mut().get(&n) {
            return res;
        }

        // Build the chain bottom-up: the least significant bit sits at the deepest ordinal.
        let mut current = Ref::TRUE;
        for ordinal in (0..self.bit_width).rev() {
            let bit = (n >> (self.bit_width - 1 - ordinal)) & 1;
            current = if bit == 1 {
                self.mk_node(ordinal, current, Ref::FALSE)
            } else {
                self.mk_node(ordinal, Ref::FALSE, current)
            };
        }

        self.int_cache.borrow_mut().insert(n, current);
        current
    }

    /// Constraint for the single character `c`, or both of its cases.
    pub fn char_constraint(&self, ignore_case: bool, c: char) -> Ref {
        debug!("char_constraint(ignore_case = {}, c = {:?})", ignore_case, c);

        let max = self.max_code();
        let base = if c as u32 <= max {
            self.from_int(c as u32)
        } else {
            Ref::FALSE
        };
        if !ignore_case {
            return base;
        }
        let variants = case_variants(c)
            .map(|v| v as u32)
            .filter(|&v| v <= max)
            .map(|v| self.from_int(v));
        self.apply_or(base, self.apply_or_many(variants))
    }

    /// Constraint for the closed range `[lower, upper]`.
    ///
    /// Bounds beyond the representable codes are clamped to [`Bdd::max_code`], so a range
    /// lying entirely beyond them is `{max_code}`.
    pub fn range_constraint(&self, ignore_case: bool, lower: u32, upper: u32) -> Ref {
        debug!(
            "range_constraint(ignore_case = {}, lower = {:#x}, upper = {:#x})",
            ignore_case, lower, upper
        );

        let max = self.max_code();
        let (lower, upper) = (lower.min(max), upper.min(max));
        if lower > upper {
            return Ref::FALSE;
        }

        let span = upper - lower;
        let base = if self.bit_width == 16 && !ignore_case && span > max - span {
            // The two outer ranges are smaller than the range itself.
            let below = if lower > 0 {
                self.mk_range(0, lower - 1)
            } else {
                Ref::FALSE
            };
            let above = if upper < max {
                self.mk_range(upper + 1, max)
            } else {
                Ref::FALSE
            };
            self.apply_not(self.apply_or(below, above))
        } else {
            self.mk_range(lower, upper)
        };

        if !ignore_case {
            return base;
        }
        let extra = case_variant_ranges(lower, upper, max)
            .into_iter()
            .map(|(lo, hi)| self.mk_range(lo, hi));
        self.apply_or(base, self.apply_or_many(extra))
    }

    /// Union of range constraints.
    pub fn ranged_constraint_from_list(&self, ignore_case: bool, ranges: &[(u32, u32)]) -> Ref {
        self.apply_or_many(
            ranges
                .iter()
                .map(|&(lo, hi)| self.range_constraint(ignore_case, lo, hi)),
        )
    }

    /// Case-sensitive union of range constraints.
    pub fn from_int_ranges(&self, ranges: &[(u32, u32)]) -> Ref {
        self.ranged_constraint_from_list(false, ranges)
    }

    /// Direct construction of `[lower, upper]`, both within range.
    fn mk_range(&self, lower: u32, upper: u32) -> Ref {
        let key = (lower, upper);
        if let Some(res) = self.range_cache.borrow_mut().get(&key) {
            return res;
        }
        let res = self.mk_range_rec(lower, upper, 0);
        self.range_cache.borrow_mut().insert(key, res);
        res
    }

    /// Range over the low `bit_width - ordinal` bits.
    fn mk_range_rec(&self, lower: u32, upper: u32, ordinal: u32) -> Ref {
        if lower > upper {
            return Ref::FALSE;
        }
        let size = 1u32 << (self.bit_width - ordinal);
        if lower == 0 && upper == size - 1 {
            return Ref::TRUE;
        }

        let half = size / 2;
        if upper < half {
            let e = self.mk_range_rec(lower, upper, ordinal + 1);
            self.mk_node(ordinal, Ref::FALSE, e)
        } else if lower >= half {
            let t = self.mk_range_rec(lower - half, upper - half, ordinal + 1);
            self.mk_node(ordinal, t, Ref::FALSE)
        } else {
            let t = self.mk_range_rec(0, upper - half, ordinal + 1);
            let e = self.mk_range_rec(lower, half - 1, ordinal + 1);
            self.mk_node(ordinal, t, e)
        }
    }

    /// Check whether `code` belongs to the set denoted by `f`.
    pub fn eval(&self, f: Ref, code: u32) -> bool {
        let mut current = f;
        while !self.is_terminal(current) {
            let node = self.node(current);
            let bit = (code >> (self.bit_width - 1 - node.ordinal)) & 1;
            current = if bit == 1 {
                node.true_case
            } else {
                node.false_case
            };
        }
        self.is_one(current)
    }

    /// Nodes reachable from `nodes`, terminals included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<Ref> {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from_iter(nodes);

        while let Some(node) = queue.pop_front() {
            if visited.insert(node) && !self.is_terminal(node) {
                queue.push_back(self.true_case(node));
                queue.push_back(self.false_case(node));
            }
        }

        visited
    }

    pub fn size(&self, f: Ref) -> usize {
        self.descendants([f]).len()
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }

        let n = self.node(node);
        assert_ne!(n.ordinal, TERMINAL_ORDINAL);
        format!(
            "{}:(b{}, {}, {})",
            node,
            n.ordinal,
            self.to_bracket_string(n.true_case),
            self.to_bracket_string(n.false_case)
        )
    }
}

fn single_char(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let c = chars.next()?;
    match chars.next() {
        None => Some(c),
        Some(_) => None,
    }
}

/// The other simple (single-character) cases of `c`.
fn case_variants(c: char) -> impl Iterator<Item = char> {
    let lower = single_char(c.to_lowercase());
    let upper = single_char(c.to_uppercase());
    [lower, upper].into_iter().flatten().filter(move |&v| v != c)
}

/// Codes outside `[lower, upper]` that are a case variant of some code inside it.
fn case_variant_ranges(lower: u32, upper: u32, max: u32) -> Vec<(u32, u32)> {
    let mut codes: Vec<u32> = (lower..=upper)
        .filter_map(char::from_u32)
        .flat_map(case_variants)
        .map(|v| v as u32)
        .filter(|&v| v <= max && (v < lower || v > upper))
        .collect();
    codes.sort_unstable();
    codes.dedup();

    let mut ranges: Vec<(u32, u32)> = Vec::new();
    for code in codes {
        match ranges.last_mut() {
            Some((_, hi)) if *hi + 1 == code => *hi = code,
            _ => ranges.push((code, code)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn members(bdd: &Bdd, f: Ref) -> Vec<u32> {
        (0..=bdd.max_code()).filter(|&c| bdd.eval(f, c)).collect()
    }

    #[test]
    fn test_terminals() {
        let bdd = Bdd::new(7);

        assert!(bdd.is_terminal(bdd.zero()));
        assert!(bdd.is_zero(bdd.zero()));
        assert!(!bdd.is_one(bdd.zero()));
        assert!(bdd.is_one(bdd.one()));

        assert_eq!(bdd.ordinal(bdd.zero()), TERMINAL_ORDINAL);
        assert_eq!(bdd.ordinal(bdd.one()), TERMINAL_ORDINAL);
        assert_eq!(bdd.num_nodes(), 2);
    }

    #[test]
    fn test_mk_node_reduces() {
        let bdd = Bdd::new(7);
        let f = bdd.from_int(b'a' as u32);
        assert_eq!(bdd.mk_node(3, f, f), f);
    }

    #[test]
    fn test_mk_node_hash_conses() {
        let bdd = Bdd::new(7);
        let x = bdd.mk_node(6, bdd.one(), bdd.zero());
        let y = bdd.mk_node(6, bdd.one(), bdd.zero());
        assert_eq!(x, y);
        assert_eq!(bdd.num_nodes(), 3);
    }

    #[test]
    fn test_from_int() {
        let bdd = Bdd::new(7);
        let f = bdd.from_int(b'a' as u32);
        assert_eq!(members(&bdd, f), vec![b'a' as u32]);
        // One node per bit.
        assert_eq!(bdd.size(f), 7 + 2);
        assert_eq!(bdd.ordinal(f), 0);
        assert_eq!(bdd.from_int(b'a' as u32), f);
    }

    #[test]
    fn test_identities() {
        let bdd = Bdd::new(8);
        let a = bdd.range_constraint(false, b'a' as u32, b'z' as u32);
        let b = bdd.range_constraint(false, b'0' as u32, b'9' as u32);

        assert_eq!(bdd.apply_and(a, bdd.one()), a);
        assert_eq!(bdd.apply_or(a, bdd.zero()), a);
        assert_eq!(bdd.apply_and(a, bdd.zero()), bdd.zero());
        assert_eq!(bdd.apply_or(a, bdd.one()), bdd.one());
        assert_eq!(bdd.apply_not(bdd.apply_not(a)), a);
        assert_eq!(bdd.apply_or(a, b), bdd.apply_or(b, a));
        assert_eq!(bdd.apply_and(a, b), bdd.zero());
        assert_eq!(bdd.apply_or(a, bdd.apply_not(a)), bdd.one());
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::new(8);
        let a = bdd.range_constraint(false, 10, 200);
        let b = bdd.range_constraint(false, 100, 250);

        let f = bdd.apply_not(bdd.apply_and(a, b));
        let g = bdd.apply_or(bdd.apply_not(a), bdd.apply_not(b));
        assert_eq!(f, g);

        let f = bdd.apply_not(bdd.apply_or(a, b));
        let g = bdd.apply_and(bdd.apply_not(a), bdd.apply_not(b));
        assert_eq!(f, g);
    }

    #[test]
    fn test_canonical_ranges() {
        let bdd = Bdd::new(8);
        let whole = bdd.range_constraint(false, 10, 99);
        let left = bdd.range_constraint(false, 10, 50);
        let right = bdd.range_constraint(false, 51, 99);
        assert_eq!(bdd.apply_or(left, right), whole);
        assert_eq!(bdd.apply_or(right, left), whole);
        assert_eq!(
            bdd.range_constraint(false, 'q' as u32, 'q' as u32),
            bdd.char_constraint(false, 'q')
        );
        assert_eq!(bdd.range_constraint(false, 0, 255), bdd.one());
        assert_eq!(bdd.range_constraint(false, 9, 3), bdd.zero());
    }

    #[test]
    fn test_range_members() {
        let bdd = Bdd::new(8);
        let f = bdd.range_constraint(false, 37, 142);
        assert_eq!(members(&bdd, f), (37..=142).collect::<Vec<_>>());
    }

    #[test]
    fn test_range_complement_form() {
        let bdd = Bdd::new(16);
        let wide = bdd.range_constraint(false, 0x20, 0xFF00);
        for code in [0x00, 0x1F, 0x20, 0x7A, 0xFF00, 0xFF01, 0xFFFF] {
            assert_eq!(bdd.eval(wide, code), (0x20..=0xFF00).contains(&code));
        }
        // Same set via the direct form.
        let direct = bdd.apply_or(
            bdd.range_constraint(false, 0x20, 0x7FFF),
            bdd.range_constraint(false, 0x8000, 0xFF00),
        );
        assert_eq!(wide, direct);
    }

    #[test]
    fn test_range_clamping() {
        let bdd = Bdd::new(7);
        let f = bdd.range_constraint(false, 'x' as u32, 0xE9);
        assert_eq!(f, bdd.range_constraint(false, 'x' as u32, 0x7F));

        assert_eq!(bdd.range_constraint(false, 0x100, 0x2000), bdd.from_int(0x7F));

        let bdd = Bdd::new(8);
        assert_eq!(bdd.range_constraint(false, 0x100, 0x2000), bdd.from_int(0xFF));
        assert_eq!(members(&bdd, bdd.range_constraint(false, 0xF0, 0x20AC)), (0xF0..=0xFF).collect::<Vec<_>>());
        assert_eq!(members(&bdd, bdd.char_constraint(false, 'é')), vec![0xE9]);
        assert!(bdd.is_zero(bdd.char_constraint(false, '\u{2028}')));
    }

    #[test]
    fn test_char_constraint_ignore_case() {
        let bdd = Bdd::new(7);
        let f = bdd.char_constraint(true, 'a');
        assert_eq!(members(&bdd, f), vec![b'A' as u32, b'a' as u32]);

        let g = bdd.char_constraint(true, '5');
        assert_eq!(members(&bdd, g), vec![b'5' as u32]);
    }

    #[test]
    fn test_range_constraint_ignore_case() {
        let bdd = Bdd::new(7);
        let f = bdd.range_constraint(true, 'a' as u32, 'c' as u32);
        assert_eq!(
            members(&bdd, f),
            vec![
                b'A' as u32,
                b'B' as u32,
                b'C' as u32,
                b'a' as u32,
                b'b' as u32,
                b'c' as u32
            ]
        );
    }

    #[test]
    fn test_ranged_constraint_from_list() {
        let bdd = Bdd::new(7);
        let f = bdd.from_int_ranges(&[(b'0' as u32, b'9' as u32), (b'a' as u32, b'f' as u32)]);
        assert_eq!(members(&bdd, f).len(), 16);
        let g = bdd.ranged_constraint_from_list(true, &[(b'a' as u32, b'f' as u32)]);
        assert_eq!(members(&bdd, g).len(), 12);
    }

    #[test]
    fn test_restrict() {
        let bdd = Bdd::new(7);
        // Codes 0x40..=0x7F have bit 0 (the MSB of 7 bits) set.
        let f = bdd.range_constraint(false, 0x30, 0x4F);
        let high = bdd.restrict(f, 0, true);
        let low = bdd.restrict(f, 0, false);
        assert_eq!(members(&bdd, high).len(), 16 * 2);
        assert_eq!(members(&bdd, low).len(), 16 * 2);
        // Restricting an untested bit is the identity.
        let g = bdd.from_int(0x30);
        assert_eq!(bdd.restrict(bdd.restrict(g, 6, false), 6, false), g);
        assert_eq!(bdd.restrict(bdd.one(), 3, true), bdd.one());
    }

    #[test]
    fn test_bracket_string() {
        let bdd = Bdd::new(1);
        let f = bdd.from_int(1);
        assert_eq!(bdd.to_bracket_string(f), format!("{}:(b0, (1), (0))", f));
    }
}
