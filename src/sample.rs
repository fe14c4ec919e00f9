//! Drawing and inspecting members of a BDD.
//!
//! A BDD over `bit_width` bits denotes a set of character codes. This module picks one
//! member at random, counts members, and lists them as sorted code ranges.

use std::collections::HashMap;
use std::fmt::Write;

use crate::bdd::Bdd;
use crate::chooser::Chooser;
use crate::reference::Ref;

impl Bdd {
    /// Draw one member of `f`, or `None` if `f` is empty.
    ///
    /// Bits are decided most significant first. A bit the diagram does not test costs one
    /// coin; a tested bit with a `False` branch is forced and costs nothing; any other tested
    /// bit costs one coin, heads meaning the `true` branch. The result is *a* member,
    /// not a uniform sample over all members.
    pub fn sample_member<C: Chooser + ?Sized>(&self, chooser: &mut C, f: Ref) -> Option<u32> {
        if self.is_zero(f) {
            return None;
        }

        let mut code = 0u32;
        let mut current = f;
        for k in 0..self.bit_width() {
            let bit = if k < self.ordinal(current) {
                // Also covers terminals, whose ordinal is larger than any bit.
                chooser.choose_bool()
            } else {
                let node = self.node(current);
                let bit = if self.is_zero(node.false_case) {
                    true
                } else if self.is_zero(node.true_case) {
                    false
                } else {
                    chooser.choose_bool()
                };
                current = if bit {
                    node.true_case
                } else {
                    node.false_case
                };
                bit
            };
            code = (code << 1) | bit as u32;
        }

        debug_assert!(self.is_one(current));
        Some(code)
    }

    /// Number of codes in `f`.
    pub fn member_count(&self, f: Ref) -> u32 {
        let mut cache = HashMap::new();
        let level = self.level(f);
        self.count_below(f, &mut cache) << level
    }

    /// Ordinal of `f`, with terminals sitting just below the last bit.
    fn level(&self, f: Ref) -> u32 {
        if self.is_terminal(f) {
            self.bit_width()
        } else {
            self.ordinal(f)
        }
    }

    /// Members over the bits from `level(f)` down.
    fn count_below(&self, f: Ref, cache: &mut HashMap<Ref, u32>) -> u32 {
        if self.is_zero(f) {
            return 0;
        }
        if self.is_one(f) {
            return 1;
        }
        if let Some(&count) = cache.get(&f) {
            return count;
        }

        let node = self.node(f);
        let t = self.count_below(node.true_case, cache) << (self.level(node.true_case) - node.ordinal - 1);
        let e = self.count_below(node.false_case, cache) << (self.level(node.false_case) - node.ordinal - 1);
        let count = t + e;
        cache.insert(f, count);
        count
    }

    /// Members of `f` as sorted, maximal, inclusive code ranges.
    pub fn to_ranges(&self, f: Ref) -> Vec<(u32, u32)> {
        let mut ranges = Vec::new();
        self.collect_ranges(f, 0, 0, &mut ranges);
        ranges
    }

    fn collect_ranges(&self, f: Ref, depth: u32, prefix: u32, ranges: &mut Vec<(u32, u32)>) {
        if self.is_zero(f) {
            return;
        }
        let rest = self.bit_width() - depth;
        if self.is_one(f) {
            let lo = prefix << rest;
            let hi = lo + ((1u32 << rest) - 1);
            match ranges.last_mut() {
                Some((_, last)) if *last + 1 == lo => *last = hi,
                _ => ranges.push((lo, hi)),
            }
            return;
        }

        // Visit the 0 branch first so ranges come out sorted.
        let (t, e) = if depth < self.ordinal(f) {
            (f, f)
        } else {
            (self.true_case(f), self.false_case(f))
        };
        self.collect_ranges(e, depth + 1, prefix << 1, ranges);
        self.collect_ranges(t, depth + 1, (prefix << 1) | 1, ranges);
    }

    /// Render `f` as a character class, e.g. `[0-9a-f]` or `[^\n]`.
    pub fn pretty(&self, f: Ref) -> String {
        if self.is_one(f) {
            return ".".to_string();
        }
        let ranges = self.to_ranges(f);
        if let [(lo, hi)] = ranges[..] {
            if lo == hi {
                return escape(lo);
            }
        }

        let complement = self.to_ranges(self.apply_not(f));
        let (negated, ranges) = if complement.len() < ranges.len() {
            (true, complement)
        } else {
            (false, ranges)
        };

        let mut out = String::from("[");
        if negated {
            out.push('^');
        }
        for (lo, hi) in ranges {
            out.push_str(&escape(lo));
            if hi == lo + 1 {
                out.push_str(&escape(hi));
            } else if hi > lo {
                out.push('-');
                out.push_str(&escape(hi));
            }
        }
        out.push(']');
        out
    }
}

fn escape(code: u32) -> String {
    match char::from_u32(code) {
        Some('\n') => "\\n".to_string(),
        Some('\t') => "\\t".to_string(),
        Some('\r') => "\\r".to_string(),
        Some(c @ ('\\' | '[' | ']' | '-' | '^' | '.')) => format!("\\{}", c),
        Some(c) if c.is_ascii_graphic() || c == ' ' => c.to_string(),
        _ => {
            let mut s = String::new();
            if code <= 0xFF {
                let _ = write!(s, "\\x{:02X}", code);
            } else {
                let _ = write!(s, "\\u{:04X}", code);
            }
            s
        }
    }
}
