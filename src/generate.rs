//! Random walks over an [`Sfa`] and the deduplicated stream of strings they produce.

use std::collections::{BTreeSet, HashSet, VecDeque};

use log::debug;

use crate::bdd::Bdd;
use crate::chooser::Chooser;
use crate::error::{Result, RexError};
use crate::sfa::Sfa;

/// Retries allowed for a duplicate walk once `distinct` strings have been produced.
pub fn retry_limit(distinct: usize) -> usize {
    (100 + distinct).min(200)
}

/// One random walk from the initial state.
///
/// At a final state a coin decides whether to stop, unless there is nowhere to go.
/// Otherwise a move is picked uniformly; a guarded move appends one character sampled from
/// its condition. The walk ends only at a final state, so its length is unbounded.
pub fn walk<C: Chooser + ?Sized>(sfa: &Sfa, bdd: &Bdd, chooser: &mut C) -> String {
    let mut out = String::new();
    let mut state = sfa.initial_state();
    loop {
        let moves = sfa.moves_from(state);
        if sfa.is_final(state) && (moves.is_empty() || chooser.choose_bool()) {
            break;
        }
        if moves.is_empty() {
            // A dead end; `generate_members` rules these out.
            break;
        }

        let m = moves[chooser.choose(moves.len())];
        if let Some(cond) = m.condition {
            if let Some(code) = bdd.sample_member(chooser, cond) {
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
        state = m.target;
    }
    out
}

/// Lazily generated, distinct members of an automaton's language.
///
/// Each item is a fresh [`walk`]. A walk repeating an earlier item is retried up to
/// [`retry_limit`] times; when that is exhausted the sequence ends, on the assumption that
/// the language has no unseen members left.
pub struct Members<'a, C: Chooser + ?Sized> {
    sfa: Sfa,
    bdd: &'a Bdd,
    chooser: &'a mut C,
    seen: HashSet<String>,
    remaining: Option<usize>,
    done: bool,
}

impl<C: Chooser + ?Sized> Members<'_, C> {
    pub fn sfa(&self) -> &Sfa {
        &self.sfa
    }

    /// Number of distinct strings produced so far.
    pub fn produced(&self) -> usize {
        self.seen.len()
    }
}

impl<C: Chooser + ?Sized> Iterator for Members<'_, C> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done || self.remaining == Some(0) {
            return None;
        }

        let limit = retry_limit(self.seen.len());
        let mut s = walk(&self.sfa, self.bdd, &mut *self.chooser);
        let mut retries = 0;
        while self.seen.contains(&s) {
            if retries == limit {
                debug!("no new member after {} retries, {} produced", limit, self.seen.len());
                self.done = true;
                return None;
            }
            retries += 1;
            s = walk(&self.sfa, self.bdd, &mut *self.chooser);
        }

        self.seen.insert(s.clone());
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(s)
    }
}

/// Members of the language of `sfa`: at most `count` of them, or unboundedly many.
pub fn generate_members<'a, C: Chooser + ?Sized>(
    sfa: Sfa,
    bdd: &'a Bdd,
    chooser: &'a mut C,
    count: Option<usize>,
) -> Result<Members<'a, C>> {
    if sfa.is_empty() {
        return Err(RexError::InvalidArgument(
            "the automaton accepts no strings".to_string(),
        ));
    }
    if let Some(state) = dead_end(&sfa) {
        return Err(RexError::InvalidAutomaton(format!(
            "state {} is reachable, not final, and has no moves",
            state
        )));
    }

    Ok(Members {
        sfa,
        bdd,
        chooser,
        seen: HashSet::new(),
        remaining: count,
        done: false,
    })
}

/// A reachable non-final state without outgoing moves, where a walk would get stuck.
fn dead_end(sfa: &Sfa) -> Option<u32> {
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([sfa.initial_state()]);
    while let Some(s) = queue.pop_front() {
        if !visited.insert(s) {
            continue;
        }
        let moves = sfa.moves_from(s);
        if moves.is_empty() && !sfa.is_final(s) {
            return Some(s);
        }
        queue.extend(moves.iter().map(|m| m.target));
    }
    None
}
