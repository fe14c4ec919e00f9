//! Symbolic finite automata.
//!
//! States are plain integers. Moves are kept in per-state lists in two maps, by source
//! (`delta`) and by target (`delta_inv`); every state of the automaton is a key of both.
//! A move carries a [`Ref`] condition over character codes, or nothing for an epsilon move.
//!
//! Two flags, `is_deterministic` and `is_epsilon_free`, are hints for the compiler. In-place
//! mutations only ever clear them; operations that rebuild an automaton recompute them.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::bdd::Bdd;
use crate::error::{Result, RexError};
use crate::reference::Ref;

pub type State = u32;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Move {
    pub source: State,
    pub target: State,
    /// `None` for an epsilon move.
    pub condition: Option<Ref>,
}

impl Move {
    pub fn epsilon(source: State, target: State) -> Self {
        Self {
            source,
            target,
            condition: None,
        }
    }

    pub fn guarded(source: State, target: State, condition: Ref) -> Self {
        Self {
            source,
            target,
            condition: Some(condition),
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.condition.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sfa {
    initial_state: State,
    final_states: BTreeSet<State>,
    delta: BTreeMap<State, Vec<Move>>,
    delta_inv: BTreeMap<State, Vec<Move>>,
    max_state: State,
    is_deterministic: bool,
    is_epsilon_free: bool,
}

impl Sfa {
    /// The automaton accepting nothing.
    pub fn empty() -> Self {
        Self::build(0, BTreeSet::new(), Vec::new())
    }

    /// The automaton accepting only the empty string.
    pub fn epsilon() -> Self {
        Self::build(0, BTreeSet::from([0]), Vec::new())
    }

    /// Construct an automaton, checking that every final state is one of its states.
    pub fn new(initial_state: State, final_states: impl IntoIterator<Item = State>, moves: Vec<Move>) -> Result<Self> {
        let final_states: BTreeSet<State> = final_states.into_iter().collect();
        let known = |s: State| s == initial_state || moves.iter().any(|m| m.source == s || m.target == s);
        if let Some(s) = final_states.iter().copied().find(|&s| !known(s)) {
            return Err(RexError::InvalidAutomaton(format!(
                "final state {} is not a state of the automaton",
                s
            )));
        }
        Ok(Self::build(initial_state, final_states, moves))
    }

    /// Construct without validation; flags follow from the moves.
    pub(crate) fn build(initial_state: State, final_states: BTreeSet<State>, moves: Vec<Move>) -> Self {
        let mut delta: BTreeMap<State, Vec<Move>> = BTreeMap::new();
        let mut delta_inv: BTreeMap<State, Vec<Move>> = BTreeMap::new();

        let states = std::iter::once(initial_state)
            .chain(final_states.iter().copied())
            .chain(moves.iter().flat_map(|m| [m.source, m.target]));
        for s in states {
            delta.entry(s).or_default();
            delta_inv.entry(s).or_default();
        }
        for m in moves {
            delta.entry(m.source).or_default().push(m);
            delta_inv.entry(m.target).or_default().push(m);
        }

        let max_state = delta.keys().next_back().copied().unwrap_or(initial_state);
        let is_deterministic = delta.values().all(|moves| moves.len() <= 1);
        let is_epsilon_free = delta.values().flatten().all(|m| !m.is_epsilon());

        Self {
            initial_state,
            final_states,
            delta,
            delta_inv,
            max_state,
            is_deterministic,
            is_epsilon_free,
        }
    }

    pub fn initial_state(&self) -> State {
        self.initial_state
    }

    pub fn final_states(&self) -> &BTreeSet<State> {
        &self.final_states
    }

    pub fn max_state(&self) -> State {
        self.max_state
    }

    pub fn is_deterministic(&self) -> bool {
        self.is_deterministic
    }

    pub fn is_epsilon_free(&self) -> bool {
        self.is_epsilon_free
    }

    pub(crate) fn set_deterministic(&mut self, value: bool) {
        self.is_deterministic = value;
    }

    pub fn is_final(&self, state: State) -> bool {
        self.final_states.contains(&state)
    }

    /// No final states: the language is empty.
    pub fn is_empty(&self) -> bool {
        self.final_states.is_empty()
    }

    /// A lone final initial state without moves.
    pub fn is_epsilon(&self) -> bool {
        self.num_moves() == 0 && self.final_states.len() == 1 && self.is_final(self.initial_state)
    }

    pub fn states(&self) -> impl Iterator<Item = State> + '_ {
        self.delta.keys().copied()
    }

    pub fn num_states(&self) -> usize {
        self.delta.len()
    }

    pub fn moves_from(&self, state: State) -> &[Move] {
        self.delta.get(&state).map_or(&[], Vec::as_slice)
    }

    pub fn moves_to(&self, state: State) -> &[Move] {
        self.delta_inv.get(&state).map_or(&[], Vec::as_slice)
    }

    /// All moves, grouped by source state in increasing order.
    pub fn moves(&self) -> impl Iterator<Item = &Move> + '_ {
        self.delta.values().flatten()
    }

    pub fn num_moves(&self) -> usize {
        self.delta.values().map(Vec::len).sum()
    }

    /// The only final state, if it has no outgoing moves.
    pub fn single_final_sink(&self) -> Option<State> {
        match self.final_states.iter().collect::<Vec<_>>()[..] {
            [&s] if self.moves_from(s).is_empty() => Some(s),
            _ => None,
        }
    }

    /// The only final state.
    pub fn final_state(&self) -> Result<State> {
        match self.final_states.iter().collect::<Vec<_>>()[..] {
            [&s] => Ok(s),
            _ => Err(RexError::InvalidAutomaton(format!(
                "expected exactly one final state, found {}",
                self.final_states.len()
            ))),
        }
    }

    pub fn initial_has_incoming(&self) -> bool {
        !self.moves_to(self.initial_state).is_empty()
    }

    /// Add a move, registering new states. Clears the determinism hint.
    pub fn add_move(&mut self, m: Move) {
        self.delta.entry(m.source).or_default().push(m);
        self.delta.entry(m.target).or_default();
        self.delta_inv.entry(m.target).or_default().push(m);
        self.delta_inv.entry(m.source).or_default();
        self.max_state = self.max_state.max(m.source).max(m.target);
        self.is_deterministic = false;
        if m.is_epsilon() {
            self.is_epsilon_free = false;
        }
    }

    /// Take over the states and moves of `other`, whose state ids must not clash with ours.
    fn absorb(&mut self, other: Sfa) {
        for (s, moves) in other.delta {
            self.delta.entry(s).or_default().extend(moves);
        }
        for (s, moves) in other.delta_inv {
            self.delta_inv.entry(s).or_default().extend(moves);
        }
        self.max_state = self.max_state.max(other.max_state);
    }

    /// Append `other`: the result accepts `uv` for `u` accepted here and `v` by `other`.
    pub fn concat(&mut self, other: Sfa) {
        let other_initial = other.initial_state;
        let other_finals = other.final_states.clone();
        let (other_det, other_eps_free) = (other.is_deterministic, other.is_epsilon_free);

        match self.single_final_sink() {
            Some(sink) => {
                let incoming = self.delta_inv.remove(&sink).unwrap_or_default();
                self.delta.remove(&sink);
                self.absorb(other);

                let sources: BTreeSet<State> = incoming.iter().map(|m| m.source).collect();
                for source in sources {
                    let new_source = if source == sink { other_initial } else { source };
                    let mut redirected = Vec::new();
                    if let Some(moves) = self.delta.get_mut(&source) {
                        for m in moves.iter_mut().filter(|m| m.target == sink) {
                            m.source = new_source;
                            m.target = other_initial;
                            redirected.push(*m);
                        }
                    }
                    // Replace the old copies in the targets' incoming lists.
                    for m in &redirected {
                        self.delta_inv.entry(m.target).or_default().push(*m);
                    }
                }

                if self.initial_state == sink {
                    self.initial_state = other_initial;
                }
                self.is_deterministic &= other_det;
                self.is_epsilon_free &= other_eps_free;
            }
            None => {
                let finals: Vec<State> = self.final_states.iter().copied().collect();
                self.absorb(other);
                for f in finals {
                    self.add_move(Move::epsilon(f, other_initial));
                }
                self.is_deterministic = false;
                self.is_epsilon_free = false;
            }
        }

        self.final_states = other_finals;
    }

    /// Make the empty string accepted at the initial state.
    pub fn make_initial_state_final(&mut self) {
        if self.initial_has_incoming() {
            self.add_new_initial_state_that_is_final();
        } else {
            self.final_states.insert(self.initial_state);
        }
    }

    /// Prepend a fresh final initial state with an epsilon move to the old one.
    pub fn add_new_initial_state_that_is_final(&mut self) {
        let new_initial = self.max_state + 1;
        self.add_move(Move::epsilon(new_initial, self.initial_state));
        self.initial_state = new_initial;
        self.final_states.insert(new_initial);
    }

    /// Move the initial state's outgoing moves to `state` and retire the old id.
    ///
    /// The initial state must have no incoming moves.
    pub fn rename_initial_state(&mut self, state: State) {
        let old = self.initial_state;
        if old == state {
            return;
        }
        debug_assert!(!self.initial_has_incoming());

        let outgoing = self.delta.remove(&old).unwrap_or_default();
        self.delta_inv.remove(&old);
        self.delta.entry(state).or_default();
        self.delta_inv.entry(state).or_default();

        for m in outgoing {
            let target = if m.target == old { state } else { m.target };
            if let Some(incoming) = self.delta_inv.get_mut(&m.target) {
                incoming.retain(|x| *x != m);
            }
            let renamed = Move {
                source: state,
                target,
                condition: m.condition,
            };
            self.delta.entry(state).or_default().push(renamed);
            self.delta_inv.entry(target).or_default().push(renamed);
        }

        if self.final_states.remove(&old) {
            self.final_states.insert(state);
        }
        self.initial_state = state;
        self.max_state = self.max_state.max(state);
        // Moves now share a source with those already at `state`.
        self.is_deterministic &= self.moves_from(state).len() <= 1;
    }

    /// The initial state is final and every other final state jumps back to it.
    pub fn is_kleene_closure(&self) -> bool {
        if !self.is_final(self.initial_state) {
            return false;
        }
        self.final_states
            .iter()
            .filter(|&&f| f != self.initial_state)
            .all(|&f| {
                self.moves_from(f)
                    .iter()
                    .any(|m| m.is_epsilon() && m.target == self.initial_state)
            })
    }

    /// The automaton for zero or more repetitions of this one.
    pub fn make_kleene_closure(mut self, disjunction: impl Fn(Ref, Ref) -> Ref) -> Sfa {
        if self.is_empty() || self.is_epsilon() {
            return Sfa::epsilon();
        }
        if self.is_kleene_closure() {
            return self;
        }

        if !self.initial_has_incoming() {
            if let Some(sink) = self.single_final_sink() {
                self.rename_initial_state(sink);
                return self;
            }
        }

        self.make_initial_state_final();
        let initial = self.initial_state;
        let others: Vec<State> = self.final_states.iter().copied().filter(|&f| f != initial).collect();
        for f in others {
            self.add_move(Move::epsilon(f, initial));
        }
        self.remove_epsilon_loops(disjunction)
    }

    /// A copy whose initial state is `new_initial` and whose other states follow it.
    pub fn make_copy(&self, new_initial: State) -> Sfa {
        let mut renaming = BTreeMap::new();
        renaming.insert(self.initial_state, new_initial);
        let mut next = new_initial + 1;
        for s in self.states() {
            if s != self.initial_state {
                renaming.insert(s, next);
                next += 1;
            }
        }
        let rename = |s: State| renaming[&s];

        let moves = self
            .moves()
            .map(|m| Move {
                source: rename(m.source),
                target: rename(m.target),
                condition: m.condition,
            })
            .collect();
        let finals = self.final_states.iter().map(|&f| rename(f)).collect();
        Sfa::build(new_initial, finals, moves)
    }

    /// Simulate the automaton on `text`.
    pub fn accepts(&self, bdd: &Bdd, text: &str) -> bool {
        let mut current = self.epsilon_closure_of(std::iter::once(self.initial_state));
        for c in text.chars() {
            let code = c as u32;
            let next: BTreeSet<State> = current
                .iter()
                .flat_map(|&s| self.moves_from(s))
                .filter(|m| m.condition.is_some_and(|cond| code <= bdd.max_code() && bdd.eval(cond, code)))
                .map(|m| m.target)
                .collect();
            if next.is_empty() {
                return false;
            }
            current = self.epsilon_closure_of(next);
        }
        current.iter().any(|&s| self.is_final(s))
    }

    /// States reachable from `start` over epsilon moves, `start` included.
    pub(crate) fn epsilon_closure_of(&self, start: impl IntoIterator<Item = State>) -> BTreeSet<State> {
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<State> = start.into_iter().collect();
        while let Some(s) = queue.pop_front() {
            if visited.insert(s) {
                for m in self.moves_from(s).iter().filter(|m| m.is_epsilon()) {
                    queue.push_back(m.target);
                }
            }
        }
        visited
    }
}
