//! Epsilon closures and the two epsilon-eliminating rewrites.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::reference::Ref;
use crate::sfa::{Move, Sfa, State};

/// Moves collected per source in first-seen order, with parallel guarded moves merged.
#[derive(Default)]
struct MoveMerger {
    moves: BTreeMap<State, Vec<Move>>,
}

impl MoveMerger {
    fn add(&mut self, m: Move, disjunction: &impl Fn(Ref, Ref) -> Ref) {
        let moves = self.moves.entry(m.source).or_default();
        let existing = moves
            .iter_mut()
            .find(|x| x.target == m.target && x.is_epsilon() == m.is_epsilon());
        match (existing, m.condition) {
            (Some(x), Some(cond)) => {
                if let Some(prev) = x.condition {
                    x.condition = Some(disjunction(prev, cond));
                }
            }
            // Parallel epsilon moves are one move.
            (Some(_), None) => {}
            (None, _) => moves.push(m),
        }
    }

    fn into_moves(self) -> Vec<Move> {
        self.moves.into_values().flatten().collect()
    }
}

impl Sfa {
    /// States reachable from `state` over epsilon moves, `state` included.
    pub fn epsilon_closure(&self, state: State) -> BTreeSet<State> {
        self.epsilon_closure_of([state])
    }

    /// States reaching `state` over epsilon moves, `state` included.
    pub fn inverse_epsilon_closure(&self, state: State) -> BTreeSet<State> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([state]);
        while let Some(s) = queue.pop_front() {
            if visited.insert(s) {
                for m in self.moves_to(s).iter().filter(|m| m.is_epsilon()) {
                    queue.push_back(m.source);
                }
            }
        }
        visited
    }

    /// An equivalent automaton without epsilon moves.
    ///
    /// Every state takes over the guarded moves of its epsilon closure, and is final if its
    /// closure meets a final state. Unreachable states are dropped.
    pub fn remove_epsilons(self, disjunction: impl Fn(Ref, Ref) -> Ref) -> Sfa {
        if self.is_epsilon_free() {
            return self;
        }

        let closures: BTreeMap<State, BTreeSet<State>> =
            self.states().map(|s| (s, self.epsilon_closure(s))).collect();

        let mut merger = MoveMerger::default();
        for (&s, closure) in &closures {
            for &t in closure {
                for m in self.moves_from(t).iter().filter(|m| !m.is_epsilon()) {
                    merger.add(
                        Move {
                            source: s,
                            target: m.target,
                            condition: m.condition,
                        },
                        &disjunction,
                    );
                }
            }
        }
        let moves = merger.into_moves();

        // Forward reachability over the new moves.
        let mut reachable = BTreeSet::new();
        let mut queue = VecDeque::from([self.initial_state()]);
        while let Some(s) = queue.pop_front() {
            if reachable.insert(s) {
                for m in moves.iter().filter(|m| m.source == s) {
                    queue.push_back(m.target);
                }
            }
        }

        let finals = reachable
            .iter()
            .copied()
            .filter(|s| closures[s].iter().any(|&t| self.is_final(t)))
            .collect();
        let moves = moves.into_iter().filter(|m| reachable.contains(&m.source)).collect();
        Sfa::build(self.initial_state(), finals, moves)
    }

    /// Collapse every epsilon cycle into its smallest state.
    pub fn remove_epsilon_loops(self, disjunction: impl Fn(Ref, Ref) -> Ref) -> Sfa {
        let representative: BTreeMap<State, State> = self
            .states()
            .map(|s| {
                let forward = self.epsilon_closure(s);
                let backward = self.inverse_epsilon_closure(s);
                let rep = forward.intersection(&backward).next().copied().unwrap_or(s);
                (s, rep)
            })
            .collect();
        let rep = |s: State| representative.get(&s).copied().unwrap_or(s);

        let mut merger = MoveMerger::default();
        for m in self.moves() {
            let (source, target) = (rep(m.source), rep(m.target));
            if m.is_epsilon() && source == target {
                continue;
            }
            merger.add(
                Move {
                    source,
                    target,
                    condition: m.condition,
                },
                &disjunction,
            );
        }

        let finals = self.final_states().iter().map(|&f| rep(f)).collect();
        Sfa::build(rep(self.initial_state()), finals, merger.into_moves())
    }
}
