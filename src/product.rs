//! Product construction over pairs of states.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use log::debug;

use crate::reference::Ref;
use crate::sfa::{Move, Sfa, State};

/// The synchronized product of `a` and `b`.
///
/// A pair of moves becomes one move labeled `conjunction(cond_a, cond_b)` when `is_sat`
/// holds for it; parallel moves are merged with `disjunction`. A pair is final when both
/// components are. States that cannot reach a final state are pruned, and the result is
/// [`Sfa::empty`] when no final state is reachable. States are numbered in discovery order.
pub fn mk_product(
    a: Sfa,
    b: Sfa,
    conjunction: impl Fn(Ref, Ref) -> Ref,
    disjunction: impl Fn(Ref, Ref) -> Ref,
    is_sat: impl Fn(Ref) -> bool,
) -> Sfa {
    if a.is_empty() || b.is_empty() {
        return Sfa::empty();
    }
    let a = a.remove_epsilons(&disjunction);
    let b = b.remove_epsilons(&disjunction);

    let mut ids: HashMap<(State, State), State> = HashMap::new();
    let mut queue = VecDeque::new();
    let start = (a.initial_state(), b.initial_state());
    ids.insert(start, 0);
    queue.push_back((start, 0));

    let mut finals = BTreeSet::new();
    let mut moves: BTreeMap<State, Vec<Move>> = BTreeMap::new();

    while let Some(((p, q), id)) = queue.pop_front() {
        if a.is_final(p) && b.is_final(q) {
            finals.insert(id);
        }
        for ma in a.moves_from(p) {
            for mb in b.moves_from(q) {
                let (Some(ca), Some(cb)) = (ma.condition, mb.condition) else {
                    continue;
                };
                let condition = conjunction(ca, cb);
                if !is_sat(condition) {
                    continue;
                }

                let pair = (ma.target, mb.target);
                let next = ids.len() as State;
                let target = *ids.entry(pair).or_insert_with(|| {
                    queue.push_back((pair, next));
                    next
                });

                let out = moves.entry(id).or_default();
                match out.iter_mut().find(|m| m.target == target) {
                    Some(m) => {
                        if let Some(prev) = m.condition {
                            m.condition = Some(disjunction(prev, condition));
                        }
                    }
                    None => out.push(Move::guarded(id, target, condition)),
                }
            }
        }
    }

    debug!("mk_product: {} pair states, {} final", ids.len(), finals.len());
    if finals.is_empty() {
        return Sfa::empty();
    }

    // Keep only states from which some final state is reachable.
    let mut alive: BTreeSet<State> = BTreeSet::new();
    let mut queue: VecDeque<State> = finals.iter().copied().collect();
    while let Some(s) = queue.pop_front() {
        if alive.insert(s) {
            for m in moves.values().flatten().filter(|m| m.target == s) {
                queue.push_back(m.source);
            }
        }
    }

    let moves = moves
        .into_values()
        .flatten()
        .filter(|m| alive.contains(&m.source) && alive.contains(&m.target))
        .collect();
    Sfa::build(0, finals, moves)
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bdd::Bdd;

    fn product(bdd: &Bdd, a: Sfa, b: Sfa) -> Sfa {
        mk_product(
            a,
            b,
            |x, y| bdd.apply_and(x, y),
            |x, y| bdd.apply_or(x, y),
            |x| !bdd.is_zero(x),
        )
    }

    /// Strings over the given ranges, any length.
    fn star_of(bdd: &Bdd, lo: char, hi: char) -> Sfa {
        let cond = bdd.range_constraint(false, lo as u32, hi as u32);
        Sfa::new(0, [0], vec![Move::guarded(0, 0, cond)]).unwrap()
    }

    /// Strings of exactly `n` arbitrary characters.
    fn length(n: State) -> Sfa {
        let moves = (0..n).map(|i| Move::guarded(i, i + 1, Ref::TRUE)).collect();
        Sfa::new(0, [n], moves).unwrap()
    }

    #[test]
    fn test_intersection() {
        let bdd = Bdd::new(7);
        let p = product(&bdd, star_of(&bdd, 'a', 'f'), length(2));
        assert!(p.accepts(&bdd, "ab"));
        assert!(p.accepts(&bdd, "ff"));
        assert!(!p.accepts(&bdd, "a"));
        assert!(!p.accepts(&bdd, "ag"));
        assert!(!p.accepts(&bdd, "abc"));
        assert_eq!(p.initial_state(), 0);
        assert_eq!(p.num_states(), 3);
    }

    #[test]
    fn test_disjoint_is_empty() {
        let bdd = Bdd::new(7);
        let digits = bdd.range_constraint(false, '0' as u32, '9' as u32);
        let letters = bdd.range_constraint(false, 'a' as u32, 'z' as u32);
        let a = Sfa::new(0, [1], vec![Move::guarded(0, 1, digits)]).unwrap();
        let b = Sfa::new(0, [1], vec![Move::guarded(0, 1, letters)]).unwrap();
        assert!(product(&bdd, a, b).is_empty());
        assert!(product(&bdd, Sfa::empty(), length(1)).is_empty());
    }

    #[test]
    fn test_prunes_dead_states() {
        let bdd = Bdd::new(7);
        let a_cond = bdd.char_constraint(false, 'a');
        let b_cond = bdd.char_constraint(false, 'b');
        // "ab" or "a" followed by a dead end.
        let a = Sfa::new(
            0,
            [2],
            vec![Move::guarded(0, 1, a_cond), Move::guarded(1, 2, b_cond), Move::guarded(0, 3, a_cond)],
        )
        .unwrap();
        let p = product(&bdd, a, star_of(&bdd, 'a', 'z'));
        assert_eq!(p.num_states(), 3);
        assert!(p.accepts(&bdd, "ab"));
        for s in p.states() {
            assert!(p.is_final(s) || !p.moves_from(s).is_empty());
        }
    }

    #[test]
    fn test_epsilon_operands() {
        let bdd = Bdd::new(7);
        let a = Sfa::new(0, [2], vec![Move::epsilon(0, 1), Move::guarded(1, 2, Ref::TRUE)]).unwrap();
        let p = product(&bdd, a, length(1));
        assert!(p.is_epsilon_free());
        assert!(p.accepts(&bdd, "x"));
        assert!(!p.accepts(&bdd, ""));

        let p = product(&bdd, Sfa::epsilon(), star_of(&bdd, 'a', 'a'));
        assert!(p.is_epsilon());
    }
}
