//! Random source driving generation.
//!
//! Generation only ever asks two questions: "which of `n`?" and "heads or tails?".
//! Keeping the interface that small pins down the draw order, so a fixed seed
//! reproduces the same strings everywhere.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait Chooser {
    /// Uniform choice in `0..n`. `n` must be positive.
    fn choose(&mut self, n: usize) -> usize;

    /// Fair coin.
    fn choose_bool(&mut self) -> bool;
}

impl<C: Chooser + ?Sized> Chooser for &mut C {
    fn choose(&mut self, n: usize) -> usize {
        (**self).choose(n)
    }

    fn choose_bool(&mut self) -> bool {
        (**self).choose_bool()
    }
}

/// [`Chooser`] backed by a ChaCha8 stream.
#[derive(Debug, Clone)]
pub struct RandomChooser {
    rng: ChaCha8Rng,
}

impl RandomChooser {
    /// Seeded from `seed` when given, from OS entropy otherwise.
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_os_rng(),
        }
    }
}

impl Default for RandomChooser {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Chooser for RandomChooser {
    fn choose(&mut self, n: usize) -> usize {
        assert!(n > 0, "Cannot choose among zero alternatives");
        self.rng.random_range(0..n)
    }

    fn choose_bool(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }
}

/// Replays a fixed script of draws, for tests that need exact control.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedChooser {
    choices: std::collections::VecDeque<usize>,
    coins: std::collections::VecDeque<bool>,
}

#[cfg(test)]
impl ScriptedChooser {
    pub(crate) fn new(choices: &[usize], coins: &[bool]) -> Self {
        Self {
            choices: choices.iter().copied().collect(),
            coins: coins.iter().copied().collect(),
        }
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.choices.is_empty() && self.coins.is_empty()
    }
}

#[cfg(test)]
impl Chooser for ScriptedChooser {
    fn choose(&mut self, n: usize) -> usize {
        let i = self.choices.pop_front().expect("script ran out of choices");
        assert!(i < n, "scripted choice {} out of 0..{}", i, n);
        i
    }

    fn choose_bool(&mut self) -> bool {
        self.coins.pop_front().expect("script ran out of coins")
    }
}
