use crate::reference::Ref;
use crate::utils::{pairing3, MyHash};

/// Ordinal carried by the two terminals.
///
/// It is greater than any bit index, so terminals sort after every decision node.
pub const TERMINAL_ORDINAL: u32 = u32::MAX;

/// A decision node testing bit `ordinal` (0 is the most significant bit of a character code).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Node {
    pub ordinal: u32,
    pub true_case: Ref,
    pub false_case: Ref,
}

impl Node {
    pub const fn terminal() -> Self {
        Self {
            ordinal: TERMINAL_ORDINAL,
            true_case: Ref::FALSE,
            false_case: Ref::FALSE,
        }
    }
}

impl Default for Node {
    fn default() -> Self {
        Self::terminal()
    }
}

impl MyHash for Node {
    fn hash(&self) -> u64 {
        pairing3(
            self.ordinal as u64,
            self.true_case.id() as u64,
            self.false_case.id() as u64,
        )
    }
}
