use std::fmt::{Display, Formatter};

/// Handle to a node in the [`Bdd`][crate::bdd::Bdd] arena.
///
/// Handles are plain indices: two handles are equal iff they denote the same node,
/// and since the arena is hash-consed and reduced, iff they denote the same boolean function.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(u32);

impl Ref {
    /// The `False` terminal, always stored at index 0.
    pub const FALSE: Ref = Ref(0);
    /// The `True` terminal, always stored at index 1.
    pub const TRUE: Ref = Ref(1);

    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Return the node identifier.
    pub const fn id(self) -> u32 {
        self.0
    }

    /// Return the arena index of the node.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn is_terminal(self) -> bool {
        self.0 <= 1
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Ref::FALSE => write!(f, "@F"),
            Ref::TRUE => write!(f, "@T"),
            Ref(id) => write!(f, "@{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminals() {
        assert!(Ref::FALSE.is_terminal());
        assert!(Ref::TRUE.is_terminal());
        assert!(!Ref::new(2).is_terminal());
        assert_eq!(Ref::TRUE.index(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Ref::FALSE.to_string(), "@F");
        assert_eq!(Ref::TRUE.to_string(), "@T");
        assert_eq!(Ref::new(42).to_string(), "@42");
    }
}
