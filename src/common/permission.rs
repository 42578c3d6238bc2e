//! Page access modes.

use std::fmt;

/// Access mode requested on, and granted for, a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Read access. Any number of transactions may share it.
    Shared,
    /// Write access. Excludes every other transaction.
    Exclusive,
}

impl Permission {
    /// Whether a grant of `self` already satisfies a request for `requested`.
    #[inline]
    pub fn covers(self, requested: Permission) -> bool {
        self == Permission::Exclusive || requested == Permission::Shared
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Shared => write!(f, "S"),
            Permission::Exclusive => write!(f, "X"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_covers() {
        assert!(Permission::Exclusive.covers(Permission::Shared));
        assert!(Permission::Exclusive.covers(Permission::Exclusive));
        assert!(Permission::Shared.covers(Permission::Shared));
        assert!(!Permission::Shared.covers(Permission::Exclusive));
    }
}
