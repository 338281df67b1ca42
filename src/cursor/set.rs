//! A set of cursors

use super::Cursor;
use rustc_hash::FxHashSet;

#[derive(Debug, Default, Clone)]
pub struct CursorSet<'tu> {
    cursors: FxHashSet<Cursor<'tu>>,
}

impl<'tu> CursorSet<'tu> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cursor; returns `true` if it was not already present.
    pub fn insert(&mut self, cursor: Cursor<'tu>) -> bool {
        self.cursors.insert(cursor)
    }

    pub fn contains(&self, cursor: &Cursor<'tu>) -> bool {
        self.cursors.contains(cursor)
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::tests::parse_unit;

    #[test]
    fn test_insert_and_contains() {
        let tu = parse_unit("int a;\nint b;\n");
        let children = tu.cursor().children();
        let mut set = CursorSet::new();
        assert!(set.insert(children[0]));
        assert!(!set.insert(children[0]));
        assert!(set.contains(&children[0]));
        assert!(!set.contains(&children[1]));
        assert!(!set.contains(&Cursor::null()));
        assert_eq!(set.len(), 1);
    }
}
