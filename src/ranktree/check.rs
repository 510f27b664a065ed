//! Structural self-checks for the rank tree.
//!
//! Intended for tests: each routine walks the whole tree and panics with a
//! description of the first violated invariant. Production code never
//! calls these.

use super::{Color, Comparator, RankTree, NIL};

impl<T, O: Comparator<T>> RankTree<T, O> {
    /// Check that parent and child links agree everywhere.
    ///
    /// # Panics
    /// Panics if a node is not exactly one child of its parent, or if a
    /// child does not point back at its parent.
    pub fn check_coherence(&self) {
        if self.root != NIL {
            assert_eq!(
                self.parent(self.root),
                NIL,
                "root {} has a non-sentinel parent",
                self.root
            );
            self.check_coherence_at(self.root);
        }
    }

    fn check_coherence_at(&self, x: u32) {
        let p = self.parent(x);
        if p != NIL {
            let is_left = self.left(p) == x;
            let is_right = self.right(p) == x;
            assert!(
                is_left != is_right,
                "node {} is not exactly one child of its parent {}",
                x,
                p
            );
        }
        let l = self.left(x);
        if l != NIL {
            assert_eq!(self.parent(l), x, "left child {} does not point back at {}", l, x);
            self.check_coherence_at(l);
        }
        let r = self.right(x);
        if r != NIL {
            assert_eq!(self.parent(r), x, "right child {} does not point back at {}", r, x);
            self.check_coherence_at(r);
        }
    }

    /// Check the red-black coloring properties.
    ///
    /// # Panics
    /// Panics if the root is red, a red node has a red child, or two
    /// root-to-leaf paths disagree on black height.
    pub fn check_red_black(&self) {
        if self.root != NIL {
            assert_eq!(self.color(self.root), Color::Black, "root is not black");
        }
        self.black_height(self.root);
    }

    fn black_height(&self, x: u32) -> u32 {
        if x == NIL {
            return 1;
        }
        if self.color(x) == Color::Red {
            assert_ne!(
                self.color(self.left(x)),
                Color::Red,
                "red node {} has a red left child",
                x
            );
            assert_ne!(
                self.color(self.right(x)),
                Color::Red,
                "red node {} has a red right child",
                x
            );
        }
        let lh = self.black_height(self.left(x));
        let rh = self.black_height(self.right(x));
        assert_eq!(lh, rh, "node {} has unequal black heights {} / {}", x, lh, rh);
        lh + if self.color(x) == Color::Black { 1 } else { 0 }
    }

    /// Check the subtree size recurrence at every node.
    ///
    /// # Panics
    /// Panics if any node's stored size differs from
    /// `size(left) + size(right) + 1`.
    pub fn check_sizes(&self) {
        self.check_sizes_at(self.root);
    }

    fn check_sizes_at(&self, x: u32) {
        if x == NIL {
            return;
        }
        let expected = self.size(self.left(x)) + self.size(self.right(x)) + 1;
        assert_eq!(
            self.size(x),
            expected,
            "node {} stores size {}, children imply {}",
            x,
            self.size(x),
            expected
        );
        self.check_sizes_at(self.left(x));
        self.check_sizes_at(self.right(x));
    }
}
