//! Persistent singly linked list. `cons` is O(1) and shares the tail, which is
//! what de Bruijn contexts and environments need: index 0 is the head.
//!
//! Each node lives behind an `Rc`, so a `ConsList<T>` has a fixed size and may
//! be stored inside `T` itself (a closure value capturing its environment).

use std::rc::Rc;

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum ConsList<T> {
    Nil,
    Cons(Rc<(T, ConsList<T>)>, usize),
}

struct ConsListIter<'a, T>(&'a ConsList<T>);
impl<'a, T> Iterator for ConsListIter<'a, T> {
    type Item = &'a T;
    fn next(&mut self) -> Option<Self::Item> {
        let list: &'a ConsList<T> = self.0;
        match list {
            ConsList::Nil => None,
            ConsList::Cons(node, _) => {
                let (head, tail) = node.as_ref();
                self.0 = tail;
                Some(head)
            }
        }
    }
}

impl<T> Default for ConsList<T> {
    fn default() -> Self {
        Self::Nil
    }
}

impl<T> ConsList<T> {
    #[inline]
    pub fn cons(&self, t: T) -> Self
    where
        T: Clone,
    {
        match self {
            Self::Nil => Self::Cons(Rc::new((t, Self::Nil)), 1),
            Self::Cons(_, len) => Self::Cons(Rc::new((t, self.clone())), len + 1),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Nil => 0,
            Self::Cons(_, len) => *len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Nil)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        ConsListIter(self)
    }

    /// The `index`-th element counting from the head.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.iter().nth(index)
    }

    #[inline]
    pub fn contains(&self, t: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|x| x == t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        let list: ConsList<i32> = ConsList::Nil;
        assert_eq!(list.len(), 0);
        assert!(list.is_empty());
        assert_eq!(list.get(0), None);
    }

    #[test]
    fn test_cons_prepends() {
        let list = ConsList::Nil.cons(1).cons(2).cons(3);
        assert_eq!(list.len(), 3);
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(list.get(0), Some(&3));
        assert_eq!(list.get(2), Some(&1));
        assert_eq!(list.get(3), None);
    }

    #[test]
    fn test_extensions_share_tail() {
        let base = ConsList::Nil.cons("a");
        let left = base.cons("l");
        let right = base.cons("r");
        assert_eq!(left.get(1), Some(&"a"));
        assert_eq!(right.get(1), Some(&"a"));
        assert_eq!(base.len(), 1);
        assert!(left.contains(&"a"));
        assert!(!left.contains(&"r"));
    }

    #[derive(Clone)]
    enum Scope {
        Leaf(i32),
        Captured(ConsList<Scope>),
    }

    #[test]
    fn test_element_may_hold_a_list_of_itself() {
        let outer = ConsList::Nil.cons(Scope::Leaf(1));
        let nested = outer.cons(Scope::Captured(outer.clone()));
        match nested.get(0) {
            Some(Scope::Captured(inner)) => assert_eq!(inner.len(), 1),
            _ => panic!("expected a captured scope at the head"),
        }
        assert!(matches!(nested.get(1), Some(Scope::Leaf(1))));
    }
}
