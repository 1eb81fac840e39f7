//! Typed arena storage. Ids are small copyable handles and can only be used
//! with the arena whose id type they are.

use std::{fmt::Debug, hash::Hash, marker::PhantomData};

pub trait Index: Copy + 'static + Eq + Ord + Debug + Hash {
    fn new(idx: usize) -> Self;

    fn index(self) -> usize;
}

/// Declares a `u32` backed id type
macro_rules! simple_index {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
        $vis struct $name(u32);

        impl $crate::index::Index for $name {
            fn new(idx: usize) -> Self {
                Self(u32::try_from(idx).expect("arena ids fit in 32 bits"))
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

pub(crate) use simple_index;

/// A `Vec` addressed by a typed id. Elements are only ever appended, so an
/// id handed out by [`IndexVec::push`] stays valid.
#[derive(Clone)]
pub struct IndexVec<I: Index, T> {
    items: Vec<T>,
    _marker: PhantomData<fn(&I)>,
}

impl<I: Index, T> IndexVec<I, T> {
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn push(&mut self, item: T) -> I {
        let id = I::new(self.items.len());
        self.items.push(item);
        id
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<I: Index, T> Default for IndexVec<I, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: Index, T: Debug> Debug for IndexVec<I, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.items.iter().enumerate().map(|(i, item)| (I::new(i), item)))
            .finish()
    }
}

impl<I: Index, T> core::ops::Index<I> for IndexVec<I, T> {
    type Output = T;

    fn index(&self, id: I) -> &T {
        &self.items[id.index()]
    }
}

impl<I: Index, T> core::ops::IndexMut<I> for IndexVec<I, T> {
    fn index_mut(&mut self, id: I) -> &mut T {
        &mut self.items[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    simple_index! {
        struct ItemId;
    }

    #[test]
    fn ids_address_their_items() {
        let mut items = IndexVec::<ItemId, &str>::new();
        let first = items.push("first");
        let second = items.push("second");

        items[second] = "replaced";

        assert_eq!(items.len(), 2);
        assert_eq!(items[first], "first");
        assert_eq!(items[second], "replaced");
        assert_eq!(second.to_string(), "#1");
    }
}
