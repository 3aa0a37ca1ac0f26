//! Ordered, duplicate-free id set for one hierarchy level.
//!
//! Iteration follows insertion order; membership is `O(log n)`.

use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionSet<T: Ord + Clone> {
    order: Vec<T>,
    members: BTreeSet<T>,
}

impl<T: Ord + Clone> Default for SelectionSet<T> {
    fn default() -> Self {
        Self { order: Vec::new(), members: BTreeSet::new() }
    }
}

impl<T: Ord + Clone> SelectionSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `id` was not already present.
    pub fn insert(&mut self, id: T) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn remove(&mut self, id: &T) -> bool {
        if !self.members.remove(id) {
            return false;
        }
        self.order.retain(|x| x != id);
        true
    }

    pub fn contains(&self, id: &T) -> bool {
        self.members.contains(id)
    }

    /// Add every id not yet present, keeping the order of `ids`. Returns how
    /// many were added.
    pub fn select_all<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        ids.into_iter().filter(|id| self.insert((*id).clone())).count()
    }

    /// Remove exactly the given ids. Returns how many were removed.
    pub fn deselect_all<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let gone: BTreeSet<&T> = ids.into_iter().filter(|id| self.members.contains(*id)).collect();
        if gone.is_empty() {
            return 0;
        }
        self.order.retain(|x| !gone.contains(x));
        for id in &gone {
            self.members.remove(*id);
        }
        gone.len()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }

    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        let members = &mut self.members;
        self.order.retain(|x| {
            let k = keep(x);
            if !k {
                members.remove(x);
            }
            k
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.order.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<T: Ord + Clone> FromIterator<T> for SelectionSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut s = Self::new();
        for id in iter {
            s.insert(id);
        }
        s
    }
}

impl<'a, T: Ord + Clone> IntoIterator for &'a SelectionSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

#[cfg(feature = "serde")]
impl<T: Ord + Clone + serde::Serialize> serde::Serialize for SelectionSet<T> {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_seq(self.order.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de, T: Ord + Clone + serde::Deserialize<'de>> serde::Deserialize<'de> for SelectionSet<T> {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(d).map(|v| v.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_and_dedup() {
        let mut s = SelectionSet::new();
        assert!(s.insert("b"));
        assert!(s.insert("a"));
        assert!(!s.insert("b"));
        assert_eq!(s.as_slice(), &["b", "a"]);
        assert!(s.remove(&"b"));
        assert!(!s.remove(&"b"));
        assert_eq!(s.as_slice(), &["a"]);
    }

    #[test]
    fn bulk_ops_are_idempotent() {
        let mut s: SelectionSet<u32> = [9].into_iter().collect();
        let visible = [1, 2, 3];
        assert_eq!(s.select_all(&visible), 3);
        let once = s.clone();
        assert_eq!(s.select_all(&visible), 0);
        assert_eq!(s, once);
        assert_eq!(s.as_slice(), &[9, 1, 2, 3]);

        assert_eq!(s.deselect_all(&visible), 3);
        let once = s.clone();
        assert_eq!(s.deselect_all(&visible), 0);
        assert_eq!(s, once);
        assert_eq!(s.as_slice(), &[9]);
    }

    #[test]
    fn retain_keeps_members_in_sync() {
        let mut s: SelectionSet<u32> = (1..=5).collect();
        s.retain(|x| x % 2 == 1);
        assert_eq!(s.as_slice(), &[1, 3, 5]);
        assert!(!s.contains(&2));
        assert!(s.insert(2));
        s.clear();
        assert!(s.is_empty());
    }
}
