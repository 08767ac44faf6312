use core::fmt::Debug;
use core::iter::FusedIterator;

use crate::error::TryReserveError;
use crate::hash_table::HashTable;
use crate::hash_table::Realloc;
use crate::hash_table::Relocate;
use crate::hash_table::Slots;
use crate::hashing::AutoHash;
use crate::hashing::HashStrategy;

/// A hash set built on the tombstone [`HashTable`] in set mode.
///
/// `HashSet<K, S, R>` is a `HashTable<K, (), S, R>`: keys are stored without
/// values and the value buffer never allocates. Like [`HashMap`], the set
/// exposes slot handles through [`find`](Self::find), [`slots`](Self::slots)
/// and the `*_at` methods.
///
/// [`HashMap`]: crate::HashMap
#[derive(Clone)]
pub struct HashSet<K, S = AutoHash, R = Realloc> {
    table: HashTable<K, (), S, R>,
}

impl<K, S, R> PartialEq for HashSet<K, S, R>
where
    S: HashStrategy<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.is_subset(other)
    }
}

impl<K, S, R> Eq for HashSet<K, S, R> where S: HashStrategy<K> {}

impl<K, S, R> Debug for HashSet<K, S, R>
where
    K: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, S> HashSet<K, S> {
    /// Creates a new hash set with the given strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashSet;
    /// use tombhash::hashing::IgnoreAsciiCase;
    ///
    /// let mut set: HashSet<&str, _> = HashSet::with_strategy(IgnoreAsciiCase);
    /// assert!(set.insert("Alpha"));
    /// assert!(!set.insert("ALPHA"));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub const fn with_strategy(strategy: S) -> Self {
        Self {
            table: HashTable::with_strategy(strategy),
        }
    }

    /// Creates a new hash set able to hold `capacity` keys without
    /// rehashing, using `strategy`.
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Self {
        Self {
            table: HashTable::with_capacity_and_strategy(capacity, strategy),
        }
    }

    /// Fallible version of
    /// [`with_capacity_and_strategy`](Self::with_capacity_and_strategy).
    pub fn try_with_capacity_and_strategy(
        capacity: usize,
        strategy: S,
    ) -> Result<Self, TryReserveError> {
        Ok(Self {
            table: HashTable::try_with_capacity_and_strategy(capacity, strategy)?,
        })
    }
}

impl<K, S, R> HashSet<K, S, R> {
    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of keys the set can hold before it rehashes.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns the number of slots in the underlying table.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// The sentinel handle returned by [`find`](Self::find) for a missing
    /// key.
    pub fn end(&self) -> usize {
        self.table.end()
    }

    /// Returns the set's hash strategy.
    pub fn strategy(&self) -> &S {
        self.table.strategy()
    }

    /// Returns `true` if `slot` holds a live key.
    pub fn contains_at(&self, slot: usize) -> bool {
        self.table.exists_at(slot)
    }

    /// Returns the key stored at `slot`.
    pub fn key_at(&self, slot: usize) -> Option<&K> {
        self.table.key_at(slot)
    }

    /// Removes the key at `slot`. Returns `false` if the slot was not live.
    pub fn remove_at(&mut self, slot: usize) -> bool {
        self.table.remove_at(slot)
    }

    /// Clears the set, removing all values. Keeps the allocated memory for
    /// reuse.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Retains only the elements specified by the predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashSet;
    ///
    /// let mut set: HashSet<i32> = (1..=4).collect();
    /// set.retain(|&x| x % 2 == 0);
    /// assert_eq!(set.len(), 2);
    /// assert!(set.contains(&2));
    /// assert!(set.contains(&4));
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K) -> bool) {
        self.table.retain(|k, _| f(k));
    }

    /// Returns an iterator over the handles of all live slots, in slot order.
    pub fn slots(&self) -> Slots<'_> {
        self.table.slots()
    }

    /// An iterator visiting all elements in slot order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Clears the set, returning all elements as an iterator.
    pub fn drain(&mut self) -> Drain<'_, K, S, R> {
        Drain {
            inner: self.table.drain(),
        }
    }
}

impl<K, S, R> HashSet<K, S, R>
where
    S: HashStrategy<K>,
{
    /// Returns the slot holding `value`, or [`end`](Self::end) if absent.
    pub fn find(&self, value: &K) -> usize {
        self.table.find(value)
    }

    /// Returns `true` if the set contains a value.
    pub fn contains(&self, value: &K) -> bool {
        self.table.exists(value)
    }

    /// Returns a reference to the stored value equal to `value`.
    pub fn get(&self, value: &K) -> Option<&K> {
        self.table.key_at(self.table.find(value))
    }

    /// Removes a value from the set. Returns whether the value was present.
    pub fn remove(&mut self, value: &K) -> bool {
        self.table.remove(value)
    }

    /// Removes and returns the stored value equal to `value`, if any.
    pub fn take(&mut self, value: &K) -> Option<K> {
        self.table.take(value).map(|(k, _)| k)
    }

    /// Returns `true` if the set contains no elements in common with `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [3, 4].into_iter().collect();
    /// assert!(a.is_disjoint(&b));
    /// ```
    pub fn is_disjoint(&self, other: &Self) -> bool {
        if self.len() <= other.len() {
            self.iter().all(|v| !other.contains(v))
        } else {
            other.iter().all(|v| !self.contains(v))
        }
    }

    /// Returns `true` if `other` contains at least all the elements in
    /// `self`.
    pub fn is_subset(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if `self` contains at least all the elements in
    /// `other`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Returns an iterator over the union of `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashSet;
    ///
    /// let a: HashSet<i32> = [1, 2].into_iter().collect();
    /// let b: HashSet<i32> = [2, 3].into_iter().collect();
    ///
    /// let mut union: Vec<_> = a.union(&b).copied().collect();
    /// union.sort();
    /// assert_eq!(union, [1, 2, 3]);
    /// ```
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, K, S, R> {
        Union {
            iter: self.iter(),
            other_iter: other.iter(),
            seen: self,
        }
    }

    /// Returns an iterator over the intersection of `self` and `other`.
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, K, S, R> {
        if self.len() <= other.len() {
            Intersection {
                iter: self.iter(),
                other,
            }
        } else {
            Intersection {
                iter: other.iter(),
                other: self,
            }
        }
    }

    /// Returns an iterator over the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, K, S, R> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Returns an iterator over the values in exactly one of `self` and
    /// `other`.
    pub fn symmetric_difference<'a>(&'a self, other: &'a Self) -> SymmetricDifference<'a, K, S, R> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<K, S, R> HashSet<K, S, R>
where
    S: HashStrategy<K>,
    R: Relocate,
{
    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. A value already present
    /// is left untouched and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashSet;
    ///
    /// let mut set = HashSet::new();
    /// assert!(set.insert(2));
    /// assert!(!set.insert(2));
    /// assert_eq!(set.len(), 1);
    /// ```
    pub fn insert(&mut self, value: K) -> bool {
        self.table.insert(value, ()).1.is_none()
    }

    /// Fallible version of [`insert`](Self::insert).
    pub fn try_insert(&mut self, value: K) -> Result<bool, TryReserveError> {
        Ok(self.table.try_insert(value, ())?.1.is_none())
    }

    /// Ensures the set can hold `capacity` values in total without
    /// rehashing.
    pub fn reserve(&mut self, capacity: usize) {
        self.table.reserve(capacity);
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(capacity)
    }

    /// Shrinks the capacity of the set as much as possible and drops every
    /// tombstone.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }
}

impl<K> HashSet<K> {
    /// Creates an empty set with the default strategy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set able to hold `capacity` values without
    /// rehashing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, AutoHash)
    }
}

impl<K, S, R> Default for HashSet<K, S, R>
where
    S: Default,
{
    fn default() -> Self {
        Self {
            table: HashTable::default(),
        }
    }
}

impl<K, S, R> From<HashTable<K, (), S, R>> for HashSet<K, S, R> {
    fn from(table: HashTable<K, (), S, R>) -> Self {
        Self { table }
    }
}

/// An iterator over the elements of a [`HashSet`].
pub struct Iter<'a, K> {
    inner: crate::hash_table::Iter<'a, K, ()>,
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> DoubleEndedIterator for Iter<'_, K> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<K> FusedIterator for Iter<'_, K> {}

/// A draining iterator over the elements of a [`HashSet`].
pub struct Drain<'a, K, S, R> {
    inner: crate::hash_table::Drain<'a, K, (), S, R>,
}

impl<K, S, R> Iterator for Drain<'_, K, S, R> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, S, R> ExactSizeIterator for Drain<'_, K, S, R> {}

/// An owning iterator over the elements of a [`HashSet`].
pub struct IntoIter<K, S, R> {
    inner: crate::hash_table::IntoIter<K, (), S, R>,
}

impl<K, S, R> Iterator for IntoIter<K, S, R> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, S, R> ExactSizeIterator for IntoIter<K, S, R> {}

impl<K, S, R> IntoIterator for HashSet<K, S, R> {
    type Item = K;
    type IntoIter = IntoIter<K, S, R>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, S, R> IntoIterator for &'a HashSet<K, S, R> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, S, R> FromIterator<K> for HashSet<K, S, R>
where
    S: HashStrategy<K> + Default,
    R: Relocate,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::default();
        set.extend(iter);
        set
    }
}

impl<K, S, R> Extend<K> for HashSet<K, S, R>
where
    S: HashStrategy<K>,
    R: Relocate,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let additional = if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        };
        self.reserve(self.len().saturating_add(additional));
        for value in iter {
            self.insert(value);
        }
    }
}

/// An iterator over the union of two sets.
pub struct Union<'a, K, S, R> {
    iter: Iter<'a, K>,
    other_iter: Iter<'a, K>,
    seen: &'a HashSet<K, S, R>,
}

impl<'a, K, S, R> Iterator for Union<'a, K, S, R>
where
    S: HashStrategy<K>,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(v) = self.iter.next() {
            return Some(v);
        }
        loop {
            let v = self.other_iter.next()?;
            if !self.seen.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the intersection of two sets.
pub struct Intersection<'a, K, S, R> {
    iter: Iter<'a, K>,
    other: &'a HashSet<K, S, R>,
}

impl<'a, K, S, R> Iterator for Intersection<'a, K, S, R>
where
    S: HashStrategy<K>,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the difference of two sets.
pub struct Difference<'a, K, S, R> {
    iter: Iter<'a, K>,
    other: &'a HashSet<K, S, R>,
}

impl<'a, K, S, R> Iterator for Difference<'a, K, S, R>
where
    S: HashStrategy<K>,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// An iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, K, S, R> {
    iter: core::iter::Chain<Difference<'a, K, S, R>, Difference<'a, K, S, R>>,
}

impl<'a, K, S, R> Iterator for SymmetricDifference<'a, K, S, R>
where
    S: HashStrategy<K>,
{
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}
