use core::fmt::Debug;
use core::iter::FusedIterator;
use core::ops::Index;

use crate::error::TryReserveError;
use crate::hash_table::Drain;
use crate::hash_table::Entry;
use crate::hash_table::HashTable;
use crate::hash_table::IntoIter;
use crate::hash_table::Iter;
use crate::hash_table::IterMut;
use crate::hash_table::Realloc;
use crate::hash_table::Relocate;
use crate::hash_table::Slots;
use crate::hashing::AutoHash;
use crate::hashing::HashStrategy;

/// Value types with a designated "missing" value.
///
/// Used by [`HashMap::get_or_missing`] and [`HashMap::get_at_or_missing`] to
/// report a failed lookup in-band. Integers use their `MAX`, raw pointers
/// use null.
pub trait Sentinel: Copy {
    /// The value reported for a missing key.
    const MISSING: Self;
}

macro_rules! int_sentinel {
    ($($t:ty),* $(,)?) => {
        $(
            impl Sentinel for $t {
                const MISSING: Self = <$t>::MAX;
            }
        )*
    };
}

int_sentinel!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl<T> Sentinel for *const T {
    const MISSING: Self = core::ptr::null();
}

impl<T> Sentinel for *mut T {
    const MISSING: Self = core::ptr::null_mut();
}

/// A hash map built on the tombstone [`HashTable`].
///
/// `HashMap<K, V, S, R>` hashes and compares keys through the strategy `S`
/// (by default [`AutoHash`], which covers integers, floats, pointers,
/// strings, references and pairs) and grows its storage per `R`.
///
/// Besides the usual key-based API the map exposes the table's *slot
/// handles*: [`find`](Self::find) returns the index of a key's slot (or the
/// sentinel [`end`](Self::end)), and the `*_at` methods read or modify an
/// entry by handle without hashing again. A handle stays valid until the
/// next call that takes `&mut self`.
///
/// # Performance Characteristics
///
/// - **Memory**: 1 byte of flag per slot plus `size_of::<K>() +
///   size_of::<V>()`; at most 77% of slots hold entries or tombstones.
/// - **Removal** leaves a tombstone. Tombstones are reclaimed by the next
///   rehash, which the table triggers early when they outnumber live entries.
#[derive(Clone)]
pub struct HashMap<K, V, S = AutoHash, R = Realloc> {
    table: HashTable<K, V, S, R>,
}

impl<K, V, S, R> Debug for HashMap<K, V, S, R>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S> HashMap<K, V, S> {
    /// Creates a new hash map with the given strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    /// use tombhash::hashing::IgnoreAsciiCase;
    ///
    /// let mut map: HashMap<String, u32, _> = HashMap::with_strategy(IgnoreAsciiCase);
    /// map.insert("Content-Length".to_string(), 42);
    /// assert_eq!(map.get(&"content-length".to_string()), Some(&42));
    /// ```
    pub const fn with_strategy(strategy: S) -> Self {
        Self {
            table: HashTable::with_strategy(strategy),
        }
    }

    /// Creates a new hash map able to hold `capacity` entries without
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

impl<K, V, S, R> HashMap<K, V, S, R> {
    /// Returns the number of elements in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.len(), 0);
    /// map.insert(1, "a");
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of entries the map can hold before it rehashes.
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

    /// Returns the map's hash strategy.
    pub fn strategy(&self) -> &S {
        self.table.strategy()
    }

    /// Returns `true` if `slot` holds a live entry.
    pub fn contains_at(&self, slot: usize) -> bool {
        self.table.exists_at(slot)
    }

    /// Returns the key stored at `slot`.
    pub fn key_at(&self, slot: usize) -> Option<&K> {
        self.table.key_at(slot)
    }

    /// Returns the value stored at `slot`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// let slot = map.insert_slot(7u32, "seven");
    /// assert_eq!(map.get_at(slot), Some(&"seven"));
    /// assert_eq!(map.get_at(map.end()), None);
    /// ```
    pub fn get_at(&self, slot: usize) -> Option<&V> {
        self.table.value_at(slot)
    }

    /// Returns the value stored at `slot` mutably.
    pub fn get_at_mut(&mut self, slot: usize) -> Option<&mut V> {
        self.table.value_at_mut(slot)
    }

    /// Returns a copy of the value at `slot`, or [`Sentinel::MISSING`] if the
    /// slot is not live.
    pub fn get_at_or_missing(&self, slot: usize) -> V
    where
        V: Sentinel,
    {
        self.get_at(slot).copied().unwrap_or(V::MISSING)
    }

    /// Overwrites the value at `slot`. Returns `false`, dropping `value`, if
    /// the slot is not live.
    pub fn set_at(&mut self, slot: usize, value: V) -> bool {
        match self.get_at_mut(slot) {
            Some(stored) => {
                *stored = value;
                true
            }
            None => false,
        }
    }

    /// Removes the entry at `slot`. Returns `false` if the slot was not live.
    pub fn remove_at(&mut self, slot: usize) -> bool {
        self.table.remove_at(slot)
    }

    /// Clears the map, removing all key-value pairs. Keeps the allocated
    /// memory for reuse.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Retains only the entries for which `f` returns `true`.
    pub fn retain(&mut self, f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(f);
    }

    /// Returns an iterator over the handles of all live slots, in slot order.
    pub fn slots(&self) -> Slots<'_> {
        self.table.slots()
    }

    /// Returns an iterator over the key-value pairs of the map.
    ///
    /// The iterator yields `(&K, &V)` pairs in slot order, which is
    /// arbitrary with respect to insertion order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    ///
    /// let mut pairs: Vec<_> = map.iter().collect();
    /// pairs.sort();
    /// assert_eq!(pairs, [(&1, &"a"), (&2, &"b")]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.table.iter()
    }

    /// Returns an iterator over the key-value pairs with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        self.table.iter_mut()
    }

    /// Returns an iterator over the keys of the map.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the values of the map.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over mutable references to the values of the map.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Clears the map, returning all key-value pairs as an iterator.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// map.insert(2, "b");
    ///
    /// let mut drained: Vec<_> = map.drain().collect();
    /// drained.sort();
    /// assert_eq!(drained, [(1, "a"), (2, "b")]);
    /// assert!(map.is_empty());
    /// ```
    pub fn drain(&mut self) -> Drain<'_, K, V, S, R> {
        self.table.drain()
    }
}

impl<K, V, S, R> HashMap<K, V, S, R>
where
    S: HashStrategy<K>,
{
    /// Returns the slot holding `key`, or [`end`](Self::end) if absent.
    pub fn find(&self, key: &K) -> usize {
        self.table.find(key)
    }

    /// Returns a reference to the value corresponding to the key.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), None);
    /// ```
    pub fn get(&self, key: &K) -> Option<&V> {
        self.table.get(key)
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.table.get_mut(key)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.table.get_key_value(key)
    }

    /// Returns a copy of the value for `key`, or [`Sentinel::MISSING`] if the
    /// key is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut ids: HashMap<&str, u32> = HashMap::new();
    /// ids.insert("root", 0);
    /// assert_eq!(ids.get_or_missing(&"root"), 0);
    /// assert_eq!(ids.get_or_missing(&"nobody"), u32::MAX);
    /// ```
    pub fn get_or_missing(&self, key: &K) -> V
    where
        V: Sentinel,
    {
        self.get(key).copied().unwrap_or(V::MISSING)
    }

    /// Overwrites the value of an existing key. Returns `false`, dropping
    /// `value`, if the key is absent; it is not inserted.
    pub fn set(&mut self, key: &K, value: V) -> bool {
        let slot = self.find(key);
        self.set_at(slot, value)
    }

    /// Returns `true` if the map contains a value for the specified key.
    pub fn contains_key(&self, key: &K) -> bool {
        self.table.exists(key)
    }

    /// Removes a key from the map, returning the value at the key if the key
    /// was previously in the map.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// map.insert(1, "a");
    /// assert_eq!(map.remove(&1), Some("a"));
    /// assert_eq!(map.remove(&1), None);
    /// ```
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.table.take(key).map(|(_, v)| v)
    }

    /// Removes a key from the map, returning the stored key and value if the
    /// key was previously in the map.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        self.table.take(key)
    }
}

impl<K, V, S, R> HashMap<K, V, S, R>
where
    S: HashStrategy<K>,
    R: Relocate,
{
    /// Inserts a key-value pair into the map.
    ///
    /// If the map did not have this key present, `None` is returned. If it
    /// did, the value is updated and the old value is returned; the stored
    /// key is not replaced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    /// assert_eq!(map.insert(37, "a"), None);
    /// assert_eq!(map.insert(37, "b"), Some("a"));
    /// assert_eq!(map[&37], "b");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.table.insert(key, value).1
    }

    /// Fallible version of [`insert`](Self::insert).
    pub fn try_insert(&mut self, key: K, value: V) -> Result<Option<V>, TryReserveError> {
        Ok(self.table.try_insert(key, value)?.1)
    }

    /// Inserts a key-value pair and returns the slot the entry lives in,
    /// overwriting the value if the key was present.
    pub fn insert_slot(&mut self, key: K, value: V) -> usize {
        self.table.insert(key, value).0
    }

    /// Gets the given key's corresponding entry in the map for in-place
    /// manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let mut map = HashMap::new();
    ///
    /// map.entry(1).or_insert("a");
    /// map.entry(2).or_insert("b");
    ///
    /// assert_eq!(map.get(&1), Some(&"a"));
    /// assert_eq!(map.get(&2), Some(&"b"));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, R> {
        self.table.entry(key)
    }

    /// Fallible version of [`entry`](Self::entry).
    pub fn try_entry(&mut self, key: K) -> Result<Entry<'_, K, V, S, R>, TryReserveError> {
        self.table.try_entry(key)
    }

    /// Ensures the map can hold `capacity` entries in total without
    /// rehashing.
    pub fn reserve(&mut self, capacity: usize) {
        self.table.reserve(capacity);
    }

    /// Fallible version of [`reserve`](Self::reserve).
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        self.table.try_reserve(capacity)
    }

    /// Shrinks the capacity of the map as much as possible and drops every
    /// tombstone.
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit();
    }

    /// Fallible version of [`shrink_to_fit`](Self::shrink_to_fit).
    pub fn try_shrink_to_fit(&mut self) -> Result<(), TryReserveError> {
        self.table.try_shrink_to_fit()
    }
}

impl<K, V> HashMap<K, V> {
    /// Creates an empty map with the default strategy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashMap;
    ///
    /// let map: HashMap<i32, String> = HashMap::new();
    /// assert!(map.is_empty());
    /// assert_eq!(map.bucket_count(), 0);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty map able to hold `capacity` entries without
    /// rehashing.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, AutoHash)
    }
}

impl<K, V, S, R> Default for HashMap<K, V, S, R>
where
    S: Default,
{
    fn default() -> Self {
        Self {
            table: HashTable::default(),
        }
    }
}

impl<K, V, S, R> From<HashTable<K, V, S, R>> for HashMap<K, V, S, R> {
    /// Wraps an engine table, for instance one configured with
    /// [`MoveLive`](crate::MoveLive) relocation.
    fn from(table: HashTable<K, V, S, R>) -> Self {
        Self { table }
    }
}

impl<K, V, S, R> Index<&K> for HashMap<K, V, S, R>
where
    S: HashStrategy<K>,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map. For value types with a
    /// [`Sentinel`], [`HashMap::get_or_missing`] reports a missing key
    /// in-band instead.
    fn index(&self, key: &K) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found in HashMap"),
        }
    }
}

impl<K, V, S, R> PartialEq for HashMap<K, V, S, R>
where
    V: PartialEq,
    S: HashStrategy<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K, V, S, R> Eq for HashMap<K, V, S, R>
where
    V: Eq,
    S: HashStrategy<K>,
{
}

impl<K, V, S, R> FromIterator<(K, V)> for HashMap<K, V, S, R>
where
    S: HashStrategy<K> + Default,
    R: Relocate,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::default();
        map.extend(iter);
        map
    }
}

impl<K, V, S, R> Extend<(K, V)> for HashMap<K, V, S, R>
where
    S: HashStrategy<K>,
    R: Relocate,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        // Duplicate keys are likely when extending a populated map.
        let additional = if self.is_empty() {
            iter.size_hint().0
        } else {
            iter.size_hint().0.div_ceil(2)
        };
        self.reserve(self.len().saturating_add(additional));
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S, R> IntoIterator for HashMap<K, V, S, R> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, S, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}

impl<'a, K, V, S, R> IntoIterator for &'a HashMap<K, V, S, R> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, R> IntoIterator for &'a mut HashMap<K, V, S, R> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Writes the map as a serde map keyed by each key's `Display` text.
#[cfg(feature = "serde")]
impl<K, V, S, R> serde::Serialize for HashMap<K, V, S, R>
where
    K: core::fmt::Display,
    V: serde::Serialize,
{
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        struct FieldName<'a, K>(&'a K);

        impl<K: core::fmt::Display> serde::Serialize for FieldName<'_, K> {
            fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
            where
                Ser: serde::Serializer,
            {
                serializer.collect_str(self.0)
            }
        }

        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(&FieldName(key), value)?;
        }
        map.end()
    }
}

/// An iterator over the keys of a [`HashMap`].
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of a [`HashMap`].
pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a [`HashMap`].
pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

#[cfg(test)]
mod tests {
    use core::hash::BuildHasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::hashing::BuildHasherStrategy;
    use crate::hashing::IgnoreAsciiCase;

    #[derive(Clone)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k1: rng.try_next_u64().unwrap_or(0),
                k2: rng.try_next_u64().unwrap_or(0),
            }
        }
    }

    type SipStrategy = BuildHasherStrategy<SipHashBuilder>;

    #[test]
    fn test_new_and_with_strategy() {
        let map: HashMap<i32, String> = HashMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
        assert_eq!(map.bucket_count(), 0);

        let map2 = HashMap::<i32, String, _>::with_strategy(SipStrategy::default());
        assert!(map2.is_empty());
        assert_eq!(map2.len(), 0);
    }

    #[test]
    fn test_with_capacity() {
        let map: HashMap<i32, String> = HashMap::with_capacity(100);
        assert!(map.capacity() >= 100);
        assert!(map.is_empty());

        let map2 =
            HashMap::<i32, String, _>::with_capacity_and_strategy(200, SipStrategy::default());
        assert!(map2.capacity() >= 200);
        assert!(map2.is_empty());
    }

    #[test]
    fn test_insert_and_get() {
        let mut map = HashMap::new();

        assert_eq!(map.insert(1, "hello".to_string()), None);
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());

        assert_eq!(map.get(&1), Some(&"hello".to_string()));
        assert_eq!(map.get(&2), None);

        assert_eq!(
            map.insert(1, "world".to_string()),
            Some("hello".to_string())
        );
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&1), Some(&"world".to_string()));
    }

    #[test]
    fn test_overwrite_scenario() {
        let mut map = HashMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("a", 3);

        assert_eq!(map.get(&"a"), Some(&3));
        assert_eq!(map.get(&"b"), Some(&2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_get_mut() {
        let mut map = HashMap::new();
        map.insert(1, "hello".to_string());

        if let Some(value) = map.get_mut(&1) {
            value.push_str(" world");
        }

        assert_eq!(map.get(&1), Some(&"hello world".to_string()));
        assert_eq!(map.get_mut(&2), None);
    }

    #[test]
    fn test_contains_key() {
        let mut map = HashMap::new();
        assert!(!map.contains_key(&1));

        map.insert(1, "value".to_string());
        assert!(map.contains_key(&1));
        assert!(!map.contains_key(&2));
    }

    #[test]
    fn test_remove() {
        let mut map = HashMap::new();
        map.insert(1, "hello".to_string());
        map.insert(2, "world".to_string());

        assert_eq!(map.remove(&1), Some("hello".to_string()));
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&1));
        assert!(map.contains_key(&2));

        assert_eq!(map.remove(&1), None);
        assert_eq!(map.len(), 1);

        map.insert(1, "again".to_string());
        assert_eq!(map.get(&1), Some(&"again".to_string()));
    }

    #[test]
    fn test_remove_entry() {
        let mut map = HashMap::new();
        map.insert(1, "hello".to_string());

        assert_eq!(map.remove_entry(&1), Some((1, "hello".to_string())));
        assert_eq!(map.remove_entry(&1), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut map = HashMap::new();
        for i in 0..10 {
            map.insert(i, i * 10);
        }
        let buckets = map.bucket_count();

        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.bucket_count(), buckets);
        assert_eq!(map.get(&5), None);

        map.insert(5, 50);
        assert_eq!(map.get(&5), Some(&50));
    }

    #[test]
    fn test_reserve() {
        let mut map: HashMap<i32, i32> = HashMap::new();
        map.reserve(1000);
        assert!(map.capacity() >= 1000);

        let buckets = map.bucket_count();
        for i in 0..1000 {
            map.insert(i, i);
        }
        assert_eq!(map.bucket_count(), buckets);
        assert_eq!(map.try_reserve(10), Ok(()));
        assert_eq!(
            map.try_reserve(usize::MAX),
            Err(TryReserveError::CapacityOverflow)
        );
        assert_eq!(map.len(), 1000);
    }

    #[test]
    fn test_slot_handles() {
        let mut map = HashMap::new();
        let slot = map.insert_slot(10u64, "ten");
        map.insert_slot(20u64, "twenty");

        assert_eq!(map.find(&10), slot);
        assert!(map.contains_at(slot));
        assert_eq!(map.key_at(slot), Some(&10));
        assert_eq!(map.get_at(slot), Some(&"ten"));

        if let Some(value) = map.get_at_mut(slot) {
            *value = "TEN";
        }
        assert_eq!(map.get(&10), Some(&"TEN"));

        assert_eq!(map.find(&30), map.end());
        assert!(!map.contains_at(map.end()));

        assert!(map.remove_at(slot));
        assert!(!map.remove_at(slot));
        assert!(!map.contains_key(&10));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_sentinel_lookup() {
        let empty: HashMap<&str, u32> = HashMap::new();
        assert_eq!(empty.find(&"x"), empty.bucket_count());
        assert_eq!(empty.get_or_missing(&"x"), u32::MAX);
        assert_eq!(empty.get_at_or_missing(empty.end()), u32::MAX);

        let mut map: HashMap<&str, i64> = HashMap::new();
        map.insert("x", -1);
        assert_eq!(map.get_or_missing(&"x"), -1);
        assert_eq!(map.get_or_missing(&"y"), i64::MAX);
        assert_eq!(map.get_at_or_missing(map.find(&"x")), -1);

        let target = 5u8;
        let mut pointers: HashMap<u32, *const u8> = HashMap::new();
        pointers.insert(1, &target);
        assert_eq!(pointers.get_or_missing(&1), &target as *const u8);
        assert!(pointers.get_or_missing(&2).is_null());
    }

    #[test]
    fn test_set_and_set_at() {
        let mut map = HashMap::new();
        map.insert(1, 10);

        assert!(map.set(&1, 11));
        assert!(!map.set(&2, 20));
        assert_eq!(map.get(&1), Some(&11));
        assert!(!map.contains_key(&2));

        let slot = map.find(&1);
        assert!(map.set_at(slot, 12));
        assert!(!map.set_at(map.end(), 99));
        assert_eq!(map[&1], 12);
        assert_eq!(map.len(), 1);
    }

    #[test]
    #[should_panic(expected = "key not found")]
    fn test_index_missing_key() {
        let map: HashMap<u32, u32> = HashMap::new();
        let _value: u32 = map[&1];
    }

    #[test]
    fn test_entry_api() {
        let mut map = HashMap::new();

        map.entry(1).or_insert("first");
        assert_eq!(map.get(&1), Some(&"first"));

        map.entry(1).or_insert("second");
        assert_eq!(map.get(&1), Some(&"first"));

        map.entry(2).or_insert_with(|| "computed");
        assert_eq!(map.get(&2), Some(&"computed"));

        map.entry(1).and_modify(|v| *v = "modified");
        assert_eq!(map.get(&1), Some(&"modified"));

        map.entry(3).and_modify(|v| *v = "never").or_insert("fresh");
        assert_eq!(map.get(&3), Some(&"fresh"));
    }

    #[test]
    fn test_entry_or_default() {
        let mut map: HashMap<&str, Vec<u32>> = HashMap::new();
        map.entry("a").or_default().push(1);
        map.entry("a").or_default().push(2);
        map.entry("b").or_default();

        assert_eq!(map.get(&"a"), Some(&vec![1, 2]));
        assert_eq!(map.get(&"b"), Some(&vec![]));
    }

    #[test]
    fn test_occupied_entry() {
        let mut map = HashMap::new();
        map.insert(1, "value".to_string());

        match map.entry(1) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), &1);
                assert_eq!(entry.get(), "value");
                entry.get_mut().push_str("_modified");
                assert_eq!(entry.insert("replaced".to_string()), "value_modified");
                assert_eq!(entry.remove(), "replaced");
            }
            Entry::Vacant(_) => panic!("expected occupied entry"),
        }
        assert!(map.is_empty());
    }

    #[test]
    fn test_vacant_entry() {
        let mut map: HashMap<i32, String> = HashMap::new();

        match map.entry(7) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), &7);
                let value = entry.insert("seven".to_string());
                value.push('!');
            }
            Entry::Occupied(_) => panic!("expected vacant entry"),
        }
        assert_eq!(map.get(&7), Some(&"seven!".to_string()));

        match map.entry(8) {
            Entry::Vacant(entry) => assert_eq!(entry.into_key(), 8),
            Entry::Occupied(_) => panic!("expected vacant entry"),
        }
        assert!(!map.contains_key(&8));
    }

    #[test]
    fn test_iterators() {
        let mut map = HashMap::new();
        for i in 0..10 {
            map.insert(i, i * 10);
        }

        let mut keys: Vec<_> = map.keys().copied().collect();
        keys.sort_unstable();
        assert_eq!(keys, (0..10).collect::<Vec<_>>());

        let mut values: Vec<_> = map.values().copied().collect();
        values.sort_unstable();
        assert_eq!(values, (0..10).map(|i| i * 10).collect::<Vec<_>>());

        for value in map.values_mut() {
            *value += 1;
        }
        for (_, value) in &mut map {
            *value += 1;
        }
        let sum: i32 = (&map).into_iter().map(|(_, v)| *v).sum();
        assert_eq!(sum, 450 + 20);

        let slots: Vec<usize> = map.slots().collect();
        assert_eq!(slots.len(), map.len());
        for slot in slots {
            let key = map.key_at(slot).copied();
            assert_eq!(key.map(|k| map.find(&k)), Some(slot));
        }
    }

    #[test]
    fn test_drain() {
        let mut map = HashMap::new();
        for i in 0..5 {
            map.insert(i, format!("value_{}", i));
        }

        let mut drained: Vec<_> = map.drain().collect();
        drained.sort();
        assert_eq!(drained.len(), 5);
        assert_eq!(drained[0], (0, "value_0".to_string()));
        assert!(map.is_empty());

        map.insert(1, "after".to_string());
        assert_eq!(map.get(&1), Some(&"after".to_string()));
    }

    #[test]
    fn test_retain() {
        let mut map: HashMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
        map.retain(|k, _| k % 10 == 0);
        assert_eq!(map.len(), 10);
        assert!(map.contains_key(&50));
        assert!(!map.contains_key(&51));
    }

    #[test]
    fn test_multiple_insertions() {
        let mut map = HashMap::new();

        for i in 0..100 {
            map.insert(i, format!("value_{}", i));
        }

        assert_eq!(map.len(), 100);
        assert!(map.bucket_count().is_power_of_two());

        for i in 0..100 {
            assert_eq!(map.get(&i), Some(&format!("value_{}", i)));
        }
    }

    #[test]
    fn test_collision_handling() {
        let mut map = HashMap::with_strategy(SipStrategy::default());

        for i in 0..1000 {
            map.insert(i, i * 2);
        }

        assert_eq!(map.len(), 1000);

        for i in 0..1000 {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }

        for i in (0..1000).step_by(2) {
            assert_eq!(map.remove(&i), Some(i * 2));
        }

        assert_eq!(map.len(), 500);

        for i in (1..1000).step_by(2) {
            assert_eq!(map.get(&i), Some(&(i * 2)));
        }
    }

    #[test]
    fn test_string_keys() {
        let mut map = HashMap::new();

        map.insert("hello".to_string(), 1);
        map.insert("world".to_string(), 2);
        map.insert("rust".to_string(), 3);

        assert_eq!(map.get(&"hello".to_string()), Some(&1));
        assert_eq!(map.get(&"world".to_string()), Some(&2));
        assert_eq!(map.get(&"rust".to_string()), Some(&3));
        assert_eq!(map.get(&"missing".to_string()), None);
    }

    #[test]
    fn test_case_insensitive_keys() {
        let mut headers: HashMap<&str, u32, _> = HashMap::with_strategy(IgnoreAsciiCase);
        headers.insert("Content-Type", 1);
        assert_eq!(headers.insert("CONTENT-TYPE", 2), Some(1));

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(&"content-type"), Some(&2));
        assert_eq!(headers.get_key_value(&"content-TYPE"), Some((&"Content-Type", &2)));
        assert_eq!(headers.get(&"content-length"), None);
    }

    #[test]
    fn test_pair_keys() {
        let mut grid: HashMap<(u32, u32), char> = HashMap::new();
        for x in 0..20 {
            for y in 0..20 {
                grid.insert((x, y), if (x + y) % 2 == 0 { '#' } else { '.' });
            }
        }

        assert_eq!(grid.len(), 400);
        assert_eq!(grid.get(&(3, 5)), Some(&'#'));
        assert_eq!(grid.get(&(5, 4)), Some(&'.'));
        assert_eq!(grid.get(&(20, 0)), None);
    }

    #[test]
    fn test_clone_independence() {
        let mut map = HashMap::new();
        for i in 0..50 {
            map.insert(i, i.to_string());
        }
        map.remove(&7);

        let mut copy = map.clone();
        assert_eq!(copy, map);
        assert_eq!(copy.bucket_count(), map.bucket_count());

        copy.insert(7, "seven".to_string());
        copy.remove(&8);
        assert_eq!(map.get(&7), None);
        assert_eq!(map.get(&8), Some(&"8".to_string()));
        assert_ne!(copy, map);
    }

    #[test]
    fn test_from_iter_and_extend() {
        let mut map: HashMap<u32, u32> = (0..10).map(|i| (i, i * i)).collect();
        assert_eq!(map.len(), 10);
        assert_eq!(map[&3], 9);

        map.extend((5..15).map(|i| (i, 0)));
        assert_eq!(map.len(), 15);
        assert_eq!(map[&3], 9);
        assert_eq!(map[&7], 0);

        let mut owned: Vec<_> = map.into_iter().collect();
        owned.sort_unstable();
        assert_eq!(owned.len(), 15);
        assert_eq!(owned[0], (0, 0));
    }

    #[test]
    fn test_move_live_relocation() {
        let table = HashTable::<u64, u64, AutoHash, crate::MoveLive>::default();
        let mut map = HashMap::from(table);
        for i in 0..500u64 {
            map.insert(i, i + 1);
        }
        for i in 0..250u64 {
            map.remove(&i);
        }
        map.shrink_to_fit();

        assert_eq!(map.len(), 250);
        for i in 250..500u64 {
            assert_eq!(map.get(&i), Some(&(i + 1)));
        }
    }

    #[test]
    fn test_default_with_move_live() {
        let mut map = HashMap::<u64, u64, AutoHash, crate::MoveLive>::default();
        assert_eq!(map.bucket_count(), 0);
        for i in 0..100u64 {
            map.insert(i, i * 3);
        }
        assert_eq!(map.len(), 100);
        assert_eq!(map[&42], 126);

        let collected: HashMap<u64, u64, AutoHash, crate::MoveLive> =
            (0..10u64).map(|i| (i, i)).collect();
        assert_eq!(collected.len(), 10);
    }

    #[test]
    fn test_extend_populated_map_with_duplicates() {
        let mut map: HashMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
        let buckets = map.bucket_count();

        // Every key is already present; the table must not grow for them.
        map.extend((0..100).map(|i| (i, i + 1)));
        assert_eq!(map.len(), 100);
        assert_eq!(map.bucket_count(), buckets);
        assert_eq!(map[&99], 100);
    }

    #[test]
    fn test_iterators_report_exact_len() {
        let mut map: HashMap<u32, u32> = (0..40).map(|i| (i, i)).collect();
        for i in 0..10 {
            map.remove(&i);
        }

        assert_eq!(map.iter().len(), 30);
        assert_eq!(map.keys().len(), 30);
        assert_eq!(map.values().len(), 30);
        assert_eq!(map.values_mut().len(), 30);
        assert_eq!(map.iter_mut().len(), 30);
        assert_eq!(map.slots().len(), 30);

        let mut iter = map.iter();
        iter.next();
        assert_eq!(iter.size_hint(), (29, Some(29)));

        let mut drain = map.drain();
        drain.next();
        assert_eq!(drain.len(), 29);
    }

    #[test]
    fn test_iter_mut_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        fn assert_sync<T: Sync>(_: &T) {}

        let mut map: HashMap<u32, String> = HashMap::new();
        map.insert(1, "one".to_string());
        let iter = map.iter_mut();
        assert_send(&iter);
        assert_sync(&iter);
    }

    #[test]
    fn test_debug_output() {
        let mut map = HashMap::new();
        map.insert(1, "one");
        assert_eq!(format!("{:?}", map), r#"{1: "one"}"#);
    }

    #[test]
    fn test_default_trait() {
        let map: HashMap<i32, String, SipStrategy> = HashMap::default();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_complex_values() {
        let mut map = HashMap::new();

        let vec1 = vec![1, 2, 3];
        let vec2 = vec![4, 5, 6];

        map.insert("first".to_string(), vec1.clone());
        map.insert("second".to_string(), vec2.clone());

        assert_eq!(map.get(&"first".to_string()), Some(&vec1));
        assert_eq!(map.get(&"second".to_string()), Some(&vec2));

        if let Some(v) = map.get_mut(&"first".to_string()) {
            v.push(4);
        }

        assert_eq!(map.get(&"first".to_string()), Some(&vec![1, 2, 3, 4]));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serialize_uses_display_keys() {
        let mut map: HashMap<u32, Vec<&str>> = HashMap::new();
        map.insert(7, vec!["seven"]);
        assert_eq!(
            serde_json::to_string(&map).unwrap(),
            r#"{"7":["seven"]}"#
        );

        let mut scores: HashMap<&str, u32> = HashMap::new();
        for (name, score) in [("ann", 3), ("bo", 5), ("cy", 8)] {
            scores.insert(name, score);
        }
        let value = serde_json::to_value(&scores).unwrap();
        assert_eq!(value, serde_json::json!({ "ann": 3, "bo": 5, "cy": 8 }));

        let empty: HashMap<u32, u32> = HashMap::new();
        assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");
    }
}
