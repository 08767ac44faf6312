//! The open-addressing engine shared by [`HashMap`](crate::HashMap) and
//! [`HashSet`](crate::HashSet).
//!
//! A table owns three parallel buffers sized to a common power-of-two bucket
//! count: a flag per slot (`Empty`, `Live` or `Deleted`), the keys, and the
//! values. Keys and values live in raw storage and are only initialized
//! where the flag says `Live`. Set mode is simply `V = ()`, for which the
//! value buffer never allocates.
//!
//! Lookups probe with triangular increments from the key's home slot and
//! stop at the first `Empty` slot. Removal leaves a `Deleted` tombstone so
//! that later keys in the same probe chain stay reachable; tombstones keep
//! counting towards the load factor until a rehash reclaims them.
//!
//! Rehashing happens in place: the key and value buffers are grown (or the
//! smaller buffers allocated) first, then every live entry is walked in slot
//! order and moved to its slot in the new layout, kicking out any entry of
//! the old layout that still sits there, cuckoo style. No second table is
//! ever built.

use alloc::alloc::alloc;
use alloc::alloc::realloc;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use crate::error::TryReserveError;
use crate::error::infallible;
use crate::hashing::AutoHash;
use crate::hashing::HashStrategy;

/// Smallest bucket count of an allocated table.
const MIN_BUCKETS: usize = 32;

/// Number of occupied slots (live or tombstoned) at which the table must be
/// rehashed before the next insertion: `round(bucket_count * 0.77)`.
#[inline(always)]
fn upper_bound(bucket_count: usize) -> usize {
    ((bucket_count as u128 * 77 + 50) / 100) as usize
}

/// Rounds a requested bucket count to a legal one.
#[inline]
fn normalize(requested: usize) -> Result<usize, TryReserveError> {
    requested
        .checked_next_power_of_two()
        .map(|buckets| buckets.max(MIN_BUCKETS))
        .ok_or(TryReserveError::CapacityOverflow)
}

/// Smallest legal bucket count whose upper bound admits `entries`.
fn buckets_for(entries: usize) -> Result<usize, TryReserveError> {
    if entries == 0 {
        return Ok(0);
    }

    let mut buckets = normalize(entries)?;
    while upper_bound(buckets) < entries {
        buckets = buckets
            .checked_mul(2)
            .ok_or(TryReserveError::CapacityOverflow)?;
    }
    Ok(buckets)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Flag {
    Live,
    Deleted,
    Empty,
}

fn try_alloc_flags(buckets: usize) -> Result<Vec<Flag>, TryReserveError> {
    let mut flags = Vec::new();
    flags
        .try_reserve_exact(buckets)
        .map_err(|_| match Layout::array::<Flag>(buckets) {
            Ok(layout) => TryReserveError::AllocError { layout },
            Err(_) => TryReserveError::CapacityOverflow,
        })?;
    flags.resize(buckets, Flag::Empty);
    Ok(flags)
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Realloc {}
    impl Sealed for super::MoveLive {}
}

/// How a table moves its key and value buffers when it grows.
///
/// Every Rust value can be moved by copying its bytes, so both strategies
/// work for any key and value type. They differ in how much memory they
/// touch: [`Realloc`] hands the whole buffer to the allocator's `realloc`,
/// which may extend it in place, while [`MoveLive`] allocates a fresh buffer
/// and copies only the live slots across.
pub trait Relocate: sealed::Sealed {
    #[doc(hidden)]
    const REALLOC: bool;
}

/// Grow storage buffers with `realloc`. This is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Realloc;

impl Relocate for Realloc {
    const REALLOC: bool = true;
}

/// Grow storage buffers by allocating fresh ones and moving live entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MoveLive;

impl Relocate for MoveLive {
    const REALLOC: bool = false;
}

/// A raw buffer of `cap` possibly-uninitialized slots.
///
/// The buffer never drops its contents; the owning table does that based on
/// its flags. Dropping the buffer only frees the allocation.
struct RawSlots<T> {
    ptr: NonNull<MaybeUninit<T>>,
    cap: usize,
    _owns: PhantomData<T>,
}

// SAFETY: `RawSlots` is a uniquely owned allocation of `T`s.
unsafe impl<T: Send> Send for RawSlots<T> {}
// SAFETY: Shared access only hands out `&T`.
unsafe impl<T: Sync> Sync for RawSlots<T> {}

impl<T> RawSlots<T> {
    const fn dangling() -> Self {
        Self {
            ptr: NonNull::dangling(),
            cap: 0,
            _owns: PhantomData,
        }
    }

    fn layout(cap: usize) -> Result<Layout, TryReserveError> {
        Layout::array::<T>(cap).map_err(|_| TryReserveError::CapacityOverflow)
    }

    fn try_allocate(cap: usize) -> Result<Self, TryReserveError> {
        let layout = Self::layout(cap)?;
        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                cap,
                _owns: PhantomData,
            });
        }

        // SAFETY: We have validated that the layout size is non-zero.
        let raw = unsafe { alloc(layout) };
        match NonNull::new(raw) {
            Some(ptr) => Ok(Self {
                ptr: ptr.cast(),
                cap,
                _owns: PhantomData,
            }),
            None => Err(TryReserveError::AllocError { layout }),
        }
    }

    /// Grows the buffer to `new_cap` slots with `realloc`. On failure the
    /// buffer is untouched.
    fn try_realloc(&mut self, new_cap: usize) -> Result<(), TryReserveError> {
        debug_assert!(new_cap >= self.cap);
        let new_layout = Self::layout(new_cap)?;
        if new_layout.size() == 0 {
            self.cap = new_cap;
            return Ok(());
        }

        let old_layout = Self::layout(self.cap)?;
        // SAFETY: `new_layout` has a non-zero size that was validated by
        // `Layout::array`. When the old layout is non-empty, `self.ptr` was
        // allocated with exactly `old_layout` and shares its alignment.
        let raw = unsafe {
            if old_layout.size() == 0 {
                alloc(new_layout)
            } else {
                realloc(self.ptr.as_ptr().cast(), old_layout, new_layout.size())
            }
        };

        let ptr = NonNull::new(raw).ok_or(TryReserveError::AllocError { layout: new_layout })?;
        self.ptr = ptr.cast();
        self.cap = new_cap;
        Ok(())
    }

    /// Moves every slot below `upto` selected by `live` into `fresh` at the
    /// same index, then replaces `self` with `fresh`, freeing the old
    /// allocation.
    ///
    /// # Safety
    ///
    /// Every selected slot must be initialized, and `upto` must not exceed
    /// either capacity.
    unsafe fn adopt(&mut self, mut fresh: Self, upto: usize, live: impl Fn(usize) -> bool) {
        debug_assert!(upto <= self.cap && upto <= fresh.cap);
        for index in 0..upto {
            if live(index) {
                // SAFETY: The caller guarantees `index` is in bounds of both
                // buffers and that the source slot is initialized. The two
                // allocations are distinct.
                unsafe {
                    core::ptr::copy_nonoverlapping(
                        self.ptr.as_ptr().add(index),
                        fresh.ptr.as_ptr().add(index),
                        1,
                    );
                }
            }
        }
        core::mem::swap(self, &mut fresh);
    }

    /// # Safety
    ///
    /// `index` must be less than `self.cap`.
    #[inline(always)]
    unsafe fn slot(&self, index: usize) -> &MaybeUninit<T> {
        debug_assert!(index < self.cap);
        // SAFETY: Caller ensures `index` is within the allocation.
        unsafe { &*self.ptr.as_ptr().add(index) }
    }

    /// # Safety
    ///
    /// `index` must be less than `self.cap`.
    #[inline(always)]
    unsafe fn slot_mut(&mut self, index: usize) -> &mut MaybeUninit<T> {
        debug_assert!(index < self.cap);
        // SAFETY: Caller ensures `index` is within the allocation.
        unsafe { &mut *self.ptr.as_ptr().add(index) }
    }
}

impl<T> Drop for RawSlots<T> {
    fn drop(&mut self) {
        if let Ok(layout) = Self::layout(self.cap) {
            if layout.size() != 0 {
                // SAFETY: A non-empty layout means `ptr` was allocated (or
                // reallocated) with exactly this layout.
                unsafe { alloc::alloc::dealloc(self.ptr.as_ptr().cast(), layout) };
            }
        }
    }
}

/// Panics while dropped, turning an unwind that escapes a rehash into an
/// abort. A rehash that stops halfway leaves entries that neither layout
/// describes.
struct AbortOnUnwind;

impl Drop for AbortOnUnwind {
    fn drop(&mut self) {
        panic!("hash strategy panicked while the table was being rehashed");
    }
}

enum Probe {
    Found(usize),
    Vacant(usize),
}

/// Debug statistics for hash table analysis.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of live entries
    pub populated: usize,
    /// Number of non-empty slots, tombstones included
    pub occupied: usize,
    /// Number of tombstoned slots
    pub tombstones: usize,
    /// Total number of slots allocated
    pub bucket_count: usize,
    /// Occupancy at which the next insertion rehashes
    pub capacity: usize,
    /// Load factor (populated / bucket_count)
    pub load_factor: f64,
    /// Slot utilization including tombstones (occupied / bucket_count)
    pub occupancy: f64,
    /// Total memory in bytes used by the table buffers
    pub total_bytes: usize,
    /// Bytes held by slots that do not contain a live entry
    pub wasted_bytes: usize,
}

#[cfg(any(test, feature = "stats"))]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.populated,
            self.bucket_count,
            self.load_factor * 100.0
        );
        println!(
            "Occupancy: {}/{} ({:.2}%, {} tombstones, rehash at {})",
            self.occupied,
            self.bucket_count,
            self.occupancy * 100.0,
            self.tombstones,
            self.capacity
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

/// An open-addressing hash table with tombstone deletion.
///
/// `HashTable<K, V, S, R>` stores keys of type `K` with values of type `V`,
/// hashing and comparing keys through the strategy `S` (see
/// [`hashing`](crate::hashing)) and growing its buffers per the relocation
/// strategy `R`. Use `V = ()` for a set.
///
/// Entries are addressed by *slot handles*: plain bucket indices returned by
/// [`find`](Self::find), [`insert`](Self::insert) and [`slots`](Self::slots).
/// A handle stays meaningful until the next mutating call. [`find`] reports a
/// missing key with the sentinel handle [`end`](Self::end), which equals
/// [`bucket_count`](Self::bucket_count).
///
/// [`find`]: Self::find
///
/// ## Example
///
/// ```rust
/// use tombhash::HashTable;
///
/// let mut table: HashTable<&str, u32> = HashTable::new();
/// let (slot, previous) = table.insert("apple", 3);
/// assert_eq!(previous, None);
/// assert_eq!(table.find(&"apple"), slot);
/// assert_eq!(table.value_at(slot), Some(&3));
///
/// assert_eq!(table.find(&"pear"), table.end());
/// ```
pub struct HashTable<K, V, S = AutoHash, R = Realloc> {
    flags: Vec<Flag>,
    keys: RawSlots<K>,
    values: RawSlots<V>,

    size: usize,
    occupied: usize,
    upper_bound: usize,

    strategy: S,
    _relocate: PhantomData<R>,
}

impl<K, V, S, R> Debug for HashTable<K, V, S, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        struct FlagMap<'a>(&'a [Flag]);

        impl Debug for FlagMap<'_> {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                use alloc::string::String;

                f.debug_list()
                    .entries(self.0.chunks(32).map(|row| {
                        row.iter()
                            .map(|flag| match flag {
                                Flag::Live => '#',
                                Flag::Deleted => 'x',
                                Flag::Empty => '.',
                            })
                            .collect::<String>()
                    }))
                    .finish()
            }
        }

        f.debug_struct("HashTable")
            .field("len", &self.size)
            .field("occupied", &self.occupied)
            .field("bucket_count", &self.flags.len())
            .field("capacity", &self.upper_bound)
            .field("flags", &FlagMap(&self.flags))
            .finish()
    }
}

impl<K, V, S, R> Clone for HashTable<K, V, S, R>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    fn clone(&self) -> Self {
        let mut table = Self::with_strategy(self.strategy.clone());
        let buckets = self.flags.len();
        if buckets == 0 {
            return table;
        }

        table.flags = infallible(try_alloc_flags(buckets));
        table.keys = infallible(RawSlots::try_allocate(buckets));
        table.values = infallible(RawSlots::try_allocate(buckets));
        table.upper_bound = self.upper_bound;

        // Tombstones are copied too: dropping them would cut the probe chains
        // of the keys behind them.
        for index in 0..buckets {
            match self.flags[index] {
                Flag::Live => {
                    // SAFETY: Both tables have `buckets` slots and `index` is
                    // live in the source.
                    unsafe {
                        let key = self.keys.slot(index).assume_init_ref().clone();
                        let value = self.values.slot(index).assume_init_ref().clone();
                        table.keys.slot_mut(index).write(key);
                        table.values.slot_mut(index).write(value);
                    }
                    table.flags[index] = Flag::Live;
                    table.size += 1;
                    table.occupied += 1;
                }
                Flag::Deleted => {
                    table.flags[index] = Flag::Deleted;
                    table.occupied += 1;
                }
                Flag::Empty => {}
            }
        }

        debug_assert_eq!(table.size, self.size);
        debug_assert_eq!(table.occupied, self.occupied);
        table
    }
}

impl<K, V, S, R> Drop for HashTable<K, V, S, R> {
    fn drop(&mut self) {
        if core::mem::needs_drop::<(K, V)>() && self.size > 0 {
            for (index, flag) in self.flags.iter().enumerate() {
                if *flag == Flag::Live {
                    // SAFETY: Live slots hold initialized keys and values, and
                    // every flag index is within both buffers.
                    unsafe {
                        self.keys.slot_mut(index).assume_init_drop();
                        self.values.slot_mut(index).assume_init_drop();
                    }
                }
            }
        }
    }
}

impl<K, V, S, R> Default for HashTable<K, V, S, R>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_strategy(S::default())
    }
}

impl<K, V, S, R> HashTable<K, V, S, R>
where
    S: Default,
{
    /// Creates an empty table with the default strategy. Nothing is
    /// allocated until the first insertion.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V, S, R> HashTable<K, V, S, R>
where
    S: Default,
{
    /// Creates a table able to hold `capacity` entries without rehashing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashTable;
    ///
    /// let table: HashTable<u64, u64> = HashTable::with_capacity(100);
    /// assert!(table.capacity() >= 100);
    /// assert_eq!(table.bucket_count(), 256);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, S::default())
    }
}

impl<K, V, S, R> HashTable<K, V, S, R> {
    /// Creates an empty table that hashes and compares keys with
    /// `strategy`.
    pub const fn with_strategy(strategy: S) -> Self {
        Self {
            flags: Vec::new(),
            keys: RawSlots::dangling(),
            values: RawSlots::dangling(),
            size: 0,
            occupied: 0,
            upper_bound: 0,
            strategy,
            _relocate: PhantomData,
        }
    }

    /// Creates a table able to hold `capacity` entries without rehashing,
    /// using `strategy`.
    pub fn with_capacity_and_strategy(capacity: usize, strategy: S) -> Self {
        infallible(Self::try_with_capacity_and_strategy(capacity, strategy))
    }

    /// Fallible version of
    /// [`with_capacity_and_strategy`](Self::with_capacity_and_strategy).
    pub fn try_with_capacity_and_strategy(
        capacity: usize,
        strategy: S,
    ) -> Result<Self, TryReserveError> {
        let mut table = Self::with_strategy(strategy);
        let buckets = buckets_for(capacity)?;
        if buckets > 0 {
            table.flags = try_alloc_flags(buckets)?;
            table.keys = RawSlots::try_allocate(buckets)?;
            table.values = RawSlots::try_allocate(buckets)?;
            table.upper_bound = upper_bound(buckets);
        }
        Ok(table)
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the table holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the number of slots: `0` for an unallocated table, otherwise
    /// a power of two of at least 32.
    pub fn bucket_count(&self) -> usize {
        self.flags.len()
    }

    /// The sentinel handle returned by [`find`](Self::find) for a missing
    /// key. Always equal to [`bucket_count`](Self::bucket_count).
    pub fn end(&self) -> usize {
        self.flags.len()
    }

    /// Returns the number of non-empty slots, live entries and tombstones
    /// together.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Returns the occupancy at which the next insertion rehashes.
    ///
    /// A table can always take `capacity() - len()` new keys without
    /// rehashing when it holds no tombstones.
    pub fn capacity(&self) -> usize {
        self.upper_bound
    }

    /// Returns the table's hash strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns `true` if `slot` holds a live entry. Out-of-range handles,
    /// including [`end`](Self::end), are never live.
    #[inline]
    pub fn exists_at(&self, slot: usize) -> bool {
        self.flags.get(slot) == Some(&Flag::Live)
    }

    /// Returns the key stored at `slot`, if live.
    pub fn key_at(&self, slot: usize) -> Option<&K> {
        if !self.exists_at(slot) {
            return None;
        }
        // SAFETY: Live slots are initialized and within bounds.
        Some(unsafe { self.keys.slot(slot).assume_init_ref() })
    }

    /// Returns the value stored at `slot`, if live.
    pub fn value_at(&self, slot: usize) -> Option<&V> {
        if !self.exists_at(slot) {
            return None;
        }
        // SAFETY: Live slots are initialized and within bounds.
        Some(unsafe { self.values.slot(slot).assume_init_ref() })
    }

    /// Returns a mutable reference to the value stored at `slot`, if live.
    pub fn value_at_mut(&mut self, slot: usize) -> Option<&mut V> {
        if !self.exists_at(slot) {
            return None;
        }
        // SAFETY: Live slots are initialized and within bounds.
        Some(unsafe { self.values.slot_mut(slot).assume_init_mut() })
    }

    /// Removes the entry at `slot`, dropping its key and value. Returns
    /// `false` if the slot was not live.
    ///
    /// The slot becomes a tombstone: `len()` drops by one, `occupied()` does
    /// not.
    pub fn remove_at(&mut self, slot: usize) -> bool {
        self.take_at(slot).is_some()
    }

    /// Removes the entry at `slot` and returns it, if live.
    pub fn take_at(&mut self, slot: usize) -> Option<(K, V)> {
        if !self.exists_at(slot) {
            return None;
        }

        self.flags[slot] = Flag::Deleted;
        self.size -= 1;
        // SAFETY: The slot was live; its flag now marks it as moved out.
        unsafe {
            Some((
                self.keys.slot(slot).assume_init_read(),
                self.values.slot(slot).assume_init_read(),
            ))
        }
    }

    /// Removes all entries, keeping the allocated storage.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashTable;
    ///
    /// let mut table: HashTable<u32, ()> = HashTable::new();
    /// table.insert(1, ());
    /// table.insert(2, ());
    /// let buckets = table.bucket_count();
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.occupied(), 0);
    /// assert_eq!(table.bucket_count(), buckets);
    /// ```
    pub fn clear(&mut self) {
        if self.size > 0 && core::mem::needs_drop::<(K, V)>() {
            for index in 0..self.flags.len() {
                if self.flags[index] == Flag::Live {
                    self.flags[index] = Flag::Empty;
                    self.size -= 1;
                    // SAFETY: The slot was live and is now marked empty, so it
                    // is dropped exactly once.
                    unsafe {
                        self.keys.slot_mut(index).assume_init_drop();
                        self.values.slot_mut(index).assume_init_drop();
                    }
                }
            }
        }

        self.flags.fill(Flag::Empty);
        self.size = 0;
        self.occupied = 0;
    }

    /// Keeps only the entries for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &mut V) -> bool) {
        for index in 0..self.flags.len() {
            if self.flags[index] != Flag::Live {
                continue;
            }

            // SAFETY: The slot is live; keys and values are separate buffers.
            let keep_it = unsafe {
                keep(
                    self.keys.slot(index).assume_init_ref(),
                    self.values.slot_mut(index).assume_init_mut(),
                )
            };
            if !keep_it {
                self.remove_at(index);
            }
        }
    }

    /// Returns an iterator over the handles of all live slots, in increasing
    /// slot order. The iterator is double-ended.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashTable;
    ///
    /// let mut table: HashTable<u32, &str> = HashTable::new();
    /// table.insert(1, "one");
    /// table.insert(2, "two");
    ///
    /// let slots: Vec<usize> = table.slots().collect();
    /// assert_eq!(slots.len(), 2);
    /// assert!(slots[0] < slots[1]);
    /// assert_eq!(table.slots().rev().next(), Some(slots[1]));
    /// ```
    pub fn slots(&self) -> Slots<'_> {
        Slots {
            flags: &self.flags,
            front: 0,
            back: self.flags.len(),
            remaining: self.size,
        }
    }

    /// Returns an iterator over `(&K, &V)` in slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: self.slots(),
            keys: &self.keys,
            values: &self.values,
        }
    }

    /// Returns an iterator over `(&K, &mut V)` in slot order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            slots: Slots {
                flags: &self.flags,
                front: 0,
                back: self.flags.len(),
                remaining: self.size,
            },
            keys: &self.keys,
            values: self.values.ptr,
            _marker: PhantomData,
        }
    }

    /// Removes and yields every entry. The table is empty afterwards, even if
    /// the iterator is dropped before it is exhausted.
    pub fn drain(&mut self) -> Drain<'_, K, V, S, R> {
        Drain {
            table: self,
            slot: 0,
        }
    }

    #[inline(always)]
    fn flag(&self, index: usize) -> Flag {
        debug_assert!(index < self.flags.len());
        // SAFETY: Callers pass indices masked by `bucket_count - 1`.
        unsafe { *self.flags.get_unchecked(index) }
    }

    /// # Safety
    ///
    /// `index` must be a live slot.
    #[inline(always)]
    unsafe fn key_unchecked(&self, index: usize) -> &K {
        // SAFETY: Caller ensures the slot is live.
        unsafe { self.keys.slot(index).assume_init_ref() }
    }

    /// Writes a new entry into the empty or tombstoned slot `index`.
    ///
    /// # Safety
    ///
    /// `index` must be within bounds and not live.
    unsafe fn occupy(&mut self, index: usize, key: K, value: V) {
        debug_assert!(self.flags[index] != Flag::Live);
        if self.flags[index] == Flag::Empty {
            self.occupied += 1;
        }
        self.flags[index] = Flag::Live;
        self.size += 1;

        // SAFETY: Caller ensures `index` is within bounds and not live.
        unsafe {
            self.keys.slot_mut(index).write(key);
            self.values.slot_mut(index).write(value);
        }
        debug_assert!(self.occupied < self.flags.len());
    }
}

impl<K, V, S, R> HashTable<K, V, S, R>
where
    S: HashStrategy<K>,
{
    /// Returns the slot holding `key`, or [`end`](Self::end) if the key is
    /// absent. Never allocates.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashTable;
    ///
    /// let mut table: HashTable<&str, i32> = HashTable::new();
    /// assert_eq!(table.find(&"x"), table.end());
    ///
    /// let (slot, _) = table.insert("x", 1);
    /// assert_eq!(table.find(&"x"), slot);
    /// assert!(table.exists_at(slot));
    /// ```
    pub fn find(&self, key: &K) -> usize {
        let bucket_count = self.flags.len();
        if self.size == 0 {
            return bucket_count;
        }

        let mask = bucket_count - 1;
        let mut index = self.strategy.hash(key) as usize & mask;
        let home = index;
        let mut step = 0;
        loop {
            match self.flag(index) {
                Flag::Empty => return bucket_count,
                // SAFETY: The slot is live.
                Flag::Live if self.strategy.equal(unsafe { self.key_unchecked(index) }, key) => {
                    return index;
                }
                _ => {}
            }

            step += 1;
            index = (index + step) & mask;
            debug_assert_ne!(index, home, "probe wrapped around a table with no empty slot");
            if index == home {
                return bucket_count;
            }
        }
    }

    /// Returns `true` if `key` is present.
    pub fn exists(&self, key: &K) -> bool {
        self.exists_at(self.find(key))
    }

    /// Returns a reference to the value stored for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.value_at(self.find(key))
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let slot = self.find(key);
        self.value_at_mut(slot)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let slot = self.find(key);
        Some((self.key_at(slot)?, self.value_at(slot)?))
    }

    /// Removes `key`, dropping the stored key and value. Returns `false` if
    /// the key was absent.
    pub fn remove(&mut self, key: &K) -> bool {
        let slot = self.find(key);
        self.remove_at(slot)
    }

    /// Removes `key` and returns the stored key and value.
    pub fn take(&mut self, key: &K) -> Option<(K, V)> {
        let slot = self.find(key);
        self.take_at(slot)
    }

    /// Computes a histogram of probe lengths over the live entries.
    ///
    /// Index `n` of the result counts the entries found after `n` probe
    /// steps from their home slot.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> Vec<usize> {
        let mut hist = Vec::new();
        let mask = self.flags.len().wrapping_sub(1);

        for slot in self.slots() {
            // SAFETY: `slots` only yields live slots.
            let key = unsafe { self.key_unchecked(slot) };
            let mut index = self.strategy.hash(key) as usize & mask;
            let mut step = 0;
            while index != slot {
                step += 1;
                index = (index + step) & mask;
            }

            if hist.len() <= step {
                hist.resize(step + 1, 0);
            }
            hist[step] += 1;
        }

        hist
    }

    /// Pretty-prints the probe-length histogram horizontally using stdout.
    #[cfg(all(any(test, feature = "stats"), feature = "std"))]
    pub fn print_probe_histogram(&self) {
        let hist = self.probe_histogram();
        let max = hist.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("probe histogram ({} entries):", self.size);
        for (steps, &count) in hist.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", steps, "█".repeat(width), count);
        }
    }

    /// Returns detailed utilization statistics for debugging.
    #[cfg(any(test, feature = "stats"))]
    pub fn debug_stats(&self) -> DebugStats {
        let bucket_count = self.flags.len();
        let slot_bytes = core::mem::size_of::<K>() + core::mem::size_of::<V>();

        DebugStats {
            populated: self.size,
            occupied: self.occupied,
            tombstones: self.occupied - self.size,
            bucket_count,
            capacity: self.upper_bound,
            load_factor: if bucket_count == 0 {
                0.0
            } else {
                self.size as f64 / bucket_count as f64
            },
            occupancy: if bucket_count == 0 {
                0.0
            } else {
                self.occupied as f64 / bucket_count as f64
            },
            total_bytes: bucket_count * core::mem::size_of::<Flag>()
                + self.keys.cap * core::mem::size_of::<K>()
                + self.values.cap * core::mem::size_of::<V>(),
            wasted_bytes: (bucket_count - self.size) * slot_bytes,
        }
    }
}

impl<K, V, S, R> HashTable<K, V, S, R>
where
    S: HashStrategy<K>,
    R: Relocate,
{
    /// Inserts `key` with `value`, returning the entry's slot and the value
    /// it replaced.
    ///
    /// If the key is already present its value is overwritten in place and
    /// the stored key is kept; with `V = ()` that makes insertion of a
    /// present key a no-op.
    ///
    /// # Panics
    ///
    /// Panics if the new bucket count overflows `usize`, and aborts through
    /// [`handle_alloc_error`](alloc::alloc::handle_alloc_error) if the
    /// allocator fails. Use [`try_insert`](Self::try_insert) to handle these.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashTable;
    ///
    /// let mut table: HashTable<&str, i32> = HashTable::new();
    /// table.insert("a", 1);
    /// table.insert("b", 2);
    /// let (_, previous) = table.insert("a", 3);
    ///
    /// assert_eq!(previous, Some(1));
    /// assert_eq!(table.get(&"a"), Some(&3));
    /// assert_eq!(table.get(&"b"), Some(&2));
    /// assert_eq!(table.len(), 2);
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (usize, Option<V>) {
        infallible(self.try_insert(key, value))
    }

    /// Fallible version of [`insert`](Self::insert). On error the table is
    /// unchanged and `key` and `value` are dropped.
    pub fn try_insert(&mut self, key: K, value: V) -> Result<(usize, Option<V>), TryReserveError> {
        self.reserve_for_insert()?;
        match self.probe_insert(&key) {
            Probe::Found(slot) => {
                // SAFETY: `probe_insert` only reports live slots as found.
                let previous =
                    unsafe { core::mem::replace(self.values.slot_mut(slot).assume_init_mut(), value) };
                Ok((slot, Some(previous)))
            }
            Probe::Vacant(slot) => {
                // SAFETY: `probe_insert` only reports in-bounds, non-live slots
                // as vacant.
                unsafe { self.occupy(slot, key, value) };
                Ok((slot, None))
            }
        }
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// This may rehash the table even if the key turns out to be present,
    /// exactly as an insertion would.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashTable;
    ///
    /// let mut counts: HashTable<char, u32> = HashTable::new();
    /// for c in "hello".chars() {
    ///     *counts.entry(c).or_insert(0) += 1;
    /// }
    /// assert_eq!(counts.get(&'l'), Some(&2));
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S, R> {
        infallible(self.try_entry(key))
    }

    /// Fallible version of [`entry`](Self::entry).
    pub fn try_entry(&mut self, key: K) -> Result<Entry<'_, K, V, S, R>, TryReserveError> {
        self.reserve_for_insert()?;
        Ok(match self.probe_insert(&key) {
            Probe::Found(slot) => Entry::Occupied(OccupiedEntry { table: self, slot }),
            Probe::Vacant(slot) => Entry::Vacant(VacantEntry {
                table: self,
                slot,
                key,
            }),
        })
    }

    /// Ensures the table can hold `capacity` entries in total without
    /// rehashing. Does nothing if it already can.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tombhash::HashTable;
    ///
    /// let mut table: HashTable<u32, u32> = HashTable::new();
    /// table.reserve(1000);
    /// assert!(table.capacity() >= 1000);
    /// let buckets = table.bucket_count();
    ///
    /// for i in 0..1000 {
    ///     table.insert(i, i);
    /// }
    /// assert_eq!(table.bucket_count(), buckets);
    /// ```
    pub fn reserve(&mut self, capacity: usize) {
        infallible(self.try_reserve(capacity))
    }

    /// Fallible version of [`reserve`](Self::reserve). On error the table is
    /// unchanged.
    pub fn try_reserve(&mut self, capacity: usize) -> Result<(), TryReserveError> {
        if capacity <= self.upper_bound {
            return Ok(());
        }
        let buckets = buckets_for(capacity)?;
        self.resize(buckets)
    }

    /// Shrinks the table to the smallest bucket count that holds its entries,
    /// dropping every tombstone. An empty table releases its storage.
    pub fn shrink_to_fit(&mut self) {
        infallible(self.try_shrink_to_fit())
    }

    /// Fallible version of [`shrink_to_fit`](Self::shrink_to_fit).
    pub fn try_shrink_to_fit(&mut self) -> Result<(), TryReserveError> {
        if self.size == 0 {
            self.clear();
            self.flags = Vec::new();
            self.keys = RawSlots::dangling();
            self.values = RawSlots::dangling();
            self.upper_bound = 0;
            return Ok(());
        }

        let buckets = buckets_for(self.size)?;
        if buckets < self.flags.len() || self.occupied > self.size {
            self.resize(buckets)?;
        }
        Ok(())
    }

    /// Makes room for one more entry, rehashing first when the table is full
    /// or mostly tombstones.
    fn reserve_for_insert(&mut self) -> Result<(), TryReserveError> {
        let bucket_count = self.flags.len();
        let tombstones = self.occupied - self.size;
        let tombstone_heavy = tombstones > self.size && tombstones >= bucket_count / 4;

        if self.occupied >= self.upper_bound || tombstone_heavy {
            let buckets = if bucket_count > self.size * 2 {
                buckets_for(self.size + 1)?
            } else {
                normalize(bucket_count + 1)?
            };
            self.resize(buckets)?;
        }

        debug_assert!(self.occupied < self.upper_bound);
        Ok(())
    }

    /// Finds `key`, or the slot a new entry for it should go to: the first
    /// tombstone on its probe path if any, otherwise the empty slot that ends
    /// the path.
    fn probe_insert(&self, key: &K) -> Probe {
        let mask = self.flags.len() - 1;
        let mut index = self.strategy.hash(key) as usize & mask;
        let home = index;
        let mut site = None;
        let mut step = 0;
        loop {
            match self.flag(index) {
                Flag::Empty => return Probe::Vacant(site.unwrap_or(index)),
                Flag::Deleted => {
                    if site.is_none() {
                        site = Some(index);
                    }
                }
                Flag::Live => {
                    // SAFETY: The slot is live.
                    if self.strategy.equal(unsafe { self.key_unchecked(index) }, key) {
                        return Probe::Found(index);
                    }
                }
            }

            step += 1;
            index = (index + step) & mask;
            if index == home {
                debug_assert!(site.is_some(), "probe wrapped around a full table");
                return Probe::Vacant(site.unwrap_or(home));
            }
        }
    }

    /// Rehashes the table into `new_buckets` slots.
    ///
    /// All allocation happens before the first entry moves, so on error the
    /// table is exactly as it was.
    fn resize(&mut self, new_buckets: usize) -> Result<(), TryReserveError> {
        debug_assert!(new_buckets.is_power_of_two() && new_buckets >= MIN_BUCKETS);
        let old_buckets = self.flags.len();
        if self.size > upper_bound(new_buckets) {
            return Ok(());
        }

        let mut new_flags = try_alloc_flags(new_buckets)?;
        let mut shrunk = None;
        if new_buckets > old_buckets {
            self.grow_storage(new_buckets)?;
        } else if new_buckets < old_buckets {
            shrunk = Some((
                RawSlots::<K>::try_allocate(new_buckets)?,
                RawSlots::<V>::try_allocate(new_buckets)?,
            ));
        }

        self.relocate(&mut new_flags);

        if let Some((keys, values)) = shrunk {
            // SAFETY: After relocation every live entry sits below
            // `new_buckets` at a slot marked live in `new_flags`.
            unsafe {
                self.keys
                    .adopt(keys, new_buckets, |index| new_flags[index] == Flag::Live);
                self.values
                    .adopt(values, new_buckets, |index| new_flags[index] == Flag::Live);
            }
        }

        self.flags = new_flags;
        self.occupied = self.size;
        self.upper_bound = upper_bound(new_buckets);
        debug_assert_eq!(
            self.flags.iter().filter(|flag| **flag == Flag::Live).count(),
            self.size
        );
        Ok(())
    }

    /// Grows the key and value buffers to at least `new_buckets` slots,
    /// keeping every live entry at its index.
    fn grow_storage(&mut self, new_buckets: usize) -> Result<(), TryReserveError> {
        if R::REALLOC {
            // A failure on the value buffer leaves a larger key buffer behind,
            // which the table tolerates: buffers track their own capacity.
            if self.keys.cap < new_buckets {
                self.keys.try_realloc(new_buckets)?;
            }
            if self.values.cap < new_buckets {
                self.values.try_realloc(new_buckets)?;
            }
        } else {
            let keys = RawSlots::try_allocate(new_buckets)?;
            let values = RawSlots::try_allocate(new_buckets)?;
            let old_buckets = self.flags.len();
            let flags = &self.flags;
            // SAFETY: Live flags mark initialized slots, all below
            // `old_buckets`, which is smaller than both new buffers.
            unsafe {
                self.keys
                    .adopt(keys, old_buckets, |index| flags[index] == Flag::Live);
                self.values
                    .adopt(values, old_buckets, |index| flags[index] == Flag::Live);
            }
        }
        Ok(())
    }

    /// Moves every live entry of the current layout to its slot under
    /// `new_flags`.
    ///
    /// Walks the old slots in order. Each live entry is taken in hand and its
    /// old slot marked deleted; the entry then claims the first empty slot on
    /// its new probe path. If that slot still holds a not-yet-moved entry of
    /// the old layout, the two are swapped and the evicted entry is placed
    /// next. The storage buffers must already span both layouts.
    fn relocate(&mut self, new_flags: &mut [Flag]) {
        let old_buckets = self.flags.len();
        let new_mask = new_flags.len() - 1;
        debug_assert!(self.keys.cap >= old_buckets.max(new_flags.len()));
        debug_assert!(self.values.cap >= old_buckets.max(new_flags.len()));

        let guard = AbortOnUnwind;
        for old in 0..old_buckets {
            if self.flags[old] != Flag::Live {
                continue;
            }

            self.flags[old] = Flag::Deleted;
            // SAFETY: The slot was live and is now marked as moved out.
            let (mut key, mut value) = unsafe {
                (
                    self.keys.slot(old).assume_init_read(),
                    self.values.slot(old).assume_init_read(),
                )
            };

            loop {
                let mut index = self.strategy.hash(&key) as usize & new_mask;
                let mut step = 0;
                while new_flags[index] != Flag::Empty {
                    step += 1;
                    index = (index + step) & new_mask;
                }
                new_flags[index] = Flag::Live;

                if index < old_buckets && self.flags[index] == Flag::Live {
                    self.flags[index] = Flag::Deleted;
                    // SAFETY: The slot is live in the old layout; swapping
                    // leaves the in-hand entry there and takes the old one.
                    unsafe {
                        core::mem::swap(self.keys.slot_mut(index).assume_init_mut(), &mut key);
                        core::mem::swap(self.values.slot_mut(index).assume_init_mut(), &mut value);
                    }
                } else {
                    // SAFETY: The slot is within both buffers and holds no
                    // live entry of either layout.
                    unsafe {
                        self.keys.slot_mut(index).write(key);
                        self.values.slot_mut(index).write(value);
                    }
                    break;
                }
            }
        }
        core::mem::forget(guard);
    }
}

/// A view into a single slot of the table, either occupied or vacant.
///
/// This enum is constructed from the [`entry`] method on [`HashTable`].
///
/// [`entry`]: HashTable::entry
pub enum Entry<'a, K, V, S, R> {
    /// The key is present.
    Occupied(OccupiedEntry<'a, K, V, S, R>),
    /// The key is absent; the entry knows where it would go.
    Vacant(VacantEntry<'a, K, V, S, R>),
}

impl<'a, K, V, S, R> Entry<'a, K, V, S, R> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to the value of an occupied entry.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns the entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    /// Returns the slot the entry occupies or would occupy.
    pub fn slot(&self) -> usize {
        match self {
            Entry::Occupied(entry) => entry.slot(),
            Entry::Vacant(entry) => entry.slot(),
        }
    }
}

impl<'a, K, V: Default, S, R> Entry<'a, K, V, S, R> {
    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

/// A view into a vacant slot.
pub struct VacantEntry<'a, K, V, S, R> {
    table: &'a mut HashTable<K, V, S, R>,
    slot: usize,
    key: K,
}

impl<'a, K, V, S, R> VacantEntry<'a, K, V, S, R> {
    /// Returns the key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes back ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Returns the slot the entry would occupy.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Inserts `value` and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        // SAFETY: The slot was found vacant by `probe_insert` and the table
        // has not been touched since.
        unsafe {
            table.occupy(self.slot, self.key, value);
            table.values.slot_mut(self.slot).assume_init_mut()
        }
    }
}

/// A view into an occupied slot.
pub struct OccupiedEntry<'a, K, V, S, R> {
    table: &'a mut HashTable<K, V, S, R>,
    slot: usize,
}

impl<'a, K, V, S, R> OccupiedEntry<'a, K, V, S, R> {
    /// Returns the entry's slot.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Returns the stored key.
    pub fn key(&self) -> &K {
        // SAFETY: The slot is live for the lifetime of the entry.
        unsafe { self.table.key_unchecked(self.slot) }
    }

    /// Returns the stored value.
    pub fn get(&self) -> &V {
        // SAFETY: The slot is live for the lifetime of the entry.
        unsafe { self.table.values.slot(self.slot).assume_init_ref() }
    }

    /// Returns the stored value mutably.
    pub fn get_mut(&mut self) -> &mut V {
        // SAFETY: The slot is live for the lifetime of the entry.
        unsafe { self.table.values.slot_mut(self.slot).assume_init_mut() }
    }

    /// Converts the entry into a mutable reference to its value.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        // SAFETY: The slot is live for the lifetime of the entry.
        unsafe { table.values.slot_mut(self.slot).assume_init_mut() }
    }

    /// Replaces the stored value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(self.get_mut(), value)
    }

    /// Removes the entry and returns its value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry and returns its key and value.
    pub fn remove_entry(self) -> (K, V) {
        let slot = self.slot;
        match self.table.take_at(slot) {
            Some(entry) => entry,
            None => unreachable!("occupied entry at slot {slot} is not live"),
        }
    }
}

/// An iterator over the live slot handles of a [`HashTable`].
///
/// This struct is created by [`HashTable::slots`].
#[derive(Clone, Debug)]
pub struct Slots<'a> {
    flags: &'a [Flag],
    front: usize,
    back: usize,
    remaining: usize,
}

impl Iterator for Slots<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.front < self.back {
            let index = self.front;
            self.front += 1;
            if self.flags[index] == Flag::Live {
                self.remaining -= 1;
                return Some(index);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Slots<'_> {
    fn next_back(&mut self) -> Option<usize> {
        while self.back > self.front {
            self.back -= 1;
            if self.flags[self.back] == Flag::Live {
                self.remaining -= 1;
                return Some(self.back);
            }
        }
        None
    }
}

impl ExactSizeIterator for Slots<'_> {}

impl FusedIterator for Slots<'_> {}

/// An iterator over the entries of a [`HashTable`], in slot order.
pub struct Iter<'a, K, V> {
    slots: Slots<'a>,
    keys: &'a RawSlots<K>,
    values: &'a RawSlots<V>,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn entry(&self, slot: usize) -> (&'a K, &'a V) {
        let keys: &'a RawSlots<K> = self.keys;
        let values: &'a RawSlots<V> = self.values;
        // SAFETY: `slot` comes from `Slots`, which only yields live slots.
        unsafe {
            (
                keys.slot(slot).assume_init_ref(),
                values.slot(slot).assume_init_ref(),
            )
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.next()?;
        Some(self.entry(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let slot = self.slots.next_back()?;
        Some(self.entry(slot))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the entries of a [`HashTable`], in slot order.
pub struct IterMut<'a, K, V> {
    slots: Slots<'a>,
    keys: &'a RawSlots<K>,
    values: NonNull<MaybeUninit<V>>,
    _marker: PhantomData<&'a mut V>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.slots.next()?;
        let keys: &'a RawSlots<K> = self.keys;
        // SAFETY: `slot` is live, and `Slots` yields each slot at most once,
        // so no two returned value references alias.
        unsafe {
            Some((
                keys.slot(slot).assume_init_ref(),
                (*self.values.as_ptr().add(slot)).assume_init_mut(),
            ))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

// SAFETY: `IterMut` hands out `&K` and `&mut V`, like `(&'a K, &'a mut V)`.
unsafe impl<K: Sync, V: Send> Send for IterMut<'_, K, V> {}
// SAFETY: Shared access to `IterMut` exposes nothing beyond `&K` and `&V`.
unsafe impl<K: Sync, V: Sync> Sync for IterMut<'_, K, V> {}

/// A draining iterator over the entries of a [`HashTable`].
///
/// This struct is created by [`HashTable::drain`].
pub struct Drain<'a, K, V, S, R> {
    table: &'a mut HashTable<K, V, S, R>,
    slot: usize,
}

impl<K, V, S, R> Iterator for Drain<'_, K, V, S, R> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot < self.table.flags.len() {
            let slot = self.slot;
            self.slot += 1;
            if let Some(entry) = self.table.take_at(slot) {
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<K, V, S, R> ExactSizeIterator for Drain<'_, K, V, S, R> {}

impl<K, V, S, R> Drop for Drain<'_, K, V, S, R> {
    fn drop(&mut self) {
        for _ in &mut *self {}
        self.table.clear();
    }
}

/// An owning iterator over the entries of a [`HashTable`].
pub struct IntoIter<K, V, S, R> {
    table: HashTable<K, V, S, R>,
    slot: usize,
}

impl<K, V, S, R> Iterator for IntoIter<K, V, S, R> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.slot < self.table.flags.len() {
            let slot = self.slot;
            self.slot += 1;
            if let Some(entry) = self.table.take_at(slot) {
                return Some(entry);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<K, V, S, R> ExactSizeIterator for IntoIter<K, V, S, R> {}

impl<K, V, S, R> IntoIterator for HashTable<K, V, S, R> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, S, R>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            slot: 0,
        }
    }
}

impl<'a, K, V, S, R> IntoIterator for &'a HashTable<K, V, S, R> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
