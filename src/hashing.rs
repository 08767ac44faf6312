//! Hash and equality strategies.
//!
//! A [`HashTable`](crate::HashTable) never hashes keys through
//! `core::hash::Hash` directly. Instead it is handed a strategy object that
//! knows how to turn a key into a 32-bit hash and how to compare two keys.
//! The strategy is stored in the table, so stateful strategies (seeded
//! hashers, closures) work as well as the zero-sized defaults.
//!
//! [`AutoHash`] is the default and picks an implementation per key category
//! through the [`AutoKey`] trait:
//!
//! - integers, `bool` and `char` use cheap bit-mixing functions,
//! - raw pointers hash their address,
//! - strings use the polynomial rolling hash `h = h * 31 + byte`,
//! - pairs pack both component hashes into a `u64` and mix that again.

use alloc::boxed::Box;
use alloc::string::String;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::ptr::NonNull;

/// A hash function and an equality predicate over keys of type `K`.
///
/// Implementations must be consistent: `equal(a, b)` implies
/// `hash(a) == hash(b)`. A table whose strategy breaks this rule will not
/// find its own keys, but it will not corrupt memory either.
pub trait HashStrategy<K: ?Sized> {
    /// Hashes `key`. Only the low bits are used to pick a home bucket, so
    /// they should be well mixed.
    fn hash(&self, key: &K) -> u32;

    /// Returns `true` if `a` and `b` denote the same key.
    fn equal(&self, a: &K, b: &K) -> bool;
}

/// Thomas Wang's 32-bit integer mix.
#[inline]
pub fn int32_hash(mut key: u32) -> u32 {
    key = key.wrapping_add(!(key << 15));
    key ^= key >> 10;
    key = key.wrapping_add(key << 3);
    key ^= key >> 6;
    key = key.wrapping_add(!(key << 11));
    key ^= key >> 16;
    key
}

/// Folds a 64-bit integer into a 32-bit hash.
#[inline]
pub fn int64_hash(key: u64) -> u32 {
    ((key >> 33) ^ key ^ (key << 11)) as u32
}

/// Polynomial rolling hash over `bytes`: `h = h * 31 + byte`.
#[inline]
pub fn str_hash(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .fold(0u32, |h, &b| h.wrapping_mul(31).wrapping_add(b as u32))
}

/// [`str_hash`] with ASCII letters lowercased before mixing.
#[inline]
pub fn str_hash_ignore_ascii_case(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |h, &b| {
        h.wrapping_mul(31)
            .wrapping_add(b.to_ascii_lowercase() as u32)
    })
}

/// Combines the hashes of the two halves of a pair.
#[inline]
pub fn pair_hash(first: u32, second: u32) -> u32 {
    int64_hash(first as u64 | ((second as u64) << 32))
}

#[inline]
fn usize_hash(key: usize) -> u32 {
    cfg_if::cfg_if! {
        if #[cfg(target_pointer_width = "64")] {
            int64_hash(key as u64)
        } else {
            int32_hash(key as u32)
        }
    }
}

/// Key types with a built-in hash and equality, used by [`AutoHash`].
pub trait AutoKey {
    /// Hashes `self`.
    fn auto_hash(&self) -> u32;

    /// Compares `self` with `other`.
    fn auto_equal(&self, other: &Self) -> bool;
}

macro_rules! auto_key_narrow {
    ($($t:ty),* $(,)?) => {
        $(
            impl AutoKey for $t {
                #[inline]
                fn auto_hash(&self) -> u32 {
                    *self as u32
                }

                #[inline]
                fn auto_equal(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

macro_rules! auto_key_mixed {
    ($mix:ident as $wide:ty: $($t:ty),* $(,)?) => {
        $(
            impl AutoKey for $t {
                #[inline]
                fn auto_hash(&self) -> u32 {
                    $mix(*self as $wide)
                }

                #[inline]
                fn auto_equal(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

auto_key_narrow!(u8, i8, u16, i16, bool);
auto_key_mixed!(int32_hash as u32: u32, i32, char);
auto_key_mixed!(int64_hash as u64: u64, i64);
auto_key_mixed!(usize_hash as usize: usize, isize);

impl AutoKey for u128 {
    #[inline]
    fn auto_hash(&self) -> u32 {
        int64_hash((*self as u64) ^ ((*self >> 64) as u64))
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self == other
    }
}

impl AutoKey for i128 {
    #[inline]
    fn auto_hash(&self) -> u32 {
        (*self as u128).auto_hash()
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self == other
    }
}

// Floats hash and compare by bit pattern so that `equal` agrees with `hash`
// for `-0.0` and NaN.
impl AutoKey for f32 {
    #[inline]
    fn auto_hash(&self) -> u32 {
        int32_hash(self.to_bits())
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl AutoKey for f64 {
    #[inline]
    fn auto_hash(&self) -> u32 {
        int64_hash(self.to_bits())
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized> AutoKey for *const T {
    #[inline]
    fn auto_hash(&self) -> u32 {
        usize_hash(self.cast::<()>() as usize)
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self.cast::<()>() == other.cast::<()>()
    }
}

impl<T: ?Sized> AutoKey for *mut T {
    #[inline]
    fn auto_hash(&self) -> u32 {
        self.cast_const().auto_hash()
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self.cast_const().auto_equal(&other.cast_const())
    }
}

impl<T: ?Sized> AutoKey for NonNull<T> {
    #[inline]
    fn auto_hash(&self) -> u32 {
        self.as_ptr().auto_hash()
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self.as_ptr().auto_equal(&other.as_ptr())
    }
}

impl AutoKey for str {
    #[inline]
    fn auto_hash(&self) -> u32 {
        str_hash(self.as_bytes())
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self == other
    }
}

impl AutoKey for String {
    #[inline]
    fn auto_hash(&self) -> u32 {
        self.as_str().auto_hash()
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self == other
    }
}

impl AutoKey for Box<str> {
    #[inline]
    fn auto_hash(&self) -> u32 {
        (**self).auto_hash()
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: AutoKey + ?Sized> AutoKey for &T {
    #[inline]
    fn auto_hash(&self) -> u32 {
        (**self).auto_hash()
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        (**self).auto_equal(*other)
    }
}

impl<A: AutoKey, B: AutoKey> AutoKey for (A, B) {
    #[inline]
    fn auto_hash(&self) -> u32 {
        pair_hash(self.0.auto_hash(), self.1.auto_hash())
    }

    #[inline]
    fn auto_equal(&self, other: &Self) -> bool {
        self.0.auto_equal(&other.0) && self.1.auto_equal(&other.1)
    }
}

/// The default strategy: dispatches to the key's [`AutoKey`] implementation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutoHash;

impl<K: AutoKey + ?Sized> HashStrategy<K> for AutoHash {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        key.auto_hash()
    }

    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        a.auto_equal(b)
    }
}

/// Case-insensitive strategy for string keys. Only ASCII letters are folded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IgnoreAsciiCase;

impl<K: AsRef<str> + ?Sized> HashStrategy<K> for IgnoreAsciiCase {
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        str_hash_ignore_ascii_case(key.as_ref().as_bytes())
    }

    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        a.as_ref().eq_ignore_ascii_case(b.as_ref())
    }
}

/// A strategy built from a hash closure and an equality closure.
///
/// ```rust
/// use tombhash::hashing::FnStrategy;
/// use tombhash::HashMap;
///
/// let by_len = FnStrategy::new(|s: &&str| s.len() as u32, |a: &&str, b: &&str| a.len() == b.len());
/// let mut map = HashMap::with_strategy(by_len);
/// map.insert("abc", 1);
/// assert_eq!(map.get(&"xyz"), Some(&1));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FnStrategy<H, E> {
    hash: H,
    equal: E,
}

impl<H, E> FnStrategy<H, E> {
    /// Pairs a hash function with an equality predicate.
    pub fn new(hash: H, equal: E) -> Self {
        Self { hash, equal }
    }
}

impl<K: ?Sized, H, E> HashStrategy<K> for FnStrategy<H, E>
where
    H: Fn(&K) -> u32,
    E: Fn(&K, &K) -> bool,
{
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        (self.hash)(key)
    }

    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        (self.equal)(a, b)
    }
}

/// Adapts any [`BuildHasher`] to a [`HashStrategy`] for `Hash + Eq` keys.
///
/// The 64-bit output of the hasher is folded down to 32 bits.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuildHasherStrategy<B>(pub B);

impl<K, B> HashStrategy<K> for BuildHasherStrategy<B>
where
    K: Hash + Eq + ?Sized,
    B: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u32 {
        let hash = self.0.hash_one(key);
        (hash ^ (hash >> 32)) as u32
    }

    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

/// [`BuildHasherStrategy`] over foldhash's randomly seeded fast hasher.
#[cfg(feature = "foldhash")]
pub type FoldHashStrategy = BuildHasherStrategy<foldhash::fast::RandomState>;
