// Allocation-failure rollback tests.
//
// A global allocator refuses every allocation or reallocation of one chosen
// byte size on the current thread. Each test arms it around a single
// fallible resize and then checks that:
//  - the call reports AllocError for exactly that size;
//  - bucket_count() and len() are unchanged and every key is retrievable;
//  - the same request succeeds once the allocator is disarmed.
use std::alloc::GlobalAlloc;
use std::alloc::Layout;
use std::alloc::System;
use std::cell::Cell;

use tombhash::AutoHash;
use tombhash::HashTable;
use tombhash::MoveLive;
use tombhash::Realloc;
use tombhash::Relocate;
use tombhash::TryReserveError;

struct RefusingAllocator;

thread_local! {
    static REFUSED_SIZE: Cell<usize> = const { Cell::new(0) };
}

fn refuses(size: usize) -> bool {
    REFUSED_SIZE
        .try_with(|refused| size != 0 && refused.get() == size)
        .unwrap_or(false)
}

unsafe impl GlobalAlloc for RefusingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if refuses(layout.size()) {
            return core::ptr::null_mut();
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if refuses(layout.size()) {
            return core::ptr::null_mut();
        }
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if refuses(new_size) {
            return core::ptr::null_mut();
        }
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static ALLOCATOR: RefusingAllocator = RefusingAllocator;

fn refusing<T>(size: usize, f: impl FnOnce() -> T) -> T {
    REFUSED_SIZE.with(|refused| refused.set(size));
    let result = f();
    REFUSED_SIZE.with(|refused| refused.set(0));
    result
}

// u64 keys and u32 values give every buffer a distinct byte size: for 256
// buckets the flags take 256 bytes, the keys 2048 and the values 1024.
type Table<R> = HashTable<u64, u32, AutoHash, R>;

/// 40 inserts and 5 removals: 64 buckets, 35 live entries, 5 tombstones.
fn populated<R: Relocate>() -> Table<R> {
    let mut table = Table::<R>::default();
    for key in 0..40u64 {
        table.insert(key, key as u32 * 3);
    }
    for key in 0..5u64 {
        assert!(table.remove(&key));
    }
    assert_eq!(table.bucket_count(), 64);
    table
}

fn assert_intact<R: Relocate>(table: &Table<R>, buckets: usize, live: impl Iterator<Item = u64>) {
    assert_eq!(table.bucket_count(), buckets);
    let mut count = 0;
    for key in live {
        assert_eq!(table.get(&key), Some(&(key as u32 * 3)), "{:#?}", table);
        count += 1;
    }
    assert_eq!(table.len(), count);
    assert_eq!(table.slots().count(), count);
}

fn grow_failure<R: Relocate>(refused: usize) {
    let mut table = populated::<R>();

    let result = refusing(refused, || table.try_reserve(150));
    match result {
        Err(TryReserveError::AllocError { layout }) => assert_eq!(layout.size(), refused),
        other => panic!("expected an allocation error for {refused} bytes, got {other:?}"),
    }
    assert_intact(&table, 64, 5..40);
    assert!(!table.exists(&0));

    assert_eq!(table.try_reserve(150), Ok(()));
    assert_intact(&table, 256, 5..40);
    table.insert(1000, 3000);
    assert_eq!(table.get(&1000), Some(&3000));
}

#[test]
fn new_flags_failure_leaves_table_untouched() {
    grow_failure::<Realloc>(256);
}

#[test]
fn key_realloc_failure_leaves_table_untouched() {
    grow_failure::<Realloc>(2048);
}

#[test]
fn value_realloc_failure_after_keys_grew_leaves_table_usable() {
    grow_failure::<Realloc>(1024);
}

#[test]
fn move_live_key_allocation_failure_leaves_table_untouched() {
    grow_failure::<MoveLive>(2048);
}

#[test]
fn move_live_value_allocation_failure_leaves_table_untouched() {
    grow_failure::<MoveLive>(1024);
}

#[test]
fn insert_growth_failure_keeps_entries() {
    let mut table = Table::<Realloc>::default();
    for key in 0..25u64 {
        table.insert(key, key as u32 * 3);
    }
    assert_eq!(table.bucket_count(), 32);

    // The 26th insertion doubles to 64 buckets: 512 bytes of keys.
    let result = refusing(512, || table.try_insert(25, 75));
    assert!(matches!(result, Err(TryReserveError::AllocError { .. })));
    assert_intact(&table, 32, 0..25);

    assert!(table.try_insert(25, 75).is_ok());
    assert_intact(&table, 64, 0..26);
}

fn shrink_failure<R: Relocate>(refused: usize) {
    let mut table = Table::<R>::default();
    for key in 0..1000u64 {
        table.insert(key, key as u32 * 3);
    }
    for key in 10..1000u64 {
        assert!(table.remove(&key));
    }
    assert_eq!(table.bucket_count(), 2048);

    // Shrinking to 32 buckets allocates 32 bytes of flags, 256 of keys and
    // 128 of values before any entry moves.
    let result = refusing(refused, || table.try_shrink_to_fit());
    match result {
        Err(TryReserveError::AllocError { layout }) => assert_eq!(layout.size(), refused),
        other => panic!("expected an allocation error for {refused} bytes, got {other:?}"),
    }
    assert_intact(&table, 2048, 0..10);
    assert_eq!(table.occupied(), 1000);

    assert_eq!(table.try_shrink_to_fit(), Ok(()));
    assert_intact(&table, 32, 0..10);
    assert_eq!(table.occupied(), 10);
    assert_eq!(table.try_reserve(500), Ok(()));
    assert_intact(&table, 1024, 0..10);
}

#[test]
fn shrink_key_allocation_failure_leaves_table_untouched() {
    shrink_failure::<Realloc>(256);
}

#[test]
fn shrink_value_allocation_failure_leaves_table_untouched() {
    shrink_failure::<Realloc>(128);
}

#[test]
fn shrink_flags_allocation_failure_leaves_table_untouched() {
    shrink_failure::<MoveLive>(32);
}
