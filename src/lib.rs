//! # extendible-set
//!
//! A hash set built on extendible hashing: a directory of slots pointing at
//! fixed-capacity buckets. When a bucket overflows it splits in two, and the
//! directory doubles only when the splitting bucket already uses every hash
//! bit the directory resolves. No operation ever rehashes the whole table.
//!
//! Based on "Extendible Hashing - A Fast Access Method for Dynamic Files"
//! (TODS 1979, Fagin et al.)
//!
//! ## Example
//!
//! ```rust
//! use extendible_set::ExtendibleSet;
//!
//! let mut set: ExtendibleSet<u64> = ExtendibleSet::new();
//! assert!(set.insert(7));
//! assert!(!set.insert(7));
//! set.extend([1, 2, 3]);
//!
//! assert_eq!(set.len(), 4);
//! assert_eq!(set.get(&2), Some(&2));
//! assert!(set.remove(&7));
//! assert_eq!(set.count(&7), 0);
//! ```

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::iter::FusedIterator;
use std::ptr;

mod bucket;
mod dump;
mod error;

pub use bucket::Bucket;
pub use dump::Dump;
pub use error::{Error, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Keys per bucket when the capacity parameter is left at its default.
pub const DEFAULT_BUCKET_CAPACITY: usize = 11;
/// Directory slots allocated by [`ExtendibleSet::new`].
pub const DEFAULT_DIRECTORY_SIZE: usize = 4;
/// Deepest directory a set will grow to unless configured otherwise.
pub const MAX_GLOBAL_DEPTH: u32 = 32;

// Directory lengths must stay addressable on 32-bit targets too.
const DEPTH_LIMIT: u32 = if MAX_GLOBAL_DEPTH < usize::BITS {
    MAX_GLOBAL_DEPTH
} else {
    usize::BITS - 1
};

/// Index into the bucket arena. Directory slots store these, so any number
/// of slots can share one bucket without shared ownership.
type BucketId = usize;

// =============================================================================
// ExtendibleSet
// =============================================================================

/// A hash set using extendible hashing.
///
/// - `N` is the fixed bucket capacity.
/// - `S` builds the hasher; keys map to slot `hash % directory_len`.
///
/// The directory length is always a power of two. A bucket with local depth
/// `l` under global depth `g` is referenced by `2^(g - l)` slots spaced
/// `2^l` apart; the lowest of them is its canonical slot.
#[derive(Clone)]
pub struct ExtendibleSet<K, const N: usize = DEFAULT_BUCKET_CAPACITY, S = RandomState> {
    buckets: Vec<Bucket<K, N>>,
    directory: Vec<BucketId>,
    global_depth: u32,
    max_depth: u32,
    len: usize,
    hash_builder: S,
}

impl<K, const N: usize> ExtendibleSet<K, N, RandomState> {
    pub fn new() -> Self {
        Self::with_directory_size(DEFAULT_DIRECTORY_SIZE)
    }

    /// Creates an empty set whose directory starts with at least
    /// `directory_size` slots (rounded up to a power of two, minimum 1).
    pub fn with_directory_size(directory_size: usize) -> Self {
        Self::with_directory_size_and_hasher(directory_size, RandomState::new())
    }
}

impl<K, const N: usize, S> ExtendibleSet<K, N, S> {
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_directory_size_and_hasher(DEFAULT_DIRECTORY_SIZE, hash_builder)
    }

    pub fn with_directory_size_and_hasher(directory_size: usize, hash_builder: S) -> Self {
        let len = directory_size.clamp(1, 1 << DEPTH_LIMIT).next_power_of_two();
        let global_depth = len.trailing_zeros();
        Self {
            buckets: (0..len).map(|_| Bucket::new(global_depth)).collect(),
            directory: (0..len).collect(),
            global_depth,
            max_depth: DEPTH_LIMIT.max(global_depth),
            len: 0,
            hash_builder,
        }
    }

    /// Caps how deep the directory may grow. Inserts that would need a
    /// deeper directory fail with [`Error::DirectoryExhausted`].
    ///
    /// The cap never drops below the current global depth.
    pub fn with_max_global_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth.clamp(self.global_depth, DEPTH_LIMIT);
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    #[inline]
    pub fn max_global_depth(&self) -> u32 {
        self.max_depth
    }

    /// Number of directory slots (`2^global_depth`).
    #[inline]
    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    /// Number of distinct buckets behind the directory.
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// The bucket referenced by directory slot `slot`.
    pub fn bucket(&self, slot: usize) -> Option<&Bucket<K, N>> {
        self.directory.get(slot).map(|&id| &self.buckets[id])
    }

    /// Distance between consecutive slots that share `slot`'s bucket.
    fn directory_stride(&self, slot: usize) -> usize {
        let delay = self.global_depth - self.buckets[self.directory[slot]].local_depth();
        let group_count = 1usize << delay;
        self.directory.len() / group_count
    }

    /// Lowest slot referencing the same bucket as `slot`.
    pub fn first_slot(&self, slot: usize) -> usize {
        let first = slot % self.directory_stride(slot);
        debug_assert_eq!(self.directory[first], self.directory[slot]);
        first
    }

    /// Whether `slot` is the canonical slot of its bucket. Walks that must
    /// see every bucket once visit only canonical slots.
    pub fn is_canonical(&self, slot: usize) -> bool {
        self.first_slot(slot) == slot
    }

    /// Removes every key. The directory keeps its size and the buckets keep
    /// their depths.
    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.len = 0;
    }

    pub fn swap(&mut self, other: &mut Self) {
        std::mem::swap(self, other);
    }

    pub fn iter(&self) -> Iter<'_, K, N, S> {
        let mut iter = Iter {
            set: self,
            slot: 0,
            index: 0,
            remaining: self.len,
        };
        iter.settle();
        iter
    }

    /// Fixed-width grid of every directory slot and its bucket, for
    /// debugging.
    pub fn dump(&self) -> Dump<'_, K, N, S> {
        Dump::new(self)
    }

    /// Doubles the directory; slot `i + old_len` aliases slot `i`.
    fn expand_directory(&mut self) {
        let old_len = self.directory.len();
        self.directory.extend_from_within(..);
        self.global_depth += 1;
        log::debug!(
            "directory doubled: {} -> {} slots, global depth {}",
            old_len,
            self.directory.len(),
            self.global_depth
        );
    }
}

impl<K, const N: usize, S> ExtendibleSet<K, N, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash_of(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Canonical slot of the bucket `hash` selects.
    #[inline]
    fn home_slot(&self, hash: u64) -> usize {
        let slot = (hash % self.directory.len() as u64) as usize;
        self.first_slot(slot)
    }

    #[inline]
    fn home_bucket(&self, key: &K) -> &Bucket<K, N> {
        &self.buckets[self.directory[self.home_slot(self.hash_of(key))]]
    }

    /// `1` if `key` is present, `0` otherwise.
    pub fn count(&self, key: &K) -> usize {
        self.home_bucket(key).count(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.count(key) == 1
    }

    /// The stored key equal to `key`.
    pub fn get(&self, key: &K) -> Option<&K> {
        self.home_bucket(key).iter().find(|k| *k == key)
    }

    /// Adds `key`, returning `false` if it was already present.
    ///
    /// # Panics
    ///
    /// Panics when the key cannot be placed; see [`Self::try_insert`].
    pub fn insert(&mut self, key: K) -> bool {
        match self.try_insert(key) {
            Ok(inserted) => inserted,
            Err(err) => panic!("{err}"),
        }
    }

    /// Adds `key`, returning `Ok(false)` if it was already present.
    ///
    /// Fails with [`Error::HashCollision`] when the target bucket is full of
    /// keys sharing the key's full hash, and with
    /// [`Error::DirectoryExhausted`] when making room would need a directory
    /// deeper than [`Self::max_global_depth`]. A failed insert leaves the set
    /// valid and without the key; splits completed before the failure stay.
    pub fn try_insert(&mut self, key: K) -> Result<bool> {
        self.place(key).map(|(_, _, inserted)| inserted)
    }

    /// Returns the stored key equal to `key`, inserting it first if absent.
    ///
    /// # Panics
    ///
    /// Panics when the key cannot be placed; see [`Self::try_insert`].
    pub fn get_or_insert(&mut self, key: K) -> &K {
        match self.place(key) {
            Ok((slot, index, _)) => self.buckets[self.directory[slot]].at(index),
            Err(err) => panic!("{err}"),
        }
    }

    /// Finds or stores `key`; returns `(canonical slot, index, inserted)`.
    ///
    /// Every pass through the loop either settles the key or splits its
    /// bucket, which raises that bucket's local depth. Depth is capped by
    /// `max_depth`, so the loop is bounded.
    fn place(&mut self, key: K) -> Result<(usize, usize, bool)> {
        let hash = self.hash_of(&key);
        loop {
            let slot = self.home_slot(hash);
            let bucket = &mut self.buckets[self.directory[slot]];
            if let Some(index) = bucket.position(&key) {
                return Ok((slot, index, false));
            }
            if !bucket.full() {
                let index = bucket.place(key);
                self.len += 1;
                return Ok((slot, index, true));
            }
            self.split(slot, hash)?;
        }
    }

    /// Splits the full bucket whose canonical slot is `first`.
    ///
    /// The bucket keeps the even half of its slot group and a new sibling
    /// takes the odd half (`first + stride`, `first + 3 * stride`, ...). Its
    /// keys are then re-placed by hash. Both halves start empty and hold `N`
    /// keys each, so re-placement always fits.
    fn split(&mut self, first: usize, incoming: u64) -> Result<()> {
        let old = self.directory[first];
        if self.buckets[old]
            .iter()
            .all(|k| self.hash_builder.hash_one(k) == incoming)
        {
            log::debug!("refusing split of bucket #{old}: all keys hash to {incoming:#018x}");
            return Err(Error::HashCollision { hash: incoming });
        }

        let depth = self.buckets[old].local_depth() + 1;
        if depth > self.max_depth {
            log::debug!("refusing split of bucket #{old}: depth {depth} exceeds {}", self.max_depth);
            return Err(Error::DirectoryExhausted { depth });
        }

        let stride = self.directory_stride(first);
        self.buckets[old].set_local_depth(depth);
        if depth > self.global_depth {
            self.expand_directory();
        }

        let sibling = self.buckets.len();
        self.buckets.push(Bucket::new(depth));
        let mut slot = first + stride;
        while slot < self.directory.len() {
            self.directory[slot] = sibling;
            slot += 2 * stride;
        }

        for key in self.buckets[old].drain() {
            let home = self.home_slot(self.hash_of(&key));
            self.buckets[self.directory[home]].place(key);
        }
        log::trace!(
            "split bucket #{old} at slot {first}: local depth {depth}, sibling #{sibling} holds {}",
            self.buckets[sibling].len()
        );
        Ok(())
    }

    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.take(key).is_some()
    }

    /// Removes and returns the stored key equal to `key`.
    pub fn take(&mut self, key: &K) -> Option<K> {
        let slot = self.home_slot(self.hash_of(key));
        let removed = self.buckets[self.directory[slot]].erase(key)?;
        self.len -= 1;
        Some(removed)
    }
}

impl<K, const N: usize> Default for ExtendibleSet<K, N, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, const N: usize, S> PartialEq for ExtendibleSet<K, N, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|key| other.contains(key))
    }
}

impl<K, const N: usize, S> Eq for ExtendibleSet<K, N, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
}

impl<K: fmt::Debug, const N: usize, S> fmt::Debug for ExtendibleSet<K, N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, const N: usize, S> Extend<K> for ExtendibleSet<K, N, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<'a, K, const N: usize, S> Extend<&'a K> for ExtendibleSet<K, N, S>
where
    K: Hash + Eq + Copy + 'a,
    S: BuildHasher,
{
    fn extend<I: IntoIterator<Item = &'a K>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

impl<K, const N: usize, S> FromIterator<K> for ExtendibleSet<K, N, S>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
{
    /// Sizes the directory so the expected keys fill about half of the
    /// initial buckets.
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let mut set = Self::with_directory_size_and_hasher(2 * lower / N, S::default());
        set.extend(iter);
        set
    }
}

impl<K, const N: usize, const M: usize> From<[K; M]> for ExtendibleSet<K, N, RandomState>
where
    K: Hash + Eq,
{
    fn from(keys: [K; M]) -> Self {
        keys.into_iter().collect()
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Borrowing iterator over the keys of an [`ExtendibleSet`].
///
/// The position is `(slot, index)`. Only canonical slots are visited, so a
/// bucket shared by several slots is read once. Two iterators are equal when
/// they walk the same set and stand at the same position.
pub struct Iter<'a, K, const N: usize, S> {
    set: &'a ExtendibleSet<K, N, S>,
    slot: usize,
    index: usize,
    remaining: usize,
}

impl<'a, K, const N: usize, S> Iter<'a, K, N, S> {
    /// Moves forward to the next readable key, or to the end position
    /// `(directory_len, 0)`.
    fn settle(&mut self) {
        let set = self.set;
        while self.slot < set.directory.len() {
            if set.is_canonical(self.slot)
                && self.index < set.buckets[set.directory[self.slot]].len()
            {
                return;
            }
            self.slot += 1;
            self.index = 0;
        }
        self.index = 0;
    }

    pub fn is_end(&self) -> bool {
        self.slot == self.set.directory.len()
    }
}

impl<'a, K, const N: usize, S> Iterator for Iter<'a, K, N, S> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_end() {
            return None;
        }
        let set = self.set;
        let key = set.buckets[set.directory[self.slot]].entry(self.index)?;
        self.index += 1;
        self.remaining -= 1;
        self.settle();
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, const N: usize, S> ExactSizeIterator for Iter<'_, K, N, S> {}

impl<K, const N: usize, S> FusedIterator for Iter<'_, K, N, S> {}

impl<K, const N: usize, S> Clone for Iter<'_, K, N, S> {
    fn clone(&self) -> Self {
        Self {
            set: self.set,
            slot: self.slot,
            index: self.index,
            remaining: self.remaining,
        }
    }
}

impl<K, const N: usize, S> PartialEq for Iter<'_, K, N, S> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.set, other.set) && self.slot == other.slot && self.index == other.index
    }
}

impl<K, const N: usize, S> Eq for Iter<'_, K, N, S> {}

impl<K, const N: usize, S> fmt::Debug for Iter<'_, K, N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("slot", &self.slot)
            .field("index", &self.index)
            .field("remaining", &self.remaining)
            .finish()
    }
}

/// Owning iterator. Each bucket lives once in the arena, so draining the
/// arena yields every key exactly once.
pub struct IntoIter<K, const N: usize> {
    buckets: std::vec::IntoIter<Bucket<K, N>>,
    current: arrayvec::IntoIter<K, N>,
    remaining: usize,
}

impl<K, const N: usize> Iterator for IntoIter<K, N> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        loop {
            if let Some(key) = self.current.next() {
                self.remaining -= 1;
                return Some(key);
            }
            self.current = self.buckets.next()?.into_entries().into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, const N: usize> ExactSizeIterator for IntoIter<K, N> {}

impl<K, const N: usize> FusedIterator for IntoIter<K, N> {}

impl<K, const N: usize, S> IntoIterator for ExtendibleSet<K, N, S> {
    type Item = K;
    type IntoIter = IntoIter<K, N>;

    fn into_iter(self) -> IntoIter<K, N> {
        IntoIter {
            buckets: self.buckets.into_iter(),
            current: arrayvec::ArrayVec::new().into_iter(),
            remaining: self.len,
        }
    }
}

impl<'a, K, const N: usize, S> IntoIterator for &'a ExtendibleSet<K, N, S> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K, N, S>;

    fn into_iter(self) -> Iter<'a, K, N, S> {
        self.iter()
    }
}


#[cfg(test)]
mod proptests;
