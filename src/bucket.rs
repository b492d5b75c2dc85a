//! Fixed-capacity key storage shared by one or more directory slots.

use arrayvec::ArrayVec;

use crate::error::{Error, Result};

/// An unordered run of at most `N` distinct keys plus its local depth.
///
/// The local depth is the number of low hash bits every key in the bucket
/// agrees on. Capacity never changes after construction; [`Bucket::clear`]
/// only resets the logical length.
#[derive(Clone, Debug)]
pub struct Bucket<K, const N: usize> {
    entries: ArrayVec<K, N>,
    local_depth: u32,
}

impl<K, const N: usize> Bucket<K, N> {
    const NONZERO_CAPACITY: () = assert!(N > 0, "bucket capacity must be at least 1");

    pub(crate) fn new(local_depth: u32) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NONZERO_CAPACITY;
        Self {
            entries: ArrayVec::new(),
            local_depth,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    #[inline]
    pub fn full(&self) -> bool {
        self.entries.is_full()
    }

    #[inline]
    pub fn local_depth(&self) -> u32 {
        self.local_depth
    }

    #[inline]
    pub(crate) fn set_local_depth(&mut self, depth: u32) {
        self.local_depth = depth;
    }

    /// Element at `index`, in insertion order modulo swap-removals.
    pub fn get(&self, index: usize) -> Result<&K> {
        self.entries.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.entries.len(),
        })
    }

    #[inline]
    pub(crate) fn entry(&self, index: usize) -> Option<&K> {
        self.entries.get(index)
    }

    /// Element at an index the caller has just validated.
    #[inline]
    pub(crate) fn at(&self, index: usize) -> &K {
        &self.entries[index]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, K> {
        self.entries.iter()
    }

    /// Empties the bucket. Storage is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Hands every key to the caller and leaves the bucket empty.
    pub(crate) fn drain(&mut self) -> ArrayVec<K, N> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn into_entries(self) -> ArrayVec<K, N> {
        self.entries
    }
}

impl<K: Eq, const N: usize> Bucket<K, N> {
    pub(crate) fn position(&self, key: &K) -> Option<usize> {
        self.entries.iter().position(|k| k == key)
    }

    /// `1` if the key is stored here, `0` otherwise.
    pub fn count(&self, key: &K) -> usize {
        usize::from(self.position(key).is_some())
    }

    /// Appends `key`. Returns `false` without touching the bucket when the
    /// key is already present or the bucket is full.
    pub fn insert(&mut self, key: K) -> bool {
        if self.position(&key).is_some() {
            return false;
        }
        self.entries.try_push(key).is_ok()
    }

    /// Removes `key` by moving the last entry into its place.
    pub fn erase(&mut self, key: &K) -> Option<K> {
        let idx = self.position(key)?;
        Some(self.entries.swap_remove(idx))
    }

    /// Pushes a key already known to be absent. Callers guarantee room.
    pub(crate) fn place(&mut self, key: K) -> usize {
        debug_assert!(!self.full());
        let idx = self.entries.len();
        self.entries.push(key);
        idx
    }
}
