//! Text rendering of the directory for debugging.
//!
//! ```text
//! global_depth = 1
//! -------------
//! |    2|     |d=1  #0
//! -------------
//! |    1|    3|d=1  #1
//! -------------
//! ```
//!
//! One row per directory slot. Each row shows the slot's bucket with one
//! width-5 cell per unit of capacity, then the bucket's local depth and
//! arena id. Slots sharing a bucket repeat it.

use std::fmt;

use crate::ExtendibleSet;

/// Helper returned by [`ExtendibleSet::dump`]; renders with `Display`.
pub struct Dump<'a, K, const N: usize, S> {
    set: &'a ExtendibleSet<K, N, S>,
}

impl<'a, K, const N: usize, S> Dump<'a, K, N, S> {
    pub(crate) fn new(set: &'a ExtendibleSet<K, N, S>) -> Self {
        Self { set }
    }
}

fn write_rule(f: &mut fmt::Formatter<'_>, columns: usize) -> fmt::Result {
    for _ in 0..columns {
        f.write_str("------")?;
    }
    f.write_str("-")
}

impl<K: fmt::Display, const N: usize, S> fmt::Display for Dump<'_, K, N, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "global_depth = {}", self.set.global_depth)?;
        for &id in &self.set.directory {
            let bucket = &self.set.buckets[id];
            write_rule(f, N)?;
            f.write_str("\n|")?;
            for i in 0..N {
                match bucket.entry(i) {
                    Some(key) => write!(f, "{key:>5}|")?,
                    None => write!(f, "{:5}|", "")?,
                }
            }
            writeln!(f, "d={}  #{}", bucket.local_depth(), id)?;
        }
        write_rule(f, N)
    }
}
