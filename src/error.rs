//! Error types for the `extendible-set` crate

/// Errors raised by bucket access and by inserts that cannot make room.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A bucket element was read at or past the bucket's logical length.
    ///
    /// The public set API never produces this; it signals a broken
    /// internal invariant or a misuse of [`Bucket::get`](crate::Bucket::get).
    #[error("bucket index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A full bucket and the incoming key all carry the same 64-bit hash.
    ///
    /// Splitting only ever looks at more hash bits, so these keys can never
    /// be separated and the insert is refused.
    #[error("bucket overflow: every key shares hash {hash:#018x}")]
    HashCollision { hash: u64 },

    /// Splitting the overflowing bucket would grow the global depth past
    /// [`MAX_GLOBAL_DEPTH`](crate::MAX_GLOBAL_DEPTH).
    #[error("directory exhausted: split would need global depth {depth}")]
    DirectoryExhausted { depth: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
