//! Sequential identifier allocation.
//!
//! Identifiers are derived from a full scan of the collection: there is no
//! persisted counter. The scan and the insert that follows are not atomic,
//! so two concurrent creates can compute the same identifier. The store's
//! duplicate-key check turns the loser into an error rather than an
//! overwrite.

/// Returns `1` for an empty collection, otherwise `max(ids) + 1`.
///
/// `None` means the identifier space is exhausted.
pub fn next_id<I>(ids: I) -> Option<u64>
where
    I: IntoIterator<Item = u64>,
{
    match ids.into_iter().max() {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}
