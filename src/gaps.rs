//! Sequence gap detection.
use std::collections::HashSet;

use crate::error::{FeedError, Result};

/// Every sequence in `[1, max)` that is absent from `sequences`, ascending.
///
/// The maximum itself is never reported since it was received. Values below
/// one are ignored. Fails with [`FeedError::EmptyInput`] when nothing was
/// received.
pub fn find_missing<I>(sequences: I) -> Result<Vec<i32>>
where
    I: IntoIterator<Item = i32>,
{
    let seen: HashSet<i32> = sequences.into_iter().collect();
    let max = *seen.iter().max().ok_or(FeedError::EmptyInput)?;
    Ok((1..max).filter(|s| !seen.contains(s)).collect())
}
