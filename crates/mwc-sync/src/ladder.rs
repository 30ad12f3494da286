//! Reorg-detection checkpoint ladder
//!
//! Slot 0 is the tip. Slot `i` holds a checkpoint whose age falls in
//! `[minimum_age(i - 1), minimum_age(i) - 1]` seconds, where ages grow by
//! powers of two for the first slots and powers of three after that. A reorg
//! shallower than the oldest checkpoint therefore never forces a rescan from
//! the wallet's starting height.

use crate::node::{Node, Tip};
use crate::Result;
use mwc_core::RecentHeight;

/// Largest number of checkpoints kept
pub const MAXIMUM_NUMBER_OF_RECENT_HEIGHTS: usize = 13;

/// Minimum age in seconds of the checkpoint in slot `index + 1`
pub fn minimum_age(index: u32, block_time_seconds: u64) -> u64 {
    let factor = if index > 2 {
        3u64.pow(index - 1)
    } else {
        2u64.pow(index)
    };
    factor * block_time_seconds
}

/// Drop checkpoints from the top of the ladder until one still matches the chain
///
/// Returns the number of discarded checkpoints.
pub async fn discard_orphaned<N>(node: &N, recent_heights: &mut Vec<RecentHeight>) -> Result<usize>
where
    N: Node + ?Sized,
{
    let mut discarded = 0;
    while let Some(newest) = recent_heights.first() {
        let header = node.get_header(newest.height()).await?;
        if newest.matches(&header.hash) {
            break;
        }
        recent_heights.remove(0);
        discarded += 1;
    }
    Ok(discarded)
}

/// Build the ladder for `tip`, reusing surviving checkpoints where they fit
pub async fn rebuild<N>(
    node: &N,
    tip: &Tip,
    surviving: &[RecentHeight],
    block_time_seconds: u64,
) -> Result<Vec<RecentHeight>>
where
    N: Node + ?Sized,
{
    let mut ladder = Vec::with_capacity(MAXIMUM_NUMBER_OF_RECENT_HEIGHTS);
    ladder.push(RecentHeight::new(tip.height, tip.hash));

    for index in 1..MAXIMUM_NUMBER_OF_RECENT_HEIGHTS as u32 {
        let minimum = minimum_age(index - 1, block_time_seconds);
        let maximum = minimum_age(index, block_time_seconds) - 1;
        let ideal_height = tip
            .height
            .saturating_sub(minimum.div_ceil(block_time_seconds));

        let reusable = surviving.iter().find(|checkpoint| {
            let age = tip.height.saturating_sub(checkpoint.height()) * block_time_seconds;
            (minimum..=maximum).contains(&age) || (ideal_height == 0 && checkpoint.height() == 0)
        });
        let checkpoint = match reusable {
            Some(checkpoint) => *checkpoint,
            None => RecentHeight::new(ideal_height, node.get_header(ideal_height).await?.hash),
        };
        ladder.push(checkpoint);

        if ideal_height == 0 {
            break;
        }
    }
    Ok(ladder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_ages() {
        let ages: Vec<u64> = (0..6).map(|index| minimum_age(index, 60)).collect();
        assert_eq!(ages, vec![60, 120, 240, 540, 1_620, 4_860]);
    }

    #[test]
    fn test_bands_are_contiguous() {
        for index in 1..MAXIMUM_NUMBER_OF_RECENT_HEIGHTS as u32 {
            assert!(minimum_age(index, 60) > minimum_age(index - 1, 60));
        }
    }
}
