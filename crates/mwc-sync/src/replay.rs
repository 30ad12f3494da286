//! Replay detection for identifier heights
//!
//! Identifiers only keep the creation height modulo `MAXIMUM_HEIGHT + 1`. The
//! full height is recovered by picking the wrap period nearest to the output's
//! actual height; an output whose identifier height lies too far below where it
//! appeared on chain is a replayed old output and is not credited.

use mwc_core::Identifier;

const HEIGHT_MODULUS: u128 = Identifier::MAXIMUM_HEIGHT as u128 + 1;

/// Identifier height lifted into the wrap period of `output_height`
///
/// Rounds `output_height / modulus` half up, then steps back one period if that
/// lands more than `overage_threshold` above the output.
pub fn unwrap_identifier_height(identifier_height: u64, output_height: u64, overage_threshold: u64) -> u128 {
    let output_height = u128::from(output_height);
    let periods = (2 * output_height + HEIGHT_MODULUS) / (2 * HEIGHT_MODULUS);
    let mut height = u128::from(identifier_height) + periods * HEIGHT_MODULUS;
    if height > output_height + u128::from(overage_threshold) && height >= HEIGHT_MODULUS {
        height -= HEIGHT_MODULUS;
    }
    height
}

/// Whether an output at `output_height` with this identifier height is a replay
pub fn is_replayed(
    identifier_height: u64,
    output_height: u64,
    overage_threshold: u64,
    replay_threshold: u64,
) -> bool {
    let height = unwrap_identifier_height(identifier_height, output_height, overage_threshold);
    let output_height = u128::from(output_height);
    output_height > height && output_height - height > u128::from(replay_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WEEK: u64 = 10_080;
    const MODULUS: u64 = Identifier::MAXIMUM_HEIGHT + 1;

    #[test]
    fn test_recent_identifier_is_accepted() {
        assert!(!is_replayed(1_300_000, 1_300_000, WEEK, WEEK));
        assert!(!is_replayed(1_300_000, 1_300_000 + WEEK, WEEK, WEEK));
        // created slightly above where it landed
        assert!(!is_replayed(1_300_100, 1_300_000, WEEK, WEEK));
    }

    #[test]
    fn test_old_identifier_is_replay() {
        assert!(is_replayed(1_300_000, 1_300_000 + WEEK + 1, WEEK, WEEK));
        assert!(is_replayed(10, 2_000_000, WEEK, WEEK));
    }

    #[test]
    fn test_wraparound() {
        // output just past a wrap, identifier height recorded just before it
        let output_height = MODULUS + 5;
        let identifier_height = MODULUS - 5;
        assert_eq!(
            unwrap_identifier_height(identifier_height, output_height, WEEK),
            u128::from(MODULUS - 5)
        );
        assert!(!is_replayed(identifier_height, output_height, WEEK, WEEK));

        // output just past a wrap, identifier already wrapped too
        assert_eq!(unwrap_identifier_height(3, output_height, WEEK), u128::from(MODULUS + 3));
    }

    #[test]
    fn test_rounds_half_up() {
        let half = MODULUS / 2;
        assert_eq!(unwrap_identifier_height(half, half - 1, WEEK), u128::from(half));
        // at exactly half a period the next period is chosen, then stepped back
        assert_eq!(unwrap_identifier_height(0, half, WEEK), 0);
    }

    proptest! {
        #[test]
        fn prop_matching_height_is_never_replay(height in 0u64..4 * MODULUS) {
            let identifier_height = height % MODULUS;
            prop_assert!(!is_replayed(identifier_height, height, WEEK, WEEK));
        }
    }
}
