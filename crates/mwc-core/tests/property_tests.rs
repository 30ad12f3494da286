//! Property-based tests for mwc-core
//!
//! Uses proptest to verify identifier and proof message invariants across
//! randomized inputs

use mwc_core::{decode_message, encode_message, Currency, Identifier, SwitchType};
use proptest::prelude::*;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Generate well-formed identifiers (paths past the depth are zero)
fn identifier_strategy() -> impl Strategy<Value = Identifier> {
    (0u8..=4, any::<[u32; 4]>()).prop_map(|(depth, mut paths)| {
        for path in paths.iter_mut().skip(usize::from(depth)) {
            *path = 0;
        }
        Identifier::new(depth, paths).unwrap()
    })
}

fn currency_strategy() -> impl Strategy<Value = Currency> {
    prop::sample::select(Currency::ALL.to_vec())
}

// ============================================================================
// Identifier Properties
// ============================================================================

proptest! {
    /// Property: serialized bytes parse back to the same identifier
    #[test]
    fn prop_identifier_bytes_roundtrip(identifier in identifier_strategy()) {
        let bytes = identifier.to_bytes();
        prop_assert_eq!(Identifier::from_bytes(&bytes).unwrap(), identifier);
        prop_assert_eq!(identifier.to_string().parse::<Identifier>().unwrap(), identifier);
    }

    /// Property: next() is strictly greater in value and includes the original
    #[test]
    fn prop_next_is_greater(identifier in identifier_strategy()) {
        if let Some(next) = identifier.next() {
            prop_assert!(next.includes_value(&identifier));
            prop_assert!(!identifier.includes_value(&next));
        }
    }

    /// Property: includes_value is a total order on identifier values
    #[test]
    fn prop_includes_value_is_total(a in identifier_strategy(), b in identifier_strategy()) {
        prop_assert!(a.includes_value(&b) || b.includes_value(&a));
        prop_assert!(a.includes_value(&a));
    }

    /// Property: encoding a height never changes the identifier's value
    #[test]
    fn prop_height_does_not_change_value(
        identifier in identifier_strategy(),
        currency in currency_strategy(),
        height in 1u64..=Identifier::MAXIMUM_HEIGHT,
    ) {
        let with_height = identifier.with_height(currency, height);
        prop_assert!(with_height.includes_value(&identifier.remove_extras(currency)));
        prop_assert!(identifier.remove_extras(currency).includes_value(&with_height));
        if currency.consensus().identifier_height_supported {
            prop_assert_eq!(with_height.height(currency), Some(height));
        } else {
            prop_assert_eq!(with_height.height(currency), None);
        }
    }

    /// Property: proof messages decode to what was encoded
    #[test]
    fn prop_message_roundtrip(identifier in identifier_strategy(), regular in any::<bool>()) {
        let switch_type = if regular { SwitchType::Regular } else { SwitchType::None };
        let message = encode_message(&identifier, switch_type);
        prop_assert_eq!(decode_message(&message).unwrap(), (identifier, switch_type));
    }
}
