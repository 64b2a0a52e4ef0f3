//! Channel identifier generation and validation.
//!
//! Identifiers are [`CHANNEL_ID_LENGTH`] characters drawn uniformly from
//! [`CHANNEL_ID_ALPHABET`], which is case-sensitive alphanumerics minus the
//! confusable `0 O o 1 l I`. That leaves 56^8 (about 9.7e13) identifiers.

use rand::rngs::OsRng;
use rand::Rng;

/// Characters a channel identifier may contain.
pub const CHANNEL_ID_ALPHABET: &[u8] = b"23456789abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ";

/// Length of every channel identifier.
pub const CHANNEL_ID_LENGTH: usize = 8;

/// Generate a channel identifier from the operating system's CSPRNG.
#[must_use]
pub fn generate_channel_id() -> String {
    generate_channel_id_with(&mut OsRng)
}

/// Generate a channel identifier from the given random source.
#[must_use]
pub fn generate_channel_id_with<R: Rng>(rng: &mut R) -> String {
    (0..CHANNEL_ID_LENGTH)
        .map(|_| CHANNEL_ID_ALPHABET[rng.gen_range(0..CHANNEL_ID_ALPHABET.len())] as char)
        .collect()
}

/// Check whether a string could be a channel identifier.
///
/// Anything failing this check cannot name an existing channel.
#[must_use]
pub fn is_well_formed(channel_id: &str) -> bool {
    channel_id.len() == CHANNEL_ID_LENGTH
        && channel_id.bytes().all(|b| CHANNEL_ID_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_alphabet_has_no_confusables() {
        for c in b"0Oo1lI" {
            assert!(!CHANNEL_ID_ALPHABET.contains(c));
        }
        let unique: HashSet<_> = CHANNEL_ID_ALPHABET.iter().collect();
        assert_eq!(unique.len(), CHANNEL_ID_ALPHABET.len());
        assert_eq!(CHANNEL_ID_ALPHABET.len(), 56);
    }

    #[test]
    fn test_generated_ids_are_well_formed() {
        for _ in 0..100 {
            let id = generate_channel_id();
            assert!(is_well_formed(&id), "{id}");
        }
    }

    #[test]
    fn test_no_collisions() {
        let ids: HashSet<String> = (0..10_000).map(|_| generate_channel_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn test_malformed_ids() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("nonexistent"));
        assert!(!is_well_formed("abcdefg"));
        assert!(!is_well_formed("abcdefg0"));
        assert!(!is_well_formed("abc/efgh"));
        assert!(is_well_formed("abcdefgh"));
    }

    proptest! {
        #[test]
        fn prop_any_alphabet_string_of_right_length_is_well_formed(
            indices in proptest::collection::vec(0..CHANNEL_ID_ALPHABET.len(), CHANNEL_ID_LENGTH)
        ) {
            let id: String = indices.iter().map(|&i| CHANNEL_ID_ALPHABET[i] as char).collect();
            prop_assert!(is_well_formed(&id));
        }

        #[test]
        fn prop_wrong_length_is_rejected(id in "[a-z]{0,7}|[a-z]{9,16}") {
            prop_assert!(!is_well_formed(&id));
        }
    }
}
