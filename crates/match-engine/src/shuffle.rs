//! Fisher-Yates shuffle.

use rand::Rng;

/// Return a uniformly random permutation of `items`. The input is left untouched.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    for i in (1..out.len()).rev() {
        let j = rng.random_range(0..=i);
        out.swap(i, j);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_empty_and_single() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(shuffle::<u8, _>(&[], &mut rng).is_empty());
        assert_eq!(shuffle(&["ねこ"], &mut rng), vec!["ねこ"]);
    }

    #[test]
    fn test_reaches_every_permutation() {
        let mut rng = StdRng::seed_from_u64(42);
        let seen: HashSet<Vec<u8>> = (0..2_000).map(|_| shuffle(&[1, 2, 3], &mut rng)).collect();
        assert_eq!(seen.len(), 6);
    }

    proptest! {
        #[test]
        fn prop_shuffle_is_permutation(items in prop::collection::vec(any::<u16>(), 0..64), seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let before = items.clone();
            let mut shuffled = shuffle(&items, &mut rng);

            prop_assert_eq!(&items, &before);
            prop_assert_eq!(shuffled.len(), items.len());

            let mut sorted = items;
            sorted.sort_unstable();
            shuffled.sort_unstable();
            prop_assert_eq!(shuffled, sorted);
        }
    }
}
