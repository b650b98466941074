//! Wordset assignment and shuffling.

use rand::seq::SliceRandom;
use rand::Rng;

/// Map a week number to one of the three wordsets.
///
/// Week 1 → set 0, week 2 → set 1, week 3 → set 2, then the cycle repeats,
/// so a given week always yields the same content.
pub fn select_wordset(week: i64) -> usize {
    match week.rem_euclid(3) {
        1 => 0,
        2 => 1,
        _ => 2,
    }
}

/// Return a uniformly random permutation of `items` (Fisher–Yates).
pub fn shuffle<T: Clone, R: Rng + ?Sized>(items: &[T], rng: &mut R) -> Vec<T> {
    let mut out = items.to_vec();
    out.shuffle(rng);
    out
}

/// Return a uniformly random permutation of `0..len`.
pub fn shuffled_indices<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}
