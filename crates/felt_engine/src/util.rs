//! Small sequence helpers shared by the engine and its callers.

use std::hash::Hash;

use indexmap::IndexSet;
use rand::Rng;
use rand::seq::SliceRandom;

/// Returns a random integer between `min` and `max`, both inclusive.
///
/// Bounds given in the wrong order are swapped.
pub fn rand_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    rng.gen_range(lo..=hi)
}

/// Returns a random element, or `None` if `items` is empty.
pub fn rand_nth<'a, T, R: Rng + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    items.choose(rng)
}

/// Returns a shuffled copy of `items`, leaving the original untouched.
pub fn shuffle<T: Clone, R: Rng + ?Sized>(rng: &mut R, items: &[T]) -> Vec<T> {
    let mut shuffled = items.to_vec();
    shuffled.shuffle(rng);
    shuffled
}

/// Removes duplicates, keeping the first occurrence of each item.
pub fn distinct<T: Hash + Eq>(items: impl IntoIterator<Item = T>) -> Vec<T> {
    items.into_iter().collect::<IndexSet<_>>().into_iter().collect()
}
