//! In-place Fisher–Yates shuffle.

use crate::utils::rng::SimpleRng;

/// Performs an in-place, uniform Fisher–Yates shuffle.
///
/// For every index `i` except the last, an index `j` is drawn uniformly from
/// `[i, len - 1]` and the two elements are swapped. Slices with one element or
/// less are left unchanged.
pub fn shuffle<T>(data: &mut [T], rng: &mut SimpleRng) {
    let len = data.len();
    if len <= 1 {
        return;
    }
    for i in 0..len - 1 {
        let j = i + rng.gen_usize(len - i);
        data.swap(i, j);
    }
}
