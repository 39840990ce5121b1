//! Euclidean rhythm generator (Bjorklund's algorithm)

/// Distribute `hits` onsets as evenly as possible over `length` steps.
///
/// Starts from `hits` singleton groups of `[true]` and `length - hits`
/// singleton groups of `[false]`, then keeps appending remainder groups onto
/// the head groups until at most one remainder group is left.
///
/// # Example
/// ```
/// use tetra_core::euclidean;
/// let tresillo = euclidean(3, 8);
/// assert_eq!(tresillo, vec![true, false, false, true, false, false, true, false]);
/// ```
pub fn euclidean(hits: usize, length: usize) -> Vec<bool> {
    if length == 0 {
        return vec![];
    }
    if hits == 0 {
        return vec![false; length];
    }
    if hits >= length {
        return vec![true; length];
    }

    let mut heads: Vec<Vec<bool>> = vec![vec![true]; hits];
    let mut remainders: Vec<Vec<bool>> = vec![vec![false]; length - hits];

    while remainders.len() > 1 {
        let merge_count = heads.len().min(remainders.len());

        let mut merged = Vec::with_capacity(merge_count);
        for (head, tail) in heads.iter().zip(remainders.iter()).take(merge_count) {
            let mut group = head.clone();
            group.extend_from_slice(tail);
            merged.push(group);
        }

        // Whatever did not pair up becomes the new remainder
        remainders = if heads.len() > merge_count {
            heads.split_off(merge_count)
        } else {
            remainders.split_off(merge_count)
        };
        heads = merged;
    }

    heads.into_iter().chain(remainders).flatten().collect()
}

/// Rotate a pattern so that step `offset` becomes step 0.
pub fn rotate<T: Clone>(pattern: &[T], offset: usize) -> Vec<T> {
    if pattern.is_empty() {
        return vec![];
    }
    let mut rotated = pattern.to_vec();
    rotated.rotate_left(offset % pattern.len());
    rotated
}
