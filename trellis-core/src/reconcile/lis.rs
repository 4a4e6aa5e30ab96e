//! Longest increasing subsequence over old-position arrays.

/// Indices of a longest strictly increasing subsequence of `positions`.
///
/// Negative entries mark items with no previous position. They never take
/// part in the subsequence and are not treated as small values.
///
/// When several subsequences share the maximal length, the one whose index
/// sequence is lexicographically smallest wins. In particular a strictly
/// descending input yields the first non-negative index.
///
/// Runs in O(n log n).
///
/// # Example
///
/// ```rust
/// use trellis_core::longest_increasing_subsequence;
///
/// assert_eq!(longest_increasing_subsequence(&[2, 0, 1, 4, 3]), vec![1, 2, 3]);
/// assert_eq!(longest_increasing_subsequence(&[-1, 0, 1, -1, 2]), vec![1, 2, 4]);
/// assert!(longest_increasing_subsequence(&[-1, -1]).is_empty());
/// ```
pub fn longest_increasing_subsequence(positions: &[isize]) -> Vec<usize> {
    // Backward pass: length of the longest increasing run starting at each
    // index. `tails[k]` is the largest value that starts a run of length
    // k + 1 in the suffix seen so far, so `tails` is strictly decreasing.
    let mut start_len = vec![0usize; positions.len()];
    let mut tails: Vec<isize> = Vec::new();

    for (i, &value) in positions.iter().enumerate().rev() {
        if value < 0 {
            continue;
        }
        let longer = tails.partition_point(|&t| t > value);
        start_len[i] = longer + 1;
        match tails.get_mut(longer) {
            Some(slot) => *slot = value,
            None => tails.push(value),
        }
    }

    // Forward pass: greedily take the earliest index that can still
    // complete a run of the remaining length.
    let mut remaining = tails.len();
    let mut result = Vec::with_capacity(remaining);
    let mut last: Option<isize> = None;

    for (i, &value) in positions.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        if value < 0 || start_len[i] != remaining {
            continue;
        }
        if last.is_some_and(|last| value <= last) {
            continue;
        }
        result.push(i);
        last = Some(value);
        remaining -= 1;
    }

    result
}
