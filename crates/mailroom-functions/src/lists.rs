//! List utilities
//!
//! Plain functions over integer slices. Inputs are never modified.

/// Ascending copy of `elements`; equal values keep their relative order
pub fn sort(elements: &[i64]) -> Vec<i64> {
    let mut sorted = elements.to_vec();
    sorted.sort();
    sorted
}

/// `first`, followed by each element of `second` that does not occur in `first`
///
/// Duplicates within `second` are all kept.
pub fn union(first: &[i64], second: &[i64]) -> Vec<i64> {
    let mut result = first.to_vec();
    result.extend(second.iter().filter(|b| !first.contains(*b)));
    result
}

/// Every ordered pair `(a[i], a[j])` whose parities differ
///
/// Parity uses the non-negative remainder, so negative odd numbers are odd.
pub fn odd_sum_pairs(elements: &[i64]) -> Vec<(i64, i64)> {
    let is_odd = |value: i64| value.rem_euclid(2) == 1;

    elements
        .iter()
        .flat_map(|a| elements.iter().map(move |b| (*a, *b)))
        .filter(|(a, b)| is_odd(*a) != is_odd(*b))
        .collect()
}
