//! Midrank assignment shared by the rank-based tests.

/// Assign 1-based ranks with ties averaged.
///
/// Returns the ranks (in input order) and the tie term `sum(t^3 - t)` over
/// tie groups, used by the tests' tie corrections.
pub(crate) fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        let count = (j - i + 1) as f64;
        if count > 1.0 {
            tie_term += count * count * count - count;
        }
        i = j + 1;
    }
    (ranks, tie_term)
}
