/// Ordering already known for a sample passed to [`gini`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortHint {
    AscSorted,
    DescSorted,
    Unsorted,
}

/// Gini coefficient of a non-negative integer sample.
///
/// `G = (2·Σ(i·v[i]) − (n−1)·Σv) / (n·Σv)` over the ascending sample with
/// 0-based indices. Returns 0 for fewer than two values or an all-zero sample.
pub fn gini(values: &[usize], hint: SortHint) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }

    let total: f64 = values.iter().map(|&v| v as f64).sum();
    if total == 0.0 {
        return 0.0;
    }

    let weighted: f64 = match hint {
        SortHint::AscSorted => weighted_sum(values.iter()),
        SortHint::DescSorted => weighted_sum(values.iter().rev()),
        SortHint::Unsorted => {
            let mut sorted = values.to_vec();
            sorted.sort_unstable();
            weighted_sum(sorted.iter())
        }
    };

    let n = n as f64;
    (2.0 * weighted - (n - 1.0) * total) / (n * total)
}

fn weighted_sum<'a>(ascending: impl Iterator<Item = &'a usize>) -> f64 {
    ascending
        .enumerate()
        .map(|(i, &v)| i as f64 * v as f64)
        .sum()
}
