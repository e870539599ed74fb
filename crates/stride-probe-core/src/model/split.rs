//! Stratified train/test partitioning.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use tracing::warn;

use crate::error::{Result, ValidationError};

/// Row indices of one train/test partition, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Indices of every sample, grouped by class label in original order.
fn members_by_class(y: &[i64]) -> BTreeMap<i64, Vec<usize>> {
    let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        members.entry(label).or_default().push(i);
    }
    members
}

/// Hold out `ceil(test_fraction * n)` samples, preserving class proportions.
///
/// Per-class test counts come from the largest-remainder method. Every class
/// keeps at least one sample in training, so a singleton class never appears
/// in the test split.
///
/// # Errors
///
/// Fails when `test_fraction` is outside `(0, 1)`, when there are fewer than
/// two samples, or when no class has a member to spare for testing.
pub fn stratified_holdout(y: &[i64], test_fraction: f64, seed: u64) -> Result<HoldoutSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ValidationError::InvalidValue {
            field: "test_fraction".into(),
            message: format!("{test_fraction} is not in (0, 1)"),
        }
        .into());
    }
    let n = y.len();
    if n < 2 {
        return Err(ValidationError::InvalidValue {
            field: "y".into(),
            message: format!("need at least 2 samples to split, got {n}"),
        }
        .into());
    }

    let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);
    let members = members_by_class(y);

    // (label, size, capacity, allocated, fractional part)
    let mut shares: Vec<(i64, usize, usize, usize, f64)> = members
        .iter()
        .map(|(&label, idx)| {
            let ideal = n_test as f64 * idx.len() as f64 / n as f64;
            let capacity = idx.len() - 1;
            let floor = (ideal.floor() as usize).min(capacity);
            (label, idx.len(), capacity, floor, ideal - ideal.floor())
        })
        .collect();
    shares.sort_by(|a, b| {
        b.4.total_cmp(&a.4)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut remaining = n_test - shares.iter().map(|s| s.3).sum::<usize>();
    while remaining > 0 {
        let mut progressed = false;
        for share in shares.iter_mut() {
            if remaining == 0 {
                break;
            }
            if share.3 < share.2 {
                share.3 += 1;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let mut rng = Mcg128Xsl64::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n);
    let mut test = Vec::with_capacity(n_test);
    // Shuffle in label order so the result does not depend on allocation order.
    let allocation: BTreeMap<i64, usize> = shares.iter().map(|s| (s.0, s.3)).collect();
    for (label, idx) in &members {
        let mut shuffled = idx.clone();
        shuffled.shuffle(&mut rng);
        let take = allocation.get(label).copied().unwrap_or(0);
        test.extend_from_slice(&shuffled[..take]);
        train.extend_from_slice(&shuffled[take..]);
    }

    if test.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "y".into(),
            message: "every class has a single member; nothing can be held out".into(),
        }
        .into());
    }
    if remaining > 0 {
        warn!(requested = n_test, held_out = test.len(), "test split smaller than requested");
    }

    train.sort_unstable();
    test.sort_unstable();
    Ok(HoldoutSplit { train, test })
}

/// Unshuffled stratified k-fold.
///
/// Samples are ordered by label and dealt round-robin into `k` slots to fix
/// how many of each class land in each fold; each class's members are then
/// assigned to folds in their original order. Fold `i` is the test split of
/// the `i`-th returned partition.
///
/// # Errors
///
/// Fails when `k < 2`, when there are fewer samples than folds, or when every
/// class has fewer than `k` members.
pub fn stratified_k_fold(y: &[i64], k: usize) -> Result<Vec<HoldoutSplit>> {
    if k < 2 {
        return Err(ValidationError::InvalidValue {
            field: "cv_folds".into(),
            message: format!("need at least 2 folds, got {k}"),
        }
        .into());
    }
    let n = y.len();
    if n < k {
        return Err(ValidationError::InvalidValue {
            field: "cv_folds".into(),
            message: format!("cannot make {k} folds from {n} samples"),
        }
        .into());
    }

    let members = members_by_class(y);
    if members.values().all(|idx| idx.len() < k) {
        return Err(ValidationError::InvalidValue {
            field: "cv_folds".into(),
            message: format!("{k} folds exceed the size of every class"),
        }
        .into());
    }
    let smallest = members.values().map(Vec::len).min().unwrap_or(0);
    if smallest < k {
        warn!(
            least_populated = smallest,
            folds = k,
            "least populated class has fewer members than folds"
        );
    }

    let mut sorted = y.to_vec();
    sorted.sort_unstable();

    let mut fold_of = vec![0usize; n];
    for (label, idx) in &members {
        let mut assigned = idx.iter();
        for fold in 0..k {
            let count = sorted
                .iter()
                .skip(fold)
                .step_by(k)
                .filter(|l| *l == label)
                .count();
            for &sample in assigned.by_ref().take(count) {
                fold_of[sample] = fold;
            }
        }
    }

    Ok((0..k)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..n).partition(|&i| fold_of[i] == fold);
            HoldoutSplit { train, test }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(y: &[i64], idx: &[usize], label: i64) -> usize {
        idx.iter().filter(|&&i| y[i] == label).count()
    }

    #[test]
    fn holdout_takes_ceil_of_fraction() {
        let y: Vec<i64> = (0..193).map(|i| 1 + (i % 4) as i64).collect();
        let split = stratified_holdout(&y, 0.2, 42).unwrap();
        assert_eq!(split.test.len(), 39);
        assert_eq!(split.train.len(), 154);
    }

    #[test]
    fn holdout_preserves_proportions() {
        let mut y = vec![1; 50];
        y.extend(vec![2; 30]);
        y.extend(vec![3; 20]);
        let split = stratified_holdout(&y, 0.2, 7).unwrap();
        assert_eq!(count(&y, &split.test, 1), 10);
        assert_eq!(count(&y, &split.test, 2), 6);
        assert_eq!(count(&y, &split.test, 3), 4);
    }

    #[test]
    fn holdout_partitions_every_index_once() {
        let y: Vec<i64> = (0..47).map(|i| (i * 7 % 5) as i64).collect();
        let split = stratified_holdout(&y, 0.25, 3).unwrap();
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..47).collect::<Vec<_>>());
        assert!(split.train.windows(2).all(|w| w[0] < w[1]));
        assert!(split.test.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn holdout_keeps_singletons_in_training() {
        let mut y = vec![3; 19];
        y.push(5);
        let split = stratified_holdout(&y, 0.2, 42).unwrap();
        assert_eq!(count(&y, &split.test, 5), 0);
        assert_eq!(count(&y, &split.train, 5), 1);
        assert_eq!(split.test.len(), 4);
    }

    #[test]
    fn holdout_is_deterministic_per_seed() {
        let y: Vec<i64> = (0..60).map(|i| (i % 3) as i64).collect();
        let a = stratified_holdout(&y, 0.2, 42).unwrap();
        let b = stratified_holdout(&y, 0.2, 42).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn holdout_rejects_degenerate_input() {
        assert!(stratified_holdout(&[1], 0.2, 0).is_err());
        assert!(stratified_holdout(&[1, 2, 3], 0.2, 0).is_err());
        assert!(stratified_holdout(&[1, 1, 2, 2], 1.0, 0).is_err());
    }

    #[test]
    fn k_fold_matches_round_robin_allocation() {
        // Ten of class 0 and five of class 1 over five folds: two and one per fold.
        let mut y = vec![0; 10];
        y.extend(vec![1; 5]);
        let folds = stratified_k_fold(&y, 5).unwrap();
        assert_eq!(folds.len(), 5);
        for (i, fold) in folds.iter().enumerate() {
            assert_eq!(fold.test, vec![2 * i, 2 * i + 1, 10 + i]);
            assert_eq!(fold.train.len(), 12);
        }
    }

    #[test]
    fn k_fold_covers_each_sample_exactly_once() {
        let y: Vec<i64> = (0..37).map(|i| 1 + (i * 3 % 4) as i64).collect();
        let folds = stratified_k_fold(&y, 5).unwrap();
        let mut seen: Vec<usize> = folds.iter().flat_map(|f| f.test.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..37).collect::<Vec<_>>());
        for fold in &folds {
            assert_eq!(fold.train.len() + fold.test.len(), 37);
        }
    }

    #[test]
    fn k_fold_tolerates_a_small_class() {
        let mut y = vec![2; 20];
        y.extend([4, 4]);
        let folds = stratified_k_fold(&y, 5).unwrap();
        let holding_minority = folds.iter().filter(|f| count(&y, &f.test, 4) > 0).count();
        assert_eq!(holding_minority, 2);
    }

    #[test]
    fn k_fold_rejects_impossible_requests() {
        assert!(stratified_k_fold(&[1, 2, 1, 2], 1).is_err());
        assert!(stratified_k_fold(&[1, 2, 1], 5).is_err());
        assert!(stratified_k_fold(&[1, 1, 2, 2, 3, 3], 3).is_err());
    }
}
