use adaptree::testing::{random_points, step_targets};
use adaptree::{Node, RefinementForest, Split, TreeConfig, UpdateOutcome};
use approx::assert_abs_diff_eq;
use rstest::rstest;

fn step_config() -> TreeConfig {
    TreeConfig::builder()
        .q_learn_rate(200)
        .filter_val(0.5)
        .build()
        .unwrap()
}

fn train_step(forest: &mut RefinementForest, label: u64, rows: usize, seed: u64, config: &TreeConfig) {
    let points = random_points(rows, 1, seed, 0.0, 1.0);
    let targets = step_targets(&points, 0, 0.5, 10.0, 0.0);
    for (p, &v) in points.iter().zip(&targets) {
        forest.update(label, p, v, 1.0, config).unwrap();
    }
}

/// Splits reachable from `label`'s root.
fn splits(forest: &RefinementForest, label: u64) -> Vec<Split> {
    let mut out = Vec::new();
    let mut stack = vec![forest.root(label).unwrap()];
    while let Some(id) = stack.pop() {
        if let Some(split) = forest.node(id).split() {
            out.push(*split);
            stack.push(split.low);
            stack.push(split.high);
        }
    }
    out
}

fn boundaries(forest: &RefinementForest, label: u64) -> Vec<f64> {
    splits(forest, label).iter().map(|s| s.boundary).collect()
}

fn boundaries_on(forest: &RefinementForest, label: u64, dimension: usize) -> usize {
    splits(forest, label).iter().filter(|s| s.dimension == dimension).count()
}

#[test]
fn step_function_is_learned() {
    let config = step_config();
    let mut forest = RefinementForest::from_config(&config);
    train_step(&mut forest, 7, 20_000, 11, &config);

    assert!(forest.leaf_count(7) >= 2);
    assert!(
        boundaries(&forest, 7).iter().any(|b| (b - 0.5).abs() < 0.1),
        "no boundary near 0.5: {:?}",
        boundaries(&forest, 7)
    );
    assert_abs_diff_eq!(forest.lookup(7, &[0.1]).mean, 10.0, epsilon = 1.0);
    assert_abs_diff_eq!(forest.lookup(7, &[0.9]).mean, 0.0, epsilon = 1.0);
    assert_eq!(forest.labels().collect::<Vec<_>>(), vec![7]);
}

#[test]
fn constant_function_never_splits() {
    let config = step_config();
    let mut forest = RefinementForest::from_config(&config);
    for p in random_points(2_000, 2, 3, -1.0, 1.0) {
        let outcome = forest.update(1, &p, 4.0, 1.0, &config).unwrap();
        assert!(!outcome.is_split());
    }
    assert_eq!(forest.leaf_count(1), 1);
    assert_eq!(forest.n_nodes(), 1);
    let e = forest.lookup(1, &[0.3, -0.3]);
    assert_eq!(e.count, 2_000);
    assert_eq!(e.mean, 4.0);
    assert_eq!(e.variance, 0.0);
}

#[test]
fn splits_on_the_informative_dimension() {
    let config = step_config();
    let mut forest = RefinementForest::from_config(&config);
    let points = random_points(5_000, 3, 21, 0.0, 1.0);
    let targets = step_targets(&points, 2, 0.5, 1.0, -1.0);

    let mut first_split = None;
    for (p, &v) in points.iter().zip(&targets) {
        if let UpdateOutcome::Split { split, .. } = forest.update(0, p, v, 1.0, &config).unwrap() {
            first_split.get_or_insert(split);
        }
    }
    assert!(first_split.is_some(), "step should split the root");
    assert!(boundaries_on(&forest, 0, 2) > 0);
    assert_abs_diff_eq!(forest.lookup(0, &[0.5, 0.5, 0.05]).mean, 1.0, epsilon = 0.5);
    assert_abs_diff_eq!(forest.lookup(0, &[0.5, 0.5, 0.95]).mean, -1.0, epsilon = 0.5);
}

#[test]
fn every_split_child_has_samples() {
    let config = step_config();
    let mut forest = RefinementForest::from_config(&config);
    let points = random_points(5_000, 2, 5, 0.0, 1.0);
    let targets = step_targets(&points, 0, 0.3, 5.0, -5.0);
    for (p, &v) in points.iter().zip(&targets) {
        if let UpdateOutcome::Split { split, .. } = forest.update(4, p, v, 1.0, &config).unwrap() {
            for child in [split.low, split.high] {
                let predictor = forest.node(child).predictor().unwrap();
                assert!(predictor.value().count() > 0);
                assert!(predictor.samples() > 0);
            }
        }
    }
}

#[test]
fn root_is_stable_across_splits() {
    let config = step_config();
    let mut forest = RefinementForest::from_config(&config);
    forest.update(7, &[0.5], 1.0, 1.0, &config).unwrap();
    let root = forest.root(7).unwrap();
    train_step(&mut forest, 7, 5_000, 2, &config);
    assert_eq!(forest.root(7), Some(root));
    assert!(matches!(forest.node(root), Node::Internal { .. }));
    assert_eq!(forest.len(), 1);
}

#[test]
fn boundary_points_route_low() {
    let config = step_config();
    let mut forest = RefinementForest::from_config(&config);
    train_step(&mut forest, 7, 5_000, 9, &config);

    let root = forest.root(7).unwrap();
    let split = *forest.node(root).split().expect("root should have split");
    let on_boundary = [split.boundary];

    // the low subtree may have split again
    let mut id = split.low;
    while let Some(s) = forest.node(id).split() {
        id = s.child_for(&on_boundary);
    }
    let leaf = forest.node(id).predictor().unwrap();
    let estimate = forest.lookup(7, &on_boundary);
    assert_eq!(estimate.mean, leaf.value().mean());
    assert_eq!(estimate.count, leaf.samples());
}

#[test]
fn same_seed_same_forest() {
    let config = step_config();
    let points = random_points(3_000, 3, 8, 0.0, 1.0);
    // two informative dimensions so tie-breaks matter
    let targets: Vec<f64> = points
        .iter()
        .map(|p| if p[0] < 0.5 && p[1] < 0.5 { 3.0 } else { 0.0 })
        .collect();

    let run = |seed: u64| {
        let mut forest = RefinementForest::with_seed(seed);
        for (p, &v) in points.iter().zip(&targets) {
            forest.update(1, p, v, 1.0, &config).unwrap();
        }
        forest.dump()
    };
    assert_eq!(run(5), run(5));
}

#[test]
fn clone_is_an_independent_snapshot() {
    let config = step_config();
    let mut forest = RefinementForest::from_config(&config);
    train_step(&mut forest, 1, 1_000, 4, &config);

    let snapshot = forest.clone();
    let before = snapshot.dump();
    train_step(&mut forest, 1, 1_000, 5, &config);
    forest.update(2, &[0.1], 1.0, 1.0, &config).unwrap();

    assert_eq!(snapshot.dump(), before);
    assert_eq!(snapshot.len(), 1);
    assert_eq!(forest.len(), 2);
}

// =============================================================================
// best_q
// =============================================================================

/// Labels 1 -> 3.0 and 2 -> 1.0; label 3 is never observed.
fn three_labels() -> RefinementForest {
    let config = TreeConfig::default();
    let mut forest = RefinementForest::new();
    forest.update(1, &[0.0], 3.0, 1.0, &config).unwrap();
    forest.update(2, &[0.0], 1.0, 1.0, &config).unwrap();
    forest
}

#[rstest]
#[case(true, None, 1.0)]
#[case(false, None, 3.0)]
#[case(true, Some(vec![2]), 1.0)]
#[case(false, Some(vec![2]), 1.0)]
#[case(true, Some(vec![1, 2, 3]), 1.0)]
#[case(false, Some(vec![1, 3]), 3.0)]
#[case(true, Some(vec![]), f64::INFINITY)]
#[case(false, Some(vec![]), f64::NEG_INFINITY)]
#[case(true, Some(vec![3]), f64::INFINITY)]
#[case(false, Some(vec![0, 3, 4]), f64::NEG_INFINITY)]
fn best_q_cases(#[case] minimize: bool, #[case] candidates: Option<Vec<u64>>, #[case] expected: f64) {
    let forest = three_labels();
    assert_eq!(forest.best_q(&[0.0], minimize, candidates.as_deref()), expected);
}

#[test]
fn best_q_on_empty_forest() {
    let forest = RefinementForest::new();
    assert_eq!(forest.best_q(&[0.0], true, None), f64::INFINITY);
    assert_eq!(forest.best_q(&[0.0], false, None), f64::NEG_INFINITY);
}

#[rstest]
#[case(1)]
#[case(10)]
#[case(u64::MAX)]
fn lookup_after_update_equals_leaf_mean(#[case] cap: u64) {
    let config = TreeConfig::builder().q_learn_rate(cap).build().unwrap();
    let mut forest = RefinementForest::from_config(&config);
    for (i, v) in [1.0, 5.0, 2.0, 8.0].into_iter().enumerate() {
        let outcome = forest.update(3, &[i as f64 * 0.01], v, 1.0, &config).unwrap();
        assert!(!outcome.is_split());
        let leaf = match outcome {
            UpdateOutcome::Observed { leaf } | UpdateOutcome::Rebalanced { leaf } => leaf,
            UpdateOutcome::Split { .. } => unreachable!(),
        };
        let predictor = forest.node(leaf).predictor().unwrap();
        assert_eq!(forest.lookup(3, &[0.0]).mean, predictor.value().mean());
    }
}
