//! End-to-end verdict scenarios over small hand-built models.

use arbor_core::{Perturbation, Tier, Verdict};
use arbor_model::{Classifier, DecisionTree, Forest, TreeBuilder, VotingScheme};
use arbor_verify::{AbstractDomain, StabilityAnalysis};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

fn labels2() -> Vec<String> {
    vec!["neg".to_owned(), "pos".to_owned()]
}

/// One split on `feature` at `threshold`; left leaf votes label 0, right
/// leaf votes label 1.
fn stump(feature: u32, threshold: f64, n_features: u32) -> DecisionTree {
    let mut b = TreeBuilder::new();
    let left = b.leaf_counts(vec![10, 0]);
    let right = b.leaf_counts(vec![0, 10]);
    let root = b.split(feature, threshold, left, right);
    b.build(root, n_features, labels2()).unwrap()
}

fn analyze(
    classifier: &Classifier,
    tier: Option<Tier>,
    timeout: Duration,
    sample: &[f64],
    perturbation: &Perturbation,
) -> arbor_core::StabilityStatus {
    StabilityAnalysis::new(classifier, AbstractDomain::Hyperrectangle, tier, timeout)
        .unwrap()
        .analyze(sample, perturbation)
        .unwrap()
}

#[test]
fn single_tree_small_ball_is_stable() {
    let classifier = Classifier::Tree(stump(0, 0.5, 1));
    let status = analyze(
        &classifier,
        None,
        TIMEOUT,
        &[0.0],
        &Perturbation::LInf { epsilon: 0.1 },
    );
    assert_eq!(status.result, Verdict::Stable);
    assert!(status.sample_b.is_none());
}

#[test]
fn single_tree_crossing_ball_is_unstable_with_witness() {
    let classifier = Classifier::Tree(stump(0, 0.5, 1));
    let status = analyze(
        &classifier,
        None,
        TIMEOUT,
        &[0.0],
        &Perturbation::LInf { epsilon: 0.6 },
    );
    assert_eq!(status.result, Verdict::Unstable);
    let witness = status.sample_b.as_ref().unwrap();
    assert!(witness[0] > 0.5 && witness[0] <= 0.6, "witness {witness:?}");
    assert_ne!(classifier.classify(witness), status.labels_a);
}

#[test]
fn duplicated_tree_ensemble_matches_the_single_tree() {
    let forest = Forest::new(vec![stump(0, 0.5, 1), stump(0, 0.5, 1)], VotingScheme::Max).unwrap();
    let classifier = Classifier::Forest(forest);
    let tree = Classifier::Tree(stump(0, 0.5, 1));

    for epsilon in [0.05, 0.1, 0.3, 0.6, 0.9] {
        let p = Perturbation::LInf { epsilon };
        let ensemble_verdict = analyze(&classifier, None, TIMEOUT, &[0.0], &p).result;
        let tree_verdict = analyze(&tree, None, TIMEOUT, &[0.0], &p).result;
        assert_eq!(ensemble_verdict, tree_verdict, "epsilon {epsilon}");
    }
}

/// Two max-voting trees on orthogonal features whose right leaves tie: three
/// of the four joint cells keep the origin's label set, the fourth widens it.
#[test]
fn one_disagreeing_joint_cell_is_found() {
    fn tree_with_tied_right(feature: u32) -> DecisionTree {
        let mut b = TreeBuilder::new();
        let left = b.leaf_counts(vec![10, 0]);
        let right = b.leaf_counts(vec![5, 5]);
        let root = b.split(feature, 0.25, left, right);
        b.build(root, 2, labels2()).unwrap()
    }

    let forest = Forest::new(
        vec![tree_with_tied_right(0), tree_with_tied_right(1)],
        VotingScheme::Max,
    )
    .unwrap();
    let classifier = Classifier::Forest(forest);

    let status = analyze(
        &classifier,
        None,
        TIMEOUT,
        &[0.0, 0.0],
        &Perturbation::LInf { epsilon: 0.4 },
    );
    assert_eq!(status.result, Verdict::Unstable);

    let witness = status.sample_b.as_ref().unwrap();
    // The only disagreeing cell has both features past their thresholds.
    assert!(witness[0] > 0.25 && witness[1] > 0.25, "witness {witness:?}");
    assert_ne!(classifier.classify(witness), status.labels_a);
}

#[test]
fn softargmax_tree_strictly_inside_one_side_is_stable() {
    let mut b = TreeBuilder::new();
    let left = b.leaf_logits(vec![3.0_f64.ln(), 1.0_f64.ln()], 1.0);
    let right = b.leaf_logits(vec![1.0_f64.ln(), 3.0_f64.ln()], 1.0);
    let root = b.split(0, 0.5, left, right);
    let tree = b.build(root, 1, labels2()).unwrap();
    let forest = Forest::new(vec![tree], VotingScheme::Softargmax).unwrap();
    let classifier = Classifier::Forest(forest);

    let status = analyze(
        &classifier,
        None,
        TIMEOUT,
        &[0.8],
        &Perturbation::LInf { epsilon: 0.1 },
    );
    assert!(status.labels_a.contains(1));
    assert_eq!(status.result, Verdict::Stable);
}

/// A one-hot group: the disagreeing leaf needs two group members active at
/// once, which the tier adjustment rules out. Without the tier the raw box
/// does contain such (invalidly encoded) points.
#[test]
fn tier_rules_out_counterfeit_encodings() {
    let mut b = TreeBuilder::new();
    let calm = b.leaf_counts(vec![10, 0]);
    let inner_left = b.leaf_counts(vec![10, 0]);
    let inner_right = b.leaf_counts(vec![0, 10]);
    let inner = b.split(2, 0.5, inner_left, inner_right);
    let root = b.split(1, 0.5, calm, inner);
    let tree = b.build(root, 4, labels2()).unwrap();
    let forest = Forest::new(vec![tree], VotingScheme::Max).unwrap();
    let classifier = Classifier::Forest(forest);

    let sample = [0.0, 1.0, 0.0, 0.0];
    let p = Perturbation::LInf { epsilon: 1.0 };

    let with_tier = analyze(
        &classifier,
        Some(Tier::new(vec![1, 1, 1, 1])),
        TIMEOUT,
        &sample,
        &p,
    );
    assert_eq!(with_tier.result, Verdict::Stable);

    let without_tier = analyze(&classifier, None, TIMEOUT, &sample, &p);
    assert_eq!(without_tier.result, Verdict::Unstable);
}

#[test]
fn zero_timeout_on_an_ensemble_is_unknown_without_witness() {
    let forest = Forest::new(vec![stump(0, 0.5, 1), stump(0, 0.5, 1)], VotingScheme::Max).unwrap();
    let classifier = Classifier::Forest(forest);

    let status = analyze(
        &classifier,
        None,
        Duration::ZERO,
        &[0.0],
        &Perturbation::LInf { epsilon: 0.6 },
    );
    assert_eq!(status.result, Verdict::Unknown);
    assert!(status.sample_b.is_none());
    assert!(status.region.is_none());
}

#[test]
fn clipped_empty_region_is_trivially_stable() {
    let classifier = Classifier::Tree(stump(0, 0.5, 1));
    let status = analyze(
        &classifier,
        None,
        TIMEOUT,
        &[5.0],
        &Perturbation::LInfClipAll {
            epsilon: 0.1,
            min: 0.0,
            max: 1.0,
        },
    );
    assert_eq!(status.result, Verdict::Stable);
}

#[test]
fn interval_domain_is_rejected() {
    let classifier = Classifier::Tree(stump(0, 0.5, 1));
    assert!(StabilityAnalysis::new(&classifier, AbstractDomain::Interval, None, TIMEOUT).is_err());
}
