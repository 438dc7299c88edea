//! Quantified properties: verdict soundness against sampled points, witness
//! correctness, determinism, and single-tree completeness.

use arbor_core::{AdversarialRegion, Perturbation, Verdict};
use arbor_model::{Classifier, DecisionTree, Forest, TreeBuilder, VotingScheme};
use arbor_verify::{AbstractDomain, StabilityAnalysis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

/// Sampled points per (model, epsilon) configuration in the soundness fuzz.
const FUZZ_POINTS: usize = 20_000;

fn labels3() -> Vec<String> {
    vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]
}

/// Small three-label tree with two levels of splits.
fn shrub(seed: u32) -> DecisionTree {
    let mut b = TreeBuilder::new();
    let l0 = b.leaf_counts(vec![8, 1, 1]);
    let l1 = b.leaf_counts(vec![1, 8, 1]);
    let l2 = b.leaf_counts(vec![1, 1, 8]);
    let lower = b.split(1 - seed % 2, 0.3, l0, l1);
    let root = b.split(seed % 2, -0.2, lower, l2);
    b.build(root, 2, labels3()).unwrap()
}

fn fixtures() -> Vec<Classifier> {
    vec![
        Classifier::Tree(shrub(0)),
        Classifier::Forest(Forest::new(vec![shrub(0), shrub(1)], VotingScheme::Max).unwrap()),
        Classifier::Forest(Forest::new(vec![shrub(0), shrub(1)], VotingScheme::Average).unwrap()),
        Classifier::Forest(
            Forest::new(vec![shrub(0), shrub(1), shrub(0)], VotingScheme::Max).unwrap(),
        ),
    ]
}

fn analyze(classifier: &Classifier, sample: &[f64], epsilon: f64) -> arbor_core::StabilityStatus {
    StabilityAnalysis::new(classifier, AbstractDomain::Hyperrectangle, None, TIMEOUT)
        .unwrap()
        .analyze(sample, &Perturbation::LInf { epsilon })
        .unwrap()
}

/// A stable verdict must survive heavy point sampling of the region, and an
/// unstable verdict must come with a valid witness.
#[test]
fn verdicts_are_sound_under_sampling() {
    let mut rng = StdRng::seed_from_u64(0xa5b0);
    let samples: [[f64; 2]; 3] = [[0.0, 0.0], [-0.5, 0.6], [0.31, -0.19]];

    for classifier in fixtures() {
        for sample in &samples {
            for epsilon in [0.01, 0.05, 0.2, 0.7] {
                let status = analyze(&classifier, sample, epsilon);
                let perturbation = Perturbation::LInf { epsilon };
                let region = AdversarialRegion {
                    sample,
                    perturbation: &perturbation,
                }
                .to_hyperrectangle();

                match status.result {
                    Verdict::Stable => {
                        for _ in 0..FUZZ_POINTS {
                            let y = region.sample(&mut rng);
                            assert_eq!(
                                classifier.classify(&y),
                                status.labels_a,
                                "stable verdict refuted at {y:?} (eps {epsilon})"
                            );
                        }
                    }
                    Verdict::Unstable => {
                        let witness = status.sample_b.as_ref().unwrap();
                        assert!(region.contains(witness), "witness {witness:?} escapes region");
                        assert_ne!(
                            classifier.classify(witness),
                            status.labels_a,
                            "witness {witness:?} does not disagree"
                        );
                        let cell = status.region.as_ref().unwrap();
                        assert!(cell.contains(witness));
                    }
                    Verdict::Unknown => panic!("budget is generous; unknown unexpected"),
                }
            }
        }
    }
}

/// Identical inputs give identical verdicts and witnesses.
#[test]
fn repeated_runs_are_deterministic() {
    for classifier in fixtures() {
        for epsilon in [0.05, 0.2, 0.7] {
            let first = analyze(&classifier, &[0.0, 0.0], epsilon);
            let second = analyze(&classifier, &[0.0, 0.0], epsilon);
            assert_eq!(first.result, second.result);
            assert_eq!(first.sample_b, second.sample_b);
            assert_eq!(first.region, second.region);
        }
    }
}

/// The single-tree path is complete: no budget, no unknown.
#[test]
fn single_tree_never_answers_unknown() {
    let classifier = Classifier::Tree(shrub(0));
    let analysis = StabilityAnalysis::new(
        &classifier,
        AbstractDomain::Hyperrectangle,
        None,
        Duration::ZERO,
    )
    .unwrap();

    for epsilon in [0.0, 0.01, 0.1, 0.5, 1.0, 5.0] {
        let status = analysis
            .analyze(&[0.1, 0.1], &Perturbation::LInf { epsilon })
            .unwrap();
        assert_ne!(status.result, Verdict::Unknown, "epsilon {epsilon}");
    }
}

/// Explicit from-file regions behave like their inline counterparts.
#[test]
fn explicit_region_matches_inline_region() {
    let classifier = Classifier::Tree(shrub(0));
    let inline = analyze(&classifier, &[0.0, 0.0], 0.7);

    let dir = std::env::temp_dir().join("arbor-explicit-region-test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("region.txt");
    std::fs::write(&path, "[-0.7;0.7] [-0.7;0.7]\n").unwrap();

    let explicit = Perturbation::from_file(&path).unwrap();
    let status = StabilityAnalysis::new(&classifier, AbstractDomain::Hyperrectangle, None, TIMEOUT)
        .unwrap()
        .analyze(&[0.0, 0.0], &explicit)
        .unwrap();

    assert_eq!(status.result, inline.result);
    assert_eq!(status.sample_b, inline.sample_b);
}
