// crates/arbor-cli/src/main.rs

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, clippy::unwrap_used, clippy::expect_used)]

use anyhow::{bail, Context, Result};
use arbor_core::{LabelSet, Perturbation, StabilityStatus, Tier, Verdict};
use arbor_dataset::{read_dataset, Dataset};
use arbor_model::{read_classifier, Classifier, VotingScheme};
use arbor_verify::{AbstractDomain, StabilityAnalysis};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Minimum width of the concrete-labels column.
const LABELS_MIN_SIZE: usize = 16;

/// Floor for `--max-print-length`.
const MIN_PRINT_LENGTH: usize = 8;

#[derive(Parser, Debug)]
#[command(
    name = "arbor",
    about = "Stability verifier for decision trees and forests",
    long_about = "Stability verifier for decision trees and forests.\n\nFor every sample of the dataset, decides whether the classifier assigns the same labels to the whole adversarial region around it. Verdicts are sound: stable is a proof, unstable comes with a concrete counterexample.",
    version = env!("CARGO_PKG_VERSION"),
    disable_help_subcommand = true
)]
struct Cli {
    /// Path to the classifier file, in silva format
    classifier: PathBuf,

    /// Path to the dataset file (CSV or binary)
    dataset: PathBuf,

    /// Maximum number of characters to print for long path labels
    #[arg(long, default_value_t = 32)]
    max_print_length: usize,

    /// Voting scheme to use for forests
    #[arg(long, value_enum, default_value_t = VotingOpt::Max)]
    voting: VotingOpt,

    /// Abstract domain to use (interval is reserved)
    #[arg(long, value_enum, default_value_t = AbstractionOpt::Hyperrectangle)]
    abstraction: AbstractionOpt,

    /// Adversarial region: "l_inf <eps>", "l_inf-clip-all <eps> <lo> <hi>",
    /// or "from-file <path>"
    #[arg(long, num_args = 1..=4, value_name = "SPEC", allow_hyphen_values = true)]
    perturbation: Option<Vec<String>>,

    /// Per-sample wall-clock budget, in seconds
    #[arg(long, default_value_t = 1)]
    sample_timeout: u64,

    /// Seed for random number generation, reserved for future use
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Categorical-group vector file (one group id per feature, 0 = none)
    #[arg(long)]
    tier: Option<PathBuf>,

    /// Write the region of each unstable sample to this file
    #[arg(long)]
    counterexamples: Option<PathBuf>,

    /// Write per-sample records as JSON to this file
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Export the model's trees in Graphviz dot format to this path
    /// (forests get one numbered file per tree)
    #[arg(long)]
    export_dot: Option<PathBuf>,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum VotingOpt {
    /// One vote per tree to its argmax labels
    Max,
    /// Average of per-tree probabilities
    Average,
    /// Softargmax over summed logits
    Softargmax,
}

impl From<VotingOpt> for VotingScheme {
    fn from(opt: VotingOpt) -> Self {
        match opt {
            VotingOpt::Max => Self::Max,
            VotingOpt::Average => Self::Average,
            VotingOpt::Softargmax => Self::Softargmax,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, ValueEnum)]
enum AbstractionOpt {
    Interval,
    Hyperrectangle,
}

impl From<AbstractionOpt> for AbstractDomain {
    fn from(opt: AbstractionOpt) -> Self {
        match opt {
            AbstractionOpt::Interval => Self::Interval,
            AbstractionOpt::Hyperrectangle => Self::Hyperrectangle,
        }
    }
}

/// Per-sample record of the JSON report.
#[derive(Serialize)]
struct SampleRecord<'a> {
    id: usize,
    label: &'a str,
    predicted: Vec<&'a str>,
    verdict: Verdict,
    seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    witness: Option<&'a [f64]>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run(&cli)
}

/// Initialize tracing with an env-driven filter (default INFO).
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false).with_level(true).compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn run(cli: &Cli) -> Result<()> {
    debug!(seed = cli.seed, "prng seed (reserved)");

    let dataset = read_dataset(&cli.dataset)?;
    let mut classifier = read_classifier(&cli.classifier)?;
    classifier.set_voting(cli.voting.into());

    let n_features = classifier.n_features() as usize;
    if dataset.n_cols() != n_features {
        bail!(
            "dataset has {} columns but the classifier expects {n_features}",
            dataset.n_cols()
        );
    }

    if let Some(path) = &cli.export_dot {
        export_dot(path, &classifier)?;
    }

    let perturbation = parse_perturbation(cli.perturbation.as_deref())?;
    let tier = cli
        .tier
        .as_ref()
        .map(|path| Tier::from_file(path, n_features))
        .transpose()?;

    let analysis = StabilityAnalysis::new(
        &classifier,
        cli.abstraction.into(),
        tier,
        Duration::from_secs(cli.sample_timeout),
    )?;

    info!(
        classifier = %cli.classifier.display(),
        dataset = %cli.dataset.display(),
        samples = dataset.len(),
        "starting analysis"
    );

    let mut counterexamples = cli
        .counterexamples
        .as_ref()
        .map(|path| {
            File::create(path)
                .map(BufWriter::new)
                .with_context(|| format!("create {}", path.display()))
        })
        .transpose()?;

    let width = cli.max_print_length.max(MIN_PRINT_LENGTH);
    print_heading(width);

    let mut tally = Tally::default();
    let mut records = Vec::new();
    let run_start = Instant::now();

    for i in 0..dataset.len() {
        let sample = dataset.row(i);
        let truth = dataset.label(i);

        let sample_start = Instant::now();
        let status = analysis.analyze(sample, &perturbation)?;
        let seconds = sample_start.elapsed().as_secs_f64();

        let correct = is_correct(&classifier, &status.labels_a, truth);
        tally.record(correct, status.result);

        print_row(width, cli, i, truth, &classifier, &status, seconds);

        if let Some(w) = counterexamples.as_mut() {
            if let Some(region) = &status.region {
                writeln!(w, "{i}: {region}").context("write counterexample")?;
            }
        }

        if cli.report_json.is_some() {
            records.push(OwnedRecord::new(i, truth, &classifier, &status, seconds));
        }
    }

    tally.print_summary(&dataset, run_start.elapsed().as_secs_f64());

    if let Some(w) = counterexamples.as_mut() {
        w.flush().context("flush counterexamples")?;
    }
    if let Some(path) = &cli.report_json {
        write_report(path, &records)?;
    }
    Ok(())
}

/// Export every tree of the model as a dot file.
fn export_dot(path: &Path, classifier: &Classifier) -> Result<()> {
    use arbor_model::{write_tree_dot, DecisionTree};

    let write_one = |path: &Path, tree: &DecisionTree| -> Result<()> {
        let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(f);
        write_tree_dot(&mut w, tree)?;
        w.flush().context("flush dot file")?;
        Ok(())
    };

    match classifier {
        Classifier::Tree(tree) => write_one(path, tree)?,
        Classifier::Forest(forest) => {
            let stem = path.with_extension("");
            for (i, tree) in forest.trees().iter().enumerate() {
                let numbered = PathBuf::from(format!("{}-{i}.dot", stem.display()));
                write_one(&numbered, tree)?;
            }
        }
    }
    info!(path = %path.display(), "exported model in dot format");
    Ok(())
}

/// Parse the `--perturbation` value list; absent means `l_inf 0`.
fn parse_perturbation(spec: Option<&[String]>) -> Result<Perturbation> {
    let Some(spec) = spec else {
        return Ok(Perturbation::LInf { epsilon: 0.0 });
    };
    let parse = |s: &String, what: &str| -> Result<f64> {
        s.parse()
            .with_context(|| format!("invalid perturbation {what} {s:?}"))
    };
    match spec {
        [kind, eps] if kind == "l_inf" => Ok(Perturbation::LInf {
            epsilon: parse(eps, "radius")?,
        }),
        [kind, eps, lo, hi] if kind == "l_inf-clip-all" => Ok(Perturbation::LInfClipAll {
            epsilon: parse(eps, "radius")?,
            min: parse(lo, "lower clip")?,
            max: parse(hi, "upper clip")?,
        }),
        [kind, path] if kind == "from-file" => Perturbation::from_file(path),
        _ => bail!(
            "unsupported perturbation {:?}; use \"l_inf <eps>\", \"l_inf-clip-all <eps> <lo> <hi>\" or \"from-file <path>\"",
            spec.join(" ")
        ),
    }
}

/// Whether the concrete prediction is the (unique) ground-truth label.
fn is_correct(classifier: &Classifier, labels: &LabelSet, truth: &str) -> bool {
    labels.is_singleton()
        && classifier
            .labels()
            .iter()
            .position(|l| l == truth)
            .is_some_and(|i| labels.contains(i))
}

/// Last `width` characters of a path, with a leading ellipsis when cut.
fn shorten(path: &Path, width: usize) -> String {
    let text = path.display().to_string();
    let max = width.saturating_sub(3);
    if text.len() <= max {
        format!("{text:<width$}")
    } else {
        let cut: String = text.chars().skip(text.chars().count() - max).collect();
        format!("...{cut:<max$}")
    }
}

fn label_names<'a>(classifier: &'a Classifier, labels: &LabelSet) -> Vec<&'a str> {
    labels
        .iter()
        .map(|i| classifier.labels()[i].as_str())
        .collect()
}

fn print_heading(width: usize) {
    println!(
        "{:<width$} {:<width$} {:>8} {:>8} {:>LABELS_MIN_SIZE$} {:>10} {:>10}",
        "Classifier", "Dataset", "ID", "Label", "Concrete", "Result", "Time (s)"
    );
}

#[allow(clippy::too_many_arguments)]
fn print_row(
    width: usize,
    cli: &Cli,
    id: usize,
    truth: &str,
    classifier: &Classifier,
    status: &StabilityStatus,
    seconds: f64,
) {
    let concrete = label_names(classifier, &status.labels_a).join(",");
    let outcome = match (status.result, is_correct(classifier, &status.labels_a, truth)) {
        (Verdict::Stable, true) => "ROBUST",
        (Verdict::Stable, false) => "VULNERABLE",
        (Verdict::Unstable, true) => "FRAGILE",
        (Verdict::Unstable, false) => "BROKEN",
        (Verdict::Unknown, _) => "NO-INFO",
    };
    println!(
        "{} {} {id:>8} {truth:>8} {concrete:>LABELS_MIN_SIZE$} {outcome:>10} {seconds:>10.6}",
        shorten(&cli.classifier, width),
        shorten(&cli.dataset, width),
    );
}

/// Running counts of the summary line.
#[derive(Default)]
struct Tally {
    correct: usize,
    stable: usize,
    unstable: usize,
    robust: usize,
    fragile: usize,
}

impl Tally {
    fn record(&mut self, correct: bool, verdict: Verdict) {
        let stable = verdict == Verdict::Stable;
        let unstable = verdict == Verdict::Unstable;
        self.correct += usize::from(correct);
        self.stable += usize::from(stable);
        self.unstable += usize::from(unstable);
        self.robust += usize::from(correct && stable);
        self.fragile += usize::from(correct && unstable);
    }

    fn print_summary(&self, dataset: &Dataset, seconds: f64) {
        println!(
            "[SUMMARY] {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>10}",
            "Size", "Time (s)", "Correct", "Wrong", "Stable", "Unstable", "No info", "Robust",
            "Fragile", "Vulnerable", "Broken"
        );
        println!(
            "[SUMMARY] {:>10} {:>10.4} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>12} {:>10}",
            dataset.len(),
            seconds,
            self.correct,
            dataset.len() - self.correct,
            self.stable,
            self.unstable,
            dataset.len() - self.stable - self.unstable,
            self.robust,
            self.fragile,
            self.stable - self.robust,
            self.unstable - self.fragile
        );
    }
}

/// Owned twin of [`SampleRecord`], collected during the run.
struct OwnedRecord {
    id: usize,
    label: String,
    predicted: Vec<String>,
    verdict: Verdict,
    seconds: f64,
    witness: Option<Vec<f64>>,
}

impl OwnedRecord {
    fn new(
        id: usize,
        truth: &str,
        classifier: &Classifier,
        status: &StabilityStatus,
        seconds: f64,
    ) -> Self {
        Self {
            id,
            label: truth.to_owned(),
            predicted: label_names(classifier, &status.labels_a)
                .into_iter()
                .map(str::to_owned)
                .collect(),
            verdict: status.result,
            seconds,
            witness: status.sample_b.clone(),
        }
    }
}

fn write_report(path: &Path, records: &[OwnedRecord]) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);

    let borrowed: Vec<SampleRecord<'_>> = records
        .iter()
        .map(|r| SampleRecord {
            id: r.id,
            label: &r.label,
            predicted: r.predicted.iter().map(String::as_str).collect(),
            verdict: r.verdict,
            seconds: r.seconds,
            witness: r.witness.as_deref(),
        })
        .collect();
    serde_json::to_writer_pretty(&mut w, &borrowed).context("serialize JSON report")?;
    w.flush().context("flush JSON report")?;

    info!(path = %path.display(), records = records.len(), "wrote report");
    Ok(())
}
