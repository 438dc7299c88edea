// crates/arbor-model/src/silva.rs

//! Loader for the silva text format.
//!
//! A decision tree is a header `classifier-decision-tree <n_features>
//! <n_labels>`, the label tokens, and a preorder stream of node tokens
//! (`LEAF c1 … cK`, `LEAF_LOGARITHMIC s1 … sK`, `SPLIT <feature>
//! <threshold>` followed by the left then the right subtree). A forest is
//! `classifier-forest <n_trees>` followed by that many trees. Forests load
//! with max voting; callers may override it afterwards.
//!
//! Parsing is iterative — the preorder stream of a deep model must not be
//! able to overflow the parser's stack — and errors carry the input line.

use crate::classifier::Classifier;
use crate::forest::{Forest, VotingScheme};
use crate::tree::{DecisionTree, NodeId, TreeBuilder};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Whitespace tokenizer that tracks the current input line for errors.
struct Tokenizer<'a> {
    rest: &'a str,
    line: u32,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text, line: 1 }
    }

    fn next(&mut self) -> Option<&'a str> {
        let mut chars = self.rest.char_indices();
        let start = loop {
            match chars.next() {
                Some((i, c)) if !c.is_whitespace() => break i,
                Some((_, '\n')) => self.line += 1,
                Some(_) => {}
                None => {
                    self.rest = "";
                    return None;
                }
            }
        };
        let tail = &self.rest[start..];
        let end = tail
            .char_indices()
            .find(|(_, c)| c.is_whitespace())
            .map_or(tail.len(), |(i, _)| i);
        self.rest = &tail[end..];
        Some(&tail[..end])
    }

    fn expect(&mut self, what: &str) -> Result<&'a str> {
        let line = self.line;
        self.next()
            .with_context(|| format!("line {line}: expected {what}, found end of input"))
    }

    fn parse<T: FromStr>(&mut self, what: &str) -> Result<T>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let token = self.expect(what)?;
        let line = self.line;
        token
            .parse()
            .with_context(|| format!("line {line}: invalid {what} {token:?}"))
    }
}

/// A split whose subtrees are still being parsed.
struct PendingSplit {
    feature: u32,
    threshold: f64,
    left: Option<NodeId>,
}

/// Parse one tree from the token stream (header included).
fn parse_tree(tok: &mut Tokenizer<'_>) -> Result<DecisionTree> {
    let header = tok.expect("classifier header")?;
    if header != "classifier-decision-tree" {
        bail!(
            "line {}: expected classifier-decision-tree, found {header:?}",
            tok.line
        );
    }
    let n_features: u32 = tok.parse("feature space size")?;
    let n_labels: usize = tok.parse("label count")?;
    if n_labels == 0 {
        bail!("line {}: a tree needs at least one label", tok.line);
    }

    let mut labels = Vec::with_capacity(n_labels);
    for _ in 0..n_labels {
        labels.push(tok.expect("label token")?.to_owned());
    }

    let mut builder = TreeBuilder::new();
    let mut pending: Vec<PendingSplit> = Vec::new();
    let mut root = None;

    // Preorder: every completed node attaches to the innermost pending
    // split; completing a right child completes the split itself, so
    // attachment bubbles upward without recursion.
    while root.is_none() {
        let token = tok.expect("node token")?;
        let line = tok.line;
        let mut node = match token {
            "LEAF" => {
                let mut counts = Vec::with_capacity(n_labels);
                for _ in 0..n_labels {
                    counts.push(tok.parse("leaf count")?);
                }
                builder.leaf_counts(counts)
            }
            "LEAF_LOGARITHMIC" => {
                let mut scores = Vec::with_capacity(n_labels);
                for _ in 0..n_labels {
                    scores.push(tok.parse("leaf score")?);
                }
                builder.leaf_logits(scores, 1.0)
            }
            "SPLIT" => {
                pending.push(PendingSplit {
                    feature: tok.parse("split feature index")?,
                    threshold: tok.parse("split threshold")?,
                    left: None,
                });
                continue;
            }
            other => bail!("line {line}: unknown node token {other:?}"),
        };

        loop {
            match pending.last_mut() {
                None => {
                    root = Some(node);
                    break;
                }
                Some(split) if split.left.is_none() => {
                    split.left = Some(node);
                    break;
                }
                Some(_) => {
                    let split = pending.pop().expect("pending split present");
                    let left = split.left.expect("left child present");
                    node = builder.split(split.feature, split.threshold, left, node);
                }
            }
        }
    }

    let root = root.expect("loop exits with a root");
    builder
        .build(root, n_features, labels)
        .with_context(|| format!("line {}: inconsistent decision tree", tok.line))
}

/// Parse a forest from the token stream (header included).
fn parse_forest(tok: &mut Tokenizer<'_>) -> Result<Forest> {
    let header = tok.expect("classifier header")?;
    if header != "classifier-forest" {
        bail!("line {}: expected classifier-forest, found {header:?}", tok.line);
    }
    let n_trees: usize = tok.parse("tree count")?;
    if n_trees == 0 {
        bail!("line {}: a forest needs at least one tree", tok.line);
    }

    let mut trees = Vec::with_capacity(n_trees);
    for i in 0..n_trees {
        trees.push(parse_tree(tok).with_context(|| format!("tree #{i}"))?);
    }
    Forest::new(trees, VotingScheme::Max)
}

/// Parse a classifier of either kind from silva text.
///
/// # Errors
/// Fails on malformed headers, node tokens, or arities; the message carries
/// the offending input line.
pub fn parse_classifier(text: &str) -> Result<Classifier> {
    let mut probe = Tokenizer::new(text);
    match probe.next() {
        Some("classifier-decision-tree") => {
            parse_tree(&mut Tokenizer::new(text)).map(Classifier::Tree)
        }
        Some("classifier-forest") => parse_forest(&mut Tokenizer::new(text)).map(Classifier::Forest),
        Some(other) => bail!("unsupported classifier type {other:?}"),
        None => bail!("empty classifier input"),
    }
}

/// Read and parse a classifier file.
///
/// # Errors
/// Propagates I/O failures and parse errors with the path as context.
pub fn read_classifier<P: AsRef<Path>>(path: P) -> Result<Classifier> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("read classifier {}", path.display()))?;
    parse_classifier(&text).with_context(|| format!("parse classifier {}", path.display()))
}
