//! Deterministic arc-eager dependency parsing: drive a sentence from the
//! initial to the terminal configuration, scoring each legal transition with
//! the perceptron over template-extracted features.
//!
//! Nivre, "Algorithms for deterministic incremental dependency parsing",
//! Computational Linguistics 34(4), 2008.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::perceptron::{FeatureSet, PerceptronModel};
use crate::segmenter::TermInstance;
use crate::state::{State, Transition};
use crate::tagger::PosTagInstance;
use crate::template::FeatureTemplate;

/// Dependency label given to nodes that end up attached to ROOT.
pub const ROOT_LABEL: &str = "HED";

/// Dependency parsing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepParserKind {
    ArcEager,
    None,
}

/// Parse result for one sentence: a head index and a label per token.
/// `None` as head means ROOT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeInstance {
    heads: Vec<Option<usize>>,
    labels: Vec<String>,
}

impl TreeInstance {
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Head token index of token `i`, `None` for ROOT.
    pub fn head(&self, i: usize) -> Option<usize> {
        self.heads[i]
    }

    pub fn label(&self, i: usize) -> &str {
        &self.labels[i]
    }
}

/// The arc-eager parser bound to its perceptron and feature template.
///
/// Holds a reusable feature buffer, so one instance must not be shared
/// between threads; open one parser per thread over the shared model.
pub struct ArcEagerParser {
    perceptron: Arc<PerceptronModel>,
    template: Arc<FeatureTemplate>,
    /// Transition per perceptron class, parsed from the class names.
    transitions: Vec<Transition>,
    feature_set: FeatureSet,
}

impl ArcEagerParser {
    pub fn new(model: &Model) -> Result<Self> {
        let perceptron = model.dependency_model()?;
        let template = model.dependency_template()?;
        let transitions = perceptron
            .classes()
            .iter()
            .map(|name| parse_class(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            perceptron,
            template,
            transitions,
            feature_set: FeatureSet::new(),
        })
    }

    /// Parses one tagged sentence into a dependency tree.
    pub fn parse(
        &mut self,
        terms: &TermInstance,
        tags: &PosTagInstance,
    ) -> Result<TreeInstance> {
        if terms.len() != tags.len() {
            return Err(Error::runtime(format!(
                "sentence has {} terms but {} tags",
                terms.len(),
                tags.len()
            )));
        }

        let n = terms.len();
        let mut state = State::new(n);
        while !state.is_terminal() && state.transition_count() < 2 * n {
            let transition = self.next(&state, terms, tags)?;
            trace!(?transition, step = state.transition_count(), "transition");
            state.apply(&transition)?;
        }
        Ok(Self::store_result(&state, n))
    }

    /// Predicts the next transition: the best-scoring legal one, with the
    /// shift-else-reduce fallback when nothing is legal to the scorer.
    fn next(
        &mut self,
        state: &State,
        terms: &TermInstance,
        tags: &PosTagInstance,
    ) -> Result<Transition> {
        self.template
            .extract(state, terms, tags, &mut self.feature_set)?;
        let allowed: Vec<bool> = self
            .transitions
            .iter()
            .map(|t| state.is_legal(t))
            .collect();
        match self.perceptron.best(&self.feature_set, &allowed) {
            Some(class) => Ok(self.transitions[class].clone()),
            None if !state.buffer_is_empty() => Ok(Transition::Shift),
            None => Ok(Transition::Reduce),
        }
    }

    /// Writes head and label per sentence position; nodes the transition
    /// sequence left headless attach to ROOT.
    fn store_result(state: &State, n: usize) -> TreeInstance {
        let mut heads = Vec::with_capacity(n);
        let mut labels = Vec::with_capacity(n);
        for node in state.token_nodes() {
            match node.head() {
                Some(0) | None => {
                    heads.push(None);
                    labels.push(if node.label().is_empty() {
                        ROOT_LABEL.to_string()
                    } else {
                        node.label().to_string()
                    });
                }
                Some(index) => {
                    heads.push(Some(index - 1));
                    labels.push(node.label().to_string());
                }
            }
        }
        TreeInstance { heads, labels }
    }
}

/// Maps a perceptron class name to a transition: `SHIFT`, `REDUCE`,
/// `LARC:<label>` or `RARC:<label>`.
fn parse_class(name: &str) -> Result<Transition> {
    if name == "SHIFT" {
        return Ok(Transition::Shift);
    }
    if name == "REDUCE" {
        return Ok(Transition::Reduce);
    }
    if let Some(label) = name.strip_prefix("LARC:") {
        return Ok(Transition::LeftArc(label.to_string()));
    }
    if let Some(label) = name.strip_prefix("RARC:") {
        return Ok(Transition::RightArc(label.to_string()));
    }
    Err(Error::corruption(format!(
        "dependency model class {:?} is not a transition",
        name
    )))
}
