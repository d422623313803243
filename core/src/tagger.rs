//! Part-of-speech tagging over a segmented sentence: HMM Viterbi, word-level
//! CRF, or the mixed policy that keeps the HMM for fully-known sentences and
//! falls back to the CRF when an out-of-vocabulary term shows up.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crf::CrfModel;
use crate::error::Result;
use crate::hmm::HmmModel;
use crate::model::Model;
use crate::segmenter::{TermInstance, WordType};

/// Tagging strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaggerKind {
    Mixed,
    Hmm,
    Crf,
    None,
}

/// Ordered POS tag strings, one per term of the sentence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PosTagInstance {
    tags: Vec<String>,
}

impl PosTagInstance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tags(tags: Vec<String>) -> Self {
        Self { tags }
    }

    pub fn push(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tag(&self, i: usize) -> &str {
        &self.tags[i]
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.tags.get(i).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|s| s.as_str())
    }
}

/// Tag forced on a term by its category when the model has no emission row.
fn category_tag(kind: WordType) -> Option<&'static str> {
    match kind {
        WordType::Number => Some("CD"),
        WordType::Punctuation => Some("PU"),
        WordType::Symbol => Some("PU"),
        WordType::English => Some("FW"),
        WordType::Chinese | WordType::Other => None,
    }
}

/// Sentence tagger bound to the models its strategy needs.
pub struct PosTagger {
    kind: TaggerKind,
    hmm: Option<Arc<HmmModel>>,
    crf: Option<Arc<CrfModel>>,
}

impl PosTagger {
    pub fn new(kind: TaggerKind, model: &Model) -> Result<Self> {
        let needs_hmm = matches!(kind, TaggerKind::Hmm | TaggerKind::Mixed);
        let needs_crf = matches!(kind, TaggerKind::Crf | TaggerKind::Mixed);
        Ok(Self {
            kind,
            hmm: needs_hmm.then(|| model.pos_hmm()).transpose()?,
            crf: needs_crf.then(|| model.pos_crf()).transpose()?,
        })
    }

    /// Tags a sentence. With `TaggerKind::None` every tag is empty.
    pub fn tag(&self, terms: &TermInstance) -> Result<PosTagInstance> {
        match self.kind {
            TaggerKind::None => Ok(PosTagInstance::from_tags(vec![
                String::new();
                terms.len()
            ])),
            TaggerKind::Hmm => self.tag_hmm(terms),
            TaggerKind::Crf => self.tag_crf(terms),
            TaggerKind::Mixed => {
                let hmm = self.hmm()?;
                let all_known = terms
                    .iter()
                    .all(|t| t.kind != WordType::Chinese || hmm.emission(&t.text).is_some());
                if all_known {
                    self.tag_hmm(terms)
                } else {
                    self.tag_crf(terms)
                }
            }
        }
    }

    fn hmm(&self) -> Result<&HmmModel> {
        self.hmm
            .as_deref()
            .ok_or_else(|| crate::error::Error::runtime("tagger has no hmm model"))
    }

    fn tag_hmm(&self, terms: &TermInstance) -> Result<PosTagInstance> {
        let hmm = self.hmm()?;

        let candidates: Vec<Vec<(usize, f32)>> = terms
            .iter()
            .map(|term| {
                if let Some(row) = hmm.emission(&term.text) {
                    return row
                        .iter()
                        .map(|(tag, cost)| (*tag as usize, *cost))
                        .collect();
                }
                if let Some(tag) = category_tag(term.kind).and_then(|t| hmm.tag_index(t)) {
                    return vec![(tag, hmm.oov_cost())];
                }
                // Out of vocabulary: every tag at the oov cost.
                Vec::new()
            })
            .collect();

        let path = hmm.decode(&candidates);
        Ok(PosTagInstance::from_tags(
            path.into_iter().map(|t| hmm.tag_name(t).to_string()).collect(),
        ))
    }

    fn tag_crf(&self, terms: &TermInstance) -> Result<PosTagInstance> {
        let crf = self
            .crf
            .as_deref()
            .ok_or_else(|| crate::error::Error::runtime("tagger has no crf model"))?;
        let path = crf.decode(terms.len(), |i| term_features(terms, i));
        Ok(PosTagInstance::from_tags(
            path.into_iter()
                .map(|t| crf.labels()[t].clone())
                .collect(),
        ))
    }
}

/// Sparse features for the term at `i`: the word, its neighbors, its first
/// and last characters and its category.
fn term_features(terms: &TermInstance, i: usize) -> Vec<String> {
    let word = &terms.term(i).text;
    let mut features = Vec::with_capacity(6);
    features.push(format!("W0:{}", word));
    if let Some(first) = word.chars().next() {
        features.push(format!("P:{}", first));
    }
    if let Some(last) = word.chars().last() {
        features.push(format!("S:{}", last));
    }
    features.push(format!("T:{}", terms.term(i).kind.code()));
    if i > 0 {
        features.push(format!("W-1:{}", terms.term(i - 1).text));
    }
    if let Some(next) = terms.get(i + 1) {
        features.push(format!("W1:{}", next.text));
    }
    features
}
