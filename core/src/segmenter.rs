//! Word segmentation: carve a sentence into character-class runs, then
//! segment Chinese runs with one of four strategies (unigram lattice,
//! bigram lattice, character CRF, or the mixed policy that patches
//! out-of-vocabulary stretches of the bigram result with the CRF).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crf::CrfModel;
use crate::error::{Error, Result};
use crate::index::TermIndex;
use crate::model::Model;
use crate::ngram::{BigramCosts, UnigramCosts};
use crate::userdict::UserDict;

/// Longest dictionary word probed during lattice construction, in chars.
const MAX_WORD_CHARS: usize = 8;
/// Cost of an out-of-vocabulary single character edge.
const OOV_CHAR_COST: f32 = 32.0;
/// Penalty added to the word cost when a bigram transition is unobserved.
const BIGRAM_BACKOFF_COST: f32 = 8.0;

/// Token category, stable integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordType {
    Chinese,
    English,
    Number,
    Symbol,
    Punctuation,
    Other,
}

impl WordType {
    pub fn code(self) -> i32 {
        match self {
            WordType::Chinese => 0,
            WordType::English => 1,
            WordType::Number => 2,
            WordType::Symbol => 3,
            WordType::Punctuation => 4,
            WordType::Other => 5,
        }
    }
}

/// One segmented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub text: String,
    pub kind: WordType,
}

impl Term {
    pub fn new(text: impl Into<String>, kind: WordType) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Ordered token sequence produced by the segmenter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermInstance {
    terms: Vec<Term>,
}

impl TermInstance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, term: Term) {
        self.terms.push(term);
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Term> {
        self.terms.get(i)
    }

    pub fn term(&self, i: usize) -> &Term {
        &self.terms[i]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Term> {
        self.terms.iter()
    }
}

/// Segmentation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmenterKind {
    Mixed,
    Crf,
    Unigram,
    Bigram,
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}')
}

const PUNCTUATION: &str = "，。！？、；：…—·“”‘’《》〈〉（）【】「」『』.,!?;:\"'()[]{}";

fn char_class(c: char) -> Option<WordType> {
    if c.is_whitespace() {
        return None;
    }
    if is_cjk(c) {
        return Some(WordType::Chinese);
    }
    if c.is_ascii_alphabetic() || matches!(c, 'Ａ'..='Ｚ' | 'ａ'..='ｚ') {
        return Some(WordType::English);
    }
    if c.is_ascii_digit() || matches!(c, '０'..='９') {
        return Some(WordType::Number);
    }
    if PUNCTUATION.contains(c) {
        return Some(WordType::Punctuation);
    }
    if c.is_ascii_graphic() || matches!(c, '￥' | '＄' | '％' | '＋' | '－' | '＊' | '／' | '＝') {
        return Some(WordType::Symbol);
    }
    Some(WordType::Other)
}

/// One lattice edge: the word spanning `chars[start..end]`.
#[derive(Debug, Clone)]
struct Edge {
    start: usize,
    end: usize,
    /// Term id when the span is a dictionary word.
    id: Option<u32>,
    cost: f32,
}

/// Sentence segmenter bound to the artifacts its strategy needs.
pub struct TextSegmenter {
    kind: SegmenterKind,
    index: Option<Arc<TermIndex>>,
    unigram: Option<Arc<UnigramCosts>>,
    bigram: Option<Arc<BigramCosts>>,
    crf: Option<Arc<CrfModel>>,
    user: Option<Arc<UserDict>>,
}

impl TextSegmenter {
    /// Pulls the artifacts required by `kind` out of the model, triggering
    /// their lazy loads.
    pub fn new(kind: SegmenterKind, model: &Model) -> Result<Self> {
        let needs_lattice = matches!(
            kind,
            SegmenterKind::Unigram | SegmenterKind::Bigram | SegmenterKind::Mixed
        );
        let needs_bigram = matches!(kind, SegmenterKind::Bigram | SegmenterKind::Mixed);
        let needs_crf = matches!(kind, SegmenterKind::Crf | SegmenterKind::Mixed);

        Ok(Self {
            kind,
            index: needs_lattice.then(|| model.index()).transpose()?,
            unigram: needs_lattice.then(|| model.unigram_cost()).transpose()?,
            bigram: needs_bigram.then(|| model.bigram_cost()).transpose()?,
            crf: needs_crf.then(|| model.seg_crf()).transpose()?,
            user: if needs_lattice && model.has_user_dictionary() {
                Some(model.user_dictionary()?)
            } else {
                None
            },
        })
    }

    /// Segments one sentence into terms.
    pub fn segment(&self, sentence: &str) -> Result<TermInstance> {
        let mut out = TermInstance::new();
        let mut run: Vec<char> = Vec::new();
        let mut run_kind: Option<WordType> = None;

        for c in sentence.chars() {
            let class = char_class(c);
            if class != run_kind || matches!(class, Some(WordType::Punctuation | WordType::Symbol))
            {
                self.flush_run(&mut run, run_kind, &mut out)?;
                run_kind = class;
            }
            if class.is_some() {
                run.push(c);
            }
        }
        self.flush_run(&mut run, run_kind, &mut out)?;

        debug!(terms = out.len(), "segmented sentence");
        Ok(out)
    }

    fn flush_run(
        &self,
        run: &mut Vec<char>,
        kind: Option<WordType>,
        out: &mut TermInstance,
    ) -> Result<()> {
        if run.is_empty() {
            return Ok(());
        }
        let chars = std::mem::take(run);
        match kind {
            Some(WordType::Chinese) => self.segment_chinese(&chars, out)?,
            Some(kind) => out.push(Term::new(chars.into_iter().collect::<String>(), kind)),
            None => {}
        }
        Ok(())
    }

    fn segment_chinese(&self, chars: &[char], out: &mut TermInstance) -> Result<()> {
        match self.kind {
            SegmenterKind::Unigram => self.segment_unigram(chars, out),
            SegmenterKind::Bigram => self.segment_bigram(chars, out),
            SegmenterKind::Crf => self.segment_crf(chars, out),
            SegmenterKind::Mixed => self.segment_mixed(chars, out),
        }
    }

    /// Looks up a word, preferring the user dictionary over the built-in
    /// index.
    fn lookup(&self, word: &str) -> Option<(u32, f32)> {
        if let Some(user) = &self.user {
            if let Some(id) = user.index().search(word) {
                return Some((id, user.cost(id).unwrap_or(OOV_CHAR_COST)));
            }
        }
        let index = self.index.as_ref()?;
        let id = index.search(word)?;
        let cost = self
            .unigram
            .as_ref()
            .and_then(|costs| costs.cost(id))
            .unwrap_or(OOV_CHAR_COST);
        Some((id, cost))
    }

    /// All dictionary words starting at each position, plus a single-char
    /// fallback edge wherever no dictionary word covers the position.
    fn build_edges(&self, chars: &[char]) -> Vec<Edge> {
        let mut edges = Vec::new();
        for start in 0..chars.len() {
            let mut word = String::new();
            let mut covered_single = false;
            for end in (start + 1)..=chars.len().min(start + MAX_WORD_CHARS) {
                word.push(chars[end - 1]);
                if let Some((id, cost)) = self.lookup(&word) {
                    covered_single |= end == start + 1;
                    edges.push(Edge {
                        start,
                        end,
                        id: Some(id),
                        cost,
                    });
                }
            }
            if !covered_single {
                edges.push(Edge {
                    start,
                    end: start + 1,
                    id: None,
                    cost: OOV_CHAR_COST,
                });
            }
        }
        edges
    }

    fn emit_path(chars: &[char], edges: &[Edge], path: &[usize], out: &mut TermInstance) {
        for &e in path {
            let edge = &edges[e];
            let text: String = chars[edge.start..edge.end].iter().collect();
            out.push(Term::new(text, WordType::Chinese));
        }
    }

    /// Cheapest path through the lattice under per-word costs.
    fn segment_unigram(&self, chars: &[char], out: &mut TermInstance) -> Result<()> {
        let n = chars.len();
        let edges = self.build_edges(chars);

        let mut best = vec![f32::INFINITY; n + 1];
        let mut back: Vec<Option<usize>> = vec![None; n + 1];
        best[0] = 0.0;
        for (i, edge) in edges.iter().enumerate() {
            if best[edge.start].is_finite() {
                let cost = best[edge.start] + edge.cost;
                if cost < best[edge.end] {
                    best[edge.end] = cost;
                    back[edge.end] = Some(i);
                }
            }
        }

        let mut path = Vec::new();
        let mut pos = n;
        while pos > 0 {
            let e = back[pos].ok_or_else(|| {
                Error::runtime("segmentation lattice has no path to the sentence end")
            })?;
            path.push(e);
            pos = edges[e].start;
        }
        path.reverse();
        Self::emit_path(chars, &edges, &path, out);
        Ok(())
    }

    /// Viterbi over word pairs: the transition to a word is its observed
    /// bigram cost, or its unigram cost plus a backoff penalty.
    fn segment_bigram(&self, chars: &[char], out: &mut TermInstance) -> Result<()> {
        let n = chars.len();
        let edges = self.build_edges(chars);
        let bigram = self
            .bigram
            .as_ref()
            .ok_or_else(|| Error::runtime("bigram segmentation without a bigram cost table"))?;

        // Edge-level Viterbi; edges are in increasing start order already.
        let mut best = vec![f32::INFINITY; edges.len()];
        let mut back: Vec<Option<usize>> = vec![None; edges.len()];
        for i in 0..edges.len() {
            if edges[i].start == 0 {
                best[i] = edges[i].cost;
                continue;
            }
            for j in 0..edges.len() {
                if edges[j].end != edges[i].start || !best[j].is_finite() {
                    continue;
                }
                let transition = match (edges[j].id, edges[i].id) {
                    (Some(left), Some(right)) => bigram
                        .cost(left, right)
                        .unwrap_or(edges[i].cost + BIGRAM_BACKOFF_COST),
                    _ => edges[i].cost + BIGRAM_BACKOFF_COST,
                };
                let cost = best[j] + transition;
                if cost < best[i] {
                    best[i] = cost;
                    back[i] = Some(j);
                }
            }
        }

        let mut last: Option<usize> = None;
        for i in 0..edges.len() {
            if edges[i].end == n && best[i].is_finite() {
                match last {
                    Some(l) if best[l] <= best[i] => {}
                    _ => last = Some(i),
                }
            }
        }
        let mut path = Vec::new();
        let mut at = last.ok_or_else(|| {
            Error::runtime("segmentation lattice has no path to the sentence end")
        })?;
        loop {
            path.push(at);
            match back[at] {
                Some(prev) => at = prev,
                None => break,
            }
        }
        path.reverse();
        Self::emit_path(chars, &edges, &path, out);
        Ok(())
    }

    /// Character-level B/M/E/S labeling decoded by the segmentation CRF.
    fn segment_crf(&self, chars: &[char], out: &mut TermInstance) -> Result<()> {
        let crf = self
            .crf
            .as_ref()
            .ok_or_else(|| Error::runtime("crf segmentation without a crf model"))?;
        let (b, m, e, s) = match (
            crf.label_index("B"),
            crf.label_index("M"),
            crf.label_index("E"),
            crf.label_index("S"),
        ) {
            (Some(b), Some(m), Some(e), Some(s)) => (b, m, e, s),
            _ => {
                return Err(Error::corruption(
                    "segmentation crf must define the labels B, M, E and S",
                ))
            }
        };

        let path = crf.decode(chars.len(), |i| char_features(chars, i));

        let mut word = String::new();
        for (i, &label) in path.iter().enumerate() {
            let c = chars[i];
            if label == s {
                if !word.is_empty() {
                    out.push(Term::new(std::mem::take(&mut word), WordType::Chinese));
                }
                out.push(Term::new(c.to_string(), WordType::Chinese));
            } else if label == b {
                if !word.is_empty() {
                    out.push(Term::new(std::mem::take(&mut word), WordType::Chinese));
                }
                word.push(c);
            } else if label == m {
                word.push(c);
            } else if label == e {
                word.push(c);
                out.push(Term::new(std::mem::take(&mut word), WordType::Chinese));
            }
        }
        if !word.is_empty() {
            out.push(Term::new(word, WordType::Chinese));
        }
        Ok(())
    }

    /// Bigram segmentation, then maximal runs of out-of-vocabulary single
    /// characters are handed to the CRF.
    fn segment_mixed(&self, chars: &[char], out: &mut TermInstance) -> Result<()> {
        let mut lattice = TermInstance::new();
        self.segment_bigram(chars, &mut lattice)?;

        let is_oov_char =
            |term: &Term| term.text.chars().count() == 1 && self.lookup(&term.text).is_none();

        let mut i = 0;
        while i < lattice.len() {
            let mut j = i;
            while j < lattice.len() && is_oov_char(lattice.term(j)) {
                j += 1;
            }
            if j - i >= 2 {
                let span: Vec<char> = lattice.terms[i..j]
                    .iter()
                    .flat_map(|t| t.text.chars())
                    .collect();
                self.segment_crf(&span, out)?;
                i = j;
            } else {
                out.push(lattice.term(i).clone());
                i += 1;
            }
        }
        Ok(())
    }
}

/// Sparse features for the character at `i`: surrounding unigrams and the
/// two adjacent bigrams.
fn char_features(chars: &[char], i: usize) -> Vec<String> {
    let at = |k: isize| -> Option<char> {
        let pos = i as isize + k;
        if pos < 0 {
            None
        } else {
            chars.get(pos as usize).copied()
        }
    };

    let mut features = Vec::with_capacity(7);
    for k in -2isize..=2 {
        if let Some(c) = at(k) {
            features.push(format!("U{}:{}", k, c));
        }
    }
    if let Some(prev) = at(-1) {
        features.push(format!("B-1:{}{}", prev, chars[i]));
    }
    if let Some(next) = at(1) {
        features.push(format!("B0:{}{}", chars[i], next));
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_classes() {
        assert_eq!(char_class('我'), Some(WordType::Chinese));
        assert_eq!(char_class('a'), Some(WordType::English));
        assert_eq!(char_class('7'), Some(WordType::Number));
        assert_eq!(char_class('。'), Some(WordType::Punctuation));
        assert_eq!(char_class('+'), Some(WordType::Symbol));
        assert_eq!(char_class(' '), None);
    }

    #[test]
    fn word_type_codes_are_stable() {
        assert_eq!(WordType::Chinese.code(), 0);
        assert_eq!(WordType::English.code(), 1);
        assert_eq!(WordType::Number.code(), 2);
        assert_eq!(WordType::Symbol.code(), 3);
        assert_eq!(WordType::Punctuation.code(), 4);
        assert_eq!(WordType::Other.code(), 5);
    }

    #[test]
    fn char_feature_window() {
        let chars: Vec<char> = "我爱北".chars().collect();
        let features = char_features(&chars, 1);
        assert!(features.contains(&"U0:爱".to_string()));
        assert!(features.contains(&"U-1:我".to_string()));
        assert!(features.contains(&"B-1:我爱".to_string()));
        assert!(features.contains(&"B0:爱北".to_string()));
    }
}
