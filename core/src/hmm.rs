//! HMM part-of-speech model: tag transition costs plus per-word emission
//! costs, decoded with Viterbi over a candidate lattice.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct HmmModel {
    tags: Vec<String>,
    /// Row-major [from * tags.len() + to], negative log probabilities.
    transitions: Vec<f32>,
    /// Word -> sparse (tag id, emission cost) rows.
    emissions: AHashMap<String, Vec<(u32, f32)>>,
    /// Emission cost assigned to out-of-vocabulary words.
    oov_cost: f32,
}

impl HmmModel {
    pub fn new(
        tags: Vec<String>,
        transitions: Vec<f32>,
        emissions: impl IntoIterator<Item = (String, Vec<(u32, f32)>)>,
        oov_cost: f32,
    ) -> Result<Self> {
        let model = Self {
            tags,
            transitions,
            emissions: emissions.into_iter().collect(),
            oov_cost,
        };
        model.validate("hmm model")?;
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        let model: Self = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::corruption(format!("{}: {}", path.display(), e)))?;
        model.validate(&path.display().to_string())?;
        Ok(model)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| Error::corruption(format!("{}: {}", path.display(), e)))
    }

    fn validate(&self, origin: &str) -> Result<()> {
        let n = self.tags.len();
        if n == 0 {
            return Err(Error::corruption(format!("{}: empty tag set", origin)));
        }
        if self.transitions.len() != n * n {
            return Err(Error::corruption(format!(
                "{}: transition matrix has {} entries for {} tags",
                origin,
                self.transitions.len(),
                n
            )));
        }
        for (word, row) in &self.emissions {
            for (tag, _) in row {
                if *tag as usize >= n {
                    return Err(Error::corruption(format!(
                        "{}: emission for {:?} names tag {} outside the tag set",
                        origin, word, tag
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn tag_name(&self, tag: usize) -> &str {
        &self.tags[tag]
    }

    pub fn tag_index(&self, tag: &str) -> Option<usize> {
        self.tags.iter().position(|t| t == tag)
    }

    pub fn oov_cost(&self) -> f32 {
        self.oov_cost
    }

    /// Emission row for a word, or `None` when the word is out of
    /// vocabulary.
    pub fn emission(&self, word: &str) -> Option<&[(u32, f32)]> {
        self.emissions.get(word).map(|row| row.as_slice())
    }

    pub fn transition(&self, from: usize, to: usize) -> f32 {
        self.transitions[from * self.tags.len() + to]
    }

    /// Minimum-cost Viterbi over a candidate lattice: one `(tag, cost)` list
    /// per position. Positions with an empty candidate list are treated as
    /// allowing every tag at the out-of-vocabulary cost.
    pub fn decode(&self, candidates: &[Vec<(usize, f32)>]) -> Vec<usize> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let all_tags: Vec<(usize, f32)> =
            (0..self.tags.len()).map(|t| (t, self.oov_cost)).collect();
        let rows: Vec<&[(usize, f32)]> = candidates
            .iter()
            .map(|row| {
                if row.is_empty() {
                    all_tags.as_slice()
                } else {
                    row.as_slice()
                }
            })
            .collect();

        let mut score: Vec<f32> = rows[0].iter().map(|(_, cost)| *cost).collect();
        let mut back: Vec<Vec<usize>> = vec![vec![0; score.len()]];

        for pos in 1..candidates.len() {
            let prev_row = rows[pos - 1];
            let cur_row = rows[pos];
            let mut next = Vec::with_capacity(cur_row.len());
            let mut from = Vec::with_capacity(cur_row.len());
            for (tag, emit) in cur_row {
                let mut best = f32::INFINITY;
                let mut best_prev = 0;
                for (i, (prev_tag, _)) in prev_row.iter().enumerate() {
                    let candidate = score[i] + self.transition(*prev_tag, *tag) + emit;
                    if candidate < best {
                        best = candidate;
                        best_prev = i;
                    }
                }
                next.push(best);
                from.push(best_prev);
            }
            score = next;
            back.push(from);
        }

        let mut best = 0;
        for (i, cost) in score.iter().enumerate() {
            if *cost < score[best] {
                best = i;
            }
        }

        let mut path = vec![0; candidates.len()];
        let mut at = best;
        for pos in (0..candidates.len()).rev() {
            path[pos] = rows[pos][at].0;
            at = back[pos][at];
        }
        path
    }
}
