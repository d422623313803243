//! Linear-chain CRF model with Viterbi decoding.
//!
//! One model type serves both consumers: character-level segmentation
//! (B/M/E/S labels) and word-level part-of-speech tagging. The model stores
//! per-label weights for sparse string features plus a dense label-to-label
//! transition matrix; decoding maximizes the summed score.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
pub struct CrfModel {
    labels: Vec<String>,
    /// Feature string -> per-label weight row, row length == labels.len().
    weights: AHashMap<String, Vec<f32>>,
    /// Row-major [from * labels.len() + to].
    transitions: Vec<f32>,
}

impl CrfModel {
    pub fn new(
        labels: Vec<String>,
        weights: impl IntoIterator<Item = (String, Vec<f32>)>,
        transitions: Vec<f32>,
    ) -> Result<Self> {
        let model = Self {
            labels,
            weights: weights.into_iter().collect(),
            transitions,
        };
        model.validate("crf model")?;
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
        let n = self.labels.len();
        if n == 0 {
            return Err(Error::corruption(format!("{}: empty label set", origin)));
        }
        if self.transitions.len() != n * n {
            return Err(Error::corruption(format!(
                "{}: transition matrix has {} entries for {} labels",
                origin,
                self.transitions.len(),
                n
            )));
        }
        for (feature, row) in &self.weights {
            if row.len() != n {
                return Err(Error::corruption(format!(
                    "{}: weight row for feature {:?} has {} entries for {} labels",
                    origin,
                    feature,
                    row.len(),
                    n
                )));
            }
        }
        Ok(())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    fn transition(&self, from: usize, to: usize) -> f32 {
        self.transitions[from * self.labels.len() + to]
    }

    /// Summed emission score of `features` for one label.
    fn emission(&self, features: &[String], label: usize) -> f32 {
        features
            .iter()
            .filter_map(|f| self.weights.get(f))
            .map(|row| row[label])
            .sum()
    }

    /// Viterbi decode over `len` positions. `features_at` yields the sparse
    /// feature strings for one position. Returns the best label path.
    pub fn decode<F>(&self, len: usize, mut features_at: F) -> Vec<usize>
    where
        F: FnMut(usize) -> Vec<String>,
    {
        let n = self.labels.len();
        if len == 0 {
            return Vec::new();
        }

        let mut score = vec![0.0f32; n];
        let mut back: Vec<Vec<usize>> = Vec::with_capacity(len);

        let first = features_at(0);
        for (label, slot) in score.iter_mut().enumerate() {
            *slot = self.emission(&first, label);
        }
        back.push(vec![0; n]);

        for pos in 1..len {
            let features = features_at(pos);
            let mut next = vec![f32::NEG_INFINITY; n];
            let mut from = vec![0; n];
            for to in 0..n {
                let emit = self.emission(&features, to);
                for (prev, prev_score) in score.iter().enumerate() {
                    let candidate = prev_score + self.transition(prev, to) + emit;
                    if candidate > next[to] {
                        next[to] = candidate;
                        from[to] = prev;
                    }
                }
            }
            score = next;
            back.push(from);
        }

        let mut best = 0;
        for (label, s) in score.iter().enumerate() {
            if *s > score[best] {
                best = label;
            }
        }

        let mut path = vec![0; len];
        path[len - 1] = best;
        for pos in (1..len).rev() {
            path[pos - 1] = back[pos][path[pos]];
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_label_model() -> CrfModel {
        // Labels A, B; feature "x" votes for A, "y" votes for B.
        CrfModel::new(
            vec!["A".into(), "B".into()],
            [
                ("x".to_string(), vec![2.0, 0.0]),
                ("y".to_string(), vec![0.0, 2.0]),
            ],
            vec![0.0, 0.0, 0.0, 0.0],
        )
        .expect("valid model")
    }

    #[test]
    fn decode_follows_emissions() {
        let model = two_label_model();
        let feats = [vec!["x".to_string()], vec!["y".to_string()], vec!["x".to_string()]];
        let path = model.decode(3, |i| feats[i].clone());
        assert_eq!(path, vec![0, 1, 0]);
    }

    #[test]
    fn decode_honors_transition_weights() {
        // Emissions are silent; a strong A->B transition must win over A->A.
        let model = CrfModel::new(
            vec!["A".into(), "B".into()],
            std::iter::once(("x".to_string(), vec![1.0, 0.0])),
            vec![-5.0, 3.0, 0.0, 0.0],
        )
        .expect("valid model");
        let path = model.decode(2, |_| vec!["x".to_string()]);
        assert_eq!(path[0], 0, "first position should follow the emission");
        assert_eq!(path[1], 1, "transition weight should flip the second position");
    }

    #[test]
    fn mismatched_weight_row_is_corruption() {
        let result = CrfModel::new(
            vec!["A".into(), "B".into()],
            std::iter::once(("x".to_string(), vec![1.0])),
            vec![0.0; 4],
        );
        assert!(matches!(result, Err(Error::Corruption(_))));
    }
}
