//! Averaged-perceptron multi-class scorer over sparse string features, and
//! the bounded feature buffer filled by the template evaluator.
//!
//! The artifact is a file pair sharing one prefix: `<prefix>.idx` is an FST
//! map from feature string to feature id, `<prefix>.bin` holds the class
//! names and the dense weight matrix (feature-major).

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::index::TermIndex;

/// Upper bound on the number of features one configuration may produce.
pub const FEATURE_MAX: usize = 50;
/// Upper bound on the byte length of one feature string.
pub const FEATURE_SIZE_MAX: usize = 1000;

/// Bounded buffer of feature strings for one parser configuration.
#[derive(Debug, Default)]
pub struct FeatureSet {
    items: Vec<String>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(FEATURE_MAX),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Appends a feature string. Fails when the buffer is full.
    pub fn push(&mut self, feature: String) -> Result<()> {
        if self.items.len() >= FEATURE_MAX {
            return Err(Error::runtime(format!(
                "feature set is full ({} features)",
                FEATURE_MAX
            )));
        }
        debug_assert!(feature.len() <= FEATURE_SIZE_MAX);
        self.items.push(feature);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&str> {
        self.items.get(i).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|s| s.as_str())
    }
}

#[derive(Serialize, Deserialize)]
struct PerceptronData {
    classes: Vec<String>,
    /// Feature-major: weights[feature_id * classes.len() + class].
    weights: Vec<f32>,
}

/// Linear multi-class model: feature index + dense weight matrix.
#[derive(Debug)]
pub struct PerceptronModel {
    features: TermIndex,
    classes: Vec<String>,
    weights: Vec<f32>,
}

impl PerceptronModel {
    /// Loads `<prefix>.idx` and `<prefix>.bin`.
    pub fn open(prefix: impl AsRef<Path>) -> Result<Self> {
        let prefix = prefix.as_ref();
        let idx_path = prefix.with_extension("idx");
        let bin_path = prefix.with_extension("bin");

        let features = TermIndex::open(&idx_path)?;
        let file = File::open(&bin_path).map_err(|e| Error::io(&bin_path, e))?;
        let data: PerceptronData = bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::corruption(format!("{}: {}", bin_path.display(), e)))?;

        Self::assemble(features, data, &bin_path.display().to_string())
    }

    /// Builds a model in memory from per-feature weight rows.
    pub fn from_weights(
        classes: Vec<String>,
        rows: impl IntoIterator<Item = (String, Vec<f32>)>,
    ) -> Result<Self> {
        let rows: Vec<(String, Vec<f32>)> = rows.into_iter().collect();
        let pairs: Vec<(&str, u32)> = rows
            .iter()
            .enumerate()
            .map(|(id, (feature, _))| (feature.as_str(), id as u32))
            .collect();
        let features = TermIndex::from_pairs(&pairs)?;

        let mut weights = vec![0.0f32; rows.len() * classes.len()];
        for (id, (feature, row)) in rows.iter().enumerate() {
            if row.len() != classes.len() {
                return Err(Error::corruption(format!(
                    "weight row for feature {:?} has {} entries for {} classes",
                    feature,
                    row.len(),
                    classes.len()
                )));
            }
            weights[id * classes.len()..(id + 1) * classes.len()].copy_from_slice(row);
        }

        Self::assemble(features, PerceptronData { classes, weights }, "perceptron")
    }

    fn assemble(features: TermIndex, data: PerceptronData, origin: &str) -> Result<Self> {
        if data.classes.is_empty() {
            return Err(Error::corruption(format!("{}: empty class set", origin)));
        }
        if data.weights.len() != features.len() * data.classes.len() {
            return Err(Error::corruption(format!(
                "{}: {} weights for {} features x {} classes",
                origin,
                data.weights.len(),
                features.len(),
                data.classes.len()
            )));
        }
        Ok(Self {
            features,
            classes: data.classes,
            weights: data.weights,
        })
    }

    /// Writes the `<prefix>.idx` / `<prefix>.bin` pair.
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<()> {
        let prefix = prefix.as_ref();
        let bin_path = prefix.with_extension("bin");
        self.features.save(prefix.with_extension("idx"))?;
        let file = File::create(&bin_path).map_err(|e| Error::io(&bin_path, e))?;
        bincode::serialize_into(
            BufWriter::new(file),
            &PerceptronData {
                classes: self.classes.clone(),
                weights: self.weights.clone(),
            },
        )
        .map_err(|e| Error::corruption(format!("{}: {}", bin_path.display(), e)))
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Scores every class for a feature set.
    pub fn score(&self, features: &FeatureSet) -> Vec<f32> {
        let n = self.classes.len();
        let mut scores = vec![0.0f32; n];
        for feature in features.iter() {
            if let Some(id) = self.features.search(feature) {
                let row = &self.weights[id as usize * n..(id as usize + 1) * n];
                for (slot, w) in scores.iter_mut().zip(row) {
                    *slot += w;
                }
            }
        }
        scores
    }

    /// Arg-max over classes with `allowed[class] == true`. Ties break toward
    /// the smaller class id. `None` when no class is allowed.
    pub fn best(&self, features: &FeatureSet, allowed: &[bool]) -> Option<usize> {
        let scores = self.score(features);
        let mut best: Option<usize> = None;
        for (class, score) in scores.iter().enumerate() {
            if !allowed.get(class).copied().unwrap_or(false) {
                continue;
            }
            match best {
                Some(b) if scores[b] >= *score => {}
                _ => best = Some(class),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature_set(features: &[&str]) -> FeatureSet {
        let mut set = FeatureSet::new();
        for f in features {
            set.push(f.to_string()).expect("under the feature cap");
        }
        set
    }

    fn toy_model() -> PerceptronModel {
        PerceptronModel::from_weights(
            vec!["a".into(), "b".into(), "c".into()],
            [
                ("f1".to_string(), vec![1.0, 3.0, 0.0]),
                ("f2".to_string(), vec![1.0, -4.0, 2.0]),
            ],
        )
        .expect("valid model")
    }

    #[test]
    fn best_is_argmax_over_summed_rows() {
        let model = toy_model();
        let features = feature_set(&["f1", "f2"]);
        // a: 2.0, b: -1.0, c: 2.0 -> tie between a and c, smaller id wins.
        assert_eq!(model.best(&features, &[true, true, true]), Some(0));
    }

    #[test]
    fn mask_excludes_classes() {
        let model = toy_model();
        let features = feature_set(&["f1"]);
        assert_eq!(model.best(&features, &[true, false, true]), Some(0));
        assert_eq!(model.best(&features, &[false, false, false]), None);
    }

    #[test]
    fn unknown_features_score_zero() {
        let model = toy_model();
        let features = feature_set(&["missing"]);
        assert_eq!(model.score(&features), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn feature_set_enforces_capacity() {
        let mut set = FeatureSet::new();
        for i in 0..FEATURE_MAX {
            set.push(format!("f{}", i)).expect("under the cap");
        }
        assert!(set.push("overflow".to_string()).is_err());
        assert_eq!(set.len(), FEATURE_MAX);
    }

    #[test]
    fn open_save_roundtrip() {
        let dir = std::env::temp_dir();
        let prefix = dir.join(format!(
            "zhparse_dep_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let model = toy_model();
        model.save(&prefix).expect("save");

        let loaded = PerceptronModel::open(&prefix).expect("open");
        assert_eq!(loaded.classes(), model.classes());
        let features = feature_set(&["f1", "f2"]);
        assert_eq!(loaded.score(&features), model.score(&features));

        let _ = std::fs::remove_file(prefix.with_extension("idx"));
        let _ = std::fs::remove_file(prefix.with_extension("bin"));
    }
}
