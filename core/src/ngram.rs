//! Unigram and bigram cost tables for lattice segmentation.
//!
//! Costs are negative log probabilities: lower is better. The unigram table
//! is a flat array indexed by term id; the bigram table is keyed by two term
//! ids packed into an `i64`.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Packs a word pair into the bigram table key.
pub fn pack_bigram_key(left: u32, right: u32) -> i64 {
    ((left as i64) << 32) | right as i64
}

/// Flat cost array indexed by term id.
#[derive(Debug, Serialize, Deserialize)]
pub struct UnigramCosts {
    costs: Vec<f32>,
}

impl UnigramCosts {
    pub fn from_vec(costs: Vec<f32>) -> Self {
        Self { costs }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::corruption(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| Error::corruption(format!("{}: {}", path.display(), e)))
    }

    /// Cost for a term id, or `None` when the id is out of range.
    pub fn cost(&self, term_id: u32) -> Option<f32> {
        self.costs.get(term_id as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}

/// Word-pair transition costs keyed by packed term-id pairs.
#[derive(Debug, Serialize, Deserialize)]
pub struct BigramCosts {
    costs: AHashMap<i64, f32>,
}

impl BigramCosts {
    pub fn from_entries(entries: impl IntoIterator<Item = ((u32, u32), f32)>) -> Self {
        let costs = entries
            .into_iter()
            .map(|((left, right), cost)| (pack_bigram_key(left, right), cost))
            .collect();
        Self { costs }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        bincode::deserialize_from(BufReader::new(file))
            .map_err(|e| Error::corruption(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| Error::io(path, e))?;
        bincode::serialize_into(BufWriter::new(file), self)
            .map_err(|e| Error::corruption(format!("{}: {}", path.display(), e)))
    }

    /// Transition cost for `left` followed by `right`, if observed.
    pub fn cost(&self, left: u32, right: u32) -> Option<f32> {
        self.costs.get(&pack_bigram_key(left, right)).copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}
