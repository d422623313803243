//! Term index: byte-string to term-id lookup backed by an FST map.
//!
//! The same structure serves the built-in unigram index, the OOV property
//! index, the stopword set and the user dictionary index. On disk it is a
//! plain FST image; in memory it can be built from `(term, id)` pairs.

use std::collections::BTreeMap;
use std::path::Path;

use fst::{Map, MapBuilder};

use crate::error::{Error, Result};

/// Read-only map from term text to a non-negative term id.
#[derive(Debug)]
pub struct TermIndex {
    map: Map<Vec<u8>>,
}

impl TermIndex {
    /// Load an index from an FST image on disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let map = Map::new(bytes)
            .map_err(|e| Error::corruption(format!("{}: {}", path.display(), e)))?;
        Ok(Self { map })
    }

    /// Build an index from `(term, id)` pairs. Input order is irrelevant;
    /// duplicate terms keep the id seen first.
    pub fn from_pairs<S: AsRef<str>>(pairs: &[(S, u32)]) -> Result<Self> {
        let mut sorted = BTreeMap::new();
        for (term, id) in pairs {
            sorted.entry(term.as_ref().as_bytes().to_vec()).or_insert(*id);
        }

        let mut builder = MapBuilder::memory();
        for (term, id) in sorted {
            builder
                .insert(term, u64::from(id))
                .map_err(|e| Error::corruption(format!("term index build: {}", e)))?;
        }
        let bytes = builder
            .into_inner()
            .map_err(|e| Error::corruption(format!("term index build: {}", e)))?;
        let map = Map::new(bytes)
            .map_err(|e| Error::corruption(format!("term index build: {}", e)))?;
        Ok(Self { map })
    }

    /// Write the FST image to disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.map.as_fst().as_bytes()).map_err(|e| Error::io(path, e))
    }

    /// Look up a term. Returns its id, or `None` when the term is absent.
    pub fn search(&self, term: &str) -> Option<u32> {
        self.map.get(term).map(|id| id as u32)
    }

    pub fn contains(&self, term: &str) -> bool {
        self.map.contains_key(term)
    }

    /// Number of terms in the index.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
