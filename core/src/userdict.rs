//! User dictionary: surface forms with segmentation costs, loaded from a
//! plain text file (`WORD` or `WORD COST` per line) or from an in-memory
//! mapping.
//!
//! Index and cost array live in one record so installing a new dictionary is
//! a single pointer swap; ids are sequential from `USER_TERM_ID_START` and
//! disjoint from built-in term ids.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::index::TermIndex;

/// First term id assigned to user-dictionary entries.
pub const USER_TERM_ID_START: u32 = 0x1000_0000;

/// Cost assumed for entries that do not carry one.
pub const DEFAULT_COST: f32 = 20.0;

/// Immutable user dictionary: term index plus the matching cost array.
#[derive(Debug)]
pub struct UserDict {
    index: TermIndex,
    costs: Vec<f32>,
}

impl UserDict {
    /// Loads `WORD` / `WORD COST` lines. Whitespace around both fields is
    /// trimmed; blank lines are skipped; within one load the first
    /// occurrence of a surface form wins.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        let mut ids: HashMap<&str, u32> = HashMap::new();
        let mut entries: Vec<(&str, u32)> = Vec::new();
        let mut costs: Vec<f32> = Vec::new();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (word, cost) = match line.split_once(' ') {
                Some((word, rest)) => {
                    let cost = rest.trim().parse::<f32>().map_err(|_| {
                        Error::corruption(format!(
                            "User dictionary {} has a bad cost in line {:?}.",
                            path.display(),
                            line
                        ))
                    })?;
                    (word.trim(), cost)
                }
                None => (line, DEFAULT_COST),
            };
            if ids.contains_key(word) {
                continue;
            }
            let id = USER_TERM_ID_START + ids.len() as u32;
            ids.insert(word, id);
            entries.push((word, id));
            costs.push(cost);
        }

        if entries.is_empty() {
            return Err(Error::corruption(format!(
                "User dictionary {} is empty.",
                path.display()
            )));
        }

        Ok(Self {
            index: TermIndex::from_pairs(&entries)?,
            costs,
        })
    }

    /// Builds a dictionary from a word -> cost mapping. Ids are assigned in
    /// sorted surface order so repeated builds are identical.
    pub fn from_words(words: &HashMap<String, f32>) -> Result<Self> {
        let mut sorted: Vec<(&str, f32)> =
            words.iter().map(|(w, c)| (w.as_str(), *c)).collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut entries: Vec<(&str, u32)> = Vec::with_capacity(sorted.len());
        let mut costs: Vec<f32> = Vec::with_capacity(sorted.len());
        for (i, (word, cost)) in sorted.iter().enumerate() {
            entries.push((word, USER_TERM_ID_START + i as u32));
            costs.push(*cost);
        }

        Ok(Self {
            index: TermIndex::from_pairs(&entries)?,
            costs,
        })
    }

    pub fn index(&self) -> &TermIndex {
        &self.index
    }

    pub fn costs(&self) -> &[f32] {
        &self.costs
    }

    /// Cost for a user term id (as returned by `index().search`).
    pub fn cost(&self, term_id: u32) -> Option<f32> {
        let offset = term_id.checked_sub(USER_TERM_ID_START)? as usize;
        self.costs.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }
}
