//! The model container: a thread-safe registry that lazily loads every
//! read-only artifact from the model directory, plus one mutable slot for
//! the user dictionary, which is replaced atomically as a paired record.
//!
//! One container is meant to be shared by any number of parser instances;
//! every getter is idempotent and a failed load leaves the slot empty so a
//! later call can retry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::crf::CrfModel;
use crate::error::{Error, Result};
use crate::hmm::HmmModel;
use crate::index::TermIndex;
use crate::ngram::{BigramCosts, UnigramCosts};
use crate::perceptron::PerceptronModel;
use crate::template::FeatureTemplate;
use crate::userdict::UserDict;

// Model filenames under the model directory.
const UNIGRAM_INDEX_FILE: &str = "unigram.idx";
const UNIGRAM_DATA_FILE: &str = "unigram.bin";
const BIGRAM_DATA_FILE: &str = "bigram.bin";
const CRF_SEG_MODEL_FILE: &str = "ctb_seg.crf";
const CRF_POS_MODEL_FILE: &str = "ctb_pos.crf";
const HMM_POS_MODEL_FILE: &str = "ctb_pos.hmm";
const OOV_PROPERTY_FILE: &str = "oov_property.idx";
const STOPWORD_FILE: &str = "stopword.idx";
const DEPENDENCY_FILE_PREFIX: &str = "ctb5_dep";
const DEPENDENCY_TEMPLATE_FILE: &str = "depparse.tmpl";

#[derive(Debug, Default)]
pub struct Model {
    dir: PathBuf,
    unigram_index: OnceCell<Arc<TermIndex>>,
    unigram_cost: OnceCell<Arc<UnigramCosts>>,
    bigram_cost: OnceCell<Arc<BigramCosts>>,
    seg_crf: OnceCell<Arc<CrfModel>>,
    pos_crf: OnceCell<Arc<CrfModel>>,
    pos_hmm: OnceCell<Arc<HmmModel>>,
    oov_property: OnceCell<Arc<TermIndex>>,
    stopword: OnceCell<Arc<TermIndex>>,
    dependency: OnceCell<Arc<PerceptronModel>>,
    dependency_template: OnceCell<Arc<FeatureTemplate>>,
    user_dict: RwLock<Option<Arc<UserDict>>>,
}

impl Model {
    /// Records the model directory. Nothing is loaded until a getter asks
    /// for it.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load<T>(
        &self,
        cell: &OnceCell<Arc<T>>,
        file: &str,
        load: impl FnOnce(&Path) -> Result<T>,
    ) -> Result<Arc<T>> {
        cell.get_or_try_init(|| {
            let path = self.dir.join(file);
            debug!(path = %path.display(), "loading model artifact");
            load(&path).map(Arc::new)
        })
        .cloned()
        .map_err(Error::recorded)
    }

    /// Term index shared by the unigram costs, the bigram costs and the HMM.
    pub fn index(&self) -> Result<Arc<TermIndex>> {
        self.load(&self.unigram_index, UNIGRAM_INDEX_FILE, |p| TermIndex::open(p))
    }

    pub fn unigram_cost(&self) -> Result<Arc<UnigramCosts>> {
        self.load(&self.unigram_cost, UNIGRAM_DATA_FILE, |p| UnigramCosts::load(p))
    }

    pub fn bigram_cost(&self) -> Result<Arc<BigramCosts>> {
        self.load(&self.bigram_cost, BIGRAM_DATA_FILE, |p| BigramCosts::load(p))
    }

    pub fn seg_crf(&self) -> Result<Arc<CrfModel>> {
        self.load(&self.seg_crf, CRF_SEG_MODEL_FILE, |p| CrfModel::load(p))
    }

    pub fn pos_crf(&self) -> Result<Arc<CrfModel>> {
        self.load(&self.pos_crf, CRF_POS_MODEL_FILE, |p| CrfModel::load(p))
    }

    pub fn pos_hmm(&self) -> Result<Arc<HmmModel>> {
        self.load(&self.pos_hmm, HMM_POS_MODEL_FILE, |p| HmmModel::load(p))
    }

    /// Character-property index used for out-of-vocabulary recognition.
    pub fn oov_property(&self) -> Result<Arc<TermIndex>> {
        self.load(&self.oov_property, OOV_PROPERTY_FILE, |p| TermIndex::open(p))
    }

    /// Stopword surface set.
    pub fn stopword(&self) -> Result<Arc<TermIndex>> {
        self.load(&self.stopword, STOPWORD_FILE, |p| TermIndex::open(p))
    }

    pub fn dependency_model(&self) -> Result<Arc<PerceptronModel>> {
        self.load(&self.dependency, DEPENDENCY_FILE_PREFIX, |p| PerceptronModel::open(p))
    }

    pub fn dependency_template(&self) -> Result<Arc<FeatureTemplate>> {
        self.load(
            &self.dependency_template,
            DEPENDENCY_TEMPLATE_FILE,
            |p| FeatureTemplate::open(p),
        )
    }

    /// Replaces the user dictionary from a `WORD [COST]` text file. Readers
    /// holding the previous dictionary keep it; new readers see the new pair.
    pub fn set_user_dictionary(&self, path: impl AsRef<Path>) -> Result<()> {
        let dict = UserDict::from_file(path).map_err(Error::recorded)?;
        self.install_user_dictionary(dict);
        Ok(())
    }

    /// Replaces the user dictionary from an in-memory word -> cost mapping.
    pub fn set_user_dictionary_from_words(&self, words: &HashMap<String, f32>) -> Result<()> {
        let dict = UserDict::from_words(words).map_err(Error::recorded)?;
        self.install_user_dictionary(dict);
        Ok(())
    }

    fn install_user_dictionary(&self, dict: UserDict) {
        debug!(entries = dict.len(), "installing user dictionary");
        let mut slot = self
            .user_dict
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Arc::new(dict));
    }

    pub fn has_user_dictionary(&self) -> bool {
        self.user_dict
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// The installed user dictionary (index and costs as one record).
    pub fn user_dictionary(&self) -> Result<Arc<UserDict>> {
        self.user_dict
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or_else(|| Error::runtime("No user dictionary").recorded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_loads_nothing() {
        let model = Model::open("/nonexistent/model/dir");
        assert!(!model.has_user_dictionary());
        // The failure happens at getter time, not at open time.
        assert!(matches!(model.index(), Err(Error::Io { .. })));
    }

    #[test]
    fn user_dictionary_getter_without_install_is_runtime_error() {
        let model = Model::open("/nonexistent/model/dir");
        match model.user_dictionary() {
            Err(Error::Runtime(message)) => assert_eq!(message, "No user dictionary"),
            other => panic!("expected runtime error, got {:?}", other),
        }
    }

    #[test]
    fn failed_load_can_be_retried() {
        let dir = std::env::temp_dir().join(format!(
            "zhparse_model_retry_{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let model = Model::open(&dir);

        assert!(model.unigram_cost().is_err());

        UnigramCosts::from_vec(vec![1.0, 2.0])
            .save(dir.join(UNIGRAM_DATA_FILE))
            .unwrap();
        let costs = model.unigram_cost().expect("retry after the file appears");
        assert_eq!(costs.cost(1), Some(2.0));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
