//! libzhparse-core
//!
//! Chinese text analysis in one pass: word segmentation, part-of-speech
//! tagging and transition-based dependency parsing.
//!
//! The heavyweight artifacts (term index, cost tables, CRF/HMM models, the
//! dependency perceptron and its feature template) are owned by a [`Model`]
//! that loads each of them lazily from a model directory and is meant to be
//! shared across threads. A [`Parser`] composes the pipeline over one model;
//! parsers are cheap and single-threaded.
//!
//! ```no_run
//! use std::sync::Arc;
//! use libzhparse_core::{Model, Parser, ParserOptions, DepParserKind};
//!
//! # fn main() -> libzhparse_core::Result<()> {
//! let model = Arc::new(Model::open("models/"));
//! let options = ParserOptions::default().use_dependency_parser(DepParserKind::ArcEager);
//! let mut parser = Parser::with_options(model, options)?;
//! for token in &parser.parse("我爱北京。")? {
//!     println!("{}\t{}\t{:?}", token.word, token.pos, token.head);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{last_error, Error, Result};

pub mod index;
pub use index::TermIndex;

pub mod ngram;
pub use ngram::{pack_bigram_key, BigramCosts, UnigramCosts};

pub mod crf;
pub use crf::CrfModel;

pub mod hmm;
pub use hmm::HmmModel;

pub mod perceptron;
pub use perceptron::{FeatureSet, PerceptronModel, FEATURE_MAX, FEATURE_SIZE_MAX};

pub mod userdict;
pub use userdict::{UserDict, DEFAULT_COST, USER_TERM_ID_START};

pub mod model;
pub use model::Model;

pub mod segmenter;
pub use segmenter::{SegmenterKind, Term, TermInstance, TextSegmenter, WordType};

pub mod tagger;
pub use tagger::{PosTagInstance, PosTagger, TaggerKind};

pub mod template;
pub use template::{FeatureTemplate, ROOT_TAG, ROOT_TERM};

pub mod state;
pub use state::{Node, State, Transition};

pub mod depparser;
pub use depparser::{ArcEagerParser, DepParserKind, TreeInstance, ROOT_LABEL};

pub mod parser;
pub use parser::{split_sentences, Parse, Parser, ParserOptions, Token};
