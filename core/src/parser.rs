//! The public parsing pipeline: sentence splitting, segmentation, POS
//! tagging and dependency parsing composed over a shared model.
//!
//! A `Parser` is cheap relative to the model it borrows from and is not
//! thread-safe; open one parser per thread over one shared `Model`.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::depparser::{ArcEagerParser, DepParserKind};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::segmenter::{SegmenterKind, TextSegmenter, WordType};
use crate::tagger::{PosTagger, TaggerKind};

/// Pipeline configuration: which segmenter, tagger and dependency parser to
/// run. Loadable from TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    pub segmenter: SegmenterKind,
    pub tagger: TaggerKind,
    pub dependency_parser: DepParserKind,
    /// Reserved: widths greater than 1 currently behave as 1.
    pub beam_width: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            segmenter: SegmenterKind::Mixed,
            tagger: TaggerKind::Mixed,
            dependency_parser: DepParserKind::None,
            beam_width: 1,
        }
    }
}

impl ParserOptions {
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml_str(&text)
            .map_err(|e| Error::corruption(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn to_toml_string(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn use_segmenter(mut self, kind: SegmenterKind) -> Self {
        self.segmenter = kind;
        self
    }

    pub fn use_tagger(mut self, kind: TaggerKind) -> Self {
        self.tagger = kind;
        self
    }

    pub fn use_dependency_parser(mut self, kind: DepParserKind) -> Self {
        self.dependency_parser = kind;
        self
    }
}

/// One analyzed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub pos: String,
    pub kind: WordType,
    /// Head token index within the sentence; `None` means ROOT.
    pub head: Option<usize>,
    /// Dependency label, present when dependency parsing ran.
    pub label: Option<String>,
    /// True for the first token of each sentence.
    pub is_begin_of_sentence: bool,
}

/// The analyzed text: an ordered token sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parse {
    tokens: Vec<Token>,
}

impl Parse {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Token> {
        self.tokens.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }
}

impl IntoIterator for Parse {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.into_iter()
    }
}

impl<'a> IntoIterator for &'a Parse {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// Splits text into sentences on sentence-ending punctuation and newlines,
/// keeping the terminator with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '。' | '！' | '？' | '!' | '?' | '\n') {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// The analysis pipeline over one shared model.
pub struct Parser {
    model: Arc<Model>,
    options: ParserOptions,
    depparser: Option<ArcEagerParser>,
}

impl Parser {
    /// A parser with default options: mixed segmenter, mixed tagger, no
    /// dependency parsing.
    pub fn new(model: Arc<Model>) -> Result<Self> {
        Self::with_options(model, ParserOptions::default())
    }

    pub fn with_options(model: Arc<Model>, options: ParserOptions) -> Result<Self> {
        if options.dependency_parser == DepParserKind::ArcEager
            && options.tagger == TaggerKind::None
        {
            return Err(
                Error::runtime("dependency parsing requires a part-of-speech tagger").recorded(),
            );
        }
        let depparser = match options.dependency_parser {
            DepParserKind::ArcEager => Some(ArcEagerParser::new(&model).map_err(Error::recorded)?),
            DepParserKind::None => None,
        };
        Ok(Self {
            model,
            options,
            depparser,
        })
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    /// Analyzes a text: every sentence is segmented, tagged and, when
    /// configured, dependency-parsed.
    pub fn parse(&mut self, text: &str) -> Result<Parse> {
        self.parse_inner(text).map_err(Error::recorded)
    }

    fn parse_inner(&mut self, text: &str) -> Result<Parse> {
        // Rebuilt per call so a user dictionary installed after the last
        // call is picked up.
        let segmenter = TextSegmenter::new(self.options.segmenter, &self.model)?;
        let tagger = PosTagger::new(self.options.tagger, &self.model)?;

        let mut tokens = Vec::new();
        for sentence in split_sentences(text) {
            let terms = segmenter.segment(sentence)?;
            if terms.is_empty() {
                continue;
            }
            let tags = tagger.tag(&terms)?;
            let tree = match &mut self.depparser {
                Some(parser) => Some(parser.parse(&terms, &tags)?),
                None => None,
            };

            let base = tokens.len();
            for (i, term) in terms.iter().enumerate() {
                tokens.push(Token {
                    word: term.text.clone(),
                    pos: tags.tag(i).to_string(),
                    kind: term.kind,
                    head: tree.as_ref().and_then(|t| t.head(i)),
                    label: tree.as_ref().map(|t| t.label(i).to_string()),
                    is_begin_of_sentence: i == 0,
                });
            }
            debug!(
                sentence_tokens = tokens.len() - base,
                "analyzed sentence"
            );
        }
        Ok(Parse { tokens })
    }
}
