//! Dependency feature template: renders each template line into a concrete
//! feature string by interpolating named atomic features (`[STw]`, `[N0t]`,
//! ...) drawn from the current parser configuration.
//!
//! The feature inventory follows Zhang & Clark's transition-based parsing
//! feature set.

use std::path::Path;

use ahash::AHashMap;

use crate::error::{Error, Result};
use crate::perceptron::{FeatureSet, FEATURE_MAX, FEATURE_SIZE_MAX};
use crate::segmenter::TermInstance;
use crate::state::{Node, State};
use crate::tagger::PosTagInstance;

/// Surface and tag reported for the synthetic ROOT node.
pub const ROOT_TERM: &str = "ROOT";
pub const ROOT_TAG: &str = "ROOT";
/// Sentinel for positions beyond the buffer, unattached parents and missing
/// children.
const NONE_VALUE: &str = "NULL";

const TEMPLATE_CORRUPTED: &str = "Template file corrputed.";

/// Atomic features of one configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Atom {
    STw,
    STt,
    N0w,
    N0t,
    N1w,
    N1t,
    N2t,
    STPt,
    STLCt,
    STRCt,
    N0LCt,
    N0RCt,
}

const ATOMS: [(&str, Atom); 12] = [
    ("STw", Atom::STw),
    ("STt", Atom::STt),
    ("N0w", Atom::N0w),
    ("N0t", Atom::N0t),
    ("N1w", Atom::N1w),
    ("N1t", Atom::N1t),
    ("N2t", Atom::N2t),
    ("STPt", Atom::STPt),
    ("STLCt", Atom::STLCt),
    ("STRCt", Atom::STRCt),
    ("N0LCt", Atom::N0LCt),
    ("N0RCt", Atom::N0RCt),
];

/// Parsed template: one line per feature, plus the atom-name index.
#[derive(Debug)]
pub struct FeatureTemplate {
    lines: Vec<String>,
    atoms: AHashMap<&'static str, Atom>,
    /// Training-time hook: words rarer than `min_count` can be suppressed.
    word_count: Option<AHashMap<String, u32>>,
    min_count: u32,
}

impl FeatureTemplate {
    /// Builds a template from raw lines; blank lines are dropped.
    pub fn new(lines: impl IntoIterator<Item = String>) -> Result<Self> {
        let lines: Vec<String> = lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() > FEATURE_MAX {
            return Err(Error::corruption(format!(
                "feature template has {} lines, the maximum is {}",
                lines.len(),
                FEATURE_MAX
            )));
        }
        Ok(Self {
            lines,
            atoms: ATOMS.iter().copied().collect(),
            word_count: None,
            min_count: 0,
        })
    }

    /// Reads a template file, one template per line.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::new(text.lines().map(|l| l.to_string()))
    }

    /// Installs a word-count table and threshold. Not consulted during
    /// extraction; scoring-time suppression belongs to training tooling.
    pub fn discard_infrequent_words(
        &mut self,
        word_count: impl IntoIterator<Item = (String, u32)>,
        min_count: u32,
    ) {
        self.word_count = Some(word_count.into_iter().collect());
        self.min_count = min_count;
    }

    /// True when a word falls under the installed count threshold.
    pub fn is_infrequent(&self, word: &str) -> bool {
        match &self.word_count {
            Some(counts) => counts.get(word).copied().unwrap_or(0) < self.min_count,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders every template line for the given configuration into
    /// `feature_set`. Returns the number of features produced.
    pub fn extract(
        &self,
        state: &State,
        terms: &TermInstance,
        tags: &PosTagInstance,
        feature_set: &mut FeatureSet,
    ) -> Result<usize> {
        let values = AtomValues::compute(state, terms, tags);

        feature_set.clear();
        for line in &self.lines {
            let mut rendered = String::new();
            let mut rest = line.as_str();
            while let Some(open) = rest.find('[') {
                push_bounded(&mut rendered, &rest[..open]);
                let after = &rest[open + 1..];
                let close = after
                    .find(']')
                    .ok_or_else(|| Error::corruption(TEMPLATE_CORRUPTED))?;
                let name = &after[..close];
                let atom = self
                    .atoms
                    .get(name)
                    .copied()
                    .ok_or_else(|| Error::corruption(TEMPLATE_CORRUPTED))?;
                push_bounded(&mut rendered, values.get(atom));
                rest = &after[close + 1..];
            }
            push_bounded(&mut rendered, rest);
            feature_set.push(rendered)?;
        }
        Ok(feature_set.len())
    }
}

/// Appends without letting the feature string outgrow `FEATURE_SIZE_MAX`.
fn push_bounded(out: &mut String, piece: &str) {
    if out.len() + piece.len() <= FEATURE_SIZE_MAX {
        out.push_str(piece);
    }
}

/// The twelve atomic feature values of one configuration.
struct AtomValues<'a> {
    st_w: &'a str,
    st_t: &'a str,
    n0_w: &'a str,
    n0_t: &'a str,
    n1_w: &'a str,
    n1_t: &'a str,
    n2_t: &'a str,
    stp_t: &'a str,
    stlc_t: &'a str,
    strc_t: &'a str,
    n0lc_t: &'a str,
    n0rc_t: &'a str,
}

fn term_of<'a>(node: &Node, terms: &'a TermInstance) -> &'a str {
    match node.term() {
        Some(i) => terms.term(i).text.as_str(),
        None => ROOT_TERM,
    }
}

fn tag_of<'a>(node: &Node, tags: &'a PosTagInstance) -> &'a str {
    match node.term() {
        Some(i) => tags.tag(i),
        None => ROOT_TAG,
    }
}

impl<'a> AtomValues<'a> {
    fn compute(state: &'a State, terms: &'a TermInstance, tags: &'a PosTagInstance) -> Self {
        let child_tag = |child: Option<usize>| -> &'a str {
            match child {
                Some(index) => tag_of(state.node(index), tags),
                None => NONE_VALUE,
            }
        };

        let st = state.stack_top();
        let n0 = state.buffer_at(0);
        let n1 = state.buffer_at(1);
        let n2 = state.buffer_at(2);

        Self {
            st_w: term_of(st, terms),
            st_t: tag_of(st, tags),
            n0_w: n0.map_or(NONE_VALUE, |n| term_of(n, terms)),
            n0_t: n0.map_or(NONE_VALUE, |n| tag_of(n, tags)),
            n1_w: n1.map_or(NONE_VALUE, |n| term_of(n, terms)),
            n1_t: n1.map_or(NONE_VALUE, |n| tag_of(n, tags)),
            n2_t: n2.map_or(NONE_VALUE, |n| tag_of(n, tags)),
            stp_t: match st.head() {
                Some(head) => tag_of(state.node(head), tags),
                None => NONE_VALUE,
            },
            stlc_t: child_tag(st.leftmost_child()),
            strc_t: child_tag(st.rightmost_child()),
            n0lc_t: child_tag(n0.and_then(Node::leftmost_child)),
            n0rc_t: child_tag(n0.and_then(Node::rightmost_child)),
        }
    }

    fn get(&self, atom: Atom) -> &'a str {
        match atom {
            Atom::STw => self.st_w,
            Atom::STt => self.st_t,
            Atom::N0w => self.n0_w,
            Atom::N0t => self.n0_t,
            Atom::N1w => self.n1_w,
            Atom::N1t => self.n1_t,
            Atom::N2t => self.n2_t,
            Atom::STPt => self.stp_t,
            Atom::STLCt => self.stlc_t,
            Atom::STRCt => self.strc_t,
            Atom::N0LCt => self.n0lc_t,
            Atom::N0RCt => self.n0rc_t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmenter::{Term, WordType};

    fn sentence(words: &[(&str, &str)]) -> (TermInstance, PosTagInstance) {
        let mut terms = TermInstance::new();
        let mut tags = PosTagInstance::new();
        for (word, tag) in words {
            terms.push(Term::new(*word, WordType::Chinese));
            tags.push(*tag);
        }
        (terms, tags)
    }

    fn extract_one(template: &str, words: &[(&str, &str)], state: &State) -> Result<String> {
        let (terms, tags) = sentence(words);
        let template = FeatureTemplate::new(vec![template.to_string()])?;
        let mut features = FeatureSet::new();
        template.extract(state, &terms, &tags, &mut features)?;
        Ok(features.get(0).unwrap_or_default().to_string())
    }

    #[test]
    fn literal_line_passes_through() {
        let state = State::new(1);
        let feature = extract_one("bias", &[("好", "VA")], &state).expect("extract");
        assert_eq!(feature, "bias");
    }

    #[test]
    fn atoms_substitute_from_the_configuration() {
        let mut state = State::new(2);
        state
            .apply(&crate::state::Transition::Shift)
            .expect("shift is legal");
        let feature = extract_one("[STt]-[N0t]", &[("我", "PN"), ("爱", "VV")], &state)
            .expect("extract");
        assert_eq!(feature, "PN-VV");
    }

    #[test]
    fn root_sentinel_for_empty_stack() {
        let state = State::new(1);
        let feature = extract_one("[STw]/[STt]", &[("好", "VA")], &state).expect("extract");
        assert_eq!(feature, "ROOT/ROOT");
    }

    #[test]
    fn null_sentinel_past_the_buffer() {
        let state = State::new(1);
        let feature = extract_one("[N1w]|[N2t]", &[("好", "VA")], &state).expect("extract");
        assert_eq!(feature, "NULL|NULL");
    }

    #[test]
    fn unclosed_bracket_is_corruption() {
        let state = State::new(1);
        match extract_one("foo[STw", &[("好", "VA")], &state) {
            Err(Error::Corruption(message)) => assert_eq!(message, "Template file corrputed."),
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn unknown_atom_is_corruption() {
        let state = State::new(1);
        match extract_one("[BOGUS]", &[("好", "VA")], &state) {
            Err(Error::Corruption(message)) => assert_eq!(message, "Template file corrputed."),
            other => panic!("expected corruption, got {:?}", other),
        }
    }

    #[test]
    fn blank_lines_are_dropped() {
        let template =
            FeatureTemplate::new(vec!["  ".to_string(), "a".to_string(), "".to_string()])
                .expect("build");
        assert_eq!(template.len(), 1);
    }

    #[test]
    fn infrequent_word_predicate() {
        let mut template = FeatureTemplate::new(vec!["bias".to_string()]).expect("build");
        assert!(!template.is_infrequent("罕见"));
        template.discard_infrequent_words([("常见".to_string(), 100u32)], 5);
        assert!(template.is_infrequent("罕见"));
        assert!(!template.is_infrequent("常见"));
    }
}
