//! Shared fixture: a complete toy model directory with a small vocabulary,
//! cost tables, CRF/HMM models, a dependency perceptron and its template.

use std::path::PathBuf;

use libzhparse_core::{
    BigramCosts, CrfModel, HmmModel, PerceptronModel, TermIndex, UnigramCosts,
};

/// A unique scratch directory under the system temp dir.
pub fn unique_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "zhparse_{}_{}",
        tag,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// Vocabulary ids, shared by the index, the cost tables and the tests.
pub const WO: u32 = 0; // 我
pub const AI: u32 = 1; // 爱
pub const BEIJING: u32 = 2; // 北京
pub const TIANANMEN: u32 = 3; // 天安门
pub const HAO: u32 = 4; // 好

const POS_TAGS: &[&str] = &["PN", "VV", "NR", "VA", "CD", "PU", "FW"];

fn pos_tag(tag: &str) -> u32 {
    POS_TAGS.iter().position(|t| *t == tag).unwrap() as u32
}

/// Writes every model artifact into a fresh directory and returns its path.
pub fn write_model_dir(tag: &str) -> PathBuf {
    let dir = unique_dir(tag);

    let index = TermIndex::from_pairs(&[
        ("我", WO),
        ("爱", AI),
        ("北京", BEIJING),
        ("天安门", TIANANMEN),
        ("好", HAO),
    ])
    .unwrap();
    index.save(dir.join("unigram.idx")).unwrap();

    UnigramCosts::from_vec(vec![2.0, 2.0, 3.0, 3.5, 2.5])
        .save(dir.join("unigram.bin"))
        .unwrap();

    BigramCosts::from_entries([
        ((WO, AI), 0.5f32),
        ((AI, BEIJING), 0.5),
        ((AI, TIANANMEN), 0.5),
    ])
    .save(dir.join("bigram.bin"))
    .unwrap();

    // Character segmenter: single characters label S, and B->E is the cheap
    // way through a two-character word.
    let bmes = |b: f32, m: f32, e: f32, s: f32| vec![b, m, e, s];
    // 4x4 label transitions, row-major over B, M, E, S; reward B -> E.
    let mut seg_transitions = vec![0.0f32; 16];
    seg_transitions[2] = 2.0;
    CrfModel::new(
        vec!["B".into(), "M".into(), "E".into(), "S".into()],
        [
            ("U0:我".to_string(), bmes(0.0, 0.0, 0.0, 2.0)),
            ("U0:爱".to_string(), bmes(0.0, 0.0, 0.0, 2.0)),
            ("U0:好".to_string(), bmes(0.0, 0.0, 0.0, 2.0)),
            ("U0:北".to_string(), bmes(2.0, 0.0, 0.0, 0.0)),
            ("U0:京".to_string(), bmes(0.0, 0.0, 2.0, 0.0)),
            ("U0:谢".to_string(), bmes(0.5, 0.0, 0.0, 0.0)),
            ("U0:你".to_string(), bmes(0.0, 0.0, 0.0, 2.0)),
        ],
        seg_transitions,
    )
    .unwrap()
    .save(dir.join("ctb_seg.crf"))
    .unwrap();

    // POS models over a tiny CTB-flavored tag set.
    let n = POS_TAGS.len();
    let tags: Vec<String> = POS_TAGS.iter().map(|t| t.to_string()).collect();
    HmmModel::new(
        tags.clone(),
        vec![1.0; n * n],
        [
            ("我".to_string(), vec![(pos_tag("PN"), 0.5f32)]),
            ("爱".to_string(), vec![(pos_tag("VV"), 0.5)]),
            ("北京".to_string(), vec![(pos_tag("NR"), 0.5)]),
            ("天安门".to_string(), vec![(pos_tag("NR"), 0.5)]),
            ("好".to_string(), vec![(pos_tag("VA"), 0.5)]),
        ],
        10.0,
    )
    .unwrap()
    .save(dir.join("ctb_pos.hmm"))
    .unwrap();

    let tag_row = |tag: &str| -> Vec<f32> {
        let mut row = vec![0.0f32; n];
        row[pos_tag(tag) as usize] = 2.0;
        row
    };
    CrfModel::new(
        tags,
        [
            ("W0:我".to_string(), tag_row("PN")),
            ("W0:爱".to_string(), tag_row("VV")),
            ("W0:北京".to_string(), tag_row("NR")),
            ("W0:天安门".to_string(), tag_row("NR")),
            ("W0:好".to_string(), tag_row("VA")),
            ("W0:谢谢".to_string(), tag_row("VV")),
            ("W0:你".to_string(), tag_row("PN")),
        ],
        vec![0.0; n * n],
    )
    .unwrap()
    .save(dir.join("ctb_pos.crf"))
    .unwrap();

    TermIndex::from_pairs(&[("的", 0u32), ("了", 1)])
        .unwrap()
        .save(dir.join("stopword.idx"))
        .unwrap();
    TermIndex::from_pairs(&[("阿", 0u32), ("老", 1)])
        .unwrap()
        .save(dir.join("oov_property.idx"))
        .unwrap();

    // Dependency perceptron: weights are keyed by the rendered template
    // features, one decisive feature per configuration.
    let classes: Vec<String> = ["SHIFT", "REDUCE", "LARC:SBV", "RARC:VOB", "RARC:HED"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let class_row = |class: &str| -> Vec<f32> {
        let mut row = vec![0.0f32; classes.len()];
        let at = classes.iter().position(|c| c == class).unwrap();
        row[at] = 5.0;
        row
    };
    let rows = vec![
        ("ROOT-我".to_string(), class_row("SHIFT")),
        ("我-爱".to_string(), class_row("LARC:SBV")),
        ("ROOT-爱".to_string(), class_row("RARC:HED")),
        ("爱-北京".to_string(), class_row("RARC:VOB")),
        ("爱-天安门".to_string(), class_row("RARC:VOB")),
        ("ROOT-好".to_string(), class_row("RARC:HED")),
    ];
    PerceptronModel::from_weights(classes, rows)
        .unwrap()
        .save(dir.join("ctb5_dep"))
        .unwrap();

    std::fs::write(dir.join("depparse.tmpl"), "[STw]-[N0w]\n[STt]-[N0t]\nbias\n").unwrap();

    dir
}
