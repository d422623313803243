//! Model container behavior: lazy idempotent loads, sharing across threads,
//! and the error surface for missing artifacts.

mod common;

use std::sync::Arc;

use anyhow::Result;
use libzhparse_core::{last_error, Error, Model};

#[test]
fn getters_are_idempotent() -> Result<()> {
    let dir = common::write_model_dir("idempotent");
    let model = Model::open(&dir);

    let first = model.index()?;
    let second = model.index()?;
    assert!(
        Arc::ptr_eq(&first, &second),
        "repeated getter calls must hand out the same artifact"
    );

    let first = model.dependency_template()?;
    let second = model.dependency_template()?;
    assert!(Arc::ptr_eq(&first, &second));

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn concurrent_first_loads_share_one_artifact() -> Result<()> {
    let dir = common::write_model_dir("concurrent");
    let model = Arc::new(Model::open(&dir));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let model = Arc::clone(&model);
            std::thread::spawn(move || model.unigram_cost().expect("load unigram costs"))
        })
        .collect();

    let reference = model.unigram_cost()?;
    for handle in handles {
        let costs = handle.join().expect("thread completed");
        assert!(
            Arc::ptr_eq(&reference, &costs),
            "all threads must observe the same loaded artifact"
        );
    }

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn every_artifact_kind_loads() -> Result<()> {
    let dir = common::write_model_dir("all_artifacts");
    let model = Model::open(&dir);

    assert!(model.index()?.contains("北京"));
    assert!(model.unigram_cost()?.len() > 0);
    assert!(model.bigram_cost()?.cost(common::WO, common::AI).is_some());
    assert!(model.seg_crf()?.label_index("B").is_some());
    assert!(model.pos_crf()?.label_index("NR").is_some());
    assert!(model.pos_hmm()?.tag_index("VV").is_some());
    assert!(model.oov_property()?.len() > 0);
    assert!(model.stopword()?.contains("的"));
    assert!(!model.dependency_model()?.classes().is_empty());
    assert!(!model.dependency_template()?.is_empty());

    std::fs::remove_dir_all(&dir)?;
    Ok(())
}

#[test]
fn missing_artifact_is_io_error_and_sets_last_error() {
    let model = Model::open("/nonexistent/model/dir");
    match model.bigram_cost() {
        Err(Error::Io { .. }) => {}
        other => panic!("expected io error, got {:?}", other),
    }
    let message = last_error().expect("last error recorded");
    assert!(
        message.contains("bigram.bin"),
        "last error should name the missing file: {}",
        message
    );
}

#[test]
fn user_dictionary_slot_starts_empty() {
    let model = Model::open("/nonexistent/model/dir");
    assert!(!model.has_user_dictionary());
    assert!(matches!(model.user_dictionary(), Err(Error::Runtime(_))));
}
