use std::collections::BTreeSet;
use std::sync::Once;

use deed_core::{update, AssetId, BatchState, DiscoveryResult, DiscoveryStatus, Effect, Msg};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn failed(ticker: &str) -> Msg {
    Msg::AssetDiscovered(DiscoveryResult::failed(
        AssetId::parse(ticker).unwrap(),
        "navigation timed out",
    ))
}

fn found(ticker: &str) -> Msg {
    let urls = BTreeSet::from([format!(
        "https://b.s3.amazonaws.com/{ticker}/escritura.pdf"
    )]);
    Msg::AssetDiscovered(DiscoveryResult::from_matches(
        AssetId::parse(ticker).unwrap(),
        urls,
    ))
}

fn none_found(ticker: &str) -> Msg {
    Msg::AssetDiscovered(DiscoveryResult::from_matches(
        AssetId::parse(ticker).unwrap(),
        BTreeSet::new(),
    ))
}

#[test]
fn three_consecutive_errors_recycle_once() {
    init_logging();
    let state = BatchState::new();

    let (state, effects) = update(state, failed("AAAA11"));
    assert!(effects.is_empty());
    assert_eq!(state.consecutive_errors(), 1);

    let (state, effects) = update(state, failed("BBBB11"));
    assert!(effects.is_empty());
    assert_eq!(state.consecutive_errors(), 2);

    let (state, effects) = update(state, failed("CCCC11"));
    assert_eq!(effects, vec![Effect::RecycleSession]);
    assert_eq!(state.consecutive_errors(), 0);
    assert_eq!(state.session_recycles(), 1);
}

#[test]
fn found_between_errors_resets_counter() {
    init_logging();
    let mut state = BatchState::new();
    let mut all_effects = Vec::new();
    for msg in [
        failed("AAAA11"),
        failed("BBBB11"),
        found("CCCC11"),
        failed("DDDD11"),
        failed("EEEE11"),
    ] {
        let (next, effects) = update(state, msg);
        state = next;
        all_effects.extend(effects);
    }

    assert!(all_effects.is_empty());
    assert_eq!(state.consecutive_errors(), 2);
    assert_eq!(state.session_recycles(), 0);
}

#[test]
fn none_found_also_resets_counter() {
    init_logging();
    let (state, _) = update(BatchState::new(), failed("AAAA11"));
    let (state, _) = update(state, none_found("BBBB11"));
    assert_eq!(state.consecutive_errors(), 0);
}

#[test]
fn six_errors_recycle_twice() {
    init_logging();
    let mut state = BatchState::new();
    let mut recycles = 0;
    for idx in 0..6 {
        let (next, effects) = update(state, failed(&format!("ERRO{idx}")));
        state = next;
        recycles += effects.len();
    }
    assert_eq!(recycles, 2);
    assert_eq!(state.session_recycles(), 2);
}

#[test]
fn summary_counts_each_status() {
    init_logging();
    let mut state = BatchState::new();
    for msg in [found("AAAA11"), none_found("BBBB11"), failed("CCCC11"), found("DDDD11")] {
        state = update(state, msg).0;
    }

    let summary = state.view();
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.with_documents, 2);
    assert_eq!(summary.without_documents, 1);
    assert_eq!(summary.errors, 1);

    let statuses: Vec<_> = state
        .results()
        .iter()
        .map(|r| r.status().clone())
        .collect();
    assert_eq!(statuses[2], DiscoveryStatus::Error("navigation timed out".into()));
}

#[test]
fn custom_threshold_is_respected() {
    init_logging();
    let state = BatchState::with_threshold(1);
    let (_state, effects) = update(state, failed("AAAA11"));
    assert_eq!(effects, vec![Effect::RecycleSession]);
}
