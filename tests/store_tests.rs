//! Distance store tests: persistence, incremental merge, retry.

mod fixtures;

use depot_planner::error::PlanError;
use depot_planner::stop::StopId;
use depot_planner::store::{DistanceStore, PairKey};

use fixtures::{complete_store, depot, stop, FlakyMatrix, GridMatrix};

#[test]
fn persist_then_load_round_trips_every_pair() {
    let stops = vec![
        depot(0.0, 0.0),
        stop(1, "Roastery", 1.0, 0.0),
        stop(2, "Cafe", 0.0, 2.0),
    ];
    let store = complete_store(&stops);
    assert!(store.ensure_complete(&ids(&stops)).is_empty());

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("distances.json");
    store.persist(&path, &stops).expect("persist");
    assert!(!path.with_extension("tmp").exists(), "tmp file left behind");

    let (customers, loaded) = DistanceStore::load(&path).expect("load");
    assert_eq!(customers.len(), 3);
    assert_eq!(loaded.len(), store.len());
    for origin in &stops {
        for dest in &stops {
            if origin.id == dest.id {
                continue;
            }
            assert_eq!(
                loaded.get(&origin.id, &dest.id),
                store.get(&origin.id, &dest.id),
                "pair ({}, {}) changed across persist/load",
                origin.id,
                dest.id
            );
        }
    }
}

#[test]
fn merge_adds_exactly_the_new_stops_pairs() {
    let known = vec![depot(0.0, 0.0), stop(1, "Roastery", 1.0, 0.0)];
    let mut store = complete_store(&known);
    let before = store.len();
    let old_forward = store.get(&known[0].id, &known[1].id);

    let newcomer = stop(2, "Cafe", 0.0, 2.0);
    store
        .merge_new(&newcomer, &known, &GridMatrix)
        .expect("merge");

    // Forward and backward pairs for the newcomer, nothing else.
    assert_eq!(store.len(), before + 4);
    for other in &known {
        assert!(store.get(&newcomer.id, &other.id).is_some());
        assert!(store.get(&other.id, &newcomer.id).is_some());
    }
    assert_eq!(
        store.get(&known[0].id, &known[1].id),
        old_forward,
        "pre-existing pair must be untouched"
    );
}

#[test]
fn merge_with_no_known_stops_seeds_self_loop() {
    let mut store = DistanceStore::default();
    let sole = depot(0.0, 0.0);
    store.merge_new(&sole, &[], &GridMatrix).expect("merge");
    assert_eq!(store.get(&sole.id, &sole.id), Some(0.0));
    assert_eq!(store.len(), 1);
}

#[test]
fn merging_a_covered_stop_is_idempotent() {
    let known = vec![depot(0.0, 0.0), stop(1, "Roastery", 1.0, 0.0)];
    let newcomer = stop(2, "Cafe", 0.0, 2.0);
    let mut store = complete_store(&known);
    store
        .merge_new(&newcomer, &known, &GridMatrix)
        .expect("first merge");
    let len_before = store.len();

    store
        .merge_new(&newcomer, &known, &GridMatrix)
        .expect("second merge");
    assert_eq!(store.len(), len_before);
}

#[test]
fn load_rejects_malformed_pair_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("distances.json");
    std::fs::write(
        &path,
        r#"{"customers": [], "distances": {"000000-000001": 12.5}}"#,
    )
    .expect("write");

    match DistanceStore::load(&path) {
        Err(PlanError::DataConsistency(message)) => {
            assert!(message.contains("000000-000001"), "message: {message}");
        }
        other => panic!("expected a data-consistency failure, got {other:?}"),
    }
}

#[test]
fn load_rejects_negative_duration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("distances.json");
    std::fs::write(
        &path,
        r#"{"customers": [], "distances": {"('000000', '000001')": -3.0}}"#,
    )
    .expect("write");

    assert!(matches!(
        DistanceStore::load(&path),
        Err(PlanError::InternalInvariant(_))
    ));
}

#[test]
fn transient_provider_failures_are_retried() {
    let known = vec![depot(0.0, 0.0), stop(1, "Roastery", 1.0, 0.0)];
    let mut store = complete_store(&known);
    let newcomer = stop(2, "Cafe", 0.0, 2.0);

    // Two failures fit inside the three-attempt budget.
    let provider = FlakyMatrix::failing(2);
    store
        .merge_new(&newcomer, &known, &provider)
        .expect("merge should survive transient failures");
    assert!(store.get(&newcomer.id, &known[1].id).is_some());
}

#[test]
fn exhausted_retries_surface_provider_error() {
    let known = vec![depot(0.0, 0.0), stop(1, "Roastery", 1.0, 0.0)];
    let mut store = complete_store(&known);
    let before = store.clone();
    let newcomer = stop(2, "Cafe", 0.0, 2.0);

    let provider = FlakyMatrix::failing(3);
    match store.merge_new(&newcomer, &known, &provider) {
        Err(PlanError::Provider { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected a provider failure, got {other:?}"),
    }
    // The failed merge must not have touched existing pairs.
    assert_eq!(store.len(), before.len());
}

#[test]
fn fetch_missing_completes_a_partial_store() {
    let stops = vec![
        depot(0.0, 0.0),
        stop(1, "Roastery", 1.0, 0.0),
        stop(2, "Cafe", 0.0, 2.0),
    ];
    let mut store = DistanceStore::default();
    store
        .insert(
            PairKey::new(StopId::depot(), StopId::from_number(1)),
            60.0,
        )
        .expect("seed");

    let merged = store
        .fetch_missing(&stops, &GridMatrix)
        .expect("fetch missing");
    assert!(merged > 0);
    assert!(store.ensure_complete(&ids(&stops)).is_empty());
}

fn ids(stops: &[depot_planner::stop::Stop]) -> Vec<StopId> {
    stops.iter().map(|s| s.id.clone()).collect()
}
