use restdot::ctx::RunKey;
use restdot::db::Store;
use restdot::label::{ResultsTable, label_volumes};
use restdot::score::ScoreGrid;
use tempfile::TempDir;

fn roster() -> Vec<String> {
    vec!["fear".to_string(), "joy".to_string()]
}

fn key() -> RunKey {
    RunKey {
        project: "proj1".to_string(),
        subj: "sub01".to_string(),
        sess: "ses1".to_string(),
        task: "movies".to_string(),
        model: "sep".to_string(),
        contrast: "stim".to_string(),
    }
}

fn table(n_vols: usize) -> ResultsTable {
    let mut grid = ScoreGrid::new(n_vols, 2);
    for t in 0..n_vols {
        grid.set(t, 0, t as f64);
        grid.set(t, 1, 1.5);
    }
    label_volumes(&grid, &roster()).unwrap()
}

#[test]
fn exists_tracks_persisted_rows() {
    let tmp = TempDir::new().unwrap();
    let mut store = Store::open(&tmp.path().join("results.db")).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();

    assert!(!store.exists("proj1", "sub01", "ses1", "movies").unwrap());
    let inserted = store
        .insert_rows(&key(), "gm_mask.bin", false, &roster(), &table(3))
        .unwrap();
    assert_eq!(inserted, 3);
    assert!(store.exists("proj1", "sub01", "ses1", "movies").unwrap());
    assert!(!store.exists("proj1", "sub01", "ses2", "movies").unwrap());
}

#[test]
fn duplicate_insert_is_ignored() {
    let tmp = TempDir::new().unwrap();
    let mut store = Store::open(&tmp.path().join("results.db")).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();

    store
        .insert_rows(&key(), "gm_mask.bin", false, &roster(), &table(3))
        .unwrap();
    let again = store
        .insert_rows(&key(), "gm_mask.bin", false, &roster(), &table(3))
        .unwrap();
    assert_eq!(again, 0);
    assert_eq!(store.count_rows("proj1", "sub01", "ses1", "movies").unwrap(), 3);
}

#[test]
fn schema_creation_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(&tmp.path().join("results.db")).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();
}

#[test]
fn subject_roster_sorted_and_deduplicated() {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(&tmp.path().join("results.db")).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();

    store.add_subject("sub02").unwrap();
    store.add_subject("sub01").unwrap();
    store.add_subject("sub02").unwrap();
    assert_eq!(store.subjects().unwrap(), vec!["sub01", "sub02"]);
}

#[test]
fn session_task_lookup() {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(&tmp.path().join("results.db")).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();

    assert!(store.session_task("sub01", "ses1").unwrap().is_none());
    store.set_session_task("sub01", "ses1", "movies").unwrap();
    assert_eq!(
        store.session_task("sub01", "ses1").unwrap().as_deref(),
        Some("movies")
    );
}

#[test]
fn hostile_identifiers_rejected() {
    let tmp = TempDir::new().unwrap();
    let store = Store::open(&tmp.path().join("results.db")).unwrap();
    assert!(store.ensure_schema("proj-1; drop", &roster()).is_err());
    assert!(store
        .ensure_schema("proj1", &["Joy!".to_string()])
        .is_err());
}
