use std::fs;
use std::path::Path;

use restdot::ctx::{Ctx, RunKey, UnitState};
use restdot::db::Store;
use restdot::fetch::LocalSync;
use restdot::pipeline::Pipeline;
use restdot::pipeline::stage0_scaffold::Stage0Scaffold;
use restdot::pipeline::stage1_guard::Stage1Guard;
use restdot::pipeline::stage2_fetch::Stage2Fetch;
use restdot::pipeline::stage3_maps::Stage3Maps;
use restdot::pipeline::stage4_score::Stage4Score;
use restdot::pipeline::stage5_label::Stage5Label;
use restdot::pipeline::stage6_persist::Stage6Persist;
use restdot::series::writer::write_volumes;
use restdot::setup;
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

/// Synthetic 2x2x2 series with hand-checkable volumes:
/// - vol 1 is constant, so every z-score and dot product is zero;
/// - vol 2 z-scores to [-1,-1,-1,-1, 1, 1, 1, 1] (mean 4, sd 4);
/// - vol 3 z-scores to [-1, 1,-1, 1,-1, 1,-1, 1] (mean 2, sd 1).
fn seed_data_root(root: &Path) {
    fs::create_dir_all(root.join("sub01/ses1")).unwrap();
    fs::create_dir_all(root.join("masks")).unwrap();
    fs::create_dir_all(root.join("classifier")).unwrap();

    let mut series = vec![2.0f32; 8];
    series.extend([0.0, 0.0, 0.0, 0.0, 8.0, 8.0, 8.0, 8.0]);
    series.extend([1.0, 3.0, 1.0, 3.0, 1.0, 3.0, 1.0, 3.0]);
    write_volumes(&root.join("sub01/ses1/rest_series.bin"), [2, 2, 2], &series).unwrap();
    write_volumes(&root.join("masks/gm_mask.bin"), [2, 2, 2], &[1.0; 8]).unwrap();

    // fear weights pick the back half of the grid, joy every odd voxel.
    let tsv = "emo_id\tv0\tv1\tv2\tv3\tv4\tv5\tv6\tv7\n\
               fear\t0\t0\t0\t0\t1\t1\t1\t1\n\
               joy\t0\t1\t0\t1\t0\t1\t0\t1\n";
    fs::write(root.join("classifier/weights_sep_movies_stim.tsv"), tsv).unwrap();
}

fn run_unit(db: &Path, work: &Path, data: &Path, key: &RunKey) -> (UnitState, anyhow::Result<()>) {
    let store = Store::open(db).unwrap();
    let mut ctx = Ctx::new(
        key.clone(),
        work,
        "gm_mask.bin".to_string(),
        false,
        0,
        roster(),
        store,
        "0.0.0-test",
    );
    let fetch = LocalSync::new(data.to_path_buf());
    let pipeline = Pipeline::new(vec![
        Box::new(Stage0Scaffold::new()),
        Box::new(Stage1Guard::new()),
        Box::new(Stage2Fetch::new(Box::new(fetch))),
        Box::new(Stage3Maps::new()),
        Box::new(Stage4Score::new()),
        Box::new(Stage5Label::new()),
        Box::new(Stage6Persist::new()),
    ]);
    let result = pipeline.run(&mut ctx);
    (ctx.state, result)
}

#[test]
fn three_volume_pipeline() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    let work = tmp.path().join("work");
    let db = tmp.path().join("results.db");
    seed_data_root(&data);

    let fetch = LocalSync::new(data.clone());
    setup::ensure_maps(&fetch, &work, "gm_mask.bin", "sep", "movies", "stim", &roster()).unwrap();

    let store = Store::open(&db).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();
    drop(store);

    let (state, result) = run_unit(&db, &work, &data, &key());
    result.unwrap();
    assert_eq!(state, UnitState::Persisted);

    // Expected dot products per volume: constant volume scores zero for
    // both maps and the tie goes to fear (earlier roster label); vol 2
    // projects 4 onto fear, vol 3 projects 4 onto joy.
    let expected = [
        (0.0f64, 0.0f64, "fear"),
        (4.0, 0.0, "fear"),
        (0.0, 4.0, "joy"),
    ];

    let tsv_path = work.join("sub01/ses1/dotprod_model-sep_con-stim_task-movies.tsv");
    let content = fs::read_to_string(&tsv_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "volume\temo_fear\temo_joy\tlabel_max");
    for (i, (fear, joy, label)) in expected.iter().enumerate() {
        let fields: Vec<&str> = lines[i + 1].split('\t').collect();
        assert_eq!(fields[0], (i + 1).to_string());
        assert!((fields[1].parse::<f64>().unwrap() - fear).abs() < 1e-6);
        assert!((fields[2].parse::<f64>().unwrap() - joy).abs() < 1e-6);
        assert_eq!(fields[3], *label);
    }

    let store = Store::open(&db).unwrap();
    assert_eq!(store.count_rows("proj1", "sub01", "ses1", "movies").unwrap(), 3);

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(work.join("sub01/ses1/report_model-sep_con-stim_task-movies.json"))
            .unwrap(),
    )
    .unwrap();
    assert_eq!(report["n_vols"], 3);
    assert_eq!(report["run_meta"]["subj"], "sub01");
    assert_eq!(report["label_counts"][0]["count"], 2);

    // The fetched series copy is transient and removed after persist.
    assert!(!work.join("sub01/ses1/rest_series.bin").exists());
}

#[test]
fn second_run_skips_without_rescoring() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    let work = tmp.path().join("work");
    let db = tmp.path().join("results.db");
    seed_data_root(&data);

    let fetch = LocalSync::new(data.clone());
    setup::ensure_maps(&fetch, &work, "gm_mask.bin", "sep", "movies", "stim", &roster()).unwrap();
    let store = Store::open(&db).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();
    drop(store);

    let (first, result) = run_unit(&db, &work, &data, &key());
    result.unwrap();
    assert_eq!(first, UnitState::Persisted);

    let (second, result) = run_unit(&db, &work, &data, &key());
    result.unwrap();
    assert_eq!(second, UnitState::Skipped);

    let store = Store::open(&db).unwrap();
    assert_eq!(store.count_rows("proj1", "sub01", "ses1", "movies").unwrap(), 3);
}

#[test]
fn shape_mismatch_fails_unit_and_persists_nothing() {
    let tmp = TempDir::new().unwrap();
    let data = tmp.path().join("data");
    let work = tmp.path().join("work");
    let db = tmp.path().join("results.db");
    seed_data_root(&data);

    // Overwrite the series with a spatial shape the mask does not have.
    write_volumes(
        &data.join("sub01/ses1/rest_series.bin"),
        [2, 2, 1],
        &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
    )
    .unwrap();

    let store = Store::open(&db).unwrap();
    store.ensure_schema("proj1", &roster()).unwrap();
    drop(store);

    let (state, result) = run_unit(&db, &work, &data, &key());
    let err = result.unwrap_err();
    let err = err.downcast::<restdot::error::RunError>().unwrap();
    assert_eq!(err.kind(), "shape_mismatch");
    assert_eq!(state, UnitState::Failed);

    let store = Store::open(&db).unwrap();
    assert_eq!(store.count_rows("proj1", "sub01", "ses1", "movies").unwrap(), 0);
}
