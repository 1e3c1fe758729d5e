use std::fs::{self, File};
use std::io::Write;

use flate2::Compression;
use flate2::write::GzEncoder;
use restdot::ctx::RunKey;
use restdot::error::RunError;
use restdot::fetch::{Fetch, LocalSync};
use tempfile::TempDir;

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

#[test]
fn copies_series_from_data_root() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("data");
    let dest = tmp.path().join("work");
    fs::create_dir_all(root.join("sub01/ses1")).unwrap();
    fs::write(root.join("sub01/ses1/rest_series.bin"), b"payload").unwrap();

    let fetch = LocalSync::new(root);
    let path = fetch.fetch_series(&key(), &dest).unwrap();
    assert_eq!(path, dest.join("rest_series.bin"));
    assert_eq!(fs::read(&path).unwrap(), b"payload");
}

#[test]
fn gunzips_compressed_source() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("data");
    let dest = tmp.path().join("work");
    fs::create_dir_all(root.join("masks")).unwrap();
    let mut enc = GzEncoder::new(
        File::create(root.join("masks/gm_mask.bin.gz")).unwrap(),
        Compression::default(),
    );
    enc.write_all(b"mask-bytes").unwrap();
    enc.finish().unwrap();

    let fetch = LocalSync::new(root);
    let path = fetch.fetch_mask("gm_mask.bin", &dest).unwrap();
    assert_eq!(path, dest.join("gm_mask.bin"));
    assert_eq!(fs::read(&path).unwrap(), b"mask-bytes");
}

#[test]
fn existing_destination_not_refetched() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("data");
    let dest = tmp.path().join("work");
    fs::create_dir_all(root.join("classifier")).unwrap();
    fs::create_dir_all(&dest).unwrap();
    fs::write(root.join("classifier/weights_sep_movies_stim.tsv"), b"new").unwrap();
    fs::write(dest.join("weights_sep_movies_stim.tsv"), b"cached").unwrap();

    let fetch = LocalSync::new(root);
    let path = fetch.fetch_weights("sep", "movies", "stim", &dest).unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"cached");
}

#[test]
fn missing_source_reports_fetch_failure() {
    let tmp = TempDir::new().unwrap();
    let fetch = LocalSync::new(tmp.path().join("data"));
    let err = fetch
        .fetch_series(&key(), &tmp.path().join("work"))
        .unwrap_err();
    let err = err.downcast::<RunError>().unwrap();
    assert_eq!(err.kind(), "fetch_failure");
    assert!(err.to_string().contains("rest_series.bin"));
}
