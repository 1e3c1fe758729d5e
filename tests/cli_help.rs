use assert_cmd::Command;

#[test]
fn cli_help_smoke() {
    let mut cmd = Command::cargo_bin("restdot").unwrap();
    cmd.arg("--help");
    cmd.assert().success();
}

#[test]
fn run_requires_subjects() {
    let mut cmd = Command::cargo_bin("restdot").unwrap();
    cmd.args([
        "run",
        "--project",
        "proj1",
        "--work-dir",
        "w",
        "--data-dir",
        "d",
        "--db",
        "r.db",
    ]);
    cmd.assert().failure();
}
