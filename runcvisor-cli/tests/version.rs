use predicates::prelude::*;
use runcvisor_test_utils::FakeRuntime;

mod common;

#[test]
fn test_version_banner() {
    let banner = "runc version 1.1.12\ncommit: v1.1.12-0-g51d5e946\nspec: 1.0.2-dev\n";
    let mut ctx = common::with_runtime(FakeRuntime::printer(banner, 0));
    ctx.cmd
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("runcvisor version"))
        .stdout(predicate::str::contains("version 1.1.12"))
        .stdout(predicate::str::contains("spec: 1.0.2-dev"));
}

#[test]
fn test_version_unrecognized_banner() {
    let mut ctx = common::with_runtime(FakeRuntime::printer("something else\n", 0));
    ctx.cmd
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("unrecognized version banner"));
}

#[test]
fn test_state_and_events() {
    let state = r#"{"id":"c1","pid":9,"status":"paused","bundle":"/b","rootfs":"/b/rootfs","created":"2024-03-01T12:00:00Z"}"#;
    let mut ctx = common::with_runtime(FakeRuntime::printer(state, 0));
    ctx.cmd
        .args(["state", "c1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"paused\""));

    let events = concat!(
        r#"{"type":"stats","id":"c1","data":{"pids":{"current":2}}}"#,
        "\nnoise\n",
        r#"{"type":"oom","id":"c1"}"#,
        "\n"
    );
    let ctx = common::with_runtime(FakeRuntime::printer(events, 0));
    let output = ctx.new_cmd().args(["events", "c1", "--interval", "1"]).output().unwrap();
    assert!(output.status.success());

    let lines: Vec<_> = String::from_utf8(output.stdout).unwrap().lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("\"type\":\"stats\""));
    assert!(lines[1].contains("\"type\":\"oom\""));
}
