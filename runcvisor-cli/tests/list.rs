use predicates::prelude::*;
use runcvisor_test_utils::FakeRuntime;

mod common;

const TWO_CONTAINERS: &str = r#"[
  {"id":"web","pid":4242,"status":"running","bundle":"/bundles/web","rootfs":"/bundles/web/rootfs","created":"2024-03-01T12:00:00Z"},
  {"id":"db","pid":0,"status":"stopped","bundle":"/bundles/db","rootfs":"/bundles/db/rootfs","created":"2024-03-01T12:05:00Z"}
]"#;

#[test]
fn test_list_table() {
    let mut ctx = common::with_runtime(FakeRuntime::printer(TWO_CONTAINERS, 0));
    ctx.cmd
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("ID"))
        .stdout(predicate::str::contains("STATUS"))
        .stdout(predicate::str::contains("web"))
        .stdout(predicate::str::contains("running"))
        .stdout(predicate::str::contains("stopped"));
}

#[test]
fn test_list_quiet() {
    let mut ctx = common::with_runtime(FakeRuntime::printer(TWO_CONTAINERS, 0));
    ctx.cmd
        .args(["ls", "-q"])
        .assert()
        .success()
        .stdout("web\ndb\n");
}

#[test]
fn test_list_json() {
    let mut ctx = common::with_runtime(FakeRuntime::printer(TWO_CONTAINERS, 0));
    let output = ctx.cmd.args(["list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    assert_eq!(parsed[0]["id"], "web");
}

#[test]
fn test_list_empty_root() {
    let mut ctx = common::with_runtime(FakeRuntime::printer("null", 0));
    ctx.cmd
        .args(["list", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_list_missing_runtime() {
    common::command_for("/nonexistent/runc")
        .arg("list")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to start"));
}
