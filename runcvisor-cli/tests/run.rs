use predicates::prelude::*;
use runcvisor_test_utils::{FALSE, FakeRuntime, TRUE};
use std::io::Write;

mod common;

#[test]
fn test_run_success() {
    common::command_for(TRUE)
        .args(["run", "--bundle", "/bundles/c1", "c1"])
        .assert()
        .success();
}

#[test]
fn test_run_propagates_runtime_status() {
    common::command_for(FALSE)
        .args(["run", "c1"])
        .assert()
        .failure()
        .code(1);

    let mut ctx = common::with_runtime(FakeRuntime::script("exit 7"));
    ctx.cmd
        .args(["run", "c1"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("exit status 7"));
}

#[test]
fn test_run_args() {
    let mut ctx = common::with_runtime(FakeRuntime::recorder());
    ctx.cmd
        .args(["run", "-b", "/bundles/c1", "--detach", "--no-pivot", "c1", "--", "--keep"])
        .assert()
        .success();
    assert_eq!(
        ctx.runtime.recorded_args(),
        ["run", "--bundle", "/bundles/c1", "--no-pivot", "--detach", "--keep", "c1"]
    );
}

#[test]
fn test_config_file_supplies_options() {
    let runtime = FakeRuntime::recorder();
    let mut config = tempfile::NamedTempFile::new().unwrap();
    write!(
        config,
        r#"{{"command": "{}", "root": "/run/from-config", "debug": true}}"#,
        runtime.command()
    )
    .unwrap();

    let bin_path = env!("CARGO_BIN_EXE_runcvisor");
    assert_cmd::Command::new(bin_path)
        .env_remove("RUNCVISOR_RUNTIME")
        .env("RUNCVISOR_CONFIG", config.path())
        .args(["start", "c1"])
        .assert()
        .success();

    assert_eq!(
        runtime.recorded_args(),
        ["--root", "/run/from-config", "--debug", "start", "c1"]
    );
}
