#![allow(dead_code)]

use assert_cmd::Command;
use runcvisor_test_utils::FakeRuntime;
use std::time::Duration;

pub struct TestContext {
    pub cmd: Command,
    pub runtime: FakeRuntime,
}

impl TestContext {
    /// Another invocation against the same fake runtime.
    pub fn new_cmd(&self) -> Command {
        command_for(&self.runtime.command())
    }
}

/// `runcvisor --runtime <fake>` with the environment scrubbed.
pub fn command_for(runtime: &str) -> Command {
    let bin_path = env!("CARGO_BIN_EXE_runcvisor");
    let mut cmd = Command::new(bin_path);
    cmd.timeout(Duration::from_secs(30));
    cmd.env_remove("RUNCVISOR_RUNTIME")
        .env_remove("RUNCVISOR_ROOT")
        .env_remove("RUNCVISOR_CONFIG")
        .env_remove("RUST_LOG");
    cmd.arg("--runtime").arg(runtime);
    cmd
}

pub fn with_runtime(runtime: FakeRuntime) -> TestContext {
    let cmd = command_for(&runtime.command());
    TestContext { cmd, runtime }
}
