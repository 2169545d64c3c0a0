//! Fake runtime executables for integration tests.
//!
//! Each [`FakeRuntime`] is a shell script in its own temporary directory,
//! standing in for `runc` on the command line. The directory (and any files
//! the script writes into it) disappears when the value is dropped.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Succeeds without output.
pub const TRUE: &str = "/bin/true";
/// Fails with status 1 without output.
pub const FALSE: &str = "/bin/false";

const SCRIPT_NAME: &str = "runtime";

pub struct FakeRuntime {
    dir: TempDir,
    path: PathBuf,
}

impl FakeRuntime {
    /// Script running `body` under `/bin/sh`.
    pub fn script(body: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix("runcvisor-fake-")
            .tempdir()
            .expect("create fake runtime directory");
        let path = dir.path().join(SCRIPT_NAME);

        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write fake runtime");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("make fake runtime executable");

        Self { dir, path }
    }

    /// Replaces itself with `sleep <secs>`, so its pid is the sleeper's.
    pub fn sleeper(secs: u64) -> Self {
        Self::script(&format!("exec /bin/sleep {}", secs))
    }

    /// Prints its arguments on one line and exits 1, so the arguments end up
    /// in the error message.
    pub fn echo_args() -> Self {
        Self::script("echo \"$@\"\nexit 1")
    }

    /// Records its arguments (one per line) to [`FakeRuntime::args_file`] and
    /// exits 0.
    pub fn recorder() -> Self {
        let runtime = Self::script("");
        let args_file = runtime.args_file();
        runtime.rewrite(&format!(
            "printf '%s\\n' \"$@\" > '{}'",
            args_file.display()
        ));
        runtime
    }

    /// Logs each SIGTERM to [`FakeRuntime::signals_file`] without exiting,
    /// touches [`FakeRuntime::ready_file`] and idles until killed.
    pub fn term_ignorer() -> Self {
        Self::trapping_term("")
    }

    /// Logs SIGTERM to [`FakeRuntime::signals_file`] and exits 0, once
    /// [`FakeRuntime::ready_file`] exists.
    pub fn term_handler() -> Self {
        Self::trapping_term("; exit 0")
    }

    // `wait` returns as soon as a trapped signal arrives, so the handler runs
    // immediately rather than after the current sleep.
    fn trapping_term(then: &str) -> Self {
        let runtime = Self::script("");
        let signals = runtime.signals_file();
        let ready = runtime.ready_file();
        runtime.rewrite(&format!(
            "trap \"echo TERM >> '{}'{}\" TERM\ntouch '{}'\nwhile :; do sleep 1 & wait $!; done",
            signals.display(),
            then,
            ready.display()
        ));
        runtime
    }

    /// Writes `stdout` verbatim and exits with `status`.
    pub fn printer(stdout: &str, status: i32) -> Self {
        let runtime = Self::script("");
        let data = runtime.dir.path().join("stdout");
        fs::write(&data, stdout).expect("write fake runtime output");
        runtime.rewrite(&format!("cat '{}'\nexit {}", data.display(), status));
        runtime
    }

    /// Path of the executable.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path as a string, for `RuncOptions::command`.
    pub fn command(&self) -> String {
        self.path.display().to_string()
    }

    pub fn args_file(&self) -> PathBuf {
        self.dir.path().join("args")
    }

    pub fn ready_file(&self) -> PathBuf {
        self.dir.path().join("ready")
    }

    pub fn signals_file(&self) -> PathBuf {
        self.dir.path().join("signals")
    }

    /// Signals logged by a [`FakeRuntime::term_ignorer`] or
    /// [`FakeRuntime::term_handler`], in arrival order.
    pub fn received_signals(&self) -> Vec<String> {
        fs::read_to_string(self.signals_file())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Arguments captured by a [`FakeRuntime::recorder`].
    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(self.args_file())
            .expect("read recorded args")
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn rewrite(&self, body: &str) {
        fs::write(&self.path, format!("#!/bin/sh\n{}\n", body)).expect("write fake runtime");
    }
}

/// Poll until `path` exists. Returns false on timeout.
pub fn wait_for_file(path: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    path.exists()
}
