#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tempfile::TempDir;

#[allow(dead_code)]
pub const CMD_TIMEOUT: Duration = Duration::from_secs(30);

/// Config used by every test run: no politeness delay, short timeout.
const TEST_CONFIG: &str = "[discovery]\nprobe_delay_ms = 0\n\n[fetch]\ntimeout_secs = 5\n";

struct TestConfig {
    _dir: TempDir,
    path: PathBuf,
}

fn config_file() -> &'static Path {
    static CONFIG: OnceLock<TestConfig> = OnceLock::new();
    &CONFIG
        .get_or_init(|| {
            let dir = tempfile::tempdir().expect("failed to create config dir for tests");
            let path = dir.path().join("config.toml");
            std::fs::write(&path, TEST_CONFIG).expect("failed to write test config");
            TestConfig { _dir: dir, path }
        })
        .path
}

/// Create a configured `smap` command suitable for integration tests.
#[allow(dead_code)]
pub fn smap_cmd() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("smap"));
    cmd.timeout(CMD_TIMEOUT);
    cmd.env("SMAP_CONFIG", config_file());
    cmd.env("NO_COLOR", "1");
    cmd
}
