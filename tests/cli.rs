use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn wayearth_cmd() -> Command {
    Command::cargo_bin("wayearth").expect("binary exists")
}

#[test]
fn wayearth_help_prints_usage() {
    wayearth_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Shaded globe with city markers for Wayland compositors",
        ))
        .stdout(predicate::str::contains("--root"))
        .stdout(predicate::str::contains("--markerfile"));
}

#[test]
fn version_includes_package_version() {
    wayearth_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn requires_wayland_env() {
    let temp = TempDir::new().unwrap();
    wayearth_cmd()
        .env_remove("WAYLAND_DISPLAY")
        .env("XDG_CONFIG_HOME", temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("WAYLAND_DISPLAY not set"));
}

#[test]
fn unreachable_display_fails_to_connect() {
    let temp = TempDir::new().unwrap();
    wayearth_cmd()
        .env("XDG_CONFIG_HOME", temp.path())
        .env("XDG_RUNTIME_DIR", temp.path())
        .env("WAYLAND_DISPLAY", "wayearth-test-no-such-socket")
        .env_remove("WAYLAND_SOCKET")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "failed to connect to the Wayland display",
        ));
}

#[test]
fn rejects_unknown_projection() {
    wayearth_cmd()
        .args(["--proj", "azimuthal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown projection"));
}

#[test]
fn rejects_malformed_position() {
    wayearth_cmd()
        .args(["--pos", "95,10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("latitude 95 outside"));
}

#[test]
fn invalid_config_file_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    std::fs::write(&path, "[view\nlatitude = ").unwrap();

    wayearth_cmd()
        .env_remove("WAYLAND_DISPLAY")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}
