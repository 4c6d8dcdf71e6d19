use std::fs;
use std::process::{Command, Output};

use tempfile::TempDir;

fn learngl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_learngl"))
        .env_remove("LEARNGL_CONFIG")
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("failed to run learngl")
}

#[test]
fn lessons_lists_every_lesson() {
    let output = learngl(&["lessons"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["first-triangle", "two-triangles", "vertex-colors", "pulse", "offset"] {
        assert!(stdout.contains(name), "missing {name} in:\n{stdout}");
    }
}

#[test]
fn show_prints_a_single_stage() {
    let output = learngl(&["show", "offset", "--stage", "vertex"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("uniform float hOffset"));
    assert!(stdout.contains("gl_Position"));
    assert!(!stdout.contains("FragColor"));
}

#[test]
fn show_without_stage_prints_both() {
    let output = learngl(&["show", "pulse"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pulse vertex shader"));
    assert!(stdout.contains("pulse fragment shader"));
    assert!(stdout.contains("greenValue"));
}

#[test]
fn unknown_lesson_is_rejected() {
    let output = learngl(&["show", "textures"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown lesson"));
}

#[test]
fn invalid_config_fails_before_opening_a_window() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("learngl.toml");
    fs::write(&config, "[clear]\ncolor = [2.0, 0.0, 0.0, 1.0]\n").unwrap();

    let output = learngl(&[
        "--config",
        config.to_str().unwrap(),
        "run",
        "first-triangle",
    ]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("clear color"), "unexpected stderr:\n{stderr}");
}

#[test]
fn missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let absent = dir.path().join("absent.toml");

    let output = learngl(&["--config", absent.to_str().unwrap(), "run", "offset"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config file not found"));
}
