use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

const SCENE: &str = r#"<scene>
  <object>
    <name>Camera</name>
    <type>camera</type>
    <position>0 2 10</position>
  </object>
  <object>
    <name>Sun</name>
    <type>directional</type>
    <position>5 10 7</position>
  </object>
  <object>
    <name>Ball</name>
    <type>sphere</type>
    <position>1 0.5 0</position>
    <color>255 0 0</color>
  </object>
  <object>
    <name>Tri</name>
    <type>model</type>
    <mesh>tri.obj</mesh>
    <position>-2 0 0</position>
  </object>
</scene>
"#;

const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

fn scene_dir(with_model: bool) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::write(dir.path().join("scene.xml"), SCENE).expect("write scene");
    if with_model {
        fs::write(dir.path().join("tri.obj"), TRIANGLE).expect("write model");
    }
    dir
}

#[test]
fn summary_lists_objects_and_final_state() {
    let dir = scene_dir(true);
    let mut cmd = Command::cargo_bin("orbit-viewer").expect("binary exists");
    cmd.arg(dir.path().join("scene.xml")).arg("--summary-only");
    cmd.assert()
        .success()
        .stdout(contains("Loaded scene with 4 objects (1 lights)"))
        .stdout(contains(" - Ball (sphere)"))
        .stdout(contains(" - Tri (model)"))
        .stdout(contains("Final object states:"))
        .stdout(contains(" - Ball pos=(1.00, 0.50, 0.00) color=(1.00, 0.00, 0.00)"))
        .stdout(contains(" - Tri pos=(-2.00, 0.00, 0.00)"));
}

#[test]
fn missing_model_is_skipped() {
    let dir = scene_dir(false);
    let mut cmd = Command::cargo_bin("orbit-viewer").expect("binary exists");
    cmd.arg(dir.path().join("scene.xml"))
        .arg("--summary-only")
        .arg("--frames")
        .arg("10");
    cmd.assert()
        .success()
        .stdout(contains("Simulated 10 frame(s)"))
        .stdout(contains(" - Ball pos=(1.00, 0.50, 0.00)"))
        .stdout(contains(" - Tri pos=").not());
}

#[test]
fn unknown_flags_are_rejected() {
    let dir = scene_dir(true);
    let mut cmd = Command::cargo_bin("orbit-viewer").expect("binary exists");
    cmd.arg(dir.path().join("scene.xml")).arg("--run-scripts");
    cmd.assert()
        .failure()
        .stderr(contains("Unknown argument: --run-scripts"));
}
