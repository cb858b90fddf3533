use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use tempfile::tempdir;

const BASE_COLOR: Rgba<u8> = Rgba([120, 130, 140, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

fn figcrop(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_figcrop"))
        .args(args)
        .output()
        .expect("spawn figcrop")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

/// A 300x300 scene plus a detections file with two people, one weak person
/// and one non-person box.
fn write_scene(dir: &Path) -> (PathBuf, PathBuf) {
    let scene = dir.join("scene.png");
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(300, 300, BASE_COLOR))
        .save(&scene)
        .expect("save scene");

    let detections = dir.join("detections.json");
    fs::write(
        &detections,
        r#"[
            {"bbox": [100.0, 100.0, 200.0, 200.0], "class_id": 0, "confidence": 0.92},
            {"bbox": [5.0, 250.0, 40.0, 290.0], "class_id": 0, "confidence": 0.2},
            {"bbox": [20.0, 20.0, 60.0, 60.0], "class_id": 0, "confidence": 0.81},
            {"bbox": [200.0, 10.0, 290.0, 90.0], "class_id": 2, "confidence": 0.99}
        ]"#,
    )
    .expect("write detections");
    (scene, detections)
}

fn run_crop(scene: &Path, detections: &Path, out: &Path) -> Output {
    figcrop(&[
        "crop",
        "--input",
        path_str(scene),
        "--detections",
        path_str(detections),
        "--output-dir",
        path_str(out),
        "--format",
        "png",
    ])
}

#[test]
fn crop_writes_numbered_crops_and_manifest() {
    let dir = tempdir().expect("tempdir");
    let (scene, detections) = write_scene(dir.path());
    let out = dir.path().join("crops");

    let output = run_crop(&scene, &detections, &out);
    assert!(
        output.status.success(),
        "crop failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Person 1:\n  Padded Box: x1=80, y1=80, x2=220, y2=220"));
    assert!(stdout.contains("Person 2:\n  Padded Box: x1=12, y1=12, x2=68, y2=68"));

    let first = image::open(out.join("person_1.png")).expect("crop 1");
    assert_eq!(first.dimensions(), (140, 140));
    let second = image::open(out.join("person_2.png")).expect("crop 2");
    assert_eq!(second.dimensions(), (56, 56));
    assert!(!out.join("person_3.png").exists());

    let manifest: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("regions.json")).expect("manifest"))
            .expect("manifest json");
    let regions = manifest["regions"].as_array().expect("regions array");
    assert_eq!(regions.len(), 2);
    assert_eq!(regions[0]["padded_box"], serde_json::json!([80, 80, 220, 220]));
    assert_eq!(regions[1]["id"], 2);
}

#[test]
fn recompose_renders_one_variant_per_excluded_region() {
    let dir = tempdir().expect("tempdir");
    let (scene, detections) = write_scene(dir.path());
    let crops = dir.path().join("crops");
    assert!(run_crop(&scene, &detections, &crops).status.success());

    let edited = dir.path().join("edited");
    fs::create_dir_all(&edited).expect("edited dir");
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(50, 50, RED))
        .save(edited.join("person_1.png"))
        .expect("save edit 1");
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 30, BLUE))
        .save(edited.join("person_2.png"))
        .expect("save edit 2");

    let out = dir.path().join("variants");
    let output = figcrop(&[
        "recompose",
        "--base",
        path_str(&scene),
        "--manifest",
        path_str(&crops.join("regions.json")),
        "--replacements",
        path_str(&edited),
        "--output-dir",
        path_str(&out),
        "--format",
        "png",
    ]);
    assert!(
        output.status.success(),
        "recompose failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    // partial_replacement_1 leaves region 1 alone and replaces region 2.
    let without_first = image::open(out.join("partial_replacement_1.png"))
        .expect("variant 1")
        .to_rgba8();
    assert_eq!(*without_first.get_pixel(150, 150), BASE_COLOR);
    assert_eq!(*without_first.get_pixel(40, 40), BLUE);

    let without_second = image::open(out.join("partial_replacement_2.png"))
        .expect("variant 2")
        .to_rgba8();
    assert_eq!(*without_second.get_pixel(150, 150), RED);
    assert_eq!(*without_second.get_pixel(40, 40), BASE_COLOR);
    // Outside every padded box nothing changes.
    assert_eq!(*without_second.get_pixel(250, 250), BASE_COLOR);
}

#[test]
fn recompose_keeps_writing_after_a_save_failure() {
    let dir = tempdir().expect("tempdir");
    let (scene, detections) = write_scene(dir.path());
    let crops = dir.path().join("crops");
    assert!(run_crop(&scene, &detections, &crops).status.success());

    let out = dir.path().join("variants");
    // A directory squatting on the first variant's file name makes that save fail.
    fs::create_dir_all(out.join("partial_replacement_1.png")).expect("blocking dir");

    let output = figcrop(&[
        "recompose",
        "--base",
        path_str(&scene),
        "--manifest",
        path_str(&crops.join("regions.json")),
        "--replacements",
        path_str(&crops),
        "--output-dir",
        path_str(&out),
        "--format",
        "png",
    ]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("could not be saved"));
    assert!(out.join("partial_replacement_2.png").is_file());
}

#[test]
fn recompose_only_renders_requested_ids() {
    let dir = tempdir().expect("tempdir");
    let (scene, detections) = write_scene(dir.path());
    let crops = dir.path().join("crops");
    assert!(run_crop(&scene, &detections, &crops).status.success());

    let out = dir.path().join("variants");
    let output = figcrop(&[
        "recompose",
        "--base",
        path_str(&scene),
        "--manifest",
        path_str(&crops.join("regions.json")),
        "--replacements",
        path_str(&crops),
        "--output-dir",
        path_str(&out),
        "--only",
        "2,1",
        "--format",
        "png",
    ]);
    assert!(output.status.success());
    assert!(out.join("only_1_2.png").exists());
    assert!(!out.join("partial_replacement_1.png").exists());
}

#[test]
fn recompose_rejects_unknown_region_ids() {
    let dir = tempdir().expect("tempdir");
    let (scene, detections) = write_scene(dir.path());
    let crops = dir.path().join("crops");
    assert!(run_crop(&scene, &detections, &crops).status.success());

    let out = dir.path().join("variants");
    let output = figcrop(&[
        "recompose",
        "--base",
        path_str(&scene),
        "--manifest",
        path_str(&crops.join("regions.json")),
        "--replacements",
        path_str(&crops),
        "--output-dir",
        path_str(&out),
        "--only",
        "7",
    ]);
    assert!(!output.status.success());
    assert!(!out.join("only_7.jpg").exists());
}

#[test]
fn detect_prints_all_detections_as_json() {
    let dir = tempdir().expect("tempdir");
    let (scene, detections) = write_scene(dir.path());
    let json_path = dir.path().join("out").join("detections.json");

    let output = figcrop(&[
        "detect",
        "--input",
        path_str(&scene),
        "--detections",
        path_str(&detections),
        "--json",
        path_str(&json_path),
    ]);
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json_path).expect("json")).expect("valid json");
    assert_eq!(parsed["width"], 300);
    assert_eq!(parsed["detections"].as_array().map(Vec::len), Some(4));
}

#[test]
fn annotate_draws_manifest_boxes() {
    let dir = tempdir().expect("tempdir");
    let (scene, detections) = write_scene(dir.path());
    let crops = dir.path().join("crops");
    assert!(run_crop(&scene, &detections, &crops).status.success());

    let annotated = dir.path().join("annotated.png");
    let output = figcrop(&[
        "annotate",
        "--input",
        path_str(&scene),
        "--manifest",
        path_str(&crops.join("regions.json")),
        "--output",
        path_str(&annotated),
        "--padded",
    ]);
    assert!(output.status.success());

    let image = image::open(&annotated).expect("annotated").to_rgba8();
    assert_eq!(*image.get_pixel(100, 150), Rgba([255, 0, 0, 255]));
    assert_eq!(*image.get_pixel(80, 150), Rgba([0, 255, 0, 255]));
    assert_eq!(*image.get_pixel(150, 150), BASE_COLOR);
}

#[test]
fn missing_input_fails() {
    let dir = tempdir().expect("tempdir");
    let (_, detections) = write_scene(dir.path());
    let output = run_crop(
        &dir.path().join("missing.png"),
        &detections,
        &dir.path().join("crops"),
    );
    assert!(!output.status.success());
    assert!(!dir.path().join("crops").exists());
}
