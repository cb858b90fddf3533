use std::collections::BTreeMap;

use figcrop_core::{
    BoundingBox, Detection, ExcludeEach, FrameSize, PipelineError, PixelBox, RegionManifest,
    RegionTable, Replacements, SelectionCriteria, StaticDetector, crop, crop_all,
    generate_variants, recompose, run_detector, select_regions,
};
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgb, RgbImage};
use tempfile::tempdir;

fn person(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Detection {
    Detection {
        bbox: BoundingBox::new(x1, y1, x2, y2),
        class_id: 0,
        confidence,
    }
}

fn textured(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * 7 + y * 3) % 256) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

#[test]
fn reference_scene_pads_and_crops() {
    let image = textured(800, 600);
    let detector = StaticDetector::new(vec![person(100.0, 100.0, 200.0, 200.0, 0.9)]);

    let detections = run_detector(&detector, &image).expect("detect");
    let regions = select_regions(
        &detections,
        &SelectionCriteria::default(),
        FrameSize::of(&image),
        0.2,
    );
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].padded_box, PixelBox::new(80, 80, 220, 220));

    let crop = crop(&image, &regions[0]).expect("crop");
    assert_eq!(crop.image.dimensions(), (140, 140));
    assert_eq!(crop.image.get_pixel(0, 0), image.get_pixel(80, 80));
    assert_eq!(crop.image.get_pixel(139, 139), image.get_pixel(219, 219));
}

#[test]
fn unmodified_crops_recompose_to_the_original() {
    let image = textured(320, 240);
    let detections = vec![
        person(20.0, 30.0, 80.0, 200.0, 0.95),
        person(150.5, 10.2, 230.9, 235.0, 0.7),
        person(-15.0, 100.0, 40.0, 260.0, 0.5),
    ];
    let regions = select_regions(
        &detections,
        &SelectionCriteria::default(),
        FrameSize::of(&image),
        0.2,
    );
    let batch = crop_all(&image, &regions);
    assert!(batch.skipped.is_empty());

    let replacements: Replacements = batch
        .crops
        .into_iter()
        .map(|crop| (crop.id, crop.image))
        .collect();
    let table = RegionTable::from_regions(&regions);
    let out = recompose(&image, &table, &replacements).expect("recompose");
    assert_eq!(out, image);
}

#[test]
fn unmodified_sixteen_bit_crops_recompose_to_the_original() {
    let image = DynamicImage::ImageRgb16(ImageBuffer::from_fn(40, 30, |x, y| {
        Rgb([4007 + x as u16 * 131, 12345 + y as u16 * 257, (x * y) as u16 * 17])
    }));
    let detections = vec![
        person(5.0, 5.0, 10.0, 10.0, 0.9),
        person(20.0, 8.0, 36.0, 28.0, 0.8),
    ];
    let regions = select_regions(
        &detections,
        &SelectionCriteria::default(),
        FrameSize::of(&image),
        0.2,
    );
    let batch = crop_all(&image, &regions);
    assert_eq!(batch.crops.len(), 2);

    let replacements: Replacements = batch
        .crops
        .into_iter()
        .map(|crop| (crop.id, crop.image))
        .collect();
    let out = recompose(&image, &RegionTable::from_regions(&regions), &replacements)
        .expect("recompose");
    assert_eq!(out, image);
}

#[test]
fn empty_mapping_is_pixel_identical() {
    let image = textured(64, 64);
    let table: RegionTable = [(1, PixelBox::new(4, 4, 20, 20))].into_iter().collect();
    let out = recompose(&image, &table, &BTreeMap::new()).expect("recompose");
    assert_eq!(out, image);
}

#[test]
fn three_regions_replace_only_one_and_two() {
    let base = solid(300, 100, [10, 10, 10]);
    let detections = vec![
        person(10.0, 20.0, 60.0, 80.0, 0.9),
        person(110.0, 20.0, 160.0, 80.0, 0.8),
        person(210.0, 20.0, 260.0, 80.0, 0.85),
    ];
    let regions = select_regions(
        &detections,
        &SelectionCriteria::default(),
        FrameSize::of(&base),
        0.2,
    );
    let table = RegionTable::from_regions(&regions);

    let mut replacements = Replacements::new();
    replacements.insert(1, solid(7, 9, [255, 0, 0]));
    replacements.insert(2, solid(300, 2, [0, 0, 255]));

    let out = recompose(&base, &table, &replacements).expect("recompose").to_rgb8();

    let boxes: Vec<PixelBox> = regions.iter().map(|r| r.padded_box).collect();
    let inside = |b: &PixelBox, x: u32, y: u32| {
        (b.x1..b.x2).contains(&(x as i32)) && (b.y1..b.y2).contains(&(y as i32))
    };
    for (x, y, pixel) in out.enumerate_pixels() {
        let expected = if inside(&boxes[0], x, y) {
            [255, 0, 0]
        } else if inside(&boxes[1], x, y) {
            [0, 0, 255]
        } else {
            [10, 10, 10]
        };
        assert_eq!(pixel.0, expected, "pixel ({x}, {y})");
    }
}

#[test]
fn boxes_that_clip_away_are_skipped() {
    let image = textured(100, 100);
    let detections = vec![
        person(10.0, 10.0, 40.0, 40.0, 0.9),
        person(0.0, 20.0, 5.0, 60.0, 0.9),
        person(60.0, 60.0, 90.0, 90.0, 0.9),
    ];
    let regions = select_regions(
        &detections,
        &SelectionCriteria::default(),
        FrameSize::of(&image),
        -1.0,
    );

    let batch = crop_all(&image, &regions);
    assert!(batch.crops.is_empty());
    assert_eq!(batch.skipped.len(), 3);
    assert!(
        batch
            .skipped
            .iter()
            .all(|skip| matches!(skip.error, PipelineError::EmptyRegion { .. }))
    );

    let regions = select_regions(
        &detections,
        &SelectionCriteria::default(),
        FrameSize::of(&image),
        0.0,
    );
    let narrow = vec![person(150.0, 10.0, 155.0, 20.0, 0.9)];
    let outside = select_regions(
        &narrow,
        &SelectionCriteria::default(),
        FrameSize::of(&image),
        0.2,
    );
    let mut all = regions;
    all.extend(outside.into_iter().map(|mut region| {
        region.id = 4;
        region
    }));

    let batch = crop_all(&image, &all);
    let ids: Vec<u32> = batch.crops.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(batch.skipped[0].id, 4);
}

#[test]
fn manifest_bridges_crop_and_recompose() {
    let image = textured(200, 120);
    let detections = vec![
        person(10.0, 10.0, 60.0, 100.0, 0.9),
        person(90.0, 15.0, 140.0, 110.0, 0.3),
        person(120.0, 10.0, 180.0, 100.0, 0.8),
    ];
    let criteria = SelectionCriteria::default();
    let frame = FrameSize::of(&image);
    let regions = select_regions(&detections, &criteria, frame, 0.2);
    let ids: Vec<u32> = regions.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);

    let batch = crop_all(&image, &regions);
    let manifest = RegionManifest::from_batch(
        "scene.png",
        frame,
        0.2,
        &criteria,
        &regions,
        &batch,
        |id| Some(format!("person_{id}.png")),
    );
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("regions.json");
    manifest.save_to_path(&path).expect("save manifest");

    let loaded = RegionManifest::load_from_path(&path).expect("load manifest");
    let table = loaded.region_table();
    let replacements: Replacements = batch
        .crops
        .iter()
        .map(|crop| {
            let (w, h) = crop.image.dimensions();
            (crop.id, solid(w, h, [crop.id as u8 * 100, 0, 0]))
        })
        .collect();

    let report = generate_variants(&image, &table, &replacements, &ExcludeEach::default());
    assert!(report.failures.is_empty());
    let labels: Vec<&str> = report.variants.iter().map(|v| v.label.as_str()).collect();
    assert_eq!(labels, vec!["partial_replacement_1", "partial_replacement_2"]);

    // Variant 1 leaves region 1 untouched and replaces region 2.
    let variant = &report.variants[0].image;
    let first = table.get(1).expect("region 1");
    let second = table.get(2).expect("region 2");
    assert_eq!(
        variant.get_pixel(first.x1 as u32, first.y1 as u32),
        image.get_pixel(first.x1 as u32, first.y1 as u32)
    );
    assert_eq!(
        variant.get_pixel(second.x1 as u32 + 1, second.y1 as u32 + 1).0,
        [200, 0, 0, 255]
    );
}
