use chrono::{TimeZone, Utc};
use image::Rgba;
use sketchpad::sketch::geometry::LayoutRect;
use sketchpad::sketch::save::{DirectorySink, EMPTY_DATA_URL};
use sketchpad::sketch::{PointerEvent, PointerInput, SketchApp, SketchSettings};

fn headless(settings: SketchSettings, dpr: f64) -> SketchApp {
    SketchApp::new(
        SketchSettings {
            cursors: Default::default(),
            ..settings
        },
        dpr,
    )
}

#[test]
fn export_is_page_sized_and_white_at_dpr_two() {
    let mut app = headless(SketchSettings::default(), 2.0);
    app.set_layout(
        LayoutRect::new(12.0, 40.0, 276.0, 150.0),
        LayoutRect::new(0.0, 0.0, 300.3, 200.2),
    );

    let export = app.export(Utc::now()).expect("export");
    assert_eq!(export.image.dimensions(), (601, 400));
    assert!(export.image.pixels().all(|px| *px == Rgba([255, 255, 255, 255])));
}

#[test]
fn strokes_land_at_canvas_offset_in_page() {
    let mut app = headless(SketchSettings::default(), 1.0);
    app.set_layout(
        LayoutRect::new(20.0, 30.0, 100.0, 100.0),
        LayoutRect::new(10.0, 10.0, 140.0, 140.0),
    );
    app.on_pointer_down(PointerEvent::new(1, 70.0, 80.0));
    app.on_pointer_up(PointerEvent::new(1, 70.0, 80.0));

    let export = app.export(Utc::now()).expect("export");
    // Client (70, 80) is (60, 70) from the page-stack origin.
    assert_eq!(export.image.get_pixel(60, 70), &Rgba([0x15, 0x15, 0x15, 255]));
    assert_eq!(export.image.get_pixel(5, 5), &Rgba([255, 255, 255, 255]));
}

#[test]
fn export_without_page_geometry_is_empty() {
    let app = headless(SketchSettings::default(), 1.0);
    let export = app.export(Utc::now()).expect("export");
    assert!(export.is_empty());
    assert_eq!(export.data_url(), EMPTY_DATA_URL);
}

#[test]
fn directory_sink_writes_decodable_png_with_prefix() {
    let dir = tempfile::tempdir().expect("temp dir");
    let settings = SketchSettings {
        export_prefix: "board".into(),
        ..SketchSettings::default()
    };
    let mut app = headless(settings, 1.0);
    app.set_layout(
        LayoutRect::new(0.0, 0.0, 64.0, 48.0),
        LayoutRect::new(0.0, 0.0, 64.0, 48.0),
    );

    let now = Utc.timestamp_millis_opt(1_700_000_000_000).single().expect("time");
    let export = app.export(now).expect("export");
    assert_eq!(export.filename, "board-1700000000000.png");

    let mut sink = DirectorySink::new(dir.path().join("out"));
    let path = app.save_to(&mut sink).expect("save").expect("path");
    let file_name = path.file_name().and_then(|n| n.to_str()).expect("name");
    assert!(file_name.starts_with("board-") && file_name.ends_with(".png"));

    let decoded = image::open(&path).expect("decode").to_rgba8();
    assert_eq!(decoded.dimensions(), (64, 48));
}
