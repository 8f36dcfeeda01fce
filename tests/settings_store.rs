use sketchpad::sketch::model::{Color, Tool};
use sketchpad::sketch::settings_store::{load_from_path, save_to_path, SETTINGS_FILE_NAME};
use sketchpad::sketch::{SketchApp, SketchSettings};

#[test]
fn saved_settings_configure_a_new_app() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    let settings = SketchSettings {
        default_tool: Tool::Eraser,
        stroke_color: Color::rgb(0x33, 0x66, 0x99),
        stroke_size: 7.0,
        cursors: Default::default(),
        ..SketchSettings::default()
    };
    save_to_path(&path, &settings).expect("save");

    let loaded = load_from_path(&path).expect("load");
    assert_eq!(loaded, settings);

    let app = SketchApp::new(loaded, 1.0);
    assert_eq!(app.config().tool, Tool::Eraser);
    assert!(app.buttons().is_pressed(Tool::Eraser));
    assert_eq!(app.color_label(), "#336699");
    assert_eq!(app.size_label(), "7 px");
}

#[test]
fn hand_written_file_is_sanitized() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    std::fs::write(
        &path,
        r##"{ "stroke_color": "#abc", "stroke_size": -1, "default_tool": "eraser" }"##,
    )
    .expect("write");

    let loaded = load_from_path(&path).expect("load");
    assert_eq!(loaded.stroke_color, Color::rgb(0xaa, 0xbb, 0xcc));
    assert_eq!(loaded.stroke_size, 10.0);
    assert_eq!(loaded.default_tool, Tool::Eraser);
}

#[test]
fn unknown_tool_name_fails_to_load() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(SETTINGS_FILE_NAME);
    std::fs::write(&path, r#"{ "default_tool": "marker" }"#).expect("write");
    assert!(load_from_path(&path).is_err());
}
