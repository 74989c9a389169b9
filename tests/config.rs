use std::io::Write;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use zone_watch::config::{ZoneWatchConfig, CONFIG_ENV};
use zone_watch::{Error, Point, ZoneKind};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        CONFIG_ENV,
        "ZONE_WATCH_ZONE_TYPE",
        "ZONE_WATCH_ZONE_POINTS",
        "ZONE_WATCH_CONFIDENCE",
        "ZONE_WATCH_HISTORY",
        "ZONE_WATCH_SHADOWS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "input": "yard.mp4",
        "output": "yard_annotated.mp4",
        "zone": {
            "type": "polygon",
            "points": [[100, 50], [200, 50], [200, 150], [100, 150]]
        },
        "classifier": {
            "confidence_threshold": 0.4,
            "min_area": 800,
            "history": 200
        }
    }"#;
    file.write_all(json.as_bytes()).expect("write config");

    std::env::set_var(CONFIG_ENV, file.path());
    std::env::set_var("ZONE_WATCH_CONFIDENCE", "0.65");
    std::env::set_var("ZONE_WATCH_SHADOWS", "off");

    let cfg = ZoneWatchConfig::load().expect("load config");

    assert_eq!(cfg.input.as_deref(), Some("yard.mp4"));
    assert_eq!(cfg.output.as_deref(), Some("yard_annotated.mp4"));
    assert_eq!(cfg.zone_kind, ZoneKind::Polygon);
    assert_eq!(cfg.zone_points.len(), 4);
    assert_eq!(cfg.zone_points[2], Point::new(200, 150));
    assert_eq!(cfg.classifier.confidence_threshold, 0.65);
    assert_eq!(cfg.classifier.min_area, 800.0);
    assert_eq!(cfg.classifier.background.history, 200);
    assert!(!cfg.classifier.shadows_as_foreground);

    let zone = cfg.zone().expect("zone");
    assert!(zone.contains(Point::new(150, 100)));

    clear_env();
}

#[test]
fn loads_toml_file_with_line_zone_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
input = "gate.avi"

[zone]
type = "polygon"
points = [[0, 0], [10, 0], [10, 10]]

[classifier]
max_area = 20000.0
"#;
    file.write_all(toml.as_bytes()).expect("write config");

    std::env::set_var("ZONE_WATCH_ZONE_TYPE", "LINE");
    std::env::set_var("ZONE_WATCH_ZONE_POINTS", "10,20; 300,20");

    let cfg = ZoneWatchConfig::load_from(file.path()).expect("load config");

    assert_eq!(cfg.input.as_deref(), Some("gate.avi"));
    assert_eq!(cfg.zone_kind, ZoneKind::Line);
    assert_eq!(cfg.zone_points, vec![Point::new(10, 20), Point::new(300, 20)]);
    assert_eq!(cfg.classifier.max_area, 20000.0);

    clear_env();
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = ZoneWatchConfig::load().expect("load defaults");
    assert_eq!(cfg.input, None);
    assert_eq!(cfg.zone_kind, ZoneKind::Polygon);
    assert!(cfg.zone_points.is_empty());
    assert_eq!(cfg.classifier.confidence_threshold, 0.5);
    assert!(matches!(cfg.zone(), Err(Error::InvalidZone(_))));
}

#[test]
fn rejects_out_of_range_confidence() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("ZONE_WATCH_CONFIDENCE", "1.5");
    assert!(matches!(ZoneWatchConfig::load(), Err(Error::Config(_))));

    std::env::set_var("ZONE_WATCH_CONFIDENCE", "high");
    assert!(matches!(ZoneWatchConfig::load(), Err(Error::Config(_))));

    clear_env();
}

#[test]
fn rejects_unknown_zone_type_in_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(br#"{ "zone": { "type": "circle" } }"#)
        .expect("write config");

    let err = ZoneWatchConfig::load_from(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{err}");
}
