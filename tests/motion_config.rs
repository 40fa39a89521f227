use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tempfile::NamedTempFile;

use motion_witness::config::MotionConfig;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "MOTIONWITNESS_CONFIG",
        "MOTIONWITNESS_DEVICE",
        "MOTIONWITNESS_MIN_AREA",
        "MOTIONWITNESS_OUTPUT",
        "MOTIONWITNESS_TIMELINE",
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
        "device": "/dev/video2",
        "width": 320,
        "height": 240,
        "target_fps": 15,
        "fps_interval_secs": 1.5,
        "detection": {
            "min_contour_area": 500.0,
            "diff_threshold": 40,
            "blur_kernel": 11
        },
        "output": {
            "csv_path": "logs/front.csv"
        },
        "display": {
            "snapshot_path": "front.jpg",
            "snapshot_interval_secs": 0.5
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("MOTIONWITNESS_CONFIG", file.path());
    std::env::set_var("MOTIONWITNESS_MIN_AREA", "750");
    std::env::set_var("MOTIONWITNESS_TIMELINE", "logs/front.html");

    let cfg = MotionConfig::load().expect("load config");

    assert_eq!(cfg.device, "/dev/video2");
    assert_eq!(cfg.capture.width, 320);
    assert_eq!(cfg.capture.height, 240);
    assert_eq!(cfg.capture.target_fps, 15);
    assert_eq!(cfg.fps_interval, Duration::from_millis(1500));
    assert_eq!(cfg.detection.min_contour_area, 750.0);
    assert_eq!(cfg.detection.diff_threshold, 40);
    assert_eq!(cfg.detection.dilate_iterations, 2);
    assert_eq!(cfg.detection.blur_kernel, 11);
    assert_eq!(cfg.output.csv_path, PathBuf::from("logs/front.csv"));
    assert_eq!(cfg.output.timeline_path, PathBuf::from("logs/front.html"));
    assert!(cfg.output.render_timeline);
    assert_eq!(cfg.display.snapshot_path, Some(PathBuf::from("front.jpg")));
    assert_eq!(cfg.display.snapshot_interval, Duration::from_millis(500));

    clear_env();
}

#[test]
fn defaults_apply_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();
    std::env::set_var("MOTIONWITNESS_DEVICE", "stub://porch");

    let cfg = MotionConfig::load().expect("load config");

    assert_eq!(cfg.device, "stub://porch");
    assert_eq!(cfg.detection.min_contour_area, 1000.0);
    assert_eq!(cfg.output.csv_path, PathBuf::from("motion_intervals.csv"));
    assert!(!cfg.output.render_timeline);
    assert!(cfg.display.snapshot_path.is_none());

    clear_env();
}

#[test]
fn rejects_invalid_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("MOTIONWITNESS_MIN_AREA", "lots");
    assert!(MotionConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{ "detection": { "blur_kernel": 4 } }"#)
        .expect("write config");
    std::env::set_var("MOTIONWITNESS_CONFIG", file.path());
    assert!(MotionConfig::load().is_err());

    clear_env();
}
