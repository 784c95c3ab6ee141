// Output sink tests against scratch directories.

use crate::config::{Config, Rotation};
use crate::datasink::OutputSink;
use crate::error::SinkError;
use crate::time::LocalTime;

use std::fs;
use std::path::Path;

fn file_config(path: &Path, rotate: Option<Rotation>) -> Config {
    Config::new("inproc://test", &path.to_string_lossy(), rotate, 250).unwrap()
}

#[test]
pub fn sink_no_rotation_concatenates_test() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.log");
    let now = LocalTime::new(2024, 3, 15, 13, 59, 59);
    let mut sink = OutputSink::new(&file_config(&target, None), now).unwrap();
    assert!(sink.current_path() == Some(target.as_path()));

    for (i, m) in ["a\n", "b\n", "c\n"].iter().enumerate() {
        let later = LocalTime::new(2024, 3, 16 + i as u32, 10, 0, 0);
        assert!(!sink.rotate_if_needed(later).unwrap());
        sink.write(m).unwrap();
    }
    sink.close();

    assert!(fs::read_to_string(&target).unwrap() == "a\nb\nc\n");
    assert!(sink.files_opened() == 1);
    assert!(fs::read_dir(dir.path()).unwrap().count() == 1);
}

#[test]
pub fn sink_writes_verbatim_test() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("raw");
    let now = LocalTime::new(2024, 3, 15, 0, 0, 0);
    let mut sink = OutputSink::new(&file_config(&target, None), now).unwrap();
    sink.write("no newline").unwrap();
    sink.write("").unwrap();
    sink.write(" and two\n\n").unwrap();
    // Flushed on every write, so the data is visible before close.
    assert!(fs::read_to_string(&target).unwrap() == "no newline and two\n\n");
}

#[test]
pub fn sink_appends_to_existing_test() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.log");
    let now = LocalTime::new(2024, 3, 15, 14, 0, 0);
    let daily = dir.path().join("out_20240315.log");
    fs::write(&daily, "earlier\n").unwrap();

    let mut sink = OutputSink::new(&file_config(&target, Some(Rotation::Daily)), now).unwrap();
    assert!(sink.current_path() == Some(daily.as_path()));
    sink.write("later\n").unwrap();
    drop(sink);

    assert!(fs::read_to_string(&daily).unwrap() == "earlier\nlater\n");
}

#[test]
pub fn sink_hourly_rotation_test() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.log");
    let first = LocalTime::new(2024, 3, 15, 13, 59, 59);
    let second = LocalTime::new(2024, 3, 15, 14, 0, 1);
    let mut sink = OutputSink::new(&file_config(&target, Some(Rotation::Hourly)), first).unwrap();

    assert!(!sink.rotate_if_needed(first).unwrap());
    sink.write("one\n").unwrap();
    assert!(sink.rotate_if_needed(second).unwrap());
    sink.write("two\n").unwrap();
    sink.close();

    let f13 = dir.path().join("out_20240315_13.log");
    let f14 = dir.path().join("out_20240315_14.log");
    assert!(fs::read_to_string(f13).unwrap() == "one\n");
    assert!(fs::read_to_string(f14).unwrap() == "two\n");
    assert!(sink.files_opened() == 2);
}

#[test]
pub fn sink_daily_rotation_test() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("app.txt");
    let t0 = LocalTime::new(2024, 3, 15, 0, 0, 0);
    let mut sink = OutputSink::new(&file_config(&target, Some(Rotation::Daily)), t0).unwrap();

    // Hour changes within the day do not rotate a daily sink.
    for h in [1, 12, 23] {
        assert!(!sink.rotate_if_needed(LocalTime::new(2024, 3, 15, h, 30, 0)).unwrap());
        sink.write(&format!("{h}\n")).unwrap();
    }
    // Idle for several days, then a message: one rotation to the new day.
    assert!(sink.rotate_if_needed(LocalTime::new(2024, 3, 19, 8, 0, 0)).unwrap());
    sink.write("later\n").unwrap();
    sink.close();

    assert!(fs::read_to_string(dir.path().join("app_20240315.txt")).unwrap() == "1\n12\n23\n");
    assert!(fs::read_to_string(dir.path().join("app_20240319.txt")).unwrap() == "later\n");
    assert!(fs::read_dir(dir.path()).unwrap().count() == 2);
}

#[test]
pub fn sink_rotation_idempotent_test() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.log");
    let t0 = LocalTime::new(2024, 3, 15, 10, 0, 0);
    let t1 = LocalTime::new(2024, 3, 15, 11, 5, 0);
    let mut sink = OutputSink::new(&file_config(&target, Some(Rotation::Hourly)), t0).unwrap();
    assert!(sink.files_opened() == 1);
    assert!(sink.rotate_if_needed(t1).unwrap());
    assert!(!sink.rotate_if_needed(t1).unwrap());
    assert!(sink.files_opened() == 2);
}

#[test]
pub fn sink_open_error_test() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("missing").join("out.log");
    let now = LocalTime::new(2024, 3, 15, 10, 0, 0);
    match OutputSink::new(&file_config(&target, None), now) {
        Err(SinkError::Open { path, .. }) => assert!(path == target),
        _ => panic!("expected an open error"),
    }
}

#[test]
pub fn sink_rotate_error_test() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.log");
    let t0 = LocalTime::new(2024, 3, 15, 10, 0, 0);
    let t1 = LocalTime::new(2024, 3, 15, 11, 0, 0);
    let mut sink = OutputSink::new(&file_config(&target, Some(Rotation::Hourly)), t0).unwrap();
    sink.write("kept\n").unwrap();

    // Occupy the next window's name with a directory so that opening it fails.
    let blocker = dir.path().join("out_20240315_11.log");
    fs::create_dir(&blocker).unwrap();
    match sink.rotate_if_needed(t1) {
        Err(SinkError::Rotate { path, .. }) => assert!(path == blocker),
        _ => panic!("expected a rotate error"),
    }
    // Nothing goes to a stale file after a failed rotation.
    assert!(matches!(sink.write("lost\n"), Err(SinkError::Write { .. })));
    assert!(fs::read_to_string(dir.path().join("out_20240315_10.log")).unwrap() == "kept\n");
}

#[test]
pub fn sink_stdout_never_rotates_test() {
    let config = Config::new("inproc://test", "-", Some(Rotation::Daily), 250).unwrap();
    let mut sink = OutputSink::new(&config, LocalTime::new(2024, 3, 15, 10, 0, 0)).unwrap();
    assert!(sink.current_path().is_none());
    assert!(!sink.rotate_if_needed(LocalTime::new(2024, 3, 20, 10, 0, 0)).unwrap());
    assert!(sink.files_opened() == 0);
    sink.write("").unwrap();
}
