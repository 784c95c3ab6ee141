// File naming for the output sink.
//
// A target like `a/b.log` is split into the prefix `a/b` and extension `.log`, and the window stamp
// goes between them: `a/b_20240315.log` for daily rotation, `a/b_20240315_14.log` for hourly.

use crate::config::Rotation;
use crate::time::LocalTime;

// The extension is the last '.' of the final path component and everything after it, provided the
// dot is neither the component's first character (dotfiles have no extension) nor its last.  A
// dot in a directory name never counts.  Without an extension the prefix is the whole path.

pub fn split_target(path: &str) -> (String, String) {
    let base = match path.rfind('/') {
        Some(ix) => ix + 1,
        None => 0,
    };
    match path[base..].rfind('.') {
        Some(dot) if dot > 0 && base + dot + 1 < path.len() => {
            let ix = base + dot;
            (path[..ix].to_string(), path[ix..].to_string())
        }
        _ => (path.to_string(), "".to_string()),
    }
}

pub fn compute_filename(prefix: &str, extension: &str, rotation: Rotation, t: &LocalTime) -> String {
    match rotation {
        Rotation::Never => format!("{prefix}{extension}"),
        Rotation::Daily => format!("{prefix}_{}{extension}", t.date_stamp()),
        Rotation::Hourly => format!("{prefix}_{}{extension}", t.hour_stamp()),
    }
}

#[test]
pub fn test_split_target() {
    let cases = [
        ("a/b.log", "a/b", ".log"),
        ("/tmp/out.log", "/tmp/out", ".log"),
        ("out.log", "out", ".log"),
        ("x.tar.gz", "x.tar", ".gz"),
        ("noext", "noext", ""),
        ("/var/log/noext", "/var/log/noext", ""),
        ("a.d/b", "a.d/b", ""),
        ("a/.hidden", "a/.hidden", ""),
        (".hidden", ".hidden", ""),
        ("a/b.", "a/b.", ""),
        ("a/.b.log", "a/.b", ".log"),
    ];
    for (path, prefix, extension) in cases {
        let (p, e) = split_target(path);
        assert!(p == prefix, "{path}: prefix {p}");
        assert!(e == extension, "{path}: extension {e}");
    }
}

#[test]
pub fn test_never_is_verbatim() {
    let times = [
        LocalTime::new(2024, 3, 15, 14, 0, 1),
        LocalTime::new(1999, 12, 31, 23, 59, 59),
        LocalTime::new(2030, 1, 1, 0, 0, 0),
    ];
    for path in ["/tmp/out.log", "noext", "a.d/b", "x.tar.gz", ".hidden"] {
        let (prefix, extension) = split_target(path);
        for t in &times {
            assert!(compute_filename(&prefix, &extension, Rotation::Never, t) == path);
        }
    }
}

#[test]
pub fn test_daily_names() {
    let (prefix, extension) = split_target("a/b.log");
    let morning = LocalTime::new(2024, 3, 15, 0, 0, 0);
    let evening = LocalTime::new(2024, 3, 15, 23, 59, 59);
    let tomorrow = LocalTime::new(2024, 3, 16, 0, 0, 0);
    let m = compute_filename(&prefix, &extension, Rotation::Daily, &morning);
    let e = compute_filename(&prefix, &extension, Rotation::Daily, &evening);
    let t = compute_filename(&prefix, &extension, Rotation::Daily, &tomorrow);
    assert!(m == "a/b_20240315.log");
    assert!(m == e);
    assert!(t == "a/b_20240316.log");
    assert!(compute_filename("noext", "", Rotation::Daily, &morning) == "noext_20240315");
}

#[test]
pub fn test_hourly_names() {
    let (prefix, extension) = split_target("/tmp/out.log");
    let a = LocalTime::new(2024, 3, 15, 13, 59, 59);
    let b = LocalTime::new(2024, 3, 15, 14, 0, 1);
    let c = LocalTime::new(2024, 3, 15, 14, 59, 0);
    let na = compute_filename(&prefix, &extension, Rotation::Hourly, &a);
    let nb = compute_filename(&prefix, &extension, Rotation::Hourly, &b);
    let nc = compute_filename(&prefix, &extension, Rotation::Hourly, &c);
    assert!(na == "/tmp/out_20240315_13.log");
    assert!(nb == "/tmp/out_20240315_14.log");
    assert!(nb == nc);

    // Crossing midnight changes both the date and the hour.
    let before = LocalTime::new(2024, 3, 15, 23, 30, 0);
    let after = LocalTime::new(2024, 3, 16, 0, 30, 0);
    assert!(compute_filename(&prefix, &extension, Rotation::Hourly, &before) == "/tmp/out_20240315_23.log");
    assert!(compute_filename(&prefix, &extension, Rotation::Hourly, &after) == "/tmp/out_20240316_00.log");
}
