use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stray::{scan, Reporter, ScanError, TrackedSet};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

/// Create a temporary directory tree for testing.
///
/// Structure (t = tracked by the manifest below):
/// ```
/// tmp/
///   etc/
///     foo.conf        t
///     baz.conf
///   usr/
///     bin/
///       bar           t
///     share/
///       doc/
///         readme
/// ```
fn setup_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    fs::create_dir(root.join("etc")).unwrap();
    fs::write(root.join("etc/foo.conf"), "tracked").unwrap();
    fs::write(root.join("etc/baz.conf"), "untracked").unwrap();

    fs::create_dir_all(root.join("usr/bin")).unwrap();
    fs::write(root.join("usr/bin/bar"), "tracked").unwrap();
    fs::create_dir_all(root.join("usr/share/doc")).unwrap();
    fs::write(root.join("usr/share/doc/readme"), "untracked").unwrap();

    dir
}

fn manifest() -> TrackedSet {
    TrackedSet::from_paths(["etc/foo.conf", "usr/bin/bar"])
}

/// Keeps test output clean — reporting is asserted through `Results`.
struct Quiet;

impl Reporter for Quiet {
    fn on_untracked(&self, _path: &Path) {}
}

fn expected(root: &Path, rels: &[&str]) -> HashSet<PathBuf> {
    rels.iter().map(|rel| root.join(rel)).collect()
}

fn as_set(paths: &[PathBuf]) -> HashSet<PathBuf> {
    paths.iter().cloned().collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn reports_exactly_the_untracked_files() {
    let dir = setup_tree();
    let results = scan()
        .root(dir.path())
        .tracked(manifest())
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();

    assert_eq!(results.untracked, 2);
    assert_eq!(
        as_set(&results.paths),
        expected(dir.path(), &["etc/baz.conf", "usr/share/doc/readme"]),
    );
}

#[test]
fn tracked_files_are_never_reported() {
    let dir = setup_tree();
    let results = scan()
        .root(dir.path())
        .tracked(manifest())
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();

    let reported = as_set(&results.paths);
    assert!(!reported.contains(&dir.path().join("etc/foo.conf")));
    assert!(!reported.contains(&dir.path().join("usr/bin/bar")));
}

#[test]
fn repeated_scans_yield_the_same_set() {
    let dir = setup_tree();
    let scan_once = || {
        scan()
            .root(dir.path())
            .tracked(manifest())
            .collect_paths(true)
            .with_reporter(Quiet)
            .run()
            .unwrap()
    };

    let first = scan_once();
    let second = scan_once();
    assert_eq!(as_set(&first.paths), as_set(&second.paths));
    assert_eq!(first.untracked, second.untracked);
}

#[test]
fn trailing_slash_on_the_root_makes_no_difference() {
    let dir = setup_tree();
    let with_slash = format!("{}/", dir.path().display());

    let plain = scan()
        .root(dir.path())
        .tracked(manifest())
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();
    let slashed = scan()
        .root(with_slash)
        .tracked(manifest())
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();

    assert_eq!(as_set(&plain.paths), as_set(&slashed.paths));
}

#[test]
fn symlinks_are_gated_by_policy() {
    let dir = setup_tree();
    let link = dir.path().join("etc/link.conf");
    std::os::unix::fs::symlink("foo.conf", &link).unwrap();

    let without = scan()
        .root(dir.path())
        .tracked(manifest())
        .include_symlinks(false)
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();
    assert!(!as_set(&without.paths).contains(&link));

    let with = scan()
        .root(dir.path())
        .tracked(manifest())
        .include_symlinks(true)
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();
    let count = with.paths.iter().filter(|p| **p == link).count();
    assert_eq!(count, 1, "an untracked symlink is reported exactly once");
}

#[test]
fn fifos_are_never_reported() {
    use rustix::fs::{makedev, mknodat, FileType, Mode, CWD};

    let dir = setup_tree();
    let fifo = dir.path().join("etc/pipe");
    if mknodat(CWD, &fifo, FileType::Fifo, Mode::RUSR | Mode::WUSR, makedev(0, 0)).is_err() {
        // filesystem refuses fifos, nothing to assert
        return;
    }

    let results = scan()
        .root(dir.path())
        .tracked(manifest())
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();

    assert!(!as_set(&results.paths).contains(&fifo));
    assert_eq!(results.untracked, 2);
}

#[test]
fn unreadable_subtree_is_skipped_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = setup_tree();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("hidden"), "").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // running privileged, the chmod doesn't actually deny anything
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let results = scan()
        .root(dir.path())
        .tracked(manifest())
        .collect_paths(true)
        .collect_errors(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    // siblings of the unreadable directory are unaffected
    assert_eq!(
        as_set(&results.paths),
        expected(dir.path(), &["etc/baz.conf", "usr/share/doc/readme"]),
    );
    assert_eq!(results.skipped.len(), 1);
    assert!(results.skipped[0].is_recoverable());
    assert_eq!(results.skipped[0].path(), Some(&locked));
}

#[test]
fn silent_suppresses_the_denied_hook() {
    use std::os::unix::fs::PermissionsExt;

    struct CountDenied(Arc<AtomicUsize>);
    impl Reporter for CountDenied {
        fn on_untracked(&self, _path: &Path) {}
        fn on_denied(&self, _path: &Path) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    let dir = setup_tree();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    for (silent, hits) in [(false, 1), (true, 0)] {
        let counter = Arc::new(AtomicUsize::new(0));
        scan()
            .root(dir.path())
            .tracked(manifest())
            .silent(silent)
            .with_reporter(CountDenied(counter.clone()))
            .run()
            .unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), hits);
    }

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn matches_an_independent_enumeration() {
    let dir = setup_tree();

    // empty tracked set: the scan must report every regular file walkdir sees
    let results = scan()
        .root(dir.path())
        .include_symlinks(false)
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();

    let oracle: HashSet<PathBuf> = walkdir::WalkDir::new(dir.path())
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();

    assert_eq!(as_set(&results.paths), oracle);
    assert_eq!(results.untracked, oracle.len());
}

#[test]
fn parallel_roots_produce_the_union() {
    let first = setup_tree();
    let second = setup_tree();

    let results = scan()
        .roots([first.path(), second.path()])
        .tracked(manifest())
        .threads(2)
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();

    let mut want = expected(first.path(), &["etc/baz.conf", "usr/share/doc/readme"]);
    want.extend(expected(second.path(), &["etc/baz.conf", "usr/share/doc/readme"]));
    assert_eq!(as_set(&results.paths), want);
    assert_eq!(results.untracked, 4);
}

#[test]
fn base_makes_lookups_manifest_relative() {
    let dir = setup_tree();

    // searching only etc/, against a manifest rooted at the tree top
    let results = scan()
        .root(dir.path().join("etc"))
        .base(dir.path())
        .tracked(manifest())
        .collect_paths(true)
        .with_reporter(Quiet)
        .run()
        .unwrap();

    assert_eq!(
        as_set(&results.paths),
        expected(dir.path(), &["etc/baz.conf"]),
    );
}

#[test]
fn root_outside_the_base_is_rejected() {
    let dir = setup_tree();
    let elsewhere = tempfile::tempdir().unwrap();

    let err = scan()
        .root(elsewhere.path())
        .base(dir.path())
        .tracked(manifest())
        .with_reporter(Quiet)
        .run()
        .unwrap_err();

    assert!(matches!(err, ScanError::RootOutsideBase { .. }));
}

#[test]
fn missing_root_is_fatal() {
    let dir = setup_tree();
    let err = scan()
        .root(dir.path().join("does-not-exist"))
        .tracked(manifest())
        .with_reporter(Quiet)
        .run()
        .unwrap_err();

    assert!(matches!(err, ScanError::Open { .. }));
    assert!(!err.is_recoverable());
    assert!(err.os_error_code().is_some());
}

#[test]
fn no_roots_is_an_error() {
    let err = scan().tracked(manifest()).run().unwrap_err();
    assert!(matches!(err, ScanError::NoRoots));
}

#[test]
fn paths_empty_when_not_collecting() {
    let dir = setup_tree();
    let results = scan()
        .root(dir.path())
        .tracked(manifest())
        .with_reporter(Quiet)
        .run()
        .unwrap();

    assert!(
        results.paths.is_empty(),
        "paths should be empty when collect_paths is false"
    );
    assert_eq!(results.untracked, 2, "untracked should still be counted");
}

#[test]
fn skipped_empty_when_not_collecting() {
    let dir = setup_tree();
    let results = scan()
        .root(dir.path())
        .tracked(manifest())
        .with_reporter(Quiet)
        .run()
        .unwrap();

    assert!(results.skipped.is_empty());
}

#[test]
fn stats_are_populated() {
    let dir = setup_tree();
    let results = scan()
        .root(dir.path())
        .tracked(manifest())
        .with_reporter(Quiet)
        .run()
        .unwrap();

    assert!(results.stats.duration.as_nanos() > 0);
    assert_eq!(results.stats.files, 4);
    // root + etc + usr + usr/bin + usr/share + usr/share/doc
    assert_eq!(results.stats.dirs, 6);
}

#[test]
fn custom_reporter_sees_every_untracked_path() {
    struct Collecting(Arc<Mutex<Vec<PathBuf>>>);
    impl Reporter for Collecting {
        fn on_untracked(&self, path: &Path) {
            self.0.lock().unwrap().push(path.to_path_buf());
        }
    }

    let dir = setup_tree();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let results = scan()
        .root(dir.path())
        .tracked(manifest())
        .with_reporter(Collecting(seen.clone()))
        .run()
        .unwrap();

    let seen: HashSet<PathBuf> = seen.lock().unwrap().iter().cloned().collect();
    assert_eq!(
        seen,
        expected(dir.path(), &["etc/baz.conf", "usr/share/doc/readme"]),
    );
    assert_eq!(results.untracked, 2);
}
