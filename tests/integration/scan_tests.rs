use super::support::MemoryFs;
use duplicut::duplicates::{DuplicateFinder, FinderConfig, ScanOutcome};
use duplicut::scanner::{HashAlgorithm, Hasher};
use duplicut::signal::CancelToken;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn scan(roots: &[PathBuf]) -> ScanOutcome {
    DuplicateFinder::with_defaults()
        .find_duplicates(roots, &CancelToken::new())
        .unwrap()
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let outcome = scan(&[dir.path().to_path_buf()]);

    assert!(outcome.groups().is_empty());
    let summary = outcome.summary();
    assert_eq!(summary.total_files, 0);
    assert_eq!(summary.processed_files, 0);
    assert_eq!(summary.errored_files, 0);
    assert_eq!(summary.duplicate_groups, 0);
}

#[test]
fn test_scan_hello_hello_world() {
    let dir = tempdir().unwrap();
    File::create(dir.path().join("a.txt"))
        .unwrap()
        .write_all(b"hello")
        .unwrap();
    File::create(dir.path().join("b.txt"))
        .unwrap()
        .write_all(b"hello")
        .unwrap();
    File::create(dir.path().join("c.txt"))
        .unwrap()
        .write_all(b"world")
        .unwrap();

    let outcome = scan(&[dir.path().to_path_buf()]);

    assert_eq!(outcome.groups().len(), 1);
    let group = &outcome.groups()[0];
    assert_eq!(
        group.paths,
        vec![dir.path().join("a.txt"), dir.path().join("b.txt")]
    );
    assert_eq!(group.fingerprint, Hasher::default().fingerprint_bytes(b"hello"));
    assert_eq!(
        group.fingerprint.to_hex(),
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(outcome.summary().processed_files, 3);
}

#[test]
fn test_scan_unique_files() {
    let dir = tempdir().unwrap();
    for (name, content) in [("a", "content a"), ("b", "content b"), ("c", "content c")] {
        fs::write(dir.path().join(name), content).unwrap();
    }

    let outcome = scan(&[dir.path().to_path_buf()]);
    assert!(outcome.groups().is_empty());
    assert_eq!(outcome.summary().total_files, 3);
}

#[test]
fn test_scan_across_multiple_roots() {
    let dir = tempdir().unwrap();
    let photos = dir.path().join("photos");
    let backup = dir.path().join("backup");
    fs::create_dir_all(photos.join("2023")).unwrap();
    fs::create_dir_all(&backup).unwrap();
    fs::write(photos.join("2023/beach.jpg"), b"jpeg bytes").unwrap();
    fs::write(backup.join("beach-copy.jpg"), b"jpeg bytes").unwrap();
    fs::write(backup.join("notes.txt"), b"notes").unwrap();

    let outcome = scan(&[photos.clone(), backup.clone()]);

    assert_eq!(outcome.groups().len(), 1);
    let members: HashSet<_> = outcome.groups()[0].paths.iter().cloned().collect();
    assert!(members.contains(&photos.join("2023/beach.jpg")));
    assert!(members.contains(&backup.join("beach-copy.jpg")));
}

#[test]
fn test_scan_nested_duplicates_and_three_way_group() {
    let dir = tempdir().unwrap();
    for rel in ["x/one", "x/y/two", "x/y/z/three"] {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"triplicate").unwrap();
    }
    fs::write(dir.path().join("pair1"), b"pair").unwrap();
    fs::write(dir.path().join("x/pair2"), b"pair").unwrap();

    let outcome = scan(&[dir.path().to_path_buf()]);
    let groups = outcome.groups();

    assert_eq!(groups.len(), 2);
    let sizes: Vec<usize> = groups.iter().map(|g| g.len()).collect();
    assert!(sizes.contains(&3));
    assert!(sizes.contains(&2));
    assert_eq!(outcome.summary().duplicate_files, 3);
}

#[test]
fn test_every_path_in_at_most_one_group() {
    let dir = tempdir().unwrap();
    for i in 0..30 {
        fs::write(dir.path().join(format!("f{:02}", i)), format!("{}", i % 4)).unwrap();
    }

    let outcome = scan(&[dir.path().to_path_buf()]);
    let mut seen = HashSet::new();
    for group in outcome.groups() {
        assert!(group.len() >= 2);
        for path in &group.paths {
            assert!(seen.insert(path.clone()), "{} in two groups", path.display());
            let content = fs::read(path).unwrap();
            assert_eq!(Hasher::default().fingerprint_bytes(&content), group.fingerprint);
        }
    }
    assert_eq!(outcome.groups().len(), 4);
}

#[test]
fn test_buffer_size_does_not_change_groups() {
    let dir = tempdir().unwrap();
    let big: Vec<u8> = (0..100_000u32).map(|i| (i * 31 % 251) as u8).collect();
    fs::write(dir.path().join("big1"), &big).unwrap();
    fs::write(dir.path().join("big2"), &big).unwrap();
    let roots = vec![dir.path().to_path_buf()];

    let mut fingerprints = Vec::new();
    for buffer_size in [1, 7, 4096, 32 * 1024, 1 << 20] {
        let finder = DuplicateFinder::new(FinderConfig::default().with_buffer_size(buffer_size));
        let outcome = finder.find_duplicates(&roots, &CancelToken::new()).unwrap();
        assert_eq!(outcome.groups().len(), 1, "buffer size {}", buffer_size);
        fingerprints.push(outcome.groups()[0].fingerprint);
    }
    assert!(fingerprints.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn test_blake3_algorithm() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"hello").unwrap();
    fs::write(dir.path().join("b"), b"hello").unwrap();

    let finder =
        DuplicateFinder::new(FinderConfig::default().with_algorithm(HashAlgorithm::Blake3));
    let outcome = finder
        .find_duplicates(&[dir.path().to_path_buf()], &CancelToken::new())
        .unwrap();

    assert_eq!(outcome.groups().len(), 1);
    assert_eq!(
        outcome.groups()[0].fingerprint,
        Hasher::new(HashAlgorithm::Blake3, 8).fingerprint_bytes(b"hello")
    );
}

#[test]
fn test_unopenable_file_is_counted() {
    let fs = MemoryFs::new().dir("/root").unreadable("/root/secret.bin");
    let finder = DuplicateFinder::with_filesystem(FinderConfig::default(), fs);

    let outcome = finder
        .find_duplicates(&[PathBuf::from("/root")], &CancelToken::new())
        .unwrap();

    assert!(!outcome.is_cancelled());
    assert!(outcome.groups().is_empty());
    assert_eq!(outcome.summary().errored_files, 1);
    assert_eq!(outcome.summary().processed_files, 0);
    assert_eq!(outcome.summary().total_files, 1);
}

#[test]
fn test_read_failure_does_not_abort_scan() {
    let fs = MemoryFs::new()
        .file("/r/a", b"same")
        .file("/r/b", b"same")
        .failing_read("/r/c", b"same");
    let finder = DuplicateFinder::with_filesystem(FinderConfig::default().with_buffer_size(2), fs);

    let outcome = finder
        .find_duplicates(&[PathBuf::from("/r")], &CancelToken::new())
        .unwrap();

    assert_eq!(outcome.summary().errored_files, 1);
    assert_eq!(outcome.summary().processed_files, 2);
    assert_eq!(outcome.groups().len(), 1);
    assert_eq!(
        outcome.groups()[0].paths,
        vec![PathBuf::from("/r/a"), PathBuf::from("/r/b")]
    );
}

#[test]
fn test_unlistable_directory_is_skipped() {
    let fs = MemoryFs::new()
        .file("/r/a/one", b"dup")
        .unlistable_dir("/r/b")
        .file("/r/c/two", b"dup");
    let finder = DuplicateFinder::with_filesystem(FinderConfig::default(), fs);

    let outcome = finder
        .find_duplicates(&[PathBuf::from("/r")], &CancelToken::new())
        .unwrap();

    assert_eq!(outcome.summary().skipped_dirs, 1);
    assert_eq!(outcome.groups().len(), 1);
}

#[test]
fn test_all_files_erroring_gives_no_groups() {
    let fs = MemoryFs::new()
        .unreadable("/r/a")
        .unreadable("/r/b")
        .unreadable("/r/c");
    let finder = DuplicateFinder::with_filesystem(FinderConfig::default(), fs);

    let outcome = finder
        .find_duplicates(&[PathBuf::from("/r")], &CancelToken::new())
        .unwrap();

    assert!(outcome.groups().is_empty());
    assert_eq!(outcome.summary().errored_files, 3);
}

#[test]
fn test_admitted_tasks_never_exceed_concurrency() {
    let mut fs = MemoryFs::new().with_read_delay(Duration::from_millis(3));
    for i in 0..40 {
        fs = fs.file(format!("/r/f{:02}", i), format!("{}", i % 5).as_bytes());
    }
    let stats = fs.stats();
    let finder = DuplicateFinder::with_filesystem(FinderConfig::default().with_concurrency(3), fs);

    let outcome = finder
        .find_duplicates(&[PathBuf::from("/r")], &CancelToken::new())
        .unwrap();

    assert!(stats.peak() <= 3, "peak readers {}", stats.peak());
    assert!(outcome.summary().peak_in_flight <= 3);
    assert!(outcome.summary().peak_in_flight >= 1);
    assert_eq!(stats.opens(), 40);
    assert_eq!(stats.in_flight(), 0);
    assert_eq!(outcome.summary().processed_files, 40);
    assert_eq!(outcome.groups().len(), 5);
}

#[test]
fn test_single_slot_runs_sequentially() {
    let mut fs = MemoryFs::new();
    for i in 0..10 {
        fs = fs.file(format!("/r/{}", i), b"x");
    }
    let stats = fs.stats();
    let finder = DuplicateFinder::with_filesystem(FinderConfig::default().with_concurrency(1), fs);

    let outcome = finder
        .find_duplicates(&[PathBuf::from("/r")], &CancelToken::new())
        .unwrap();

    assert_eq!(stats.peak(), 1);
    assert_eq!(outcome.groups()[0].len(), 10);
}

#[test]
fn test_large_ceiling_scans_quickly() {
    let fs = MemoryFs::new().file("/r/a", b"1").file("/r/b", b"1");
    let stats = fs.stats();
    let finder =
        DuplicateFinder::with_filesystem(FinderConfig::default().with_concurrency(20_000), fs);

    let started = std::time::Instant::now();
    let outcome = finder
        .find_duplicates(&[PathBuf::from("/r")], &CancelToken::new())
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(outcome.groups().len(), 1);
    assert_eq!(stats.opens(), 2);
    assert!(stats.peak() <= 2);
}
