use super::support::{wait_until, MemoryFs, ReadGate};
use duplicut::duplicates::{FinderConfig, ScanOutcome};
use duplicut::progress::{Phase, ProgressCallback, ProgressSnapshot};
use duplicut::roots::RootSet;
use duplicut::session::{ScanEvent, ScanSession, SessionState};
use duplicut::signal::CancelToken;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn roots(paths: &[&str]) -> RootSet {
    RootSet::from_paths(paths.iter().map(PathBuf::from)).unwrap()
}

fn many_files(count: usize) -> MemoryFs {
    let mut fs = MemoryFs::new();
    for i in 0..count {
        fs = fs.file(format!("/data/file{:03}", i), format!("{}", i % 10).as_bytes());
    }
    fs
}

#[test]
fn test_session_completes_with_groups() {
    let fs = MemoryFs::new()
        .file("/data/a", b"hello")
        .file("/data/b", b"hello")
        .file("/data/c", b"world");

    let handle =
        ScanSession::start_with_filesystem(&roots(&["/data"]), FinderConfig::default(), fs)
            .unwrap();
    let events: Vec<ScanEvent> = handle.events().iter().collect();

    let finished: Vec<&ScanOutcome> = events
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Finished(outcome) => Some(outcome),
            _ => None,
        })
        .collect();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].groups().len(), 1);

    assert_eq!(handle.state(), SessionState::Completed);
    let outcome = handle.wait().unwrap();
    assert_eq!(
        outcome.groups()[0].paths,
        vec![PathBuf::from("/data/a"), PathBuf::from("/data/b")]
    );
}

#[test]
fn test_progress_published_for_every_task() {
    let fs = MemoryFs::new()
        .file("/data/a", b"1")
        .unreadable("/data/b")
        .file("/data/c", b"1")
        .file("/data/d", b"2");

    let handle =
        ScanSession::start_with_filesystem(&roots(&["/data"]), FinderConfig::default(), fs)
            .unwrap();
    let snapshots: Vec<ProgressSnapshot> = handle
        .events()
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress(s) => Some(s),
            _ => None,
        })
        .collect();

    assert_eq!(snapshots.len(), 4);
    assert!(snapshots.windows(2).all(|w| w[0].done() <= w[1].done()));
    let last = snapshots.last().unwrap();
    assert_eq!(last.processed, 3);
    assert_eq!(last.errored, 1);
    assert_eq!(last.total, 4);
    assert!(snapshots.iter().all(|s| s.total == 4 && s.done() <= s.total));

    let final_progress = handle.progress();
    assert_eq!(final_progress.done(), 4);
    handle.wait().unwrap();
}

#[test]
fn test_progress_events_arrive_in_order() {
    let mut fs = many_files(120).with_read_delay(Duration::from_millis(1));
    for i in 0..10 {
        fs = fs.unreadable(format!("/data/locked{:02}", i));
    }
    let stats = fs.stats();

    let handle = ScanSession::start_with_filesystem(
        &roots(&["/data"]),
        FinderConfig::default().with_concurrency(8),
        fs,
    )
    .unwrap();
    let snapshots: Vec<ProgressSnapshot> = handle
        .events()
        .iter()
        .filter_map(|e| match e {
            ScanEvent::Progress(s) => Some(s),
            _ => None,
        })
        .collect();

    assert_eq!(snapshots.len(), 130);
    for pair in snapshots.windows(2) {
        assert!(pair[0].done() <= pair[1].done(), "{:?} then {:?}", pair[0], pair[1]);
        assert!(pair[0].processed <= pair[1].processed);
        assert!(pair[0].errored <= pair[1].errored);
    }
    assert_eq!(snapshots.last().unwrap().done(), 130);
    assert!(stats.peak() > 1);
    handle.wait().unwrap();
}

#[test]
fn test_phase_events_in_order() {
    let fs = MemoryFs::new().file("/data/a", b"x");
    let handle =
        ScanSession::start_with_filesystem(&roots(&["/data"]), FinderConfig::default(), fs)
            .unwrap();

    let phases: Vec<(Phase, bool)> = handle
        .events()
        .iter()
        .filter_map(|e| match e {
            ScanEvent::PhaseStarted { phase, .. } => Some((phase, true)),
            ScanEvent::PhaseFinished(phase) => Some((phase, false)),
            _ => None,
        })
        .collect();

    assert_eq!(
        phases,
        vec![
            (Phase::Enumerating, true),
            (Phase::Enumerating, false),
            (Phase::Hashing, true),
            (Phase::Hashing, false),
        ]
    );
    handle.wait().unwrap();
}

#[test]
fn test_cancel_mid_hashing_discards_results() {
    let gate = ReadGate::new();
    let fs = many_files(100).with_gate(Arc::clone(&gate));
    let stats = fs.stats();

    let handle = ScanSession::start_with_filesystem(
        &roots(&["/data"]),
        FinderConfig::default().with_concurrency(4),
        fs,
    )
    .unwrap();

    assert!(wait_until(Duration::from_secs(10), || stats.in_flight() == 4));
    assert_eq!(handle.state(), SessionState::Hashing);

    handle.cancel();
    gate.release();

    let outcome = handle.wait().unwrap();
    assert!(outcome.is_cancelled());
    assert!(outcome.groups().is_empty());
    let summary = outcome.summary();
    assert!(summary.processed_files + summary.errored_files <= summary.total_files);
    assert!(summary.processed_files + summary.errored_files < 100);
    assert!(stats.opens() < 100);
}

#[test]
fn test_cancelled_session_reports_finished_once() {
    let gate = ReadGate::new();
    let fs = many_files(20).with_gate(Arc::clone(&gate));
    let stats = fs.stats();

    let handle = ScanSession::start_with_filesystem(
        &roots(&["/data"]),
        FinderConfig::default().with_concurrency(2),
        fs,
    )
    .unwrap();
    assert!(wait_until(Duration::from_secs(10), || stats.in_flight() == 2));

    handle.cancel();
    handle.cancel();
    gate.release();

    let finished: Vec<ScanEvent> = handle
        .events()
        .iter()
        .filter(|e| matches!(e, ScanEvent::Finished(_)))
        .collect();
    assert_eq!(finished.len(), 1);
    assert!(matches!(&finished[0], ScanEvent::Finished(o) if o.is_cancelled()));
    assert_eq!(handle.state(), SessionState::Cancelled);
}

#[test]
fn test_cancel_after_completion_is_noop() {
    let fs = MemoryFs::new().file("/data/a", b"x").file("/data/b", b"x");
    let handle =
        ScanSession::start_with_filesystem(&roots(&["/data"]), FinderConfig::default(), fs)
            .unwrap();

    for _ in handle.events().iter() {}
    assert_eq!(handle.state(), SessionState::Completed);
    assert!(wait_until(Duration::from_secs(10), || handle.is_finished()));

    handle.cancel();
    assert_eq!(handle.state(), SessionState::Completed);
    let outcome = handle.wait().unwrap();
    assert!(!outcome.is_cancelled());
    assert_eq!(outcome.groups().len(), 1);
}

#[test]
fn test_concurrent_sessions_are_independent() {
    let gate = ReadGate::new();
    let blocked = many_files(30).with_gate(Arc::clone(&gate));
    let blocked_stats = blocked.stats();
    let free = MemoryFs::new().file("/other/a", b"z").file("/other/b", b"z");

    let first = ScanSession::start_with_filesystem(
        &roots(&["/data"]),
        FinderConfig::default().with_concurrency(2),
        blocked,
    )
    .unwrap();
    let second =
        ScanSession::start_with_filesystem(&roots(&["/other"]), FinderConfig::default(), free)
            .unwrap();

    assert!(wait_until(Duration::from_secs(10), || blocked_stats.in_flight() == 2));
    first.cancel();
    gate.release();

    let second_outcome = second.wait().unwrap();
    assert!(!second_outcome.is_cancelled());
    assert_eq!(second_outcome.groups().len(), 1);
    assert!(first.wait().unwrap().is_cancelled());
}

#[test]
fn test_dropping_handle_cancels_session() {
    let gate = ReadGate::new();
    let fs = many_files(50).with_gate(Arc::clone(&gate));
    let stats = fs.stats();

    let handle = ScanSession::start_with_filesystem(
        &roots(&["/data"]),
        FinderConfig::default().with_concurrency(2),
        fs,
    )
    .unwrap();
    assert!(wait_until(Duration::from_secs(10), || stats.in_flight() == 2));

    let token = handle.cancel_token();
    let releaser = {
        let gate = Arc::clone(&gate);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            gate.release();
        })
    };
    drop(handle);
    releaser.join().unwrap();

    assert!(token.is_cancelled());
    assert!(stats.opens() < 50);
}

struct CountingCallback {
    progress: AtomicUsize,
    phases: AtomicUsize,
}

impl ProgressCallback for CountingCallback {
    fn on_phase_start(&self, _phase: Phase, _total: usize) {
        self.phases.fetch_add(1, Ordering::SeqCst);
    }
    fn on_progress(&self, _snapshot: &ProgressSnapshot) {
        self.progress.fetch_add(1, Ordering::SeqCst);
    }
    fn on_phase_end(&self, _phase: Phase) {}
}

#[test]
fn test_caller_callback_still_invoked() {
    let callback = Arc::new(CountingCallback {
        progress: AtomicUsize::new(0),
        phases: AtomicUsize::new(0),
    });
    let fs = many_files(12);

    let handle = ScanSession::start_with_filesystem(
        &roots(&["/data"]),
        FinderConfig::default().with_progress_callback(callback.clone()),
        fs,
    )
    .unwrap();
    handle.wait().unwrap();

    assert_eq!(callback.progress.load(Ordering::SeqCst), 12);
    assert_eq!(callback.phases.load(Ordering::SeqCst), 2);
}

#[test]
fn test_empty_root_set() {
    let handle =
        ScanSession::start_with_filesystem(&RootSet::new(), FinderConfig::default(), MemoryFs::new())
            .unwrap();
    let outcome = handle.wait().unwrap();
    assert!(!outcome.is_cancelled());
    assert!(outcome.groups().is_empty());
    assert_eq!(outcome.summary().total_files, 0);
}

#[test]
fn test_token_cancelled_before_start() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let fs = many_files(10);
    let stats = fs.stats();

    let handle = ScanSession::start_with_cancel(
        &roots(&["/data"]),
        FinderConfig::default(),
        fs,
        cancel.clone(),
    )
    .unwrap();
    assert!(handle.cancel_token().same_as(&cancel));

    let outcome = handle.wait().unwrap();
    assert!(outcome.is_cancelled());
    assert!(outcome.groups().is_empty());
    assert_eq!(stats.opens(), 0);
}

#[test]
fn test_caller_token_cancels_running_session() {
    let gate = ReadGate::new();
    let fs = many_files(40).with_gate(Arc::clone(&gate));
    let stats = fs.stats();
    let cancel = CancelToken::new();

    let handle = ScanSession::start_with_cancel(
        &roots(&["/data"]),
        FinderConfig::default().with_concurrency(2),
        fs,
        cancel.clone(),
    )
    .unwrap();
    assert!(wait_until(Duration::from_secs(10), || stats.in_flight() == 2));

    cancel.cancel();
    gate.release();

    assert!(handle.wait().unwrap().is_cancelled());
    assert!(stats.opens() < 40);
}
