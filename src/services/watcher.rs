//! Background source watcher
//!
//! Polls the modification times of the backing files and, when any of them
//! changes, re-exports the full record set and pushes it onto a channel. The
//! render loop is the only consumer and drains the channel once per frame.

use super::export::RecordSource;
use crate::error::{FetchError, WatchError};
use crate::model::Record;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info, warn};

/// A full record set produced by one export
pub type Batch = Vec<Record>;

/// Last-seen modification times of the backing files
#[derive(Debug)]
pub struct ChangeDetector {
    files: Vec<(PathBuf, SystemTime)>,
}

impl ChangeDetector {
    /// Verify every path is an existing file and record its current timestamp
    pub fn new(paths: &[PathBuf]) -> Result<Self, WatchError> {
        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            if !path.is_file() {
                return Err(WatchError::MissingFile(path.clone()));
            }
            let mtime = modified(path).map_err(|source| WatchError::Stat {
                path: path.clone(),
                source,
            })?;
            files.push((path.clone(), mtime));
        }
        Ok(Self { files })
    }

    /// Re-stat every file. Returns true if any timestamp differs from the last
    /// one seen, and remembers the new timestamps.
    ///
    /// Nothing is remembered unless every file could be read, so a change seen
    /// in a failed cycle is reported again by the next one.
    pub fn poll(&mut self) -> io::Result<bool> {
        let current = self
            .files
            .iter()
            .map(|(path, _)| modified(path))
            .collect::<io::Result<Vec<_>>>()?;

        let mut changed = false;
        for ((path, last), mtime) in self.files.iter_mut().zip(current) {
            if mtime != *last {
                debug!(path = %path.display(), "backing file changed");
                *last = mtime;
                changed = true;
            }
        }
        Ok(changed)
    }
}

fn modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Owner's side of a running watcher. Dropping it stops the thread.
#[derive(Debug)]
pub struct WatcherHandle {
    stop_tx: Option<Sender<()>>,
    /// Aborts an export that is still running when the watcher is stopped
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WatcherHandle {
    /// Signal the watcher thread and wait for it to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // The flag aborts a running export; dropping the sender ends the interval wait
        self.cancel.store(true, Ordering::SeqCst);
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("watcher thread panicked");
            }
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Start watching `paths`.
///
/// Fails if a backing file is missing or the first export fails. Otherwise the
/// first batch is already on `batches` when this returns, and a background
/// thread checks the files every `interval`.
pub fn spawn<S: RecordSource>(
    paths: &[PathBuf],
    mut source: S,
    interval: Duration,
    batches: Sender<Batch>,
) -> Result<WatcherHandle, WatchError> {
    let mut detector = ChangeDetector::new(paths)?;

    let cancel = Arc::new(AtomicBool::new(false));
    let initial = source.fetch(&cancel)?;
    info!(records = initial.len(), "initial export");
    // A closed channel only means nobody is listening any more
    let _ = batches.send(initial);

    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let thread_cancel = cancel.clone();
    let thread = thread::Builder::new()
        .name("source-watcher".to_string())
        .spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    debug!("watcher stopped");
                    break;
                }
            }

            if !poll_once(&mut detector, &mut source, &batches, &thread_cancel) {
                debug!("batch receiver closed, watcher exiting");
                break;
            }
        })
        .map_err(WatchError::Thread)?;

    Ok(WatcherHandle {
        stop_tx: Some(stop_tx),
        cancel,
        thread: Some(thread),
    })
}

/// One poll cycle. Returns false once the receiving side has gone away.
fn poll_once<S: RecordSource>(
    detector: &mut ChangeDetector,
    source: &mut S,
    batches: &Sender<Batch>,
    cancel: &AtomicBool,
) -> bool {
    match detector.poll() {
        Ok(false) => return true,
        Ok(true) => {}
        Err(e) => {
            warn!(error = %e, "could not read backing file timestamps");
            return true;
        }
    }

    match source.fetch(cancel) {
        Ok(records) => {
            info!(records = records.len(), "source changed, re-exported");
            batches.send(records).is_ok()
        }
        Err(FetchError::Cancelled) => {
            debug!("export cancelled by shutdown");
            true
        }
        Err(e) => {
            error!(error = %e, "export failed, keeping previous records");
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use tempfile::TempDir;

    const INTERVAL: Duration = Duration::from_millis(20);

    /// Source returning scripted results and counting calls
    struct FakeSource {
        calls: Arc<AtomicUsize>,
        fail_on: Vec<usize>,
    }

    impl FakeSource {
        fn new(fail_on: Vec<usize>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: calls.clone(),
                    fail_on,
                },
                calls,
            )
        }
    }

    impl RecordSource for FakeSource {
        fn fetch(&mut self, _cancel: &AtomicBool) -> Result<Vec<Record>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on.contains(&call) {
                return Err(FetchError::Timeout(Duration::from_millis(1)));
            }
            Ok(vec![Record::new().with("id", call as i64)])
        }
    }

    fn backing_files(dir: &TempDir) -> Vec<PathBuf> {
        let paths = vec![dir.path().join("backlog.data"), dir.path().join("pending.data")];
        for path in &paths {
            File::create(path).unwrap();
        }
        paths
    }

    fn touch(path: &Path, secs_ahead: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(secs_ahead))
            .unwrap();
    }

    #[test]
    fn test_missing_file_fails_fast() {
        let dir = TempDir::new().unwrap();
        let paths = vec![dir.path().join("backlog.data")];
        let (source, calls) = FakeSource::new(vec![]);
        let (tx, _rx) = mpsc::channel();

        let err = spawn(&paths, source, INTERVAL, tx).unwrap_err();
        assert!(matches!(err, WatchError::MissingFile(p) if p == paths[0]));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_initial_fetch_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let (source, _calls) = FakeSource::new(vec![1]);
        let (tx, _rx) = mpsc::channel();

        let err = spawn(&paths, source, INTERVAL, tx).unwrap_err();
        assert!(matches!(err, WatchError::InitialFetch(FetchError::Timeout(_))));
    }

    #[test]
    fn test_detector_reports_changes_once() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let mut detector = ChangeDetector::new(&paths).unwrap();

        assert!(!detector.poll().unwrap());
        touch(&paths[1], 10);
        assert!(detector.poll().unwrap());
        assert!(!detector.poll().unwrap());
    }

    #[test]
    fn test_change_survives_a_failed_stat_cycle() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let mut detector = ChangeDetector::new(&paths).unwrap();
        let pending_mtime = modified(&paths[1]).unwrap();

        touch(&paths[0], 10);
        fs::remove_file(&paths[1]).unwrap();
        assert!(detector.poll().is_err());

        // pending.data comes back untouched; the backlog change is still due
        let file = File::create(&paths[1]).unwrap();
        file.set_modified(pending_mtime).unwrap();
        assert!(detector.poll().unwrap());
        assert!(!detector.poll().unwrap());
    }

    /// Source whose second export hangs until it is cancelled
    struct HangingSource {
        calls: Arc<AtomicUsize>,
    }

    impl RecordSource for HangingSource {
        fn fetch(&mut self, cancel: &AtomicBool) -> Result<Vec<Record>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call == 1 {
                return Ok(vec![Record::new().with("id", 1)]);
            }
            let deadline = Instant::now() + Duration::from_secs(30);
            while Instant::now() < deadline {
                if cancel.load(Ordering::SeqCst) {
                    return Err(FetchError::Cancelled);
                }
                thread::sleep(Duration::from_millis(5));
            }
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_stop_aborts_running_export() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let calls = Arc::new(AtomicUsize::new(0));
        let source = HangingSource {
            calls: calls.clone(),
        };
        let (tx, rx) = mpsc::channel();

        let handle = spawn(&paths, source, INTERVAL, tx).unwrap();
        rx.recv().unwrap();

        touch(&paths[0], 10);
        while calls.load(Ordering::SeqCst) < 2 {
            thread::sleep(INTERVAL);
        }

        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unchanged_files_never_re_export() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let (source, calls) = FakeSource::new(vec![]);
        let (tx, rx) = mpsc::channel();

        let handle = spawn(&paths, source, INTERVAL, tx).unwrap();
        assert_eq!(rx.try_recv().unwrap().len(), 1);

        thread::sleep(INTERVAL * 10);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());
        handle.stop();
    }

    #[test]
    fn test_change_triggers_full_re_export() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let (source, calls) = FakeSource::new(vec![]);
        let (tx, rx) = mpsc::channel();

        let handle = spawn(&paths, source, INTERVAL, tx).unwrap();
        rx.recv().unwrap();

        touch(&paths[0], 10);
        let batch = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(batch[0].get("id"), Some(&crate::model::Value::Integer(2)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        handle.stop();
    }

    #[test]
    fn test_failed_export_is_skipped_and_polling_continues() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let (source, calls) = FakeSource::new(vec![2]);
        let (tx, rx) = mpsc::channel();

        let handle = spawn(&paths, source, INTERVAL, tx).unwrap();
        rx.recv().unwrap();

        touch(&paths[0], 10);
        // second call fails: nothing is published
        while calls.load(Ordering::SeqCst) < 2 {
            thread::sleep(INTERVAL);
        }
        assert!(rx.try_recv().is_err());

        touch(&paths[1], 20);
        let batch = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(batch[0].get("id"), Some(&crate::model::Value::Integer(3)));
        handle.stop();
    }

    #[test]
    fn test_stop_ends_thread_and_closes_channel() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let (source, _calls) = FakeSource::new(vec![]);
        let (tx, rx) = mpsc::channel();

        let handle = spawn(&paths, source, Duration::from_secs(60), tx).unwrap();
        rx.recv().unwrap();

        // returns promptly even though the interval is a minute
        handle.stop();
        assert!(matches!(
            rx.recv_timeout(Duration::from_secs(1)),
            Err(RecvTimeoutError::Disconnected)
        ));
    }

    #[test]
    fn test_watcher_exits_when_receiver_dropped() {
        let dir = TempDir::new().unwrap();
        let paths = backing_files(&dir);
        let (source, calls) = FakeSource::new(vec![]);
        let (tx, rx) = mpsc::channel();

        let handle = spawn(&paths, source, INTERVAL, tx).unwrap();
        drop(rx);

        touch(&paths[0], 10);
        while calls.load(Ordering::SeqCst) < 2 {
            thread::sleep(INTERVAL);
        }
        // the thread has exited on its own; stop just joins it
        handle.stop();
    }
}
