//! Record export from an external command
//!
//! Runs the export command, captures its standard output and parses it into
//! records. The child is killed if it does not finish within the timeout, or
//! as soon as the caller raises the cancel flag.

use crate::error::FetchError;
use crate::model::{parse_records, Record};
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How often a running export is checked for completion
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Anything that can produce the full record set on demand
pub trait RecordSource: Send + 'static {
    /// Long-running sources should give up with `FetchError::Cancelled`
    /// once `cancel` is set.
    fn fetch(&mut self, cancel: &AtomicBool) -> Result<Vec<Record>, FetchError>;
}

/// How a running export ended
enum Wait {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// Export through an external command, e.g. `task export`
#[derive(Debug, Clone)]
pub struct CommandExport {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandExport {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Command line for log messages
    pub fn display_command(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the command and return its standard output
    fn run(&self, cancel: &AtomicBool) -> Result<Vec<u8>, FetchError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| FetchError::Spawn {
                command: self.display_command(),
                source,
            })?;

        // Drain both pipes on their own threads so a chatty child never blocks
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match wait_with_deadline(&mut child, self.timeout, cancel)? {
            Wait::Exited(status) => status,
            Wait::TimedOut => {
                warn!(command = %self.display_command(), timeout = ?self.timeout, "killing export");
                let _ = child.kill();
                let _ = child.wait();
                return Err(FetchError::Timeout(self.timeout));
            }
            Wait::Cancelled => {
                debug!(command = %self.display_command(), "killing cancelled export");
                let _ = child.kill();
                let _ = child.wait();
                return Err(FetchError::Cancelled);
            }
        };

        let stdout = collect(stdout)?;
        let stderr = collect(stderr)?;

        if !status.success() {
            return Err(FetchError::Exit {
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        Ok(stdout)
    }
}

impl RecordSource for CommandExport {
    fn fetch(&mut self, cancel: &AtomicBool) -> Result<Vec<Record>, FetchError> {
        let started = Instant::now();
        let output = self.run(cancel)?;
        let records = parse_records(&output)?;
        debug!(
            command = %self.display_command(),
            records = records.len(),
            elapsed = ?started.elapsed(),
            "export finished"
        );
        Ok(records)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf)?;
        Ok(buf)
    })
}

fn collect(handle: Option<JoinHandle<std::io::Result<Vec<u8>>>>) -> Result<Vec<u8>, FetchError> {
    match handle {
        Some(handle) => match handle.join() {
            Ok(result) => Ok(result?),
            Err(_) => Err(FetchError::Io(std::io::Error::other("pipe reader panicked"))),
        },
        None => Ok(Vec::new()),
    }
}

/// Wait for the child to exit, the deadline to pass or `cancel` to be set
fn wait_with_deadline(
    child: &mut Child,
    timeout: Duration,
    cancel: &AtomicBool,
) -> Result<Wait, FetchError> {
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Wait::Exited(status));
        }
        if cancel.load(Ordering::SeqCst) {
            return Ok(Wait::Cancelled);
        }
        if Instant::now() >= deadline {
            return Ok(Wait::TimedOut);
        }
        thread::sleep(WAIT_POLL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::model::Value;

    fn idle() -> AtomicBool {
        AtomicBool::new(false)
    }

    fn shell(script: &str, timeout: Duration) -> CommandExport {
        CommandExport::new("sh", vec!["-c".to_string(), script.to_string()], timeout)
    }

    #[test]
    fn test_fetch_parses_stdout() {
        let mut export = shell(
            r#"echo '[{"uuid":"a","id":1},{"uuid":"b","id":2,"tags":["x"]}]'"#,
            Duration::from_secs(5),
        );
        let records = export.fetch(&idle()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("id"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_non_zero_exit_is_an_error() {
        let mut export = shell("echo boom >&2; exit 3", Duration::from_secs(5));
        match export.fetch(&idle()) {
            Err(FetchError::Exit { status, stderr }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected exit error, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_output_is_an_error() {
        let mut export = shell("echo 'not json'", Duration::from_secs(5));
        assert!(matches!(export.fetch(&idle()), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let mut export = CommandExport::new(
            "taskhud-definitely-not-installed",
            Vec::new(),
            Duration::from_secs(1),
        );
        assert!(matches!(export.fetch(&idle()), Err(FetchError::Spawn { .. })));
    }

    #[test]
    fn test_hung_export_times_out() {
        let mut export = CommandExport::new(
            "sleep",
            vec!["5".to_string()],
            Duration::from_millis(100),
        );
        let started = Instant::now();
        assert!(matches!(export.fetch(&idle()), Err(FetchError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_cancel_kills_running_export() {
        let mut export = CommandExport::new(
            "sleep",
            vec!["5".to_string()],
            Duration::from_secs(30),
        );
        let cancel = std::sync::Arc::new(AtomicBool::new(false));
        let flag = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            flag.store(true, Ordering::SeqCst);
        });

        let started = Instant::now();
        assert!(matches!(export.fetch(&cancel), Err(FetchError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(4));
        canceller.join().unwrap();
    }

    #[test]
    fn test_display_command() {
        let export = CommandExport::new(
            "task",
            vec!["rc.json.array=on".to_string(), "export".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(export.display_command(), "task rc.json.array=on export");
    }
}
