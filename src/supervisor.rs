use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::launcher::{InvocationSpec, TeardownSpec};
use crate::types::ExecutionResult;

/// Cap on captured stdout/stderr, per stream. Output past the cap is
/// discarded while the pipe keeps draining, so truncation never stalls the
/// child or disturbs its exit status.
pub const MAX_CAPTURE_BYTES: usize = 5 * 1024 * 1024;

/// How long to keep draining the pipes once the process itself is gone.
/// Bounds the case where an orphaned descendant still holds the write end.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Bound on the sandbox teardown command run after a timeout.
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Execute one invocation under a wall-clock deadline.
///
/// Exactly two events can resolve the call: the process exits, or the
/// deadline fires first. On a natural exit the real exit code and the
/// captured streams are returned with `timed_out = false`. On deadline the
/// process (and any sandbox it owns) is killed and reaped, `timed_out` is
/// set, and `exit_code` is `None`.
///
/// A failing user program is data, not an error; only a sandbox that cannot
/// start at all yields [`EngineError::LaunchFailure`].
pub async fn run(
    spec: &InvocationSpec,
    time_limit: Duration,
) -> Result<ExecutionResult, EngineError> {
    let start = Instant::now();

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group, so a deadline kill reaches every descendant the
    // invocation forked, not just the direct child.
    #[cfg(unix)]
    cmd.process_group(0);
    if let Some(dir) = &spec.current_dir {
        cmd.current_dir(dir);
    }

    debug!(program = %spec.program, "spawning sandboxed process");
    let mut child = cmd.spawn().map_err(|e| {
        EngineError::LaunchFailure(
            anyhow::Error::new(e).context(format!("failed to spawn `{}`", spec.program)),
        )
    })?;

    // Drain both pipes concurrently while waiting, as a full pipe would
    // block the child indefinitely.
    let stdout_capture = StreamCapture::spawn(child.stdout.take());
    let stderr_capture = StreamCapture::spawn(child.stderr.take());

    let wait_result = tokio::time::timeout(time_limit, child.wait()).await;
    let elapsed_time_ms = start.elapsed().as_millis() as u64;

    let timed_out = match &wait_result {
        Ok(Ok(_)) => false,
        Ok(Err(e)) => {
            return Err(EngineError::LaunchFailure(anyhow::anyhow!(
                "failed waiting on sandboxed process: {e}"
            )))
        }
        Err(_) => {
            // Deadline elapsed first: tear down the sandbox itself (a
            // container outlives its client process), kill the whole
            // process group, then reap the child. kill_on_drop backs this
            // up if the signal cannot be delivered.
            if let Some(teardown) = &spec.teardown {
                run_teardown(teardown).await;
            }
            kill_process_group(&child);
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill timed-out process");
            }
            debug!(elapsed_ms = elapsed_time_ms, "execution timed out");
            true
        }
    };

    let (stdout_buf, stderr_buf) =
        futures::future::join(stdout_capture.settle(), stderr_capture.settle()).await;

    let exit_code = match wait_result {
        // A signal-terminated process has no code; report -1 so `None`
        // stays reserved for the timeout sentinel.
        Ok(Ok(status)) => Some(status.code().unwrap_or(-1)),
        _ => None,
    };

    Ok(ExecutionResult {
        stdout: String::from_utf8_lossy(&stdout_buf).to_string(),
        stderr: String::from_utf8_lossy(&stderr_buf).to_string(),
        exit_code,
        timed_out,
        elapsed_time_ms,
    })
}

/// Kill the invocation's entire process group. The group exists because
/// the child was spawned with `process_group(0)`; already-exited groups
/// are a normal race, not a fault.
#[cfg(unix)]
fn kill_process_group(child: &tokio::process::Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &tokio::process::Child) {}

/// Run the backend's sandbox teardown command, bounded and best-effort.
async fn run_teardown(teardown: &TeardownSpec) {
    let mut cmd = Command::new(&teardown.program);
    cmd.args(&teardown.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    match tokio::time::timeout(TEARDOWN_TIMEOUT, cmd.status()).await {
        Ok(Ok(status)) if status.success() => {}
        Ok(Ok(status)) => warn!(%status, "sandbox teardown exited nonzero"),
        Ok(Err(e)) => warn!(error = %e, "failed to run sandbox teardown"),
        Err(_) => warn!("sandbox teardown timed out"),
    }
}

/// Background drain of one output pipe into a shared, capped buffer.
///
/// The buffer is shared rather than returned by the task so that whatever
/// was captured is still available when the drain has to be cut short.
struct StreamCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: tokio::task::JoinHandle<()>,
}

impl StreamCapture {
    fn spawn<R: AsyncRead + Unpin + Send + 'static>(reader: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                if let Some(reader) = reader {
                    drain_into(reader, &buf, MAX_CAPTURE_BYTES).await;
                }
            })
        };
        Self { buf, task }
    }

    /// Wait briefly for the drain to reach EOF, then take what was
    /// captured. If an orphaned writer keeps the pipe open past the grace
    /// period, stop draining rather than hang the caller.
    async fn settle(mut self) -> Vec<u8> {
        if tokio::time::timeout(DRAIN_GRACE, &mut self.task)
            .await
            .is_err()
        {
            self.task.abort();
        }
        let mut buf = self.buf.lock().unwrap();
        std::mem::take(&mut *buf)
    }
}

/// Read a stream to EOF, keeping at most `cap` bytes in `buf`. Reading
/// continues past the cap so the writer never blocks on a full pipe.
async fn drain_into<R: AsyncRead + Unpin>(mut reader: R, buf: &Mutex<Vec<u8>>, cap: usize) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let mut buf = buf.lock().unwrap();
                if buf.len() < cap {
                    let take = n.min(cap - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                }
            }
        }
    }
}
