use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::http::StatusCode;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::DispatchOutcome;

/// Environment variable carrying the hex-encoded payload
pub const PAYLOAD_ENV: &str = "DATA";

/// How long to keep draining pipes after a timed-out process is killed
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Largest amount of combined output kept per process; the rest is discarded
const MAX_OUTPUT_SIZE: usize = 1024 * 1024;

type OutputBuffer = Arc<Mutex<Vec<u8>>>;

/// Run `path` with the payload in [`PAYLOAD_ENV`] and map its exit.
///
/// The payload only ever travels through the environment, never argv or a
/// shell, so remote data cannot inject commands.
pub async fn run(path: &str, payload: &[u8], timeout: Duration) -> DispatchOutcome {
    debug!(path = %path, size = payload.len(), "Spawning consumer process");

    let mut child = match Command::new(path)
        .env(PAYLOAD_ENV, hex::encode(payload))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!(path = %path, error = %e, "Failed to spawn consumer process");
            return DispatchOutcome::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start {path}: {e}"),
            );
        }
    };

    // stdout and stderr land in one buffer, interleaved as they arrive
    let output: OutputBuffer = Arc::default();
    let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(collect(stdout, output.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(collect(stderr, output.clone())));
    }

    let outcome = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) if status.success() => DispatchOutcome::delivered(),
        Ok(Ok(status)) => {
            warn!(path = %path, status = %status, "Consumer process failed");
            DispatchOutcome::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{path} exited with {status}"),
            )
        }
        Ok(Err(e)) => {
            warn!(path = %path, error = %e, "Failed to wait for consumer process");
            DispatchOutcome::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(_) => {
            warn!(path = %path, timeout = ?timeout, "Consumer process timed out, killing it");
            if let Err(e) = child.kill().await {
                warn!(path = %path, error = %e, "Failed to kill consumer process");
            }
            drain(&mut readers).await;
            DispatchOutcome::new(StatusCode::GATEWAY_TIMEOUT, snapshot(&output))
        }
    };

    for reader in readers {
        reader.abort();
    }
    outcome
}

/// Read `reader` to the end so the process never blocks on a full pipe, keeping
/// at most [`MAX_OUTPUT_SIZE`] bytes.
async fn collect<R: AsyncRead + Unpin>(mut reader: R, output: OutputBuffer) {
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Ok(mut buf) = output.lock() {
                    let room = MAX_OUTPUT_SIZE.saturating_sub(buf.len());
                    buf.extend_from_slice(&chunk[..n.min(room)]);
                }
            }
        }
    }
}

/// Let readers pick up what is left in the pipes. Grandchildren may keep a
/// pipe open, so this is bounded.
async fn drain(readers: &mut [JoinHandle<()>]) {
    let _ = tokio::time::timeout(DRAIN_GRACE, async {
        for reader in readers.iter_mut() {
            let _ = reader.await;
        }
    })
    .await;
}

fn snapshot(output: &OutputBuffer) -> Bytes {
    match output.lock() {
        Ok(buf) => Bytes::copy_from_slice(&buf),
        Err(_) => Bytes::new(),
    }
}
