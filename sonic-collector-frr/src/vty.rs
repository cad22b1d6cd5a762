//! Client for the FRR VTY unix sockets.
//!
//! Each FRR daemon listens on `<socket_dir>/<daemon>.vty`. A request is the
//! command text followed by a NUL byte; the reply is the command output
//! followed by three NUL bytes and a one-byte status, where 0 means success.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::trace;

use crate::error::VtyError;

const TERMINATOR: [u8; 3] = [0, 0, 0];
const CMD_SUCCESS: u8 = 0;

/// Sends commands to FRR daemons, one connection per command.
#[derive(Debug, Clone)]
pub struct VtyClient {
    socket_dir: PathBuf,
    timeout: Duration,
}

impl VtyClient {
    pub fn new(socket_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            socket_dir: socket_dir.into(),
            timeout,
        }
    }

    /// Socket path of a daemon.
    pub fn socket_path(&self, daemon: &str) -> PathBuf {
        self.socket_dir.join(format!("{}.vty", daemon))
    }

    /// Run a command on a daemon and return its output.
    pub async fn execute(&self, daemon: &str, command: &str) -> Result<String, VtyError> {
        let path = self.socket_path(daemon);
        trace!(daemon, command, "Sending VTY command");

        tokio::time::timeout(self.timeout, exchange(&path, command))
            .await
            .map_err(|_| VtyError::Timeout(self.timeout))?
    }
}

async fn exchange(path: &Path, command: &str) -> Result<String, VtyError> {
    let mut stream = UnixStream::connect(path)
        .await
        .map_err(|source| VtyError::Connect {
            path: path.to_path_buf(),
            source,
        })?;

    let mut request = Vec::with_capacity(command.len() + 1);
    request.extend_from_slice(command.as_bytes());
    request.push(0);
    stream.write_all(&request).await?;

    let mut reply = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Err(VtyError::Closed);
        }
        reply.extend_from_slice(&chunk[..n]);

        if let Some(status) = completed(&reply) {
            reply.truncate(reply.len() - 4);
            if status != CMD_SUCCESS {
                return Err(VtyError::Command {
                    command: command.to_string(),
                    status,
                });
            }
            return Ok(String::from_utf8(reply)?);
        }
    }
}

/// Status byte, once the reply ends with the terminator.
fn completed(reply: &[u8]) -> Option<u8> {
    let len = reply.len();
    if len >= 4 && reply[len - 4..len - 1] == TERMINATOR {
        Some(reply[len - 1])
    } else {
        None
    }
}
