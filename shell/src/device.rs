/**
 * @file device.rs
 * @author Nguyen Le Duy
 * @date 24/05/2025
 * @brief Shell client for a simulated device reachable over its UART pipes.
 */
use bsim_types::PipePair;
use regex::Regex;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::line::LineBuffer;
use crate::lock::LockFile;
use crate::ShellError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 256;

/// How often the receive task looks for a writer before the firmware connects.
const CONNECT_POLL: Duration = Duration::from_millis(20);

/// A shell command together with the response that confirms it.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    pub command: String,
    pub response: String,
    pub timeout: Duration,
}

impl ShellCommand {
    pub fn new(command: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            response: response.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct ShellDevice {
    name: String,
    tx: pipe::Sender,
    lines: mpsc::UnboundedReceiver<String>,
    receiver: JoinHandle<()>,
    lock: LockFile,
}

impl ShellDevice {
    /// Open the pipes of a device and start collecting its output.
    ///
    /// Both ends are opened without waiting for the firmware, it may connect
    /// later. Once it has sent something, closing its end of the pipe ends
    /// the stream of lines. Must be called from within a tokio runtime.
    pub fn open(pipes: &PipePair) -> Result<Self, ShellError> {
        let name = pipes.name();
        let lock = LockFile::acquire(&pipes.lock, &name)?;

        let rx = pipe::OpenOptions::new()
            .open_receiver(&pipes.c2h)
            .map_err(|source| open_error(&pipes.c2h, source))?;
        let tx = sender_options()
            .open_sender(&pipes.h2c)
            .map_err(|source| open_error(&pipes.h2c, source))?;

        let (sender, lines) = mpsc::unbounded_channel();
        let receiver = tokio::spawn(receive_lines(rx, name.clone(), sender));

        log::info!("Opened device {}", name);

        Ok(Self {
            name,
            tx,
            lines,
            receiver,
            lock,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    pub async fn send_cmd(&mut self, cmd: &str) -> Result<(), ShellError> {
        let mut data = Vec::with_capacity(cmd.len() + 1);
        data.extend_from_slice(cmd.as_bytes());
        data.push(b'\n');

        log::debug!("{} <- {}", self.name, cmd);
        self.tx.write_all(&data).await?;
        Ok(())
    }

    /// Wait for a line starting with a match of `pattern`.
    ///
    /// Lines received before the match are consumed. Returns `None` when the
    /// timeout elapses first.
    pub async fn wait_for(
        &mut self,
        pattern: &str,
        timeout: Duration,
    ) -> Result<Option<String>, ShellError> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        let deadline = Instant::now() + timeout;

        loop {
            let line = match time::timeout_at(deadline, self.lines.recv()).await {
                Ok(Some(line)) => line,
                Ok(None) => return Err(ShellError::Disconnected(self.name.clone())),
                Err(_) => return Ok(None),
            };

            log::trace!("{} -> {}", self.name, line);

            if regex.is_match(&line) {
                return Ok(Some(line));
            }
        }
    }

    /// Send a command and wait for its confirmation.
    pub async fn send_cmd_sync(&mut self, cmd: &ShellCommand) -> Result<String, ShellError> {
        self.send_cmd(&cmd.command).await?;

        self.wait_for(&cmd.response, cmd.timeout)
            .await?
            .ok_or_else(|| ShellError::NoResponse {
                pattern: cmd.response.clone(),
                timeout: cmd.timeout,
            })
    }

    /// Next line from the device, `None` once its pipe is gone.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Print everything the device says until its pipe goes away.
    pub async fn pipe_to_stdout(&mut self) {
        while let Some(line) = self.next_line().await {
            println!("{line}");
        }
    }

    pub fn close(self) {
        log::info!("Closing device {}", self.name);
        // pipes and lock are released by drop
    }
}

impl Drop for ShellDevice {
    fn drop(&mut self) {
        self.receiver.abort();
    }
}

fn sender_options() -> pipe::OpenOptions {
    let mut options = pipe::OpenOptions::new();

    // A write-only open fails with ENXIO until the firmware opens its end.
    #[cfg(target_os = "linux")]
    options.read_write(true);

    options
}

fn open_error(path: &Path, source: std::io::Error) -> ShellError {
    ShellError::Open {
        path: path.to_path_buf(),
        source,
    }
}

async fn receive_lines(
    mut rx: pipe::Receiver,
    name: String,
    lines: mpsc::UnboundedSender<String>,
) {
    let mut buffer = LineBuffer::default();
    let mut chunk = [0u8; READ_CHUNK];
    let mut connected = false;

    loop {
        let len = match rx.read(&mut chunk).await {
            // no writer yet, the firmware has not opened its end
            Ok(0) if !connected => {
                time::sleep(CONNECT_POLL).await;
                continue;
            }
            Ok(0) => {
                log::info!("Pipe to {} disconnected, terminating receive task", name);
                return;
            }
            Ok(len) => {
                connected = true;
                len
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::error!("Failed to read from {}: {}", name, e);
                return;
            }
        };

        for line in buffer.extend(&chunk[..len]) {
            if lines.send(line).is_err() {
                return;
            }
        }
    }
}
