use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("Device {name} already open (or dead), delete {} to regain control", lock.display())]
    AlreadyOpen { name: String, lock: PathBuf },

    #[error("Failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid response pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("No response matching {pattern:?} within {timeout:?}")]
    NoResponse { pattern: String, timeout: Duration },

    #[error("Pipe to {0} disconnected")]
    Disconnected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
