/**
 * @file stop.rs
 * @author Nguyen Le Duy
 * @date 22/05/2025
 * @brief Killing leftovers of earlier simulations.
 */
use std::io::ErrorKind;
use std::process::Stdio;
use tokio::process::Command;

use crate::toolchain::Toolchain;
use crate::LaunchError;

/// What the stop helper did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    /// The helper exited unsuccessfully, usually because nothing was running.
    NothingStopped(Option<i32>),
    HelperMissing,
}

/// Run the toolchain's `stop_bsim.sh`, which kills every simulator process of
/// the current user so that stale runs do not hold on to the radio channel or
/// shared memory.
///
/// A missing helper or a failing run is not an error, only failing to start
/// an existing helper is.
pub async fn stop_simulations(toolchain: &Toolchain) -> Result<StopOutcome, LaunchError> {
    let script = toolchain.stop_script();

    let status = Command::new(&script)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {
            log::debug!("Stopped stale simulations");
            Ok(StopOutcome::Stopped)
        }
        Ok(status) => {
            log::debug!("{} exited with {}", script.display(), status);
            Ok(StopOutcome::NothingStopped(status.code()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::warn!("Stop helper {} not found, skipping cleanup", script.display());
            Ok(StopOutcome::HelperMissing)
        }
        Err(source) => Err(LaunchError::Spawn {
            program: script,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_helper_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let toolchain = Toolchain::new(dir.path(), None);

        assert_eq!(
            stop_simulations(&toolchain).await.unwrap(),
            StopOutcome::HelperMissing
        );
    }
}
