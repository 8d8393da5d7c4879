/**
 * @file firmware.rs
 * @author Nguyen Le Duy
 * @date 22/05/2025
 * @brief Building the firmware image that runs on the simulated board.
 */
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::config::LauncherConfig;
use crate::LaunchError;

/// Build the firmware and return the path of the resulting executable.
///
/// The build tool runs with the firmware project as its working directory,
/// the launcher's own working directory is left alone. Any failure here is
/// fatal, a stale executable from an earlier build is never used.
pub async fn build(config: &LauncherConfig) -> Result<PathBuf, LaunchError> {
    let tool = resolve_tool(&config.build_tool)?;
    let mut cmd = build_command(config, &tool);

    log::info!(
        "Building firmware in {} for board {}",
        config.firmware_dir.display(),
        config.board
    );

    let status = cmd.status().await.map_err(|source| LaunchError::Spawn {
        program: tool.clone(),
        source,
    })?;

    if !status.success() {
        return Err(LaunchError::BuildFailed {
            code: status.code(),
        });
    }

    let executable = config.executable_path();

    match tokio::fs::try_exists(&executable).await {
        Ok(true) => {}
        Ok(false) => log::warn!(
            "Build succeeded but {} does not exist",
            executable.display()
        ),
        Err(e) => log::warn!(
            "Build succeeded but {} could not be checked: {}",
            executable.display(),
            e
        ),
    }

    Ok(executable)
}

pub fn resolve_tool(tool: &str) -> Result<PathBuf, LaunchError> {
    which::which(tool).map_err(|source| LaunchError::ToolNotFound {
        tool: tool.to_string(),
        source,
    })
}

fn build_command(config: &LauncherConfig, tool: &Path) -> Command {
    let mut cmd = Command::new(tool);

    cmd.current_dir(&config.firmware_dir)
        .arg("build")
        .arg("-b")
        .arg(&config.board)
        .args(&config.build_args);

    cmd
}
