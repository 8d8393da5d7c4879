/**
 * @file config.rs
 * @author Nguyen Le Duy
 * @date 21/05/2025
 * @brief Configuration handling for the simulation launcher.
 */
use bsim_types::SimulationId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::LaunchError;

/// Prefix of the environment variables overriding the config file.
pub const ENV_PREFIX: &str = "BSIM_LAUNCHER";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LauncherConfig {
    /// Shared by every process of the run.
    pub simulation_id: SimulationId,
    /// Firmware project, the build runs inside it.
    pub firmware_dir: PathBuf,
    pub build_tool: String,
    pub board: String,
    /// Extra arguments appended to the build command.
    pub build_args: Vec<String>,
    /// Built executable, relative to `firmware_dir`.
    pub executable: PathBuf,
    pub pipe_dir: PathBuf,
    /// Number of firmware devices.
    pub devices: u32,
    /// How much faster than real time the simulation may run.
    pub handbrake_rate: f64,
    pub seed: u32,
    pub real_encryption: bool,
    /// Debugger wrapping the first firmware device, `None` runs it bare.
    pub debugger: Option<String>,
    pub skip_build: bool,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            simulation_id: SimulationId::new("myid").expect("valid default id"),
            firmware_dir: PathBuf::from("."),
            build_tool: String::from("west"),
            board: String::from("nrf52_bsim"),
            build_args: Vec::new(),
            executable: PathBuf::from("build/zephyr/zephyr.exe"),
            pipe_dir: PathBuf::from("/tmp/bsim_pipes"),
            devices: 1,
            handbrake_rate: 10.0,
            seed: 0,
            real_encryption: false,
            debugger: Some(String::from("gdb")),
            skip_build: false,
        }
    }
}

impl LauncherConfig {
    /// Defaults, overridden by the (optional) file at `path`, overridden by
    /// `BSIM_LAUNCHER_*` environment variables.
    pub fn parse(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&LauncherConfig::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn validate(&self) -> Result<(), LaunchError> {
        if self.devices == 0 {
            return Err(LaunchError::InvalidConfig(
                "at least one firmware device is required".to_string(),
            ));
        }

        if !(self.handbrake_rate.is_finite() && self.handbrake_rate > 0.0) {
            return Err(LaunchError::InvalidConfig(format!(
                "handbrake rate must be positive, got {}",
                self.handbrake_rate
            )));
        }

        if self.board.is_empty() {
            return Err(LaunchError::InvalidConfig("board must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn executable_path(&self) -> PathBuf {
        self.firmware_dir.join(&self.executable)
    }
}
