/**
 * @file toolchain.rs
 * @author Nguyen Le Duy
 * @date 21/05/2025
 * @brief Locations of the BabbleSim binaries the launcher starts.
 */
use std::env;
use std::path::PathBuf;

use crate::LaunchError;

pub const OUT_PATH_VAR: &str = "BSIM_OUT_PATH";
pub const COMPONENTS_PATH_VAR: &str = "BSIM_COMPONENTS_PATH";

const HANDBRAKE_BIN: &str = "bs_device_handbrake";
const PHY_BIN: &str = "bs_2G4_phy_v1";
const STOP_SCRIPT: &str = "common/stop_bsim.sh";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    out_path: PathBuf,
    components_path: PathBuf,
}

impl Toolchain {
    pub fn new(out_path: impl Into<PathBuf>, components_path: Option<PathBuf>) -> Self {
        let out_path = out_path.into();
        let components_path = components_path.unwrap_or_else(|| out_path.join("components"));

        Self {
            out_path,
            components_path,
        }
    }

    /// `BSIM_OUT_PATH` is required, `BSIM_COMPONENTS_PATH` falls back to the
    /// `components` directory of the output path.
    pub fn from_env() -> Result<Self, LaunchError> {
        let out_path = non_empty_var(OUT_PATH_VAR).ok_or(LaunchError::MissingEnv(OUT_PATH_VAR))?;
        let components_path = non_empty_var(COMPONENTS_PATH_VAR).map(PathBuf::from);

        Ok(Self::new(out_path, components_path))
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.out_path.join("bin")
    }

    pub fn handbrake(&self) -> PathBuf {
        self.bin_dir().join(HANDBRAKE_BIN)
    }

    pub fn phy(&self) -> PathBuf {
        self.bin_dir().join(PHY_BIN)
    }

    pub fn stop_script(&self) -> PathBuf {
        self.components_path.join(STOP_SCRIPT)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}
