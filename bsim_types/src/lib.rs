//! bsim_types
//! Author: Nguyen Le Duy
//! Date: 21/05/2025
//! Description: This module defines the data structures shared between the
//! simulation launcher and the shell device client: the simulation identifier,
//! device indices and the named pipe layout of a simulated device.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Length of a generated simulation identifier.
const GENERATED_ID_LEN: usize = 21;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Simulation id must not be empty")]
    EmptySimulationId,
    #[error("Simulation id {0:?} contains whitespace or '/'")]
    InvalidSimulationId(String),
}

/// Key grouping every process of one simulated run.
///
/// The simulator uses the id as a directory name, so it cannot be empty and
/// cannot contain a path separator or whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SimulationId(String);

impl SimulationId {
    pub fn new(id: impl Into<String>) -> Result<Self, Error> {
        let id = id.into();

        if id.is_empty() {
            return Err(Error::EmptySimulationId);
        }

        if id.chars().any(|c| c == '/' || c.is_whitespace()) {
            return Err(Error::InvalidSimulationId(id));
        }

        Ok(Self(id))
    }

    /// Random id, so that parallel runs do not discover each other.
    pub fn generate() -> Self {
        Self(nanoid::nanoid!(GENERATED_ID_LEN, &nanoid::alphabet::SAFE))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SimulationId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SimulationId> for String {
    fn from(id: SimulationId) -> Self {
        id.0
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Index of a device inside one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIndex(pub u32);

impl DeviceIndex {
    /// The handbrake always takes the first slot.
    pub const HANDBRAKE: DeviceIndex = DeviceIndex(0);

    /// Index of the `ordinal`-th firmware device (0-based).
    pub const fn firmware(ordinal: u32) -> Self {
        DeviceIndex(ordinal + 1)
    }
}

impl fmt::Display for DeviceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named pipes emulating the UART of one simulated device.
///
/// `h2c` carries bytes from the host to the controller (the firmware reads
/// it), `c2h` the other way round. The lock file marks the pair as taken by a
/// shell client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipePair {
    pub device: DeviceIndex,
    pub h2c: PathBuf,
    pub c2h: PathBuf,
    pub lock: PathBuf,
}

impl PipePair {
    pub fn for_device(dir: impl AsRef<Path>, device: DeviceIndex) -> Self {
        let dir = dir.as_ref();

        Self {
            device,
            h2c: dir.join(format!("d{device}-h2c.fifo")),
            c2h: dir.join(format!("d{device}-c2h.fifo")),
            lock: dir.join(format!("d{device}.lock")),
        }
    }

    /// Human readable name, used in log messages.
    pub fn name(&self) -> String {
        format!("d{}", self.device)
    }
}
