//! bsim_shell
//! Author: Nguyen Le Duy
//! Date: 24/05/2025
//! Description: Client for the Zephyr shell of a simulated device. The device
//! UART is emulated with a pair of named pipes created by the launcher; this
//! crate opens them, sends commands and waits for responses.

mod device;
mod error;
mod line;
mod lock;

pub use device::{DEFAULT_TIMEOUT, ShellCommand, ShellDevice};
pub use error::ShellError;
pub use line::LineBuffer;
pub use lock::LockFile;
