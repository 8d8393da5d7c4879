/**
 * @file lib.rs
 * @author Nguyen Le Duy
 * @date 21/05/2025
 * @brief Launcher for BabbleSim Bluetooth simulations: builds the firmware,
 *        prepares the UART pipes and starts the simulator processes.
 */
pub mod config;
pub mod error;
pub mod firmware;
pub mod launcher;
pub mod pipes;
pub mod plan;
pub mod session;
pub mod stop;
pub mod toolchain;

pub use config::LauncherConfig;
pub use error::LaunchError;
pub use launcher::Launcher;
pub use plan::{Invocation, LaunchPlan, Role};
pub use session::{Session, SessionEnd};
pub use toolchain::Toolchain;
