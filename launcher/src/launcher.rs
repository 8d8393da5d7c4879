/**
 * @file launcher.rs
 * @author Nguyen Le Duy
 * @date 23/05/2025
 * @brief Sequencing of the launch steps.
 */
use crate::config::LauncherConfig;
use crate::plan::LaunchPlan;
use crate::session::{Session, SessionEnd};
use crate::toolchain::Toolchain;
use crate::{firmware, pipes, stop, LaunchError};

pub struct Launcher {
    config: LauncherConfig,
    toolchain: Toolchain,
}

impl Launcher {
    pub fn new(config: LauncherConfig, toolchain: Toolchain) -> Result<Self, LaunchError> {
        config.validate()?;
        Ok(Self { config, toolchain })
    }

    pub fn plan(&self) -> LaunchPlan {
        LaunchPlan::new(&self.config, &self.toolchain)
    }

    /// Build the firmware, set up the pipes and clear out stale simulations.
    ///
    /// Only a failing build is an error. Pipe and cleanup problems are logged
    /// and the launch goes on, the processes will report what they miss.
    pub async fn prepare(&self, plan: &LaunchPlan) -> Result<(), LaunchError> {
        if self.config.skip_build {
            log::info!("Skipping firmware build");
        } else {
            let executable = firmware::build(&self.config).await?;
            log::info!("Firmware built: {}", executable.display());
        }

        match pipes::ensure_pipes(&self.config.pipe_dir, &plan.pipes) {
            Ok(setup) => {
                for failure in &setup.failures {
                    log::error!("Pipe setup failed: {}", failure);
                }

                log::info!(
                    "Pipes ready in {} ({} created, {} failed)",
                    self.config.pipe_dir.display(),
                    setup.created,
                    setup.failures.len()
                );
            }
            Err(e) => log::error!("Pipe setup failed: {}", e),
        }

        if let Err(e) = stop::stop_simulations(&self.toolchain).await {
            log::warn!("Could not stop stale simulations: {}", e);
        }

        Ok(())
    }

    /// Start the processes of the plan, see [`Session::spawn`].
    pub fn start(&self, plan: &LaunchPlan) -> Session {
        log::info!(
            "Starting simulation {} with {} firmware device(s)",
            plan.simulation_id,
            plan.pipes.len()
        );

        Session::spawn(plan)
    }

    /// Prepare, start, wait for the foreground process and tear everything
    /// down again.
    pub async fn run(&self) -> Result<SessionEnd, LaunchError> {
        let plan = self.plan();
        self.prepare(&plan).await?;

        let mut session = self.start(&plan);
        let end = session.wait().await;
        session.shutdown().await;

        end
    }
}
