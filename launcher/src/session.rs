/**
 * @file session.rs
 * @author Nguyen Le Duy
 * @date 23/05/2025
 * @brief Child processes of a running simulation.
 */
use bsim_types::SimulationId;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tokio::signal;

use crate::plan::{Invocation, LaunchPlan, Role};
use crate::LaunchError;

/// Exit code reported when the session is ended with Ctrl-C.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug)]
pub struct Spawned {
    pub role: Role,
    child: Child,
}

impl Spawned {
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}

/// How the foreground process of a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Exited(ExitStatus),
    Interrupted,
    /// The foreground process could not be started.
    NoForeground,
}

impl SessionEnd {
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionEnd::Exited(status) => status.code().unwrap_or(1),
            SessionEnd::Interrupted => INTERRUPTED_EXIT_CODE,
            SessionEnd::NoForeground => 1,
        }
    }
}

/// Every process started for one simulation, in spawn order.
///
/// Children are killed when the session is dropped; `shutdown` does the same
/// but also waits for them to exit.
#[derive(Debug)]
pub struct Session {
    simulation_id: SimulationId,
    children: Vec<Spawned>,
    foreground: Option<usize>,
    interactive: bool,
}

impl Session {
    /// Start every process of the plan in order, without waiting for any of
    /// them to become ready.
    ///
    /// A process that fails to start is logged and skipped, the others still
    /// run. Must be called from within a tokio runtime.
    pub fn spawn(plan: &LaunchPlan) -> Self {
        let mut session = Self {
            simulation_id: plan.simulation_id.clone(),
            children: Vec::with_capacity(plan.processes.len()),
            foreground: None,
            interactive: false,
        };

        for invocation in &plan.processes {
            let child = match spawn_one(invocation) {
                Ok(child) => child,
                Err(e) => {
                    log::error!("Failed to start {}: {}", invocation.role, e);
                    continue;
                }
            };

            log::info!(
                "Started {} (pid {}) for simulation {}",
                invocation.role,
                child.id().unwrap_or_default(),
                session.simulation_id
            );

            if invocation.foreground {
                session.foreground = Some(session.children.len());
                session.interactive = invocation.interactive;
            }

            session.children.push(Spawned {
                role: invocation.role,
                child,
            });
        }

        session
    }

    pub fn children(&self) -> &[Spawned] {
        &self.children
    }

    pub fn roles(&self) -> Vec<Role> {
        self.children.iter().map(|c| c.role).collect()
    }

    /// Wait until the foreground process exits.
    ///
    /// While a debugger holds the terminal, Ctrl-C belongs to it and is
    /// ignored here. Otherwise Ctrl-C ends the wait.
    pub async fn wait(&mut self) -> Result<SessionEnd, LaunchError> {
        let Some(index) = self.foreground else {
            log::error!("No foreground process is running");
            return Ok(SessionEnd::NoForeground);
        };

        let interactive = self.interactive;
        let foreground = &mut self.children[index];

        loop {
            tokio::select! {
                status = foreground.child.wait() => {
                    let status = status?;
                    log::info!("{} exited with {}", foreground.role, status);
                    return Ok(SessionEnd::Exited(status));
                }
                interrupt = signal::ctrl_c() => {
                    interrupt?;

                    if interactive {
                        log::debug!("Interrupt left to the debugger");
                        continue;
                    }

                    log::info!("Interrupted, stopping simulation {}", self.simulation_id);
                    return Ok(SessionEnd::Interrupted);
                }
            }
        }
    }

    /// Kill every process that is still running and wait for it to exit.
    pub async fn shutdown(mut self) {
        let children = std::mem::take(&mut self.children);

        let stops = children.into_iter().map(|mut spawned| async move {
            match spawned.child.try_wait() {
                Ok(Some(status)) => {
                    log::debug!("{} already exited with {}", spawned.role, status);
                }
                _ => match spawned.child.kill().await {
                    Ok(()) => log::debug!("Stopped {}", spawned.role),
                    Err(e) => log::warn!("Failed to stop {}: {}", spawned.role, e),
                },
            }
        });

        futures::future::join_all(stops).await;
        log::info!("Simulation {} shut down", self.simulation_id);
    }
}

fn spawn_one(invocation: &Invocation) -> Result<Child, LaunchError> {
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args).kill_on_drop(true);

    if let Some(cwd) = &invocation.cwd {
        cmd.current_dir(cwd);
    }

    // Background processes get their own process group so that Ctrl-C in the
    // terminal only reaches the foreground process.
    if !invocation.foreground {
        cmd.stdin(Stdio::null()).process_group(0);
    }

    cmd.spawn().map_err(|source| LaunchError::Spawn {
        program: invocation.program.clone(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::path::PathBuf;

    fn invocation(role: Role, program: &str, args: &[&str], foreground: bool) -> Invocation {
        Invocation {
            role,
            program: PathBuf::from(program),
            args: args.iter().map(|a| a.to_string()).collect(),
            cwd: None,
            foreground,
            interactive: false,
        }
    }

    fn plan(processes: Vec<Invocation>) -> LaunchPlan {
        LaunchPlan {
            simulation_id: SimulationId::new("session_test").unwrap(),
            pipes: Vec::new(),
            processes,
        }
    }

    #[tokio::test]
    async fn test_spawn_order_and_foreground_exit() {
        let plan = plan(vec![
            invocation(Role::Handbrake, "sleep", &["30"], false),
            invocation(Role::Phy, "sleep", &["30"], false),
            invocation(
                Role::Firmware {
                    device: bsim_types::DeviceIndex(1),
                },
                "sh",
                &["-c", "exit 3"],
                true,
            ),
        ]);

        let mut session = Session::spawn(&plan);
        assert_eq!(session.roles(), plan.processes.iter().map(|p| p.role).collect::<Vec<_>>());
        assert!(session.children().iter().all(|c| c.id().is_some()));

        let end = session.wait().await.unwrap();
        assert_eq!(end.exit_code(), 3);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_spawn_is_skipped() {
        let plan = plan(vec![
            invocation(Role::Handbrake, "/nonexistent/bs_device_handbrake", &[], false),
            invocation(Role::Phy, "sleep", &["30"], false),
        ]);

        let mut session = Session::spawn(&plan);
        assert_eq!(session.roles(), vec![Role::Phy]);
        assert_eq!(session.wait().await.unwrap(), SessionEnd::NoForeground);

        session.shutdown().await;
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(SessionEnd::Exited(ExitStatus::from_raw(0)).exit_code(), 0);
        // killed by SIGKILL, no exit code
        assert_eq!(SessionEnd::Exited(ExitStatus::from_raw(9)).exit_code(), 1);
        assert_eq!(SessionEnd::Interrupted.exit_code(), 130);
        assert_eq!(SessionEnd::NoForeground.exit_code(), 1);
    }
}
