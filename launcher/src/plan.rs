/**
 * @file plan.rs
 * @author Nguyen Le Duy
 * @date 23/05/2025
 * @brief The ordered list of processes making up one simulation.
 */
use bsim_types::{DeviceIndex, PipePair, SimulationId};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::LauncherConfig;
use crate::toolchain::Toolchain;

/// Gap between the random seeds of consecutive firmware devices.
const SEED_STRIDE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    Handbrake,
    Phy,
    Firmware { device: DeviceIndex },
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Handbrake => f.write_str("handbrake"),
            Role::Phy => f.write_str("phy"),
            Role::Firmware { device } => write!(f, "firmware d{device}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Invocation {
    pub role: Role,
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Keeps the terminal, the session ends when it exits.
    pub foreground: bool,
    /// Runs under the debugger, which handles interrupts itself.
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LaunchPlan {
    pub simulation_id: SimulationId,
    pub pipes: Vec<PipePair>,
    /// In spawn order: handbrake, PHY, then the firmware devices.
    pub processes: Vec<Invocation>,
}

impl LaunchPlan {
    pub fn new(config: &LauncherConfig, toolchain: &Toolchain) -> Self {
        let id = &config.simulation_id;
        let bin_dir = toolchain.bin_dir();

        let pipes = (0..config.devices)
            .map(|ordinal| PipePair::for_device(&config.pipe_dir, DeviceIndex::firmware(ordinal)))
            .collect::<Vec<_>>();

        let mut processes = Vec::with_capacity(pipes.len() + 2);

        processes.push(Invocation {
            role: Role::Handbrake,
            program: toolchain.handbrake(),
            args: vec![
                format!("-s={id}"),
                format!("-d={}", DeviceIndex::HANDBRAKE),
                format!("-r={}", config.handbrake_rate),
            ],
            cwd: Some(bin_dir.clone()),
            foreground: false,
            interactive: false,
        });

        // every firmware device plus the handbrake is a radio device
        processes.push(Invocation {
            role: Role::Phy,
            program: toolchain.phy(),
            args: vec![format!("-s={id}"), format!("-D={}", config.devices + 1)],
            cwd: Some(bin_dir),
            foreground: false,
            interactive: false,
        });

        let executable = config.executable_path();
        let debugger = config.debugger.as_deref().filter(|d| !d.is_empty());

        for (ordinal, pair) in (0u32..).zip(&pipes) {
            let args = firmware_args(config, ordinal, pair);
            let first = ordinal == 0;

            let invocation = match debugger {
                Some(debugger) if first => Invocation {
                    role: Role::Firmware { device: pair.device },
                    program: PathBuf::from(debugger),
                    args: debugger_args(&executable, args),
                    cwd: None,
                    foreground: true,
                    interactive: true,
                },
                _ => Invocation {
                    role: Role::Firmware { device: pair.device },
                    program: executable.clone(),
                    args,
                    cwd: None,
                    foreground: first,
                    interactive: false,
                },
            };

            processes.push(invocation);
        }

        Self {
            simulation_id: id.clone(),
            pipes,
            processes,
        }
    }

    pub fn foreground(&self) -> Option<&Invocation> {
        self.processes.iter().find(|p| p.foreground)
    }
}

fn firmware_args(config: &LauncherConfig, ordinal: u32, pipes: &PipePair) -> Vec<String> {
    let seed = config
        .seed
        .wrapping_add(ordinal.wrapping_mul(SEED_STRIDE));

    vec![
        format!("-s={}", config.simulation_id),
        format!("-d={}", pipes.device),
        format!("-RealEncryption={}", u8::from(config.real_encryption)),
        format!("-rs={seed}"),
        format!("-fifo_0_rx={}", pipes.h2c.display()),
        format!("-fifo_0_tx={}", pipes.c2h.display()),
    ]
}

/// Run the program right away and print a backtrace whenever it stops.
fn debugger_args(executable: &Path, program_args: Vec<String>) -> Vec<String> {
    let mut args = vec![
        "-q".to_string(),
        "-ex".to_string(),
        "run".to_string(),
        "-ex".to_string(),
        "backtrace".to_string(),
        "--args".to_string(),
        executable.display().to_string(),
    ];

    args.extend(program_args);
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> LauncherConfig {
        LauncherConfig {
            simulation_id: SimulationId::new("myid").unwrap(),
            firmware_dir: PathBuf::from("/work/app"),
            pipe_dir: PathBuf::from("/tmp/pipes"),
            ..Default::default()
        }
    }

    fn toolchain() -> Toolchain {
        Toolchain::new("/opt/bsim", None)
    }

    #[test]
    fn test_default_plan() {
        let plan = LaunchPlan::new(&config(), &toolchain());

        let roles = plan.processes.iter().map(|p| p.role).collect::<Vec<_>>();
        assert_eq!(
            roles,
            vec![
                Role::Handbrake,
                Role::Phy,
                Role::Firmware {
                    device: DeviceIndex(1)
                }
            ]
        );

        assert_eq!(
            plan.processes[0],
            Invocation {
                role: Role::Handbrake,
                program: PathBuf::from("/opt/bsim/bin/bs_device_handbrake"),
                args: vec!["-s=myid".into(), "-d=0".into(), "-r=10".into()],
                cwd: Some(PathBuf::from("/opt/bsim/bin")),
                foreground: false,
                interactive: false,
            }
        );

        assert_eq!(plan.processes[1].args, vec!["-s=myid", "-D=2"]);

        let firmware = plan.foreground().unwrap();
        assert!(firmware.interactive);
        assert_eq!(firmware.program, PathBuf::from("gdb"));
        assert_eq!(
            firmware.args,
            vec![
                "-q",
                "-ex",
                "run",
                "-ex",
                "backtrace",
                "--args",
                "/work/app/build/zephyr/zephyr.exe",
                "-s=myid",
                "-d=1",
                "-RealEncryption=0",
                "-rs=0",
                "-fifo_0_rx=/tmp/pipes/d1-h2c.fifo",
                "-fifo_0_tx=/tmp/pipes/d1-c2h.fifo",
            ]
        );
    }

    #[test]
    fn test_every_process_shares_the_simulation_id() {
        let config = LauncherConfig {
            simulation_id: SimulationId::generate(),
            devices: 3,
            ..config()
        };
        let plan = LaunchPlan::new(&config, &toolchain());
        let expected = format!("-s={}", config.simulation_id);

        assert_eq!(plan.processes.len(), 5);
        for process in &plan.processes {
            assert_eq!(
                process.args.iter().filter(|a| a.starts_with("-s=")).collect::<Vec<_>>(),
                vec![&expected],
                "{}",
                process.role
            );
        }
    }

    #[test]
    fn test_multiple_devices_without_debugger() {
        let config = LauncherConfig {
            devices: 2,
            seed: 7,
            real_encryption: true,
            debugger: None,
            ..config()
        };
        let plan = LaunchPlan::new(&config, &toolchain());

        assert_eq!(plan.pipes.len(), 2);
        assert_eq!(plan.processes[1].args[1], "-D=3");

        let firmware = &plan.processes[2..];
        assert_eq!(firmware.len(), 2);
        assert!(firmware[0].foreground);
        assert!(!firmware[1].foreground);

        for process in firmware {
            assert_eq!(process.program, PathBuf::from("/work/app/build/zephyr/zephyr.exe"));
        }

        assert_eq!(
            firmware[1].args,
            vec![
                "-s=myid",
                "-d=2",
                "-RealEncryption=1",
                "-rs=107",
                "-fifo_0_rx=/tmp/pipes/d2-h2c.fifo",
                "-fifo_0_tx=/tmp/pipes/d2-c2h.fifo",
            ]
        );
        assert_eq!(plan.foreground().unwrap().args[3], "-rs=7");
    }

    #[test]
    fn test_empty_debugger_runs_bare() {
        let config = LauncherConfig {
            debugger: Some(String::new()),
            ..config()
        };
        let plan = LaunchPlan::new(&config, &toolchain());
        let firmware = plan.foreground().unwrap();

        assert!(!firmware.interactive);
        assert_eq!(firmware.program, PathBuf::from("/work/app/build/zephyr/zephyr.exe"));
    }

    #[test]
    fn test_plan_serializes() {
        let plan = LaunchPlan::new(&config(), &toolchain());
        let json = serde_json::to_value(&plan).unwrap();

        assert_eq!(json["simulation_id"], "myid");
        assert_eq!(json["processes"][0]["role"]["kind"], "handbrake");
        assert_eq!(json["processes"][2]["role"]["device"], 1);
    }
}
