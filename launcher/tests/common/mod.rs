//! A fake BabbleSim installation and firmware project built from shell
//! scripts. Every fake binary records its arguments in the log directory.

#![allow(dead_code)]

use bsim_launcher::{LauncherConfig, Toolchain};
use bsim_types::SimulationId;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub struct FakeSimulation {
    _dir: TempDir,
    pub root: PathBuf,
    pub config: LauncherConfig,
    pub toolchain: Toolchain,
}

impl FakeSimulation {
    /// `build_exit` is the exit code of the fake build tool.
    pub fn new(build_exit: i32) -> Self {
        let _ = pretty_env_logger::formatted_builder()
            .is_test(true)
            .try_init();

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let logs = root.join("logs");
        fs::create_dir_all(&logs).unwrap();

        let bsim = root.join("bsim");
        let app = root.join("app");

        write_script(
            &bsim.join("bin/bs_device_handbrake"),
            &format!("{}\nexec sleep 30", record(&logs, "handbrake")),
        );
        write_script(
            &bsim.join("bin/bs_2G4_phy_v1"),
            &format!("{}\nexec sleep 30", record(&logs, "phy")),
        );
        write_script(
            &bsim.join("components/common/stop_bsim.sh"),
            &format!("{}\nexit 1", record(&logs, "stop")),
        );
        write_script(
            &root.join("tools/west"),
            &format!(
                "echo \"$(pwd -P) $@\" > {logs}/build.tmp && mv {logs}/build.tmp {logs}/build.args\nexit {build_exit}",
                logs = logs.display()
            ),
        );
        write_script(
            &app.join("build/zephyr/zephyr.exe"),
            &format!("{}\nexec sleep 30", record(&logs, "firmware")),
        );

        let config = LauncherConfig {
            simulation_id: SimulationId::generate(),
            firmware_dir: app,
            build_tool: root.join("tools/west").display().to_string(),
            pipe_dir: root.join("pipes"),
            debugger: None,
            ..Default::default()
        };

        Self {
            _dir: dir,
            toolchain: Toolchain::new(&bsim, None),
            root,
            config,
        }
    }

    pub fn log_path(&self, name: &str) -> PathBuf {
        self.root.join("logs").join(format!("{name}.args"))
    }

    /// Arguments a fake binary was started with, waiting for it to start.
    pub async fn wait_for_args(&self, name: &str) -> String {
        let path = self.log_path(name);

        for _ in 0..250 {
            if let Ok(args) = fs::read_to_string(&path) {
                return args.trim_end().to_string();
            }

            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        panic!("{name} was never started");
    }
}

fn record(logs: &Path, name: &str) -> String {
    format!(
        "echo \"$@\" > {logs}/{name}.tmp && mv {logs}/{name}.tmp {logs}/{name}.args",
        logs = logs.display()
    )
}

pub fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}
