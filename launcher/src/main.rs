/**
 * @file main.rs
 * @author Nguyen Le Duy
 * @date 21/05/2025
 * @brief Main entry point for the simulation launcher.
 */
use anyhow::{bail, Context};
use bsim_launcher::{stop, LaunchError, LaunchPlan, Launcher, LauncherConfig, Toolchain};
use bsim_shell::ShellDevice;
use bsim_types::{DeviceIndex, PipePair, SimulationId};
use clap::{Parser, Subcommand};
use std::process;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

const CONFIG_PATH: &str = "bsim.toml";

#[derive(Parser, Debug)]
#[command(
    name = "bsim-launch",
    version,
    about = "Build a Zephyr firmware and run it inside a BabbleSim Bluetooth simulation",
    long_about = "Build a Zephyr firmware and run it inside a BabbleSim Bluetooth simulation.\n\nRequires BSIM_OUT_PATH (and optionally BSIM_COMPONENTS_PATH) to point at the BabbleSim installation.\n\nExamples:\n  bsim-launch\n  bsim-launch --no-build --devices 2 --no-debugger\n  bsim-launch shell 1"
)]
struct Cli {
    /// Configuration file, missing files are ignored.
    #[arg(short, long, global = true, default_value = CONFIG_PATH)]
    config: String,

    /// Simulation id shared by every process.
    #[arg(long, global = true, conflicts_with = "random_id")]
    sim_id: Option<String>,

    /// Use a freshly generated simulation id.
    #[arg(long, global = true)]
    random_id: bool,

    /// Number of firmware devices.
    #[arg(long, global = true)]
    devices: Option<u32>,

    /// Use the firmware from the previous build.
    #[arg(long, global = true)]
    no_build: bool,

    /// Run the firmware without a debugger.
    #[arg(long, global = true)]
    no_debugger: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build, set up pipes and start the simulation (default).
    Launch,
    /// Print the processes that would be started, as JSON.
    Plan,
    /// Kill every running simulation.
    Stop,
    /// Attach the terminal to the shell of a firmware device.
    Shell {
        /// Device index, firmware devices start at 1.
        device: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    log::debug!("Config: {:?}", config);

    match cli.command.unwrap_or(Commands::Launch) {
        Commands::Launch => {
            let code = launch(config).await?;
            process::exit(code);
        }
        Commands::Plan => {
            let plan = LaunchPlan::new(&config, &Toolchain::from_env()?);
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Stop => {
            let outcome = stop::stop_simulations(&Toolchain::from_env()?).await?;
            log::info!("Stop helper: {:?}", outcome);
        }
        Commands::Shell { device } => shell(&config, device).await?,
    }

    Ok(())
}

fn init_logger() {
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(log::LevelFilter::Info);

    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    builder.init();
}

fn load_config(cli: &Cli) -> anyhow::Result<LauncherConfig> {
    let mut config = LauncherConfig::parse(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config))?;

    if let Some(id) = &cli.sim_id {
        config.simulation_id = SimulationId::new(id.as_str())?;
    }

    if cli.random_id {
        config.simulation_id = SimulationId::generate();
    }

    if let Some(devices) = cli.devices {
        config.devices = devices;
    }

    if cli.no_build {
        config.skip_build = true;
    }

    if cli.no_debugger {
        config.debugger = None;
    }

    config.validate().context("Invalid configuration")?;

    Ok(config)
}

/// Returns the exit code of the launcher: the build tool's code when the
/// build fails, otherwise the foreground process's.
async fn launch(config: LauncherConfig) -> anyhow::Result<i32> {
    let launcher = Launcher::new(config, Toolchain::from_env()?)?;

    match launcher.run().await {
        Ok(end) => Ok(end.exit_code()),
        Err(e @ LaunchError::BuildFailed { .. }) => {
            log::error!("{}", e);
            Ok(e.exit_code())
        }
        Err(e) => Err(e.into()),
    }
}

async fn shell(config: &LauncherConfig, device: u32) -> anyhow::Result<()> {
    if DeviceIndex(device) == DeviceIndex::HANDBRAKE {
        bail!("Device 0 is the handbrake, firmware devices start at 1");
    }

    let pipes = PipePair::for_device(&config.pipe_dir, DeviceIndex(device));
    let mut device = ShellDevice::open(&pipes)
        .with_context(|| format!("Failed to open device {}", pipes.name()))?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = stdin.next_line() => match line? {
                Some(line) => device.send_cmd(&line).await?,
                None => break,
            },
            line = device.next_line() => match line {
                Some(line) => println!("{line}"),
                None => break,
            },
            _ = signal::ctrl_c() => break,
        }
    }

    device.close();
    Ok(())
}
