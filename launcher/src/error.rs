/**
 * @file error.rs
 * @author Nguyen Le Duy
 * @date 21/05/2025
 * @brief Errors raised while preparing and launching a simulation.
 */
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tool {tool:?} not found: {source}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: which::Error,
    },

    #[error("Firmware build failed with {}", describe_code(*code))]
    BuildFailed { code: Option<i32> },

    #[error("{} exists but is not a named pipe", .0.display())]
    NotAFifo(PathBuf),

    #[error("Failed to spawn {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File system error: {0}")]
    FileSystemError(#[from] std::io::Error),
}

impl LaunchError {
    /// Exit code the launcher terminates with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::BuildFailed { code: Some(code) } => *code,
            _ => 1,
        }
    }
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => String::from("a signal"),
    }
}
