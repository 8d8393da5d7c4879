/**
 * @file pipes.rs
 * @author Nguyen Le Duy
 * @date 22/05/2025
 * @brief Named pipes emulating the UART of the simulated devices.
 */
use bsim_types::PipePair;
use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::FileTypeExt;
use std::path::Path;

use crate::LaunchError;

const FIFO_MODE: libc::mode_t = 0o600;

/// Outcome of [`ensure_pipes`].
#[derive(Debug, Default)]
pub struct PipeSetup {
    pub created: usize,
    /// Paths that could not be turned into a pipe, the rest were still set up.
    pub failures: Vec<LaunchError>,
}

/// Create the pipe directory and every missing pipe.
///
/// Pipes outlive the simulation and are reused by the next run, so a pipe
/// that already exists is skipped. A path that fails does not stop the
/// others, only a missing pipe directory is an error.
pub fn ensure_pipes(dir: &Path, pairs: &[PipePair]) -> Result<PipeSetup, LaunchError> {
    fs::create_dir_all(dir)?;

    let mut setup = PipeSetup::default();

    for pair in pairs {
        for path in [&pair.h2c, &pair.c2h] {
            match ensure_fifo(path) {
                Ok(true) => {
                    log::debug!("Created pipe {}", path.display());
                    setup.created += 1;
                }
                Ok(false) => log::debug!("Reusing pipe {}", path.display()),
                Err(e) => setup.failures.push(e),
            }
        }
    }

    Ok(setup)
}

/// Returns `false` when a FIFO was already present at `path`.
fn ensure_fifo(path: &Path) -> Result<bool, LaunchError> {
    match mkfifo(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            if fs::metadata(path)?.file_type().is_fifo() {
                Ok(false)
            } else {
                Err(LaunchError::NotAFifo(path.to_path_buf()))
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn mkfifo(path: &Path) -> io::Result<()> {
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    // SAFETY: `c_path` is a valid NUL terminated string that outlives the call.
    let ret = unsafe { libc::mkfifo(c_path.as_ptr(), FIFO_MODE) };

    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
