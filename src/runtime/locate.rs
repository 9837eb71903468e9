// src/runtime/locate.rs

use std::env;
use std::path::{Path, PathBuf};

use crate::errors::{HotserveError, Result};

/// Resolve the runtime executable.
///
/// - A command containing a path separator is taken as a path and must
///   point at an existing file.
/// - Otherwise every directory in `PATH` is searched (with `.exe` appended on
///   Windows).
pub fn locate_executable(command: &str) -> Result<PathBuf> {
    let candidate = Path::new(command);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        if candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        return Err(HotserveError::RuntimeNotFound(command.to_string()));
    }

    let path_var = env::var_os("PATH")
        .ok_or_else(|| HotserveError::RuntimeNotFound(command.to_string()))?;

    for dir in env::split_paths(&path_var) {
        for name in executable_names(command) {
            let full = dir.join(&name);
            if full.is_file() {
                return Ok(full);
            }
        }
    }

    Err(HotserveError::RuntimeNotFound(command.to_string()))
}

fn executable_names(command: &str) -> Vec<String> {
    if cfg!(windows) && !command.to_lowercase().ends_with(".exe") {
        vec![format!("{command}.exe"), command.to_string()]
    } else {
        vec![command.to_string()]
    }
}
