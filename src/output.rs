// src/output.rs

//! Preparation of the output directory shared by `build` and `serve`.
//!
//! The runtime process is started in the output directory, so it needs a
//! package descriptor whose `main` field points at the entry point. `serve`
//! may additionally inject a replacement entry point that wraps the real one.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::config::BuildOptions;
use crate::errors::{HotserveError, Result};
use crate::fs::FileSystem;
use crate::path_utils::{normalize, relative_path, to_slash};

/// Placeholder in an entry wrapper template.
pub const MAIN_PLACEHOLDER: &str = "{{main}}";

/// Entry wrapper used by `serve` when none is configured: reloads every
/// window on the reload signal, then loads the real entry point.
pub const DEFAULT_ENTRY_WRAPPER: &str = r#"const electron = require('electron');
const signal = process.env.HOTSERVE_RELOAD_SIGNAL || 'SIGUSR1';
process.on(signal, () => {
  for (const window of electron.BrowserWindow.getAllWindows()) {
    window.reload();
  }
});
require('./{{main}}');
"#;

/// Replacement entry point written next to the build output.
pub struct ReplaceMain {
    /// File name (relative to the output directory).
    pub file_name: String,
    /// Produces the file contents from the path of the original entry point,
    /// relative to the replacement's directory.
    pub content: Box<dyn Fn(&str) -> String + Send + Sync>,
}

impl fmt::Debug for ReplaceMain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaceMain")
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

impl ReplaceMain {
    /// Replacement built from a template where every `{{main}}` is
    /// substituted.
    pub fn from_template(file_name: impl Into<String>, template: String) -> Self {
        Self {
            file_name: file_name.into(),
            content: Box::new(move |main| template.replace(MAIN_PLACEHOLDER, main)),
        }
    }
}

/// Paths resolved by [`setup_output_path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub output_path: PathBuf,
    /// Entry point the descriptor points at (the replacement, if any).
    pub main_path: PathBuf,
    /// Entry point produced by the build targets.
    pub original_main_path: PathBuf,
    pub package_json_path: PathBuf,
}

/// Prepare `options.output_path` below `workspace_root`.
///
/// - The input package descriptor must exist.
/// - The output directory is removed first if `clean_output_path` is set,
///   then created.
/// - If `replace_main` is given, the replacement entry point is written.
/// - The descriptor is copied into the output directory with `main` pointing
///   at the (possibly replaced) entry point.
pub fn setup_output_path(
    fs: &dyn FileSystem,
    workspace_root: &Path,
    options: &BuildOptions,
    replace_main: Option<&ReplaceMain>,
) -> Result<OutputPaths> {
    let in_package_json = normalize(&workspace_root.join(&options.package_json_path));
    if !fs.is_file(&in_package_json) {
        return Err(HotserveError::ConfigError(format!(
            "package.json file could not be found: {}",
            in_package_json.display()
        )));
    }

    let output_path = normalize(&workspace_root.join(&options.output_path));
    let package_json_path = output_path.join("package.json");
    let original_main_path = normalize(&output_path.join(&options.main));
    let mut main_path = original_main_path.clone();

    if options.clean_output_path {
        debug!(path = %output_path.display(), "cleaning output path");
        fs.remove_dir_all(&output_path)?;
    }
    fs.create_dir_all(&output_path)?;

    if let Some(replace) = replace_main {
        let replacement = normalize(&output_path.join(&replace.file_name));
        let folder = replacement
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| output_path.clone());
        fs.create_dir_all(&folder)?;

        let relative_main = to_slash(&relative_path(&folder, &original_main_path));
        fs.write(&replacement, (replace.content)(&relative_main).as_bytes())?;
        info!(
            replacement = %replacement.display(),
            original = %original_main_path.display(),
            "wrote replacement entry point"
        );
        main_path = replacement;
    }

    let mut descriptor: Value = serde_json::from_str(&fs.read_to_string(&in_package_json)?)?;
    let Some(fields) = descriptor.as_object_mut() else {
        return Err(HotserveError::ConfigError(format!(
            "{} does not contain a JSON object",
            in_package_json.display()
        )));
    };
    fields.insert(
        "main".to_string(),
        Value::String(to_slash(&relative_path(&output_path, &main_path))),
    );

    fs.write(
        &package_json_path,
        serde_json::to_string_pretty(&descriptor)?.as_bytes(),
    )?;
    debug!(path = %package_json_path.display(), "wrote package descriptor");

    Ok(OutputPaths {
        output_path,
        main_path,
        original_main_path,
        package_json_path,
    })
}
