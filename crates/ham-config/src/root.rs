//! Project root resolution

use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the project directory
pub const PROJECT_ROOT_ENV: &str = "HAM_PROJECT_ROOT";

/// Project directory used when nothing else is given
pub const DEFAULT_PROJECT_DIR: &str = "ham.d";

/// Resolve the project root.
///
/// Priority:
/// 1. `explicit` (the `--project-dir` flag)
/// 2. `HAM_PROJECT_ROOT`
/// 3. `ham.d` in the current directory
///
/// A leading `~` is expanded and the result is made absolute. The directory
/// does not have to exist yet (`ham init` creates it).
pub fn resolve_project_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let raw = match explicit {
        Some(path) => path.to_path_buf(),
        None => std::env::var_os(PROJECT_ROOT_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROJECT_DIR)),
    };

    let expanded = expand_home(&raw)?;
    let root = if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()?.join(expanded)
    };
    debug!(project_root = %root.display(), "Resolved project root");
    Ok(root)
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    let Ok(rest) = path.strip_prefix("~") else {
        return Ok(path.to_path_buf());
    };
    let home = dirs::home_dir().ok_or_else(|| ConfigError::HomeDirNotFound(path.to_path_buf()))?;
    Ok(home.join(rest))
}
