//! `.env` file discovery and loading

use super::error::ConfigError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the file searched for by [`load_env`]
pub const ENV_FILE_NAME: &str = ".env";

/// Find the nearest `.env` file in `start` or any of its parents
pub fn find_env_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(ENV_FILE_NAME))
        .find(|candidate| candidate.is_file())
}

/// Load environment variables from a `.env` file.
///
/// With `path = None` the current directory and its parents are searched.
/// Existing variables are kept unless `override_existing` is set. Returns
/// whether a file was loaded; a missing file is not an error.
pub fn load_env(path: Option<&Path>, override_existing: bool) -> Result<bool, ConfigError> {
    let env_path = match path {
        Some(path) if path.is_file() => path.to_path_buf(),
        Some(path) => {
            debug!("Env file {} does not exist, skipping", path.display());
            return Ok(false);
        }
        None => {
            let cwd = std::env::current_dir().map_err(|e| ConfigError::EnvFile {
                path: ENV_FILE_NAME.to_string(),
                source: dotenvy::Error::Io(e),
            })?;
            match find_env_file(&cwd) {
                Some(found) => found,
                None => return Ok(false),
            }
        }
    };

    let result = if override_existing {
        dotenvy::from_path_override(&env_path)
    } else {
        dotenvy::from_path(&env_path)
    };
    result.map_err(|source| ConfigError::EnvFile {
        path: env_path.display().to_string(),
        source,
    })?;

    debug!("Loaded environment from {}", env_path.display());
    Ok(true)
}
