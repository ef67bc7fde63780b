use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Config file name looked up in the working directory and the config dir.
pub const CONFIG_FILE_NAME: &str = "robodeploy.json";

/// Base robodeploy config directory (~/.config/robodeploy/ on Unix-like systems)
pub fn robodeploy() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows".to_string())
        })?;
        Ok(PathBuf::from(appdata).join("robodeploy"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("robodeploy"))
    }
}

/// Global robodeploy.json config file path
pub fn global_config() -> Result<PathBuf> {
    Ok(robodeploy()?.join(CONFIG_FILE_NAME))
}
