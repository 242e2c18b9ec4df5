//! Path resolution for the provider config and state files
//!
//! # Environment Variables
//!
//! - `USERSYNC_CONFIG` - Path of the provider config file
//! - `USERSYNC_STATE_DIR` - Directory holding the state file
//!
//! # Path Resolution Priority
//!
//! For config_path():
//! 1. `USERSYNC_CONFIG` environment variable
//! 2. `XDG_CONFIG_HOME/usersync/config.toml` (if set)
//! 3. Platform config dir: `<config dir>/usersync/config.toml`
//!
//! For state_path():
//! 1. `USERSYNC_STATE_DIR/state.json`
//! 2. `XDG_STATE_HOME/usersync/state.json` (if set)
//! 3. Platform default: `~/.local/state/usersync/state.json`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for the config file override
pub const ENV_CONFIG: &str = "USERSYNC_CONFIG";

/// Environment variable for the state directory override
pub const ENV_STATE_DIR: &str = "USERSYNC_STATE_DIR";

const APP_DIR: &str = "usersync";
const CONFIG_FILE: &str = "config.toml";
const STATE_FILE: &str = "state.json";

/// Location of the provider config file
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG) {
        let path = expand(&path);
        log::debug!("Using config file from {}: {}", ENV_CONFIG, path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR).join(CONFIG_FILE);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let dir = dirs::config_dir().context("Could not determine config directory")?;
    let path = dir.join(APP_DIR).join(CONFIG_FILE);
    log::debug!("Using default config file: {}", path.display());
    Ok(path)
}

/// Location of the state file holding bound identities and observed state
pub fn state_path() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir).join(STATE_FILE);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join(APP_DIR).join(STATE_FILE);
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(local_app_data) = dirs::data_local_dir() {
            return Ok(local_app_data.join(APP_DIR).join(STATE_FILE));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home
        .join(".local")
        .join("state")
        .join(APP_DIR)
        .join(STATE_FILE);
    log::debug!("Using default state file: {}", path.display());
    Ok(path)
}

/// Expand ~ and environment variables in a path string
///
/// Unknown variables are left as written.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Run `f` with `key` set, restoring the previous value afterwards
    ///
    /// Each test touches its own variables only, since tests share the
    /// process environment.
    fn with_env_var<F, R>(key: &str, value: Option<&str>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: no other test reads or writes this variable
        match value {
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        let result = f();
        match original {
            // SAFETY: see above
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    #[test]
    fn test_config_path_env_override() {
        with_env_var(ENV_CONFIG, Some("/custom/usersync.toml"), || {
            assert_eq!(config_path().unwrap(), PathBuf::from("/custom/usersync.toml"));
        });
    }

    #[test]
    fn test_state_path_resolution() {
        with_env_var(ENV_STATE_DIR, Some("~/usersync-state-test"), || {
            let home = dirs::home_dir().unwrap();
            assert_eq!(
                state_path().unwrap(),
                home.join("usersync-state-test").join("state.json")
            );
        });

        with_env_var(ENV_STATE_DIR, None, || {
            with_env_var("XDG_STATE_HOME", Some("/tmp/xdg-state-test"), || {
                assert_eq!(
                    state_path().unwrap(),
                    PathBuf::from("/tmp/xdg-state-test/usersync/state.json")
                );
            });
        });
    }

    #[test]
    fn test_expand() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/tenant/config.toml"), home.join("tenant").join("config.toml"));
        assert_eq!(expand("/absolute/path"), PathBuf::from("/absolute/path"));
        assert_eq!(
            expand("/path/$USERSYNC_NONEXISTENT_12345/file"),
            PathBuf::from("/path/$USERSYNC_NONEXISTENT_12345/file")
        );
    }
}
