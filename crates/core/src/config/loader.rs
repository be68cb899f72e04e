//! Config path resolution
//!
//! The shim library is loaded from `<game>/mods/hookshim/bin/hookshim.so`;
//! configuration lives next to it under `<game>/mods/hookshim/configs/`.
//! `HOOKSHIM_ROOT` overrides the base directory, which test harnesses and
//! unusual install layouts rely on.

use std::path::PathBuf;

use super::{ConfigError, ConfigResult};

/// Returns the hookshim base directory.
///
/// `HOOKSHIM_ROOT` wins when set; otherwise navigate up from the loaded
/// library location: `hookshim.so -> bin -> hookshim/`.
pub fn shim_base_dir() -> ConfigResult<PathBuf> {
    if let Ok(root) = std::env::var("HOOKSHIM_ROOT") {
        return Ok(PathBuf::from(root));
    }

    let exe = std::env::current_exe().map_err(ConfigError::IoError)?;
    exe.parent() // bin/
        .and_then(|p| p.parent()) // hookshim/
        .map(PathBuf::from)
        .ok_or(ConfigError::NoConfigDirectory)
}

/// Returns the base configs directory.
pub fn configs_dir() -> ConfigResult<PathBuf> {
    Ok(shim_base_dir()?.join("configs"))
}

/// Returns the core framework config path.
pub fn config_path() -> ConfigResult<PathBuf> {
    Ok(configs_dir()?.join("hookshim.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_format() {
        // This test verifies path construction logic without touching the
        // real environment.
        let base = PathBuf::from("/game/mods/hookshim");
        let expected = base.join("configs").join("hookshim.toml");
        assert!(expected.ends_with("configs/hookshim.toml"));
    }
}
