//! Subcommand handlers for list-cameras and config actions.

use std::path::Path;

use super::args::ConfigAction;
use crate::camera;
use crate::config::{default_path, Config, ConfigError, DEFAULT_CONFIG_TOML};
use crate::identity;

/// List available cameras and print them to stdout.
pub fn list_cameras() -> Result<(), camera::CameraError> {
    let devices = camera::list_devices()?;
    if devices.is_empty() {
        println!("No cameras found.");
        println!();
        println!("Make sure your camera is connected and permissions are granted.");
    } else {
        println!("Available cameras:");
        for device in devices {
            println!("  {}", device);
        }
        println!();
        println!("Use --camera <index> to select a camera.");
    }
    Ok(())
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    config: &Config,
    config_path: Option<&Path>,
) -> Result<(), ConfigError> {
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            println!("Current configuration:");
            println!();
            print!("{}", config.to_toml()?);
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
            let identity_path = config
                .identity
                .path
                .clone()
                .unwrap_or_else(identity::default_path);
            println!("Identity file: {}", identity_path.display());
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'squat-coach config show' to view current settings.");
                return Ok(());
            }

            let io_error = |source| ConfigError::IoError {
                path: config_path.clone(),
                source,
            };
            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent).map_err(io_error)?;
            }
            std::fs::write(&config_path, DEFAULT_CONFIG_TOML).map_err(io_error)?;

            println!("Created config file: {}", config_path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        handle_config_action(ConfigAction::Init, &Config::default(), Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TOML);

        // second init leaves the file alone
        std::fs::write(&path, "[camera]\ndevice = 3\n").unwrap();
        handle_config_action(ConfigAction::Init, &Config::default(), Some(&path)).unwrap();
        assert_eq!(Config::load(Some(&path)).unwrap().camera.device, 3);
    }
}
