//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Stream your webcam to a squat-analysis service and get live form feedback
#[derive(Parser, Debug)]
#[command(name = "squat-coach")]
#[command(version, about = "Live squat coaching from your webcam", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Camera device index (from list-cameras)
    #[arg(long)]
    pub camera: Option<u32>,

    /// Mirror camera horizontally
    #[arg(long)]
    pub mirror: bool,

    /// REST base URL of the analysis service
    #[arg(long)]
    pub api_url: Option<String>,

    /// Socket base URL of the analysis service
    #[arg(long)]
    pub ws_url: Option<String>,

    /// Identity cache file (token and user record)
    #[arg(long)]
    pub identity: Option<PathBuf>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run an interactive training session (default)
    Train,
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    /// Overlay command-line flags on a loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(camera) = self.camera {
            config.camera.device = camera;
        }
        if self.mirror {
            config.camera.mirror = true;
        }
        if let Some(url) = &self.api_url {
            config.server.api_base_url = url.clone();
        }
        if let Some(url) = &self.ws_url {
            config.server.ws_base_url = url.clone();
        }
        if let Some(path) = &self.identity {
            config.identity.path = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["squat-coach"]);
        assert!(args.command.is_none());
        assert!(args.camera.is_none());
        assert!(!args.mirror);
        assert!(args.api_url.is_none());
        assert!(args.ws_url.is_none());
        assert!(args.identity.is_none());
        assert!(args.config.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_subcommands() {
        let args = Args::parse_from(["squat-coach", "train"]);
        assert_eq!(args.command, Some(Command::Train));

        let args = Args::parse_from(["squat-coach", "list-cameras"]);
        assert_eq!(args.command, Some(Command::ListCameras));

        let args = Args::parse_from(["squat-coach", "config", "init"]);
        assert_eq!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init
            })
        );
    }

    #[test]
    fn test_args_global_flags() {
        let args = Args::parse_from([
            "squat-coach",
            "--camera",
            "2",
            "--mirror",
            "-v",
            "--ws-url",
            "wss://coach.example/analysis/ws",
        ]);
        assert_eq!(args.camera, Some(2));
        assert!(args.mirror);
        assert!(args.verbose);
        assert_eq!(args.ws_url.as_deref(), Some("wss://coach.example/analysis/ws"));
    }

    #[test]
    fn test_apply_to_overrides_only_given_flags() {
        let args = Args::parse_from([
            "squat-coach",
            "--camera",
            "1",
            "--api-url",
            "http://10.0.0.2:8000/api/analysis",
            "--identity",
            "/tmp/id.json",
        ]);
        let mut config = Config::default();
        config.camera.mirror = true;
        args.apply_to(&mut config);

        assert_eq!(config.camera.device, 1);
        assert!(config.camera.mirror);
        assert_eq!(config.server.api_base_url, "http://10.0.0.2:8000/api/analysis");
        assert_eq!(config.server.ws_base_url, Config::default().server.ws_base_url);
        assert_eq!(config.identity.path, Some(PathBuf::from("/tmp/id.json")));
    }
}
